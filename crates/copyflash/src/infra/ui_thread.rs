//! A dedicated thread playing the role of a host UI context.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;

use crate::infra::host::{EditorHost, EditorSurface, UiTask};

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

enum UiMessage<S> {
    Run(Job<S>),
    Close,
}

/// Owns a surface on its own thread and runs queued jobs against it in order.
pub struct UiLoop<S> {
    tx: Sender<UiMessage<S>>,
    worker: Option<JoinHandle<S>>,
}

impl<S: Send + 'static> UiLoop<S> {
    /// Move `surface` onto a new thread named `name`.
    pub fn spawn(name: &str, surface: S) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<UiMessage<S>>();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let mut surface = surface;
                for message in rx.iter() {
                    match message {
                        UiMessage::Run(job) => job(&mut surface),
                        UiMessage::Close => break,
                    }
                }
                surface
            })
            .with_context(|| format!("failed to spawn ui thread {name}"))?;

        Ok(Self {
            tx,
            worker: Some(worker),
        })
    }

    /// Dispatcher handle for the blink scheduler and other background callers.
    pub fn host(&self) -> UiLoopHost<S> {
        UiLoopHost {
            tx: self.tx.clone(),
        }
    }

    /// Run `f` on the UI thread and wait for its result.
    pub fn with_surface<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(UiMessage::Run(Box::new(move |surface: &mut S| {
                let _ = reply_tx.send(f(surface));
            })))
            .map_err(|_| anyhow!("ui thread has shut down"))?;
        reply_rx.recv().context("ui thread dropped the request")
    }

    /// Stop the thread after the jobs already queued and hand the surface back.
    ///
    /// Jobs submitted afterwards are dropped without running.
    pub fn close(mut self) -> Result<S> {
        let worker = self.worker.take().context("ui thread already closed")?;
        let _ = self.tx.send(UiMessage::Close);
        worker.join().map_err(|_| anyhow!("ui thread panicked"))
    }
}

impl<S> Drop for UiLoop<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.tx.send(UiMessage::Close);
        }
    }
}

/// [`EditorHost`] backed by a [`UiLoop`].
pub struct UiLoopHost<S> {
    tx: Sender<UiMessage<S>>,
}

impl<S> Clone for UiLoopHost<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: EditorSurface + 'static> EditorHost for UiLoopHost<S> {
    fn run_on_ui(&self, task: UiTask) {
        let job: Job<S> = Box::new(move |surface: &mut S| {
            let surface: &mut dyn EditorSurface = surface;
            task(surface)
        });
        if self.tx.send(UiMessage::Run(job)).is_err() {
            tracing::debug!("ui thread closed, task dropped");
        }
    }
}
