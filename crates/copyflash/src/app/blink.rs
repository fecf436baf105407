//! Blink sessions: timed ON/OFF decoration of copied ranges followed by a caret restore.
//!
//! Each session runs on its own scheduling thread. The thread only waits and counts: every tick
//! is shipped to the host UI context as a task, and the thread blocks until that task reports
//! back before it starts the next interval. Live decoration handles travel with the task and
//! return in its report, so nothing else can reach them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::app::restore::RestorePlan;
use crate::domain::model::{BlinkConfig, DecorationHandle, HighlightTarget};
use crate::infra::highlight::HighlightStyle;
use crate::infra::host::{EditorHost, EditorSurface};

pub type SessionId = u64;

/// How a blink session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// All ticks ran and the caret layout was restored.
    Restored,
    /// Superseded or cancelled explicitly. No restore.
    Cancelled,
    /// The editor went away mid-session. No restore.
    Disposed,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionOutcome::Restored => "restored",
            SessionOutcome::Cancelled => "cancelled",
            SessionOutcome::Disposed => "disposed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    On,
    Off,
}

impl Phase {
    fn for_tick(tick: u32) -> Self {
        if tick % 2 == 0 { Phase::On } else { Phase::Off }
    }
}

struct TickRequest {
    phase: Phase,
    targets: Arc<[HighlightTarget]>,
    style: HighlightStyle,
    live: Vec<DecorationHandle>,
    restore: bool,
    cancelled: Arc<AtomicBool>,
}

enum TickReport {
    Applied(Vec<DecorationHandle>),
    Cancelled,
    Disposed,
}

/// Cancellation of one session.
///
/// The flag is read by queued UI tasks, so a tick that was already dispatched when the cancel
/// arrived still backs out. The channel wakes the scheduling thread from its interval wait.
#[derive(Debug, Clone)]
struct CancelSignal {
    flag: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl CancelSignal {
    fn fire(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.wake.try_send(());
    }
}

/// Caller side of a running session.
#[derive(Debug)]
pub struct BlinkHandle {
    id: SessionId,
    cancel: CancelSignal,
    worker: JoinHandle<SessionOutcome>,
}

impl BlinkHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Ask the session to stop. A tick already queued on the UI context backs out untouched.
    pub fn cancel(&self) {
        self.cancel.fire();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the session ends.
    pub fn join(self) -> SessionOutcome {
        let Self { id, worker, .. } = self;
        worker.join().unwrap_or_else(|_| {
            tracing::error!(session = id, "blink session thread panicked");
            SessionOutcome::Cancelled
        })
    }
}

struct ActiveSession {
    id: SessionId,
    cancel: CancelSignal,
}

/// Starts blink sessions against one host, at most one running at a time.
pub struct BlinkScheduler<H> {
    host: Arc<H>,
    active: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl<H: EditorHost> BlinkScheduler<H> {
    pub fn new(host: H) -> Self {
        Self {
            host: Arc::new(host),
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Id of the most recently started session, finished or not.
    pub fn active_session(&self) -> Option<SessionId> {
        self.active.lock().as_ref().map(|session| session.id)
    }

    /// Cancel the most recently started session. Returns whether there was one.
    pub fn cancel_active(&self) -> bool {
        match self.active.lock().take() {
            Some(session) => {
                session.cancel.fire();
                true
            }
            None => false,
        }
    }

    /// Start flashing `targets`, cancelling any session still in flight.
    ///
    /// Returns `Ok(None)` when there is nothing to flash. The previous session is only signalled,
    /// never joined, so this is safe to call from the UI context that the old session may be
    /// waiting on.
    pub fn start(
        &self,
        targets: Vec<HighlightTarget>,
        config: BlinkConfig,
        style: HighlightStyle,
    ) -> Result<Option<BlinkHandle>> {
        if targets.is_empty() {
            tracing::debug!("no targets, blink session skipped");
            return Ok(None);
        }

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            tracing::debug!(session = previous.id, "superseding blink session");
            previous.cancel.fire();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);
        let cancel = CancelSignal {
            flag: Arc::new(AtomicBool::new(false)),
            wake: cancel_tx,
        };
        let cancelled = Arc::clone(&cancel.flag);
        let host = Arc::clone(&self.host);
        let targets: Arc<[HighlightTarget]> = targets.into();

        tracing::debug!(
            session = id,
            targets = targets.len(),
            blinks = config.blink_count(),
            interval_ms = config.blink_interval_ms(),
            "starting blink session"
        );

        let worker = thread::Builder::new()
            .name(format!("copyflash-blink-{id}"))
            .spawn(move || {
                run_session(host.as_ref(), id, targets, config, style, cancelled, cancel_rx)
            })
            .context("failed to spawn blink session thread")?;

        *active = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
        });

        Ok(Some(BlinkHandle {
            id,
            cancel,
            worker,
        }))
    }
}

fn run_session<H: EditorHost>(
    host: &H,
    session: SessionId,
    targets: Arc<[HighlightTarget]>,
    config: BlinkConfig,
    style: HighlightStyle,
    cancel_flag: Arc<AtomicBool>,
    cancel: Receiver<()>,
) -> SessionOutcome {
    let total = config.total_ticks();
    let mut live = Vec::new();

    for tick in 0..total {
        // A disconnected cancel channel means every handle is gone; stop as well.
        let stop = if tick == 0 {
            !matches!(cancel.try_recv(), Err(TryRecvError::Empty))
        } else {
            crossbeam_channel::select! {
                recv(cancel) -> _ => true,
                default(config.interval()) => false,
            }
        };

        if stop || cancel_flag.load(Ordering::SeqCst) {
            flush(host, live);
            tracing::debug!(session, tick, "blink session cancelled");
            return SessionOutcome::Cancelled;
        }

        let request = TickRequest {
            phase: Phase::for_tick(tick),
            targets: Arc::clone(&targets),
            style,
            live: std::mem::take(&mut live),
            restore: tick + 1 == total,
            cancelled: Arc::clone(&cancel_flag),
        };

        match dispatch(host, request) {
            TickReport::Applied(next) => live = next,
            TickReport::Cancelled => {
                tracing::debug!(session, tick, "blink session cancelled while tick was queued");
                return SessionOutcome::Cancelled;
            }
            TickReport::Disposed => {
                tracing::debug!(session, tick, "editor disposed, blink session stopped");
                return SessionOutcome::Disposed;
            }
        }
        tracing::trace!(session, tick, decorations = live.len(), "blink tick");
    }

    tracing::debug!(session, "blink session restored");
    SessionOutcome::Restored
}

fn dispatch<H: EditorHost>(host: &H, request: TickRequest) -> TickReport {
    let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
    host.run_on_ui(Box::new(move |surface: &mut dyn EditorSurface| {
        let _ = reply_tx.send(run_tick(surface, request));
    }));
    // A host that drops the task has no editor left to decorate.
    reply_rx.recv().unwrap_or(TickReport::Disposed)
}

/// Remove whatever a cancelled session still has attached, then wait for that to land.
fn flush<H: EditorHost>(host: &H, mut live: Vec<DecorationHandle>) {
    if live.is_empty() {
        return;
    }
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    host.run_on_ui(Box::new(move |surface: &mut dyn EditorSurface| {
        clear_decorations(surface, &mut live);
        let _ = done_tx.send(());
    }));
    let _ = done_rx.recv();
}

fn run_tick(surface: &mut dyn EditorSurface, request: TickRequest) -> TickReport {
    let TickRequest {
        phase,
        targets,
        style,
        mut live,
        restore,
        cancelled,
    } = request;

    clear_decorations(surface, &mut live);
    if cancelled.load(Ordering::SeqCst) {
        return TickReport::Cancelled;
    }
    if surface.is_disposed() {
        return TickReport::Disposed;
    }

    if phase == Phase::On {
        surface.remove_selection();
        live = apply_decorations(surface, &targets, &style);
    }

    if restore && let Some(plan) = RestorePlan::from_targets(&targets) {
        plan.apply(surface);
    }

    TickReport::Applied(live)
}

fn clear_decorations(surface: &mut dyn EditorSurface, live: &mut Vec<DecorationHandle>) {
    for handle in live.drain(..) {
        if let Err(err) = surface.remove_decoration(handle) {
            tracing::debug!(handle = handle.0, error = %err, "decoration already gone");
        }
    }
}

fn apply_decorations(
    surface: &mut dyn EditorSurface,
    targets: &[HighlightTarget],
    style: &HighlightStyle,
) -> Vec<DecorationHandle> {
    targets
        .iter()
        .filter_map(|target| match surface.add_decoration(target.range(), style) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::debug!(
                    start = target.start_offset,
                    end = target.end_offset,
                    error = %err,
                    "target skipped"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Weak;
    use std::sync::atomic::AtomicUsize;

    use once_cell::sync::OnceCell;

    use crate::domain::model::TextRange;
    use crate::infra::host::UiTask;
    use crate::infra::memory::{Caret, MemoryEditor, SurfaceEvent};

    /// Runs tasks inline on the scheduling thread, optionally disposing the editor before the
    /// task with the given index runs.
    struct InlineHost {
        editor: Arc<Mutex<MemoryEditor>>,
        ran: AtomicUsize,
        dispose_before: Option<usize>,
    }

    impl InlineHost {
        fn new(editor: &Arc<Mutex<MemoryEditor>>) -> Self {
            Self {
                editor: Arc::clone(editor),
                ran: AtomicUsize::new(0),
                dispose_before: None,
            }
        }
    }

    impl EditorHost for InlineHost {
        fn run_on_ui(&self, task: UiTask) {
            let index = self.ran.fetch_add(1, Ordering::SeqCst);
            let mut editor = self.editor.lock();
            if self.dispose_before == Some(index) {
                editor.dispose();
            }
            let surface: &mut dyn EditorSurface = &mut *editor;
            task(surface);
        }
    }

    /// Drops every task, like a host whose UI context has shut down.
    struct ClosedHost;

    impl EditorHost for ClosedHost {
        fn run_on_ui(&self, _task: UiTask) {}
    }

    /// Cancels the active session right before running the task with the given index, as if a
    /// new copy landed while that tick sat in the UI queue.
    struct CancellingHost {
        inner: InlineHost,
        cancel_before: usize,
        scheduler: OnceCell<Weak<BlinkScheduler<CancellingHost>>>,
        cancelled_one: AtomicBool,
    }

    impl CancellingHost {
        fn new(editor: &Arc<Mutex<MemoryEditor>>, cancel_before: usize) -> Self {
            Self {
                inner: InlineHost::new(editor),
                cancel_before,
                scheduler: OnceCell::new(),
                cancelled_one: AtomicBool::new(false),
            }
        }

        fn scheduler(
            editor: &Arc<Mutex<MemoryEditor>>,
            cancel_before: usize,
        ) -> Arc<BlinkScheduler<Self>> {
            let scheduler = Arc::new(BlinkScheduler::new(Self::new(editor, cancel_before)));
            let _ = scheduler.host().scheduler.set(Arc::downgrade(&scheduler));
            scheduler
        }
    }

    impl EditorHost for CancellingHost {
        fn run_on_ui(&self, task: UiTask) {
            if self.inner.ran.load(Ordering::SeqCst) == self.cancel_before
                && let Some(scheduler) = self.scheduler.get().and_then(Weak::upgrade)
            {
                let cancelled = scheduler.cancel_active();
                self.cancelled_one.store(cancelled, Ordering::SeqCst);
            }
            self.inner.run_on_ui(task);
        }
    }

    fn editor() -> Arc<Mutex<MemoryEditor>> {
        let mut editor = MemoryEditor::new("first line\nsecond line\n");
        editor
            .set_carets(vec![
                Caret::selecting(TextRange::new(0, 5)),
                Caret::at(14),
            ])
            .unwrap();
        Arc::new(Mutex::new(editor))
    }

    fn targets() -> Vec<HighlightTarget> {
        vec![
            HighlightTarget::selection(TextRange::new(0, 5)),
            HighlightTarget::whole_line(TextRange::new(11, 22)),
        ]
    }

    fn count(journal: &[SurfaceEvent], pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        journal.iter().filter(|event| pred(event)).count()
    }

    #[test]
    fn three_blinks_run_six_ticks_then_restore_once() {
        let editor = editor();
        let scheduler = BlinkScheduler::new(InlineHost::new(&editor));
        let config = BlinkConfig::new(3, 1).unwrap();

        let handle = scheduler
            .start(targets(), config, HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Restored);
        assert_eq!(scheduler.host().ran.load(Ordering::SeqCst), 6);

        let editor = editor.lock();
        let journal = editor.journal();
        assert_eq!(count(journal, |e| *e == SurfaceEvent::SelectionRemoved), 3);
        assert_eq!(
            count(journal, |e| matches!(e, SurfaceEvent::DecorationAdded { .. })),
            6
        );
        assert_eq!(
            count(journal, |e| matches!(e, SurfaceEvent::DecorationRemoved(_))),
            6
        );
        assert_eq!(
            count(journal, |e| *e == SurfaceEvent::SecondaryCaretsRemoved),
            1
        );
        assert_eq!(editor.live_decorations(), 0);

        // Restore comes after the last clear.
        let restore_at = journal
            .iter()
            .position(|e| *e == SurfaceEvent::SecondaryCaretsRemoved)
            .unwrap();
        let last_clear = journal
            .iter()
            .rposition(|e| matches!(e, SurfaceEvent::DecorationRemoved(_)))
            .unwrap();
        assert!(restore_at > last_clear);
    }

    #[test]
    fn first_tick_hides_selection_before_decorating() {
        let editor = editor();
        let scheduler = BlinkScheduler::new(InlineHost::new(&editor));
        let handle = scheduler
            .start(targets(), BlinkConfig::new(1, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        handle.join();

        let editor = editor.lock();
        let journal = editor.journal();
        assert_eq!(journal[0], SurfaceEvent::SelectionRemoved);
        assert!(matches!(journal[1], SurfaceEvent::DecorationAdded { .. }));
        assert!(matches!(journal[2], SurfaceEvent::DecorationAdded { .. }));
    }

    #[test]
    fn disposal_mid_session_skips_restore_and_clears() {
        let editor = editor();
        let mut host = InlineHost::new(&editor);
        host.dispose_before = Some(3);
        let scheduler = BlinkScheduler::new(host);

        let handle = scheduler
            .start(targets(), BlinkConfig::new(3, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Disposed);
        assert_eq!(scheduler.host().ran.load(Ordering::SeqCst), 4);

        let editor = editor.lock();
        assert_eq!(editor.live_decorations(), 0);
        assert!(
            !editor
                .journal()
                .iter()
                .any(|e| *e == SurfaceEvent::SecondaryCaretsRemoved)
        );
    }

    #[test]
    fn dropped_tasks_count_as_disposal() {
        let scheduler = BlinkScheduler::new(ClosedHost);
        let handle = scheduler
            .start(targets(), BlinkConfig::default(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Disposed);
    }

    #[test]
    fn new_session_cancels_the_previous_one() {
        let editor = editor();
        let scheduler = BlinkScheduler::new(InlineHost::new(&editor));

        let slow = scheduler
            .start(
                targets(),
                BlinkConfig::new(10, 1_000).unwrap(),
                HighlightStyle::default(),
            )
            .unwrap()
            .unwrap();
        let fast = scheduler
            .start(targets(), BlinkConfig::new(1, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_ne!(slow.id(), fast.id());
        assert_eq!(scheduler.active_session(), Some(fast.id()));

        assert_eq!(slow.join(), SessionOutcome::Cancelled);
        assert_eq!(fast.join(), SessionOutcome::Restored);

        let editor = editor.lock();
        assert_eq!(editor.live_decorations(), 0);
        assert_eq!(
            count(editor.journal(), |e| *e == SurfaceEvent::SecondaryCaretsRemoved),
            1
        );
    }

    #[test]
    fn explicit_cancel_stops_without_restore() {
        let editor = editor();
        let scheduler = BlinkScheduler::new(InlineHost::new(&editor));
        let handle = scheduler
            .start(
                targets(),
                BlinkConfig::new(5, 1_000).unwrap(),
                HighlightStyle::default(),
            )
            .unwrap()
            .unwrap();

        assert!(scheduler.cancel_active());
        assert_eq!(handle.join(), SessionOutcome::Cancelled);
        assert_eq!(editor.lock().live_decorations(), 0);
        assert!(!scheduler.cancel_active());
    }

    #[test]
    fn cancel_during_queued_final_tick_skips_restore() {
        let editor = editor();
        let scheduler = CancellingHost::scheduler(&editor, 1);

        let handle = scheduler
            .start(targets(), BlinkConfig::new(1, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Cancelled);
        assert!(scheduler.host().cancelled_one.load(Ordering::SeqCst));
        assert_eq!(scheduler.host().inner.ran.load(Ordering::SeqCst), 2);

        let editor = editor.lock();
        assert_eq!(editor.live_decorations(), 0);
        assert_eq!(
            count(editor.journal(), |e| *e == SurfaceEvent::SecondaryCaretsRemoved),
            0
        );
        assert_eq!(editor.secondary().len(), 1);
    }

    #[test]
    fn cancel_during_queued_on_tick_draws_nothing() {
        let editor = editor();
        let scheduler = CancellingHost::scheduler(&editor, 0);

        let handle = scheduler
            .start(targets(), BlinkConfig::new(2, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Cancelled);
        assert_eq!(scheduler.host().inner.ran.load(Ordering::SeqCst), 1);

        let editor = editor.lock();
        assert!(editor.journal().is_empty());
        assert_eq!(editor.primary(), Caret::selecting(TextRange::new(0, 5)));
    }

    #[test]
    fn empty_targets_start_nothing() {
        let scheduler = BlinkScheduler::new(ClosedHost);
        let handle = scheduler
            .start(Vec::new(), BlinkConfig::default(), HighlightStyle::default())
            .unwrap();
        assert!(handle.is_none());
        assert_eq!(scheduler.active_session(), None);
    }

    #[test]
    fn stale_targets_are_skipped() {
        let editor = editor();
        let scheduler = BlinkScheduler::new(InlineHost::new(&editor));
        let mut with_stale = targets();
        with_stale.push(HighlightTarget::selection(TextRange::new(90, 99)));

        let handle = scheduler
            .start(with_stale, BlinkConfig::new(1, 1).unwrap(), HighlightStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.join(), SessionOutcome::Restored);

        let editor = editor.lock();
        assert_eq!(
            count(editor.journal(), |e| matches!(e, SurfaceEvent::DecorationAdded { .. })),
            2
        );
    }
}
