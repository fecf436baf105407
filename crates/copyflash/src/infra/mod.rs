//! Infrastructure adapters for the host, clipboard, config, and colors.

pub mod clipboard;
pub mod config;
pub mod highlight;
pub mod host;
pub mod memory;
pub mod ui_thread;
