//! Application layer orchestrating copy detection, blinking, and caret restore.

pub mod blink;
pub mod copy;
pub mod restore;
pub mod selection;
