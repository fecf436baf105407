//! Host-independent value types shared by the extractor, scheduler, and restore logic.

pub mod errors;
pub mod model;
