//! Cycle orchestration: Sense -> Reason -> Act -> Learn

mod driver;

pub use driver::{CycleDriver, CycleReport};
