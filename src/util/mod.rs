//! util
//!
//! Small shared utilities.

mod debounce;

pub use debounce::{Clock, Debounce, ManualClock, SystemClock};
