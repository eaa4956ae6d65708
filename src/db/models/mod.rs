pub mod duration;

pub use duration::{DurationDelta, DurationRecord};
