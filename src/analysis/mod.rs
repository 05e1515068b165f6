//! Analysis module - windowed feature extraction and gait metrics

mod features;
mod gait;
mod statistics;
mod window;

pub use features::*;
pub use gait::*;
pub use statistics::{coefficient_of_variation, mean, population_std, EPSILON};
pub use window::SlidingWindow;
