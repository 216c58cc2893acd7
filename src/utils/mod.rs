// Utility functions
pub mod duration;
pub mod error;

pub use duration::*;
pub use error::*;
