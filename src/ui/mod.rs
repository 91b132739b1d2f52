//! Terminal output

pub mod progress;

pub use progress::ProgressReporter;
