//! In-process metrics: a recorder for the `metrics` facade that keeps the
//! counters the dispatcher emits and logs them on an interval.

pub mod logging_recorder;

pub use logging_recorder::LoggingRecorder;
