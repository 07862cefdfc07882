//! Background Tasks Module
//!
//! Hosts the serial executor that every cache operation runs on.

mod executor;

pub use executor::{Job, SerialExecutor, TaskExecutor};
