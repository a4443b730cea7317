//! The map reduce worker: pulls tasks from the coordinator and runs the
//! map and reduce executors against a shared working directory.

pub mod client;
pub mod core;
pub mod map;
pub mod reduce;

pub use crate::client::GrpcCoordinator;
pub use crate::core::{Exit, MRWorker};
