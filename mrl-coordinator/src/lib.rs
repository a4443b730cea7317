//! The map reduce coordinator: task leasing, lease expiry and phase
//! tracking, served over gRPC.

pub mod core;
pub mod jobs;
pub mod state;

pub use crate::core::{MRCoordinator, DEFAULT_LEASE_TIMEOUT};
pub use crate::jobs::Phase;
pub use crate::state::{CoordinatorError, CoordinatorState};
