//! Retry domain - policy and executor for remote operations

mod executor;
mod policy;

pub use executor::{OperationOptions, ResilientExecutor};
pub use policy::RetryPolicy;
