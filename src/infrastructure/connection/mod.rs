//! Connection infrastructure - process-wide store connection lifecycle

mod cell;
mod manager;

pub use cell::{ConnectionCell, ConnectionState};
pub use manager::ConnectionManager;
