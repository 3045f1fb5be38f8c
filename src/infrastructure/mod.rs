//! Infrastructure layer - store backends, connection lifecycle and services

pub mod connection;
pub mod logging;
pub mod services;
pub mod store;
