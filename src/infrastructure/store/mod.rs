//! Store infrastructure - document store backends and the connection handshake

mod connector;
mod in_memory;
mod postgres;

pub use connector::{DefaultStoreConnector, StoreConnector, StoreCredentials};
pub use in_memory::InMemoryDocumentStore;
pub use postgres::{PostgresConfig, PostgresDocumentStore, classify_sqlx_error};

#[cfg(test)]
pub use connector::MockStoreConnector;
