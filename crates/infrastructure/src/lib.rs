//! Infrastructure adapters: Postgres persistence and in-memory
//! implementations of the application-layer collaborator traits.

pub mod memory;
pub mod repository;

pub use memory::{InMemoryMessageStore, InMemoryNotificationStore, InMemoryUserDirectory};
pub use repository::{
    create_pg_pool, PgMessageStore, PgNotificationStore, PgUserDirectory,
};
