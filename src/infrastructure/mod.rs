//! Infrastructure module for external services.
//!
//! This module contains the task and session stores and the factory that
//! selects them at startup.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod redis;
pub mod repository;

pub use factory::{
    ConfigurationError, FactoryError, Repositories, RepositoryConfig, RepositoryFactory,
    SessionMode, StorageMode,
};
pub use in_memory::{InMemorySessionStore, InMemoryTaskRepository};
pub use postgres::PostgresTaskRepository;
pub use self::redis::RedisSessionStore;
pub use repository::{RepositoryError, RepositoryFuture, SessionStore, TaskRepository};
