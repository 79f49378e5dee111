//! OnBehalf Target State Store
//!
//! Proposals, policies, customers, claims and claim processes the engine
//! reads and mutates. Each record is a JSON object with a version number;
//! writes go through [`TargetRepository::put_if_version`] so two writers
//! can never silently overwrite each other.

pub mod error;
pub mod memory;
pub mod record;
pub mod repository;
pub mod seed;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRepository;
pub use record::VersionedRecord;
pub use repository::TargetRepository;
pub use seed::{seed, SeedReport};
pub use sqlite::SqliteRepository;
