//! Persistence adapters implementing the squawk repository port.
//!
//! Storage is process-local. Each operation runs inside a client span tagged
//! with the logical table and operation so slow or failing calls show up in
//! traces next to the request that issued them.

mod in_memory_squawk_repository;

pub use in_memory_squawk_repository::InMemorySquawkRepository;
