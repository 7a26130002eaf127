//! ledgerdb - an in-memory, schemaless document database with WAL-backed
//! durable persistence, exposed over an HTTP/JSON interface.
//!
//! The storage engine (WAL writer, in-memory store, LRU cache, secondary
//! indexes, checkpoint writer, recovery manager) is the core; the HTTP
//! adapter and CLI are thin collaborators that call into [`engine::Engine`].

pub mod cache;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod http_server;
pub mod index;
pub mod model;
pub mod observability;
pub mod recovery;
pub mod store;
pub mod wal;
