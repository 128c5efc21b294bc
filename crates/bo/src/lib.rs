//! # elif-bo: business-object mapping engine for elif.rs
//!
//! Turns declarative class metadata into a consistent object graph:
//!
//! - [`metadata`] holds class, property, key and relationship definitions and
//!   validates a whole collection of them before anything else may use it.
//! - [`query`] describes the join graph a query spans and the criteria used
//!   for lookups and guarded writes.
//! - [`relationships`] loads, caches and mutates related objects and
//!   collections on top of validated metadata.
//! - [`concurrency`] detects (optimistic) or prevents (pessimistic) conflicting
//!   edits by independent clients of the same store.
//!
//! Statement generation and connection handling belong to the persistence
//! layer, which plugs in through [`BusinessObjectLoader`] and
//! [`ConcurrencyStore`].

pub mod concurrency;
pub mod config;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod object;
pub mod query;
pub mod relationships;
pub mod transaction;

#[cfg(test)]
mod testing;


pub use concurrency::*;
pub use config::*;
pub use error::*;
pub use loader::*;
pub use metadata::*;
pub use object::*;
pub use query::*;
pub use relationships::*;
pub use transaction::*;
