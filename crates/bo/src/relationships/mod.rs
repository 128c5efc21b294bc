//! Relationship Engine - runtime single and multiple relationships built on
//! validated relationship metadata
//!
//! A relationship copies its key values from the owner, loads related objects
//! through a [`BusinessObjectLoader`](crate::loader::BusinessObjectLoader),
//! prefers resident instances from the [`ObjectManager`](crate::object::ObjectManager)
//! and notifies registered observers of every change it makes.

pub mod col;
pub mod context;
pub mod events;
pub mod multiple;
pub mod rel_key;
pub mod single;

pub use col::*;
pub use context::*;
pub use events::*;
pub use multiple::*;
pub use rel_key::*;
pub use single::*;

