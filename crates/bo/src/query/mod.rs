//! Query Sources - the join graph a query spans, plus the criteria used for
//! lookups and guarded writes
//!
//! Statement generation belongs to the persistence layer; this module only
//! describes structure.

pub mod criteria;
pub mod source;
pub mod source_builder;
pub mod types;

pub use criteria::*;
pub use source::*;
pub use source_builder::*;
pub use types::*;
