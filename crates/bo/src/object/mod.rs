//! Business objects, their keys, collections and the resident-object registry

pub mod business_object;
pub mod collection;
pub mod manager;
pub mod primary_key;

pub use business_object::*;
pub use collection::*;
pub use manager::*;
pub use primary_key::*;
