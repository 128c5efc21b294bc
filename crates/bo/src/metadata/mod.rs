//! Class Metadata - class, property, key and relationship definitions and
//! the validator that turns a loaded collection into usable metadata

pub mod class;
pub mod key;
pub mod property;
pub mod relationship;
pub mod validator;

pub use class::*;
pub use key::*;
pub use property::*;
pub use relationship::*;
pub use validator::*;
