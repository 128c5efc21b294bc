//! Error types for the business-object engine
//!
//! Configuration errors describe metadata that cannot be used and always name
//! the offending class, relationship, key or property. Concurrency errors
//! describe a conflict with another client of the same store.

use chrono::{DateTime, Utc};

/// Result type alias for engine operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Top-level error for every fallible engine operation
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Metadata or developer error, never retried
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Conflict with another client of the store
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Failure reported by a store or loader collaborator
    #[error("Database error: {0}")]
    Database(String),

    /// Primary key is missing, partial or malformed
    #[error("Invalid key error: {0}")]
    InvalidKey(String),

    /// Property write rejected by the property's read/write rule
    #[error("Property '{property}' of class '{class}' cannot be edited: {reason}")]
    NotEditable {
        class: String,
        property: String,
        reason: String,
    },
}

impl ModelError {
    /// Returns the configuration error, if this is one
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            ModelError::Configuration(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the concurrency error, if this is one
    pub fn as_concurrency(&self) -> Option<&ConcurrencyError> {
        match self {
            ModelError::Concurrency(err) => Some(err),
            _ => None,
        }
    }
}

// Collaborator implementations are free to build their errors with anyhow
impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Database(format!("Serialization error: {}", err))
    }
}

/// Which side of a relationship key a property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySide {
    Owner,
    Related,
}

impl std::fmt::Display for KeySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySide::Owner => write!(f, "owner"),
            KeySide::Related => write!(f, "related"),
        }
    }
}

/// Structured metadata/developer errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Class '{class}' is registered more than once")]
    DuplicateClass { class: String },

    #[error("Class '{class}' declares superclass '{superclass}', which is not a registered class")]
    SuperClassNotFound { class: String, superclass: String },

    #[error("Class '{class}' is part of a circular inheritance chain")]
    CircularInheritance { class: String },

    #[error("The primary key of class '{class}' refers to property '{property}', which is not defined on the class or any of its superclasses")]
    PrimaryKeyPropertyNotFound { class: String, property: String },

    #[error("The primary key of class '{class}' is an object identifier and must have exactly one property, but has {count}")]
    ObjectIdKeyNotSingle { class: String, count: usize },

    #[error("The primary key of class '{class}' is an object identifier, but its property '{property}' is of type '{property_type}' instead of Guid")]
    ObjectIdKeyWrongType {
        class: String,
        property: String,
        property_type: String,
    },

    #[error("The '{key}' key of the '{class}' class refers to the property '{property}', which does not exist for the class or for any of its superclasses")]
    KeyPropertyNotFound {
        key: String,
        class: String,
        property: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' refers to the related class '{related_class}', which could not be found: {cause}")]
    RelatedClassNotFound {
        relationship: String,
        class: String,
        related_class: String,
        cause: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' refers to the {side} property '{property}', which does not exist on class '{property_class}' or any of its superclasses")]
    RelationshipPropertyNotFound {
        relationship: String,
        class: String,
        side: KeySide,
        property: String,
        property_class: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' declares the reverse relationship '{reverse}', which is not defined on the related class '{related_class}'")]
    ReverseRelationshipNotFound {
        relationship: String,
        class: String,
        reverse: String,
        related_class: String,
    },

    #[error("The relationship key of '{relationship}' on class '{class}' does not mirror the key of its reverse relationship '{reverse}' on class '{related_class}'")]
    ReverseKeyMismatch {
        relationship: String,
        class: String,
        reverse: String,
        related_class: String,
    },

    #[error("The relationship '{relationship}' on class '{class}' and its reverse relationship '{reverse}' on class '{related_class}' both claim to hold the foreign key")]
    BothSidesOwnForeignKey {
        relationship: String,
        class: String,
        reverse: String,
        related_class: String,
    },

    #[error("The relationship '{relationship}' on class '{class}' does not hold the foreign key and its reverse relationship '{reverse}' on class '{related_class}' does not hold it either")]
    NoSideOwnsForeignKey {
        relationship: String,
        class: String,
        reverse: String,
        related_class: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' cannot load a collection of '{requested}', which is neither '{declared}' nor a subclass of it")]
    InvalidCollectionType {
        relationship: String,
        class: String,
        requested: String,
        declared: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' is not a {expected} relationship")]
    WrongCardinality {
        relationship: String,
        class: String,
        expected: String,
    },

    #[error("The relationship '{relationship}' of class '{class}' relates to '{expected}', so it cannot be set to an object of class '{actual}'")]
    WrongRelatedType {
        relationship: String,
        class: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown type '{type_name}': {cause}")]
    UnknownType { type_name: String, cause: String },

    #[error("Class '{class}' has no relationship named '{relationship}'")]
    RelationshipNotFound { class: String, relationship: String },

    #[error("Class '{class}' has no property named '{property}'")]
    PropertyNotFound { class: String, property: String },

    #[error("Cannot merge the joins of source '{other}' into source '{source_name}'")]
    SourceMismatch { source_name: String, other: String },
}

impl ConfigurationError {
    /// The class that owns the offending definition
    pub fn class_name(&self) -> Option<&str> {
        use ConfigurationError::*;
        match self {
            DuplicateClass { class }
            | SuperClassNotFound { class, .. }
            | CircularInheritance { class }
            | PrimaryKeyPropertyNotFound { class, .. }
            | ObjectIdKeyNotSingle { class, .. }
            | ObjectIdKeyWrongType { class, .. }
            | KeyPropertyNotFound { class, .. }
            | RelatedClassNotFound { class, .. }
            | RelationshipPropertyNotFound { class, .. }
            | ReverseRelationshipNotFound { class, .. }
            | ReverseKeyMismatch { class, .. }
            | BothSidesOwnForeignKey { class, .. }
            | NoSideOwnsForeignKey { class, .. }
            | InvalidCollectionType { class, .. }
            | WrongCardinality { class, .. }
            | WrongRelatedType { class, .. }
            | RelationshipNotFound { class, .. }
            | PropertyNotFound { class, .. } => Some(class),
            UnknownType { .. } | SourceMismatch { .. } => None,
        }
    }

    /// The offending relationship, when the error concerns one
    pub fn relationship_name(&self) -> Option<&str> {
        use ConfigurationError::*;
        match self {
            RelatedClassNotFound { relationship, .. }
            | RelationshipPropertyNotFound { relationship, .. }
            | ReverseRelationshipNotFound { relationship, .. }
            | ReverseKeyMismatch { relationship, .. }
            | BothSidesOwnForeignKey { relationship, .. }
            | NoSideOwnsForeignKey { relationship, .. }
            | InvalidCollectionType { relationship, .. }
            | WrongCardinality { relationship, .. }
            | WrongRelatedType { relationship, .. }
            | RelationshipNotFound { relationship, .. } => Some(relationship),
            _ => None,
        }
    }

    /// The reverse relationship named by a mirrored-pair error
    pub fn reverse_relationship_name(&self) -> Option<&str> {
        use ConfigurationError::*;
        match self {
            ReverseRelationshipNotFound { reverse, .. }
            | ReverseKeyMismatch { reverse, .. }
            | BothSidesOwnForeignKey { reverse, .. } => Some(reverse),
            _ => None,
        }
    }

    /// The offending property, when the error concerns one
    pub fn property_name(&self) -> Option<&str> {
        use ConfigurationError::*;
        match self {
            PrimaryKeyPropertyNotFound { property, .. }
            | ObjectIdKeyWrongType { property, .. }
            | KeyPropertyNotFound { property, .. }
            | RelationshipPropertyNotFound { property, .. }
            | PropertyNotFound { property, .. } => Some(property),
            _ => None,
        }
    }
}

/// Conflicts detected by the concurrency control strategies
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConcurrencyError {
    #[error("The {class} object '{object}' has been deleted by another user")]
    DeletedConcurrently { class: String, object: String },

    #[error("The {class} object '{object}' has been edited by another user{}", describe_editor(.updated_by, .updated_on, .updated_at))]
    EditedConcurrently {
        class: String,
        object: String,
        expected_version: i64,
        stored_version: Option<i64>,
        updated_by: Option<String>,
        updated_on: Option<String>,
        updated_at: Option<DateTime<Utc>>,
    },

    #[error("The {class} object '{object}' cannot be edited because it changed since it was loaded (version {in_memory_version} in memory, {stored_version} stored)")]
    BeginEditConflict {
        class: String,
        object: String,
        in_memory_version: i64,
        stored_version: i64,
    },

    #[error("The {class} object '{object}' is locked by user '{locked_by}' on machine '{locked_on}' since {locked_at}")]
    LockedByAnotherUser {
        class: String,
        object: String,
        locked_by: String,
        locked_on: String,
        locked_at: DateTime<Utc>,
    },

    #[error("The lock on {class} object '{object}' taken at {locked_at} exceeded the allowed duration of {duration_minutes} minutes")]
    LockDurationExceeded {
        class: String,
        object: String,
        locked_at: DateTime<Utc>,
        duration_minutes: i64,
    },
}

fn describe_editor(
    updated_by: &Option<String>,
    updated_on: &Option<String>,
    updated_at: &Option<DateTime<Utc>>,
) -> String {
    let mut parts = Vec::new();
    if let Some(user) = updated_by {
        parts.push(format!("user '{}'", user));
    }
    if let Some(machine) = updated_on {
        parts.push(format!("machine '{}'", machine));
    }
    if let Some(at) = updated_at {
        parts.push(format!("at {}", at));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}
