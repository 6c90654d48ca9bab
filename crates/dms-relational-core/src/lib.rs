//! Derives a dialect-specific relational model from an Ed-Fi effective
//! schema set.
//!
//! The entry point is [`schema::DerivedRelationalModelSetBuilder`], which runs
//! an ordered list of set-level passes over a single
//! [`schema::RelationalModelSetBuilderContext`] and returns an immutable
//! [`schema::DerivedRelationalModelSet`].

mod error;
pub use error::{
    Error, ExtensionKeyFailure, ExtensionSiteContext, IdentifierCollisionRecord, IntoError,
    UnusedNameOverrideEntry,
};

pub mod effective;
pub use effective::EffectiveSchemaSet;

pub mod schema;

/// A Result type alias that uses the crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
