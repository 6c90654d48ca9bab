//! Canonical JSON manifests of derived relational models.
//!
//! Manifests are the diffable form of a build: two emissions of equal models
//! are byte-identical. Field order follows the declaration order of the view
//! types in [`view`], arrays keep the model's canonical order, and maps are
//! sorted.

mod resource;
pub use resource::{emit_resource_manifest, resolve_descriptor_fk_constraint_name};

mod set;
pub use set::{emit_set_manifest, emit_set_manifest_with_details};

mod view;

pub use dms_relational_core::{Error, Result};

use serde::Serialize;

/// Two-space indented JSON ending in a newline.
fn to_json(value: &impl Serialize) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}
