mod build;
pub(crate) use build::BuildCommand;

mod inspect;
pub(crate) use inspect::InspectCommand;

mod manifest;
pub(crate) use manifest::ManifestCommand;

use crate::{load_effective_schema, Config};
use anyhow::Result;
use dms_relational_core::schema::{DerivedRelationalModelSet, DerivedRelationalModelSetBuilder};
use std::path::PathBuf;

/// Loads `inputs` and runs the default passes for the configured dialect.
fn build_model(config: &Config, inputs: &[PathBuf]) -> Result<DerivedRelationalModelSet> {
    let effective = load_effective_schema(inputs)?;
    let rules = config.dialect.default_rules();

    let set = DerivedRelationalModelSetBuilder::default_passes().build(
        &effective,
        config.dialect,
        rules.as_ref(),
    )?;
    Ok(set)
}
