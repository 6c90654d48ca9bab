use super::build_model;
use crate::{theme, Config};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(crate) struct BuildCommand {
    /// Effective schema set, or one ApiSchema file per project
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

impl BuildCommand {
    pub(crate) fn run(self, config: &Config) -> Result<()> {
        println!();
        println!("  {}", theme::heading("Build Relational Model"));
        println!();

        let set = build_model(config, &self.inputs)?;

        let tables: usize = set
            .concrete_resources_in_name_order
            .iter()
            .map(|model| model.relational_model.tables.len())
            .sum();

        for (label, count) in [
            ("projects", set.project_schemas_in_endpoint_order.len()),
            ("resources", set.concrete_resources_in_name_order.len()),
            ("tables", tables),
            (
                "abstract identity tables",
                set.abstract_identity_tables_in_name_order.len(),
            ),
            ("indexes", set.indexes_in_create_order.len()),
            ("triggers", set.triggers_in_create_order.len()),
        ] {
            println!("  {} {}", theme::success_mark(), theme::dim(format!("{count} {label}")));
        }

        println!();
        Ok(())
    }
}
