use super::build_model;
use crate::{theme, Config};
use anyhow::{bail, Result};
use clap::Parser;
use console::style;
use dms_relational_core::schema::{db::ColumnStorage, QualifiedResourceName};
use dms_relational_manifest::emit_resource_manifest;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub(crate) struct InspectCommand {
    /// Resource to inspect, as `Project:Resource`
    resource: String,

    /// Effective schema set, or one ApiSchema file per project
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Print the resource manifest instead of a table listing
    #[arg(long)]
    json: bool,
}

impl InspectCommand {
    pub(crate) fn run(self, config: &Config) -> Result<()> {
        let Some((project, resource)) = self.resource.split_once(':') else {
            bail!("expected `Project:Resource`, got `{}`", self.resource);
        };
        let name = QualifiedResourceName::new(project, resource);

        let set = build_model(config, &self.inputs)?;
        let Some(model) = set.resource(&name) else {
            bail!("resource `{name}` is not part of the build");
        };

        if self.json {
            print!(
                "{}",
                emit_resource_manifest(&model.relational_model, &model.extension_sites)?
            );
            return Ok(());
        }

        println!();
        println!("  {}", theme::heading(&format!("{name}")));
        println!();

        for table in &model.relational_model.tables {
            println!(
                "  {} {}",
                style(&table.table).cyan().bold(),
                theme::dim(table.scope.to_string())
            );

            for column in &table.columns {
                let ty = column
                    .ty
                    .map(|ty| ty.kind.as_str())
                    .unwrap_or("-");
                let alias = match &column.storage {
                    ColumnStorage::Stored => String::new(),
                    ColumnStorage::UnifiedAlias {
                        canonical_column, ..
                    } => format!(" -> {canonical_column}"),
                };
                let nullable = if column.nullable { "?" } else { "" };

                println!(
                    "    {}{nullable} {}{}",
                    column.name,
                    theme::dim(format!("{} {ty}", column.kind.as_str())),
                    alias
                );
            }

            for constraint in &table.constraints {
                println!("    {}", style(constraint.name()).magenta());
            }
            println!();
        }

        Ok(())
    }
}
