use super::build_model;
use crate::{theme, Config};
use anyhow::{Context, Result};
use clap::Parser;
use dms_relational_manifest::{emit_resource_manifest, emit_set_manifest};
use heck::ToSnakeCase;
use std::{fs, path::PathBuf};

/// File name of the set-level manifest
const SET_MANIFEST_FILE: &str = "relational-model.manifest.json";

#[derive(Parser, Debug)]
pub(crate) struct ManifestCommand {
    /// Effective schema set, or one ApiSchema file per project
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ManifestCommand {
    pub(crate) fn run(self, config: &Config) -> Result<()> {
        println!();
        println!("  {}", theme::heading("Write Manifests"));
        println!();

        let set = build_model(config, &self.inputs)?;
        let output_dir = self
            .output
            .unwrap_or_else(|| config.manifest.output_dir.clone());

        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;

        if config.manifest.set_manifest {
            let path = output_dir.join(SET_MANIFEST_FILE);
            fs::write(&path, emit_set_manifest(&set)?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "  {} {}",
                theme::success_mark(),
                theme::dim(format!("Wrote {}", path.display()))
            );
        }

        if config.manifest.per_resource {
            let mut written = 0;

            for model in &set.concrete_resources_in_name_order {
                let resource = model.resource();
                let dir = output_dir.join(resource.project_name.to_snake_case());
                fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

                let path = dir.join(format!(
                    "{}.manifest.json",
                    resource.resource_name.to_snake_case()
                ));
                let manifest =
                    emit_resource_manifest(&model.relational_model, &model.extension_sites)?;
                fs::write(&path, manifest).with_context(|| format!("writing {}", path.display()))?;

                log::debug!("wrote manifest for {resource} to {}", path.display());
                written += 1;
            }

            println!(
                "  {} {}",
                theme::success_mark(),
                theme::dim(format!("Wrote {written} resource manifests"))
            );
        }

        println!();
        Ok(())
    }
}
