use anyhow::{bail, Context, Result};
use dms_relational_core::schema::SqlDialect;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the working
/// directory.
pub const CONFIG_FILE: &str = "dms-relational.toml";

/// Configuration for relational model builds
#[derive(Debug, Clone)]
pub struct Config {
    /// Dialect to derive the model for
    pub dialect: SqlDialect,

    /// Manifest output configuration
    pub manifest: ManifestConfig,
}

/// Where and what the `manifest` command writes
#[derive(Debug, Clone)]
pub struct ManifestConfig {
    /// Directory receiving manifest files
    pub output_dir: PathBuf,

    /// Write one manifest per resource
    pub per_resource: bool,

    /// Write the set-level manifest
    pub set_manifest: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Pgsql,
            manifest: ManifestConfig::default(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("manifests"),
            per_resource: true,
            set_manifest: true,
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target dialect
    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the manifest configuration
    pub fn manifest(mut self, manifest: ManifestConfig) -> Self {
        self.manifest = manifest;
        self
    }

    /// Loads `path`, filling unset values with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Loads [`CONFIG_FILE`] when present, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s)?;
        let mut config = Config::default();

        if let Some(dialect) = file.dialect {
            config.dialect = match dialect.parse() {
                Ok(dialect) => dialect,
                Err(e) => bail!("{e}"),
            };
        }

        if let Some(manifest) = file.manifest {
            if let Some(output_dir) = manifest.output_dir {
                config.manifest = config.manifest.output_dir(output_dir);
            }
            if let Some(per_resource) = manifest.per_resource {
                config.manifest = config.manifest.per_resource(per_resource);
            }
            if let Some(set_manifest) = manifest.set_manifest {
                config.manifest = config.manifest.set_manifest(set_manifest);
            }
        }

        Ok(config)
    }
}

impl ManifestConfig {
    /// Create a new ManifestConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Enable or disable per-resource manifests
    pub fn per_resource(mut self, enabled: bool) -> Self {
        self.per_resource = enabled;
        self
    }

    /// Enable or disable the set-level manifest
    pub fn set_manifest(mut self, enabled: bool) -> Self {
        self.set_manifest = enabled;
        self
    }
}

/// On-disk shape of [`CONFIG_FILE`]
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    dialect: Option<String>,
    manifest: Option<ManifestFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    output_dir: Option<PathBuf>,
    per_resource: Option<bool>,
    set_manifest: Option<bool>,
}
