use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CodemorphConfig {
    pub inline: InlineConfig,
    pub extract: ExtractConfig,
    pub dead_store: DeadStoreConfig,
}

/// Which names inside an inlined body get the disambiguating suffix
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenameMode {
    /// Every name reference and parameter in the copied body
    #[default]
    All,
    /// Parameters and names the function binds; free names are left alone
    Locals,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InlineConfig {
    pub suffix: String,
    pub rename: RenameMode,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            suffix: "_new".to_string(),
            rename: RenameMode::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    pub function_name: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            function_name: "extracted_function".to_string(),
        }
    }
}

/// Where a read must appear to keep an assignment alive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// A read of the same name anywhere in the tree
    #[default]
    Global,
    /// A read in the assignment's scope or a scope nested inside it
    Scoped,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DeadStoreConfig {
    pub liveness: Liveness,
    /// Repeat until a pass removes nothing
    pub fixed_point: bool,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codemorph.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CodemorphConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CodemorphConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CodemorphConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
