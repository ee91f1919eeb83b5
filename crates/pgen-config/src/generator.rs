use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

/// JSON-pointer prefixes [`GeneratorConfig::from_loaded`] reads.
pub static CONSUMED_POINTERS: &[&str] = &[
    "/conflict/window_capacity",
    "/conflict/idle_timeout_secs",
    "/storage/dir",
    "/storage/page_size",
    "/resource/blank_unit",
    "/encoder/replacements",
    "/encoder/replacements_file",
    "/encoder/fluid_drop_item",
    "/catalog/path",
];

/// Item debited once per generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankUnit {
    pub id: String,
    #[serde(default)]
    pub variant: u32,
}

impl Default for BlankUnit {
    fn default() -> Self {
        Self {
            id: "appliedenergistics2:item.ItemMultiMaterial".to_string(),
            variant: 52,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ConflictSection {
    window_capacity: usize,
    idle_timeout_secs: Option<u64>,
}

impl Default for ConflictSection {
    fn default() -> Self {
        Self {
            window_capacity: 6,
            idle_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct StorageSection {
    dir: PathBuf,
    page_size: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("patterngen"),
            page_size: 9,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ResourceSection {
    blank_unit: BlankUnit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct EncoderSection {
    replacements: Vec<String>,
    replacements_file: Option<PathBuf>,
    fluid_drop_item: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CatalogSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    conflict: ConflictSection,
    storage: StorageSection,
    resource: ResourceSection,
    encoder: EncoderSection,
    catalog: CatalogSection,
}

/// Typed, validated generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Conflict groups per window.
    pub window_capacity: usize,
    /// `None` = sessions never expire on their own.
    pub idle_timeout: Option<Duration>,
    pub storage_dir: PathBuf,
    pub page_size: usize,
    pub blank_unit: BlankUnit,
    /// `src=dst` tag replacement rules.
    pub replacements: Vec<String>,
    /// Extra rules, one per line. Inline `replacements` win over the file.
    pub replacements_file: Option<PathBuf>,
    /// Item used to carry fluids in artifacts; `None` drops fluids.
    pub fluid_drop_item: Option<String>,
    pub catalog_path: Option<PathBuf>,
    /// Hash of the effective config this view was built from.
    pub config_hash: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default(), String::new())
    }
}

impl GeneratorConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config has the wrong shape")?;

        if raw.conflict.window_capacity == 0 {
            bail!("CONFIG_INVALID /conflict/window_capacity must be >= 1");
        }
        if raw.storage.page_size == 0 {
            bail!("CONFIG_INVALID /storage/page_size must be >= 1");
        }
        if raw.conflict.idle_timeout_secs == Some(0) {
            bail!("CONFIG_INVALID /conflict/idle_timeout_secs must be >= 1 or null");
        }
        if raw.resource.blank_unit.id.trim().is_empty() {
            bail!("CONFIG_INVALID /resource/blank_unit/id must not be empty");
        }
        Ok(Self::from_raw(raw, loaded.config_hash.clone()))
    }

    fn from_raw(raw: RawConfig, config_hash: String) -> Self {
        Self {
            window_capacity: raw.conflict.window_capacity,
            idle_timeout: raw.conflict.idle_timeout_secs.map(Duration::from_secs),
            storage_dir: raw.storage.dir,
            page_size: raw.storage.page_size,
            blank_unit: raw.resource.blank_unit,
            replacements: raw.encoder.replacements,
            replacements_file: raw.encoder.replacements_file,
            fluid_drop_item: raw
                .encoder
                .fluid_drop_item
                .filter(|s| !s.trim().is_empty()),
            catalog_path: raw.catalog.path,
            config_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn defaults_from_empty_config() {
        let l = load_layered_yaml_from_strings(&["{}"]).unwrap();
        let c = GeneratorConfig::from_loaded(&l).unwrap();
        assert_eq!(c.window_capacity, 6);
        assert_eq!(c.idle_timeout, None);
        assert_eq!(c.storage_dir, PathBuf::from("patterngen"));
        assert_eq!(c.page_size, 9);
        assert_eq!(c.blank_unit, BlankUnit::default());
        assert!(c.replacements.is_empty());
        assert_eq!(c.replacements_file, None);
        assert_eq!(c.config_hash, l.config_hash);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let l = load_layered_yaml_from_strings(&["conflict:\n  window_capacity: 0\n"]).unwrap();
        let err = GeneratorConfig::from_loaded(&l).unwrap_err();
        assert!(err.to_string().contains("window_capacity"));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let l = load_layered_yaml_from_strings(&["storage:\n  page_size: lots\n"]).unwrap();
        assert!(GeneratorConfig::from_loaded(&l).is_err());
    }

    #[test]
    fn replacements_file_is_read_from_the_encoder_section() {
        let l = load_layered_yaml_from_strings(&[
            "encoder:\n  replacements: [\"a=b\"]\n  replacements_file: rules.txt\n",
        ])
        .unwrap();
        let c = GeneratorConfig::from_loaded(&l).unwrap();
        assert_eq!(c.replacements, vec!["a=b".to_string()]);
        assert_eq!(c.replacements_file, Some(PathBuf::from("rules.txt")));
    }
}
