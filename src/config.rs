//! Calculator configuration, loaded from a TOML file
//!
//! ```toml
//! [engine]
//! sale_divisor = 5
//! minimum_value = 1
//! max_sweeps = 500
//!
//! [[seed]]
//! item = 2
//! value = 1
//! ```

use std::num::NonZeroU32;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;
use crate::overrides::{OverrideTables, RawOverride};
use crate::rational::Rational;

/// Sale price is one fifth of an item's "true" value.
pub const DEFAULT_SALE_DIVISOR: NonZeroU32 = NonZeroU32::new(5).unwrap();

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub sale_divisor: NonZeroU32,
    /// Floor for market-derived defaults and for non-positive solved values.
    pub minimum_value: u64,
    /// Sweep cap; defaults to recipe count + 1.
    pub max_sweeps: Option<usize>,
}

impl EngineSettings {
    pub fn minimum(&self) -> Rational {
        Rational::from_integer(self.minimum_value)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sale_divisor: DEFAULT_SALE_DIVISOR,
            minimum_value: 1,
            max_sweeps: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    engine: EngineSettings,
    #[serde(default)]
    seed: Vec<RawOverride>,
    #[serde(default)]
    equivalent: Vec<RawOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculatorConfig {
    pub engine: EngineSettings,
    pub overrides: OverrideTables,
}

impl CalculatorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, path)?;
        info!(
            "Loaded config from {} ({} seed, {} equivalent overrides)",
            path.display(),
            config.overrides.seed.len(),
            config.overrides.equivalent.len()
        );
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            engine: raw.engine,
            overrides: OverrideTables::from_raw(&raw.seed, &raw.equivalent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;
    use crate::overrides::OverrideValue;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CalculatorConfig::from_toml_str("").unwrap();
        assert_eq!(config.engine.sale_divisor.get(), 5);
        assert_eq!(config.engine.minimum_value, 1);
        assert_eq!(config.engine.minimum(), Rational::one());
        assert_eq!(config.engine.max_sweeps, None);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("emc.toml");

        let toml_content = r#"
[engine]
max_sweeps = 40

[[seed]]
item = 2
name = "Dirt Block"
value = 1

[[seed]]
item = 3318
value = 0

[[equivalent]]
item = 5000
same_as = 22
namespace = "SomeMod"
"#;
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = CalculatorConfig::load(&path).unwrap();
        assert_eq!(config.engine.max_sweeps, Some(40));
        assert_eq!(config.engine.sale_divisor.get(), 5);
        assert_eq!(config.overrides.seed.len(), 2);
        assert_eq!(config.overrides.seed[0].item, ItemId(2));
        assert_eq!(
            config.overrides.seed[1].value,
            OverrideValue::Fixed(Rational::zero())
        );
        assert_eq!(
            config.overrides.equivalent[0].namespace.as_deref(),
            Some("SomeMod")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = CalculatorConfig::load_or_default(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, CalculatorConfig::default());
    }

    #[test]
    fn test_bad_override_is_reported() {
        let err = CalculatorConfig::from_toml_str("[[seed]]\nitem = 7\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { item: ItemId(7), .. }));

        let err = CalculatorConfig::from_toml_str("[engine]\nsale_divisor = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_unknown_settings_are_rejected() {
        let config = CalculatorConfig::from_toml_str("[engine]\nminimum_value = 3\n").unwrap();
        assert_eq!(config.engine.minimum(), Rational::from(3));

        let err = CalculatorConfig::from_toml_str("[engine]\nminimum_valu = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));

        let err = CalculatorConfig::from_toml_str("[[seeds]]\nitem = 2\nvalue = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));

        let err = CalculatorConfig::from_toml_str("[engine]\nminimum_value = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }
}
