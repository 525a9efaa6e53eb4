//! Session configuration supplied by the host.
//!
//! Every field is required; there is no silent fallback. Hosts either load a
//! TOML document or pick the explicit [`GameConfig::classic`] preset.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::Tile;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("a {width}x{height} grid has too many cells")]
    GridTooLarge { width: usize, height: usize },
    #[error("max lives must be at least 1")]
    NoLives,
    #[error("goal must be a positive tile value")]
    InvalidGoal,
    #[error("accepted spawnables must be a non-empty list of positive values")]
    InvalidSpawnables,
    #[error("{starter} starter tiles do not fit a grid of {cells} cells")]
    TooManyStarterTiles { starter: usize, cells: usize },
    #[error("max undos must be at least 1")]
    NoUndos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    pub default_grid_width: usize,
    pub default_grid_height: usize,
    pub default_max_lives: u32,
    pub default_goal: Tile,
    /// Drawn uniformly by index; repeat a value to make it more frequent.
    pub default_accepted_spawnables: Vec<Tile>,
    pub default_starter_tiles: usize,
    /// Undo chain capacity, including the current state.
    pub default_max_undos: usize,
}

impl GameConfig {
    /// The usual 4x4 game to 2048: three lives, 2s nine times as likely as 4s.
    pub fn classic() -> Self {
        let mut spawnables = vec![2; 9];
        spawnables.push(4);
        Self {
            default_grid_width: 4,
            default_grid_height: 4,
            default_max_lives: 3,
            default_goal: 2048,
            default_accepted_spawnables: spawnables,
            default_starter_tiles: 2,
            default_max_undos: 10,
        }
    }

    /// Parse and validate a TOML document.
    ///
    /// ```
    /// use tiles_2048::config::GameConfig;
    /// let cfg = GameConfig::from_toml_str(r#"
    ///     default_grid_width = 5
    ///     default_grid_height = 4
    ///     default_max_lives = 2
    ///     default_goal = 1024
    ///     default_accepted_spawnables = [2, 2, 4]
    ///     default_starter_tiles = 2
    ///     default_max_undos = 6
    /// "#).unwrap();
    /// assert_eq!(cfg.default_grid_width, 5);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> { toml::to_string(self) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = (self.default_grid_width, self.default_grid_height);
        if width < 2 || height < 2 {
            return Err(ConfigError::GridTooSmall { width, height });
        }
        if self.default_max_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        if self.default_goal == 0 {
            return Err(ConfigError::InvalidGoal);
        }
        if self.default_accepted_spawnables.is_empty() || self.default_accepted_spawnables.contains(&0) {
            return Err(ConfigError::InvalidSpawnables);
        }
        let cells = width.checked_mul(height).ok_or(ConfigError::GridTooLarge { width, height })?;
        if self.default_starter_tiles > cells {
            return Err(ConfigError::TooManyStarterTiles { starter: self.default_starter_tiles, cells });
        }
        if self.default_max_undos == 0 {
            return Err(ConfigError::NoUndos);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn classic_is_valid() {
        assert!(GameConfig::classic().validate().is_ok());
    }

    #[test]
    fn toml_round_trip() {
        let cfg = GameConfig::classic();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(GameConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_field_is_an_error() {
        let text = r#"
            default_grid_width = 4
            default_grid_height = 4
            default_goal = 2048
            default_accepted_spawnables = [2]
            default_starter_tiles = 2
            default_max_undos = 3
        "#;
        assert!(matches!(GameConfig::from_toml_str(text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let mut text = GameConfig::classic().to_toml_string().unwrap();
        text.push_str("\ncolour = \"blue\"\n");
        assert!(matches!(GameConfig::from_toml_str(&text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn validation_failures() {
        let base = GameConfig::classic();

        let cfg = GameConfig { default_grid_height: 1, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::GridTooSmall { width: 4, height: 1 })));

        let huge = usize::MAX / 2;
        let cfg = GameConfig { default_grid_width: huge, default_grid_height: huge, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::GridTooLarge { .. })));

        let cfg = GameConfig { default_max_lives: 0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoLives)));

        let cfg = GameConfig { default_goal: 0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidGoal)));

        let cfg = GameConfig { default_accepted_spawnables: vec![], ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidSpawnables)));

        let cfg = GameConfig { default_accepted_spawnables: vec![2, 0], ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidSpawnables)));

        let cfg = GameConfig { default_starter_tiles: 17, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::TooManyStarterTiles { starter: 17, cells: 16 })));

        let cfg = GameConfig { default_max_undos: 0, ..base };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoUndos)));
    }

    #[test]
    fn load_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{}", GameConfig::classic().to_toml_string().unwrap()).unwrap();
        assert_eq!(GameConfig::load(tmp.path()).unwrap(), GameConfig::classic());
        assert!(matches!(GameConfig::load(tmp.path().with_extension("missing")), Err(ConfigError::Io(_))));
    }
}
