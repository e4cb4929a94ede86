//! Runtime configuration

use crate::types::PrimitiveTable;
use crate::{GemError, GemResult};
use serde::{Deserialize, Serialize};

/// Characters that encode field modifiers in definition keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMarkers {
    /// Leading marker for private (non-enumerable) fields
    pub private: char,
    /// Trailing marker for nullable fields
    pub nullable: char,
    /// Trailing marker for required fields
    pub required: char,
    /// Leading marker for event listeners
    pub listener: char,
}

impl Default for KeyMarkers {
    fn default() -> Self {
        Self {
            private: '_',
            nullable: '?',
            required: '*',
            listener: '@',
        }
    }
}

impl KeyMarkers {
    /// Markers must be pairwise distinct
    pub fn validate(&self) -> GemResult<()> {
        let all = [self.private, self.nullable, self.required, self.listener];
        for (i, a) in all.iter().enumerate() {
            if all[i + 1..].contains(a) {
                return Err(GemError::Config(format!(
                    "key marker {:?} is used for more than one modifier",
                    a
                )));
            }
            if a.is_whitespace() {
                return Err(GemError::Config("key markers cannot be whitespace".into()));
            }
        }
        Ok(())
    }
}

/// Options for creating a runtime
#[derive(Debug, Clone)]
pub struct GemOptions {
    /// Modifier markers used when parsing definition keys
    pub markers: KeyMarkers,

    /// Primitive types registered at bootstrap
    pub primitives: PrimitiveTable,

    /// Upper bound on ticks run by `run_until_idle`
    pub idle_tick_limit: usize,
}

impl Default for GemOptions {
    fn default() -> Self {
        Self {
            markers: KeyMarkers::default(),
            primitives: PrimitiveTable::standard(),
            idle_tick_limit: 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GemConfigFile {
    markers: KeyMarkers,
    idle_tick_limit: Option<usize>,
}

impl GemOptions {
    /// Load options from a TOML document
    ///
    /// ```toml
    /// idle_tick_limit = 64
    ///
    /// [markers]
    /// private = "_"
    /// nullable = "?"
    /// required = "!"
    /// listener = "@"
    /// ```
    pub fn from_toml_str(source: &str) -> GemResult<Self> {
        let file: GemConfigFile =
            toml::from_str(source).map_err(|e| GemError::Config(e.to_string()))?;
        file.markers.validate()?;

        let mut options = Self {
            markers: file.markers,
            ..Self::default()
        };
        if let Some(limit) = file.idle_tick_limit {
            options.idle_tick_limit = limit;
        }
        Ok(options)
    }
}
