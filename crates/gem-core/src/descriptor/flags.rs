//! Field modifier flags and key marker parsing

use crate::options::KeyMarkers;
use crate::{GemError, GemResult};
use serde::{Deserialize, Serialize};

/// Modifiers carried by a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    /// Null is admitted on write and at verification
    pub nullable: bool,
    /// Must hold a value at verification
    pub required: bool,
    /// Not enumerable, still readable and writable
    pub private: bool,
}

impl FieldFlags {
    /// Merge two flag sets
    pub fn union(self, other: FieldFlags) -> FieldFlags {
        FieldFlags {
            nullable: self.nullable || other.nullable,
            required: self.required || other.required,
            private: self.private || other.private,
        }
    }

    /// Suffix describing the flags in diagnostics
    pub fn modifier(&self) -> &'static str {
        if self.required {
            "*"
        } else if self.nullable {
            "?"
        } else {
            ""
        }
    }
}

/// Split a raw definition key into its field key and flags
///
/// A leading private marker is kept in the key. One trailing nullable or
/// required marker is stripped.
pub fn parse_key(raw: &str, markers: &KeyMarkers) -> GemResult<(String, FieldFlags)> {
    let mut flags = FieldFlags {
        private: raw.starts_with(markers.private),
        ..FieldFlags::default()
    };

    let key = if let Some(stripped) = raw.strip_suffix(markers.nullable) {
        flags.nullable = true;
        stripped
    } else if let Some(stripped) = raw.strip_suffix(markers.required) {
        flags.required = true;
        stripped
    } else {
        raw
    };

    if key.is_empty() {
        return Err(GemError::Definition(format!(
            "field key {:?} is empty once its markers are removed",
            raw
        )));
    }
    if key.ends_with(markers.nullable) || key.ends_with(markers.required) {
        return Err(GemError::Definition(format!(
            "field key {:?} carries more than one trailing marker",
            raw
        )));
    }
    Ok((key.to_string(), flags))
}
