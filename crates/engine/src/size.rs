//! Human-readable size parsing and normalization

use crate::error::EngineError;

/// Binary unit suffix ladder as printed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceUnit {
    Kib,
    Mib,
    Gib,
    Tib,
    Pib,
}

impl SpaceUnit {
    /// Multiplier from this unit to GiB
    fn gib_factor(self) -> f64 {
        match self {
            SpaceUnit::Kib => 1.0 / (1024.0 * 1024.0),
            SpaceUnit::Mib => 1.0 / 1024.0,
            SpaceUnit::Gib => 1.0,
            SpaceUnit::Tib => 1024.0,
            SpaceUnit::Pib => 1024.0 * 1024.0,
        }
    }

    fn from_suffix(suffix: char) -> Option<Self> {
        match suffix.to_ascii_uppercase() {
            'K' => Some(SpaceUnit::Kib),
            'M' => Some(SpaceUnit::Mib),
            'G' => Some(SpaceUnit::Gib),
            'T' => Some(SpaceUnit::Tib),
            'P' => Some(SpaceUnit::Pib),
            _ => None,
        }
    }
}

/// A free-space reading as reported by the engine: magnitude plus unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSpace {
    pub magnitude: f64,
    pub unit: SpaceUnit,
}

impl RawSpace {
    /// Parse a reading like `456G` or `1.21T`
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let trimmed = input.trim();
        let parse_err = || EngineError::Parse {
            what: "free-space reading",
            input: input.to_string(),
        };

        let mut chars = trimmed.chars();
        let suffix = chars.next_back().ok_or_else(parse_err)?;
        let unit = SpaceUnit::from_suffix(suffix).ok_or_else(parse_err)?;
        let magnitude: f64 = chars.as_str().parse().map_err(|_| parse_err())?;
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(parse_err());
        }

        Ok(Self { magnitude, unit })
    }

    /// Normalize to whole GiB, rounded to nearest
    pub fn to_gib(self) -> u64 {
        (self.magnitude * self.unit.gib_factor()).round() as u64
    }
}
