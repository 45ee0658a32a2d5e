//! Tile resolution tiers.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Grid resolution a tile's points are snapped to.
///
/// The label is part of the tile cache key, so two requests for the same
/// query and colour mode at different resolutions are cached separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// 1 degree grid
    Point1,
    /// 0.1 degree grid
    Point01,
    /// 0.01 degree grid
    Point001,
    /// 0.001 degree grid
    Point0001,
    /// 0.0001 degree grid
    Point00001,
    /// Unsnapped coordinates
    Raw,
}

impl Resolution {
    /// Every tier, coarsest first.
    pub const ALL: [Resolution; 6] = [
        Resolution::Point1,
        Resolution::Point01,
        Resolution::Point001,
        Resolution::Point0001,
        Resolution::Point00001,
        Resolution::Raw,
    ];

    /// Label used in cache keys and configuration.
    pub fn label(self) -> &'static str {
        match self {
            Resolution::Point1 => "point-1",
            Resolution::Point01 => "point-0.1",
            Resolution::Point001 => "point-0.01",
            Resolution::Point0001 => "point-0.001",
            Resolution::Point00001 => "point-0.0001",
            Resolution::Raw => "lat_long",
        }
    }

    /// Grid spacing in degrees, or `None` for unsnapped coordinates.
    pub fn degrees(self) -> Option<f64> {
        match self {
            Resolution::Point1 => Some(1.0),
            Resolution::Point01 => Some(0.1),
            Resolution::Point001 => Some(0.01),
            Resolution::Point0001 => Some(0.001),
            Resolution::Point00001 => Some(0.0001),
            Resolution::Raw => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error parsing a resolution label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown resolution '{0}'")]
pub struct ParseResolutionError(pub String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.label() == s)
            .ok_or_else(|| ParseResolutionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_parse_back() {
        for resolution in Resolution::ALL {
            assert_eq!(resolution.label().parse::<Resolution>(), Ok(resolution));
        }
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(
            "point-5".parse::<Resolution>(),
            Err(ParseResolutionError("point-5".to_string()))
        );
    }

    #[test]
    fn test_degrees_get_finer() {
        let degrees: Vec<f64> = Resolution::ALL.iter().filter_map(|r| r.degrees()).collect();
        assert_eq!(degrees.len(), 5);
        assert!(degrees.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(Resolution::Raw.degrees(), None);
    }

    #[test]
    fn test_display_is_label() {
        assert_eq!(Resolution::Point001.to_string(), "point-0.01");
    }
}
