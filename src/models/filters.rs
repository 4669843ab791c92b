use super::forecast::GeoPoint;
use crate::error::{ClimaError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Pune,
    Nashik,
    Aurangabad,
    Ahmednagar,
    Beed,
    Jalna,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Pune,
        Region::Nashik,
        Region::Aurangabad,
        Region::Ahmednagar,
        Region::Beed,
        Region::Jalna,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Pune => "Pune",
            Region::Nashik => "Nashik",
            Region::Aurangabad => "Aurangabad",
            Region::Ahmednagar => "Ahmednagar",
            Region::Beed => "Beed",
            Region::Jalna => "Jalna",
        }
    }

    /// District headquarters used as the default query point
    pub fn reference_point(&self) -> GeoPoint {
        match self {
            Region::Pune => GeoPoint::new(18.5204, 73.8567),
            Region::Nashik => GeoPoint::new(19.9975, 73.7898),
            Region::Aurangabad => GeoPoint::new(19.8762, 75.3433),
            Region::Ahmednagar => GeoPoint::new(19.0948, 74.7480),
            Region::Beed => GeoPoint::new(18.9891, 75.7601),
            Region::Jalna => GeoPoint::new(19.8347, 75.8816),
        }
    }

    pub fn slug(&self) -> String {
        self.as_str().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crop {
    Rice,
    Wheat,
    Cotton,
    Sugarcane,
    Soybean,
    Jowar,
}

impl Crop {
    pub const ALL: [Crop; 6] = [
        Crop::Rice,
        Crop::Wheat,
        Crop::Cotton,
        Crop::Sugarcane,
        Crop::Soybean,
        Crop::Jowar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Crop::Rice => "Rice",
            Crop::Wheat => "Wheat",
            Crop::Cotton => "Cotton",
            Crop::Sugarcane => "Sugarcane",
            Crop::Soybean => "Soybean",
            Crop::Jowar => "Jowar",
        }
    }

    /// Typical Maharashtra yield in tonnes per hectare
    pub fn base_yield_t_per_ha(&self) -> f64 {
        match self {
            Crop::Rice => 2.8,
            Crop::Wheat => 3.0,
            Crop::Cotton => 1.6,
            Crop::Sugarcane => 80.0,
            Crop::Soybean => 1.1,
            Crop::Jowar => 1.0,
        }
    }

    /// Optimal daily temperature band (min, max) in °C
    pub fn optimal_temp_c(&self) -> (f64, f64) {
        match self {
            Crop::Rice => (25.0, 35.0),
            Crop::Wheat => (15.0, 25.0),
            Crop::Cotton => (21.0, 30.0),
            _ => (20.0, 30.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Kharif,
    Rabi,
    Zaid,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Kharif, Season::Rabi, Season::Zaid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Zaid => "Zaid",
        }
    }
}

macro_rules! closed_set {
    ($ty:ident, $what:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ClimaError;

            fn from_str(s: &str) -> Result<Self> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        ClimaError::InvalidInput(format!(
                            "unknown {} '{}' (expected one of: {})",
                            $what,
                            s,
                            valid.join(", ")
                        ))
                    })
            }
        }

        impl $ty {
            pub fn next(&self) -> Self {
                let i = $ty::ALL.iter().position(|v| v == self).unwrap_or(0);
                $ty::ALL[(i + 1) % $ty::ALL.len()]
            }

            pub fn prev(&self) -> Self {
                let i = $ty::ALL.iter().position(|v| v == self).unwrap_or(0);
                $ty::ALL[(i + $ty::ALL.len() - 1) % $ty::ALL.len()]
            }
        }
    };
}

closed_set!(Region, "region");
closed_set!(Crop, "crop");
closed_set!(Season, "season");

/// What the advisory is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryFilters {
    pub region: Region,
    pub crop: Crop,
    pub season: Season,
}

impl AdvisoryFilters {
    /// Parse the three filters from free text, rejecting anything outside
    /// the known sets.
    pub fn parse(region: &str, crop: &str, season: &str) -> Result<Self> {
        Ok(Self {
            region: region.parse()?,
            crop: crop.parse()?,
            season: season.parse()?,
        })
    }
}

impl Default for AdvisoryFilters {
    fn default() -> Self {
        Self {
            region: Region::Pune,
            crop: Crop::Rice,
            season: Season::Kharif,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        let filters = AdvisoryFilters::parse("pune", "WHEAT", " Rabi ").unwrap();
        assert_eq!(filters.region, Region::Pune);
        assert_eq!(filters.crop, Crop::Wheat);
        assert_eq!(filters.season, Season::Rabi);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = AdvisoryFilters::parse("Mumbai", "Rice", "Kharif").unwrap_err();
        assert!(matches!(err, ClimaError::InvalidInput(_)));
        assert!("barley".parse::<Crop>().is_err());
        assert!("monsoon".parse::<Season>().is_err());
    }

    #[test]
    fn cycling_wraps_around() {
        assert_eq!(Season::Zaid.next(), Season::Kharif);
        assert_eq!(Season::Kharif.prev(), Season::Zaid);
        assert_eq!(Crop::Jowar.next(), Crop::Rice);
    }

    #[test]
    fn reference_points_are_valid() {
        for region in Region::ALL {
            assert!(region.reference_point().validate().is_ok());
        }
    }

    #[test]
    fn base_yields_are_positive() {
        for crop in Crop::ALL {
            assert!(crop.base_yield_t_per_ha() > 0.0);
            let (lo, hi) = crop.optimal_temp_c();
            assert!(lo < hi);
        }
    }
}
