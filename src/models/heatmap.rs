use crate::error::{ClimaError, Result};
use serde::{Deserialize, Serialize};

/// One synthetic map cell. Purely a shading hint, not a modelled value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatmapSample {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Maharashtra state bounds
    pub const MAHARASHTRA: BoundingBox = BoundingBox {
        lat_min: 15.6,
        lat_max: 22.0,
        lon_min: 72.6,
        lon_max: 80.9,
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&latitude)
            && (self.lon_min..=self.lon_max).contains(&longitude)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.lat_min, self.lat_max, self.lon_min, self.lon_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.lat_min >= self.lat_max || self.lon_min >= self.lon_max {
            return Err(ClimaError::InvalidInput(format!(
                "degenerate bounding box {:?}",
                self
            )));
        }
        Ok(())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::MAHARASHTRA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive() {
        let b = BoundingBox::MAHARASHTRA;
        assert!(b.contains(15.6, 72.6));
        assert!(b.contains(22.0, 80.9));
        assert!(!b.contains(22.01, 75.0));
        assert!(!b.contains(18.0, 72.5));
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let b = BoundingBox {
            lat_min: 20.0,
            lat_max: 18.0,
            lon_min: 73.0,
            lon_max: 77.0,
        };
        assert!(b.validate().is_err());
        assert!(BoundingBox::default().validate().is_ok());
    }
}
