use crate::types::Record;
use geo::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default half-width of the offset window, in degrees (roughly 30 m here).
pub const DEFAULT_JITTER_DEGREES: f64 = 0.0003;
/// Largest offset window accepted from configuration.
pub const MAX_JITTER_DEGREES: f64 = 1.0;

/// Nudges markers off their true coordinate so co-located investors don't
/// stack on a single pin.
pub struct JitterPositioner {
    rng: StdRng,
    magnitude: f64,
}

impl JitterPositioner {
    /// Magnitudes outside `0..=MAX_JITTER_DEGREES` (or non-finite) are
    /// clamped into range; NaN disables jitter.
    pub fn new(magnitude: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            magnitude: if magnitude.is_nan() {
                0.0
            } else {
                magnitude.abs().min(MAX_JITTER_DEGREES)
            },
        }
    }

    /// Returns `None` when the record has no usable coordinate.
    pub fn position_for<C>(&mut self, record: &Record<C>) -> Option<Point<f64>> {
        let coord = record.coordinate?;
        if !(coord.lat.is_finite() && coord.lon.is_finite()) {
            return None;
        }
        let (dlat, dlon) = if self.magnitude > 0.0 {
            (
                self.rng.gen_range(-self.magnitude..=self.magnitude),
                self.rng.gen_range(-self.magnitude..=self.magnitude),
            )
        } else {
            (0.0, 0.0)
        };
        let base = coord.to_point();
        Some(Point::new(base.x() + dlon, base.y() + dlat))
    }
}
