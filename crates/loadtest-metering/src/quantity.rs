//! Quantity generators for meter readings.

use rand::Rng;

/// How each reading's quantity is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityGenerator {
    /// Independent uniform draw from `[min, max)`.
    Uniform { min: f64, max: f64 },
    /// The same value for every reading.
    Fixed { value: f64 },
}

impl QuantityGenerator {
    /// Uniform over `[0, 1)`.
    pub fn unit() -> Self {
        QuantityGenerator::Uniform { min: 0.0, max: 1.0 }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            QuantityGenerator::Uniform { min, max } if max > min => rng.random_range(min..max),
            // Degenerate range
            QuantityGenerator::Uniform { min, .. } => min,
            QuantityGenerator::Fixed { value } => value,
        }
    }
}

impl Default for QuantityGenerator {
    fn default() -> Self {
        Self::unit()
    }
}
