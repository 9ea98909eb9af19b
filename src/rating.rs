//! Five-star rating breakdown for catalog entries.

use std::fmt;

pub const MAX_STARS: u8 = 5;

/// Whole, half and empty stars for an average rating rounded to the
/// nearest half. The three counts always add up to five.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarRating {
    pub full: u8,
    pub half: bool,
    pub empty: u8,
}

impl StarRating {
    /// Average `total_value` over `total_count` ratings. No ratings means
    /// an all-empty row.
    pub fn from_totals(total_value: f64, total_count: u64) -> Self {
        let average = if total_count > 0 {
            total_value / total_count as f64
        } else {
            0.0
        };
        Self::from_average(average)
    }

    pub fn from_average(average: f64) -> Self {
        let rounded = if average.is_finite() {
            ((average * 2.0).round() / 2.0).clamp(0.0, f64::from(MAX_STARS))
        } else {
            0.0
        };

        let full = rounded.floor() as u8;
        let half = rounded.fract() == 0.5;
        Self {
            full,
            half,
            empty: MAX_STARS - full - u8::from(half),
        }
    }

    /// The rounded average, in half-star steps
    pub fn value(&self) -> f64 {
        f64::from(self.full) + if self.half { 0.5 } else { 0.0 }
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.full {
            f.write_str("★")?;
        }
        if self.half {
            f.write_str("⯪")?;
        }
        for _ in 0..self.empty {
            f.write_str("☆")?;
        }
        Ok(())
    }
}
