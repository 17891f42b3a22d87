//! Revenue classifier: maps revenue (in millions) to a band and back.
//!
//! Bands are contiguous over [0, 1000]:
//!   10M  = [0, 10]
//!   100M = (10, 100]
//!   500M = (100, 500]
//!   1B   = (500, 1000]

use crate::{
    error::{SimError, SimResult},
    types::RevenueBand,
};

pub const MIN_REVENUE: f64 = 0.0;
pub const MAX_REVENUE: f64 = 1000.0;

/// Classify a revenue value into its band.
/// NaN and anything outside [0, 1000] is rejected.
pub fn classify(revenue: f64) -> SimResult<RevenueBand> {
    if !(MIN_REVENUE..=MAX_REVENUE).contains(&revenue) {
        log::debug!("classify: revenue {revenue} out of range");
        return Err(SimError::InvalidRevenue { revenue });
    }
    let band = if revenue <= 10.0 {
        RevenueBand::Band10M
    } else if revenue <= 100.0 {
        RevenueBand::Band100M
    } else if revenue <= 500.0 {
        RevenueBand::Band500M
    } else {
        RevenueBand::Band1B
    };
    Ok(band)
}

/// Lower and upper bound of a band, in millions.
pub fn bounds(band: RevenueBand) -> (f64, f64) {
    match band {
        RevenueBand::Band10M  => (0.0, 10.0),
        RevenueBand::Band100M => (10.0, 100.0),
        RevenueBand::Band500M => (100.0, 500.0),
        RevenueBand::Band1B   => (500.0, 1000.0),
    }
}

/// Bounds for a raw band label, as received from outside the core.
pub fn bounds_for_label(label: &str) -> SimResult<(f64, f64)> {
    Ok(bounds(label.parse::<RevenueBand>()?))
}

impl RevenueBand {
    pub fn bounds(&self) -> (f64, f64) {
        bounds(*self)
    }

    /// Membership test that agrees with `classify`.
    pub fn contains(&self, revenue: f64) -> bool {
        classify(revenue).map(|b| b == *self).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_edges_are_inclusive() {
        assert_eq!(classify(10.0).unwrap(), RevenueBand::Band10M);
        assert_eq!(classify(100.0).unwrap(), RevenueBand::Band100M);
        assert_eq!(classify(500.0).unwrap(), RevenueBand::Band500M);
        assert_eq!(classify(1000.0).unwrap(), RevenueBand::Band1B);
    }

    #[test]
    fn just_past_an_edge_moves_to_next_band() {
        assert_eq!(classify(10.0001).unwrap(), RevenueBand::Band100M);
        assert_eq!(classify(100.0001).unwrap(), RevenueBand::Band500M);
        assert_eq!(classify(500.0001).unwrap(), RevenueBand::Band1B);
    }

    #[test]
    fn zero_is_in_first_band() {
        assert_eq!(classify(0.0).unwrap(), RevenueBand::Band10M);
    }

    #[test]
    fn out_of_range_is_rejected() {
        for r in [-1.0, -0.0001, 1000.0001, f64::NAN, f64::INFINITY] {
            let err = classify(r).unwrap_err();
            assert!(matches!(err, SimError::InvalidRevenue { .. }), "{r}: got {err:?}");
        }
    }

    #[test]
    fn bounds_contain_classified_revenue() {
        let mut r = 0.0;
        while r <= 1000.0 {
            let band = classify(r).unwrap();
            let (lo, hi) = bounds(band);
            assert!(r >= lo && r <= hi, "{r} not in {band} bounds ({lo}, {hi})");
            assert!(band.contains(r));
            r += 0.25;
        }
    }

    #[test]
    fn bands_are_contiguous() {
        for pair in RevenueBand::ALL.windows(2) {
            assert_eq!(bounds(pair[0]).1, bounds(pair[1]).0);
        }
        assert_eq!(bounds(RevenueBand::Band10M).0, MIN_REVENUE);
        assert_eq!(bounds(RevenueBand::Band1B).1, MAX_REVENUE);
    }

    #[test]
    fn unknown_label_has_no_bounds() {
        assert!(matches!(bounds_for_label("5B"), Err(SimError::InvalidBand { .. })));
        assert_eq!(bounds_for_label("500M").unwrap(), (100.0, 500.0));
    }
}
