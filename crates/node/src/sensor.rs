//! Moisture sampling: raw-count scaling plus a stateful simulator for
//! development hosts without a probe attached.
//!
//! Capacitive probes read *high* when dry and *low* when wet, so the
//! percentage scale is inverted relative to the raw counts.

// ---------------------------------------------------------------------------
// Raw-count scaling
// ---------------------------------------------------------------------------

/// Full-scale raw reading of the probe's ADC (12-bit).
pub(crate) const RAW_DRY: i32 = 4095;
/// Raw reading in saturated soil.
pub(crate) const RAW_WET: i32 = 0;

/// Map a raw ADC count onto a 0-100 moisture percentage, clamped.
/// `raw_dry` maps to 0 %, `raw_wet` to 100 %.
pub(crate) fn scale_to_percent(raw: i32, raw_dry: i32, raw_wet: i32) -> i32 {
    if raw_dry == raw_wet {
        return 0; // degenerate calibration; avoid divide-by-zero
    }
    let pct = (raw_dry - raw) * 100 / (raw_dry - raw_wet);
    pct.clamp(0, 100)
}

// ---------------------------------------------------------------------------
// Simulated probe
// ---------------------------------------------------------------------------

/// Random-walk moisture simulator with a slow drying drift, standing in for
/// the real probe during development.  Raw counts rise as the soil dries.
#[cfg(feature = "sim")]
pub(crate) struct SimProbe {
    raw: f64,
    drift_per_sample: f64,
    noise: f64,
}

#[cfg(feature = "sim")]
impl SimProbe {
    pub(crate) fn new() -> Self {
        Self {
            // Start mid-range with some spread between nodes.
            raw: 2000.0 + fastrand::f64() * 400.0,
            drift_per_sample: 1.5,
            noise: 25.0,
        }
    }

    /// Produce the next raw reading.
    pub(crate) fn read(&mut self) -> i32 {
        self.raw += self.drift_per_sample;
        self.raw += (fastrand::f64() - 0.5) * 2.0 * self.noise;
        self.raw = self.raw.clamp(RAW_WET as f64, RAW_DRY as f64);
        self.raw as i32
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- scale_to_percent ---------------------------------------------------

    #[test]
    fn fully_dry_is_zero_percent() {
        assert_eq!(scale_to_percent(4095, RAW_DRY, RAW_WET), 0);
    }

    #[test]
    fn fully_wet_is_hundred_percent() {
        assert_eq!(scale_to_percent(0, RAW_DRY, RAW_WET), 100);
    }

    #[test]
    fn midpoint_is_about_fifty_percent() {
        let pct = scale_to_percent(2048, RAW_DRY, RAW_WET);
        assert!((49..=51).contains(&pct), "got {pct}");
    }

    #[test]
    fn out_of_range_readings_clamp() {
        assert_eq!(scale_to_percent(5000, RAW_DRY, RAW_WET), 0);
        assert_eq!(scale_to_percent(-100, RAW_DRY, RAW_WET), 100);
    }

    #[test]
    fn custom_calibration_range() {
        // Probe that reads 26000 dry / 12000 wet (15-bit ADC).
        assert_eq!(scale_to_percent(26000, 26000, 12000), 0);
        assert_eq!(scale_to_percent(12000, 26000, 12000), 100);
        assert_eq!(scale_to_percent(19000, 26000, 12000), 50);
    }

    #[test]
    fn degenerate_calibration_does_not_divide_by_zero() {
        assert_eq!(scale_to_percent(123, 2000, 2000), 0);
    }

    // -- SimProbe -----------------------------------------------------------

    #[cfg(feature = "sim")]
    #[test]
    fn sim_probe_stays_in_adc_range() {
        let mut probe = SimProbe::new();
        for _ in 0..10_000 {
            let raw = probe.read();
            assert!((RAW_WET..=RAW_DRY).contains(&raw), "raw {raw} out of range");
        }
    }

    #[cfg(feature = "sim")]
    #[test]
    fn sim_probe_dries_over_time() {
        let mut probe = SimProbe::new();
        let first = probe.read();
        let mut last = first;
        for _ in 0..1000 {
            last = probe.read();
        }
        // Drift dominates noise over a long horizon.
        assert!(last > first, "expected drying drift, {first} -> {last}");
    }
}
