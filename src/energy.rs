//! # Energy Module
//!
//! Order-of-magnitude energy estimates from token counts.
//!
//! ## Constants
//!
//! Each token category has a fixed cost in mWh per 1,000 tokens:
//! - Fresh input (prefill)
//! - Cache read (KV cache load, far cheaper than prefill)
//! - Cache write (prefill plus write overhead)
//! - Output (decode)
//!
//! The real uncertainty is at least ±3x in each direction, so a midpoint is
//! shown snapped to 1/2/5 per decade, and a range is shown as literal bounds.

use crate::models::Counters;

/// mWh per 1,000 tokens for each category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyRates {
    pub fresh_input: f64,
    pub cache_read: f64,
    pub cache_write: f64,
    pub output: f64,
}

pub const MID_RATES: EnergyRates = EnergyRates {
    fresh_input: 390.0,
    cache_read: 15.0,
    cache_write: 490.0,
    output: 1400.0,
};

pub const LOW_RATES: EnergyRates = EnergyRates {
    fresh_input: 130.0,
    cache_read: 13.0,
    cache_write: 163.0,
    output: 650.0,
};

pub const HIGH_RATES: EnergyRates = EnergyRates {
    fresh_input: 1170.0,
    cache_read: 117.0,
    cache_write: 1470.0,
    output: 5850.0,
};

/// How energy figures are rendered on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyMode {
    #[default]
    Mid,
    Range,
}

impl EnergyRates {
    /// Energy in mWh.
    pub fn estimate(&self, fresh_input: u64, cache_read: u64, cache_write: u64, output: u64) -> f64 {
        fresh_input as f64 / 1000.0 * self.fresh_input
            + cache_read as f64 / 1000.0 * self.cache_read
            + cache_write as f64 / 1000.0 * self.cache_write
            + output as f64 / 1000.0 * self.output
    }

    pub fn estimate_counters(&self, c: &Counters) -> f64 {
        self.estimate(c.input, c.cache_read, c.cache_write, c.output)
    }
}

/// Midpoint estimate in mWh.
pub fn estimate(fresh_input: u64, cache_read: u64, cache_write: u64, output: u64) -> f64 {
    MID_RATES.estimate(fresh_input, cache_read, cache_write, output)
}

/// Low and high bounds in mWh.
pub fn estimate_range(
    fresh_input: u64,
    cache_read: u64,
    cache_write: u64,
    output: u64,
) -> (f64, f64) {
    (
        LOW_RATES.estimate(fresh_input, cache_read, cache_write, output),
        HIGH_RATES.estimate(fresh_input, cache_read, cache_write, output),
    )
}

/// Snap to the nearest of {1, 2, 5} x 10^k in log space.
///
/// Thresholds on the fractional decade: below 0.15 rounds down to 1, below
/// 0.50 to 2, below 0.85 to 5, otherwise up to the next power of ten.
/// Returns `None` below 1 mWh.
pub fn snap_mwh(mwh: f64) -> Option<u64> {
    if !mwh.is_finite() || mwh < 1.0 {
        return None;
    }
    let log = mwh.log10();
    let decade = log.floor();
    let frac = log - decade;
    let base = 10f64.powi(decade as i32);
    let val = if frac < 0.15 {
        base
    } else if frac < 0.50 {
        2.0 * base
    } else if frac < 0.85 {
        5.0 * base
    } else {
        10.0 * base
    };
    Some(val.round() as u64)
}

/// Midpoint display, e.g. `~500mWh`, `~2Wh`, `~1kWh`.
pub fn format_snapped(mwh: f64) -> String {
    let Some(val) = snap_mwh(mwh) else {
        return "~0".to_string();
    };
    if val < 1_000 {
        format!("~{val}mWh")
    } else if val < 1_000_000 {
        format!("~{}Wh", val as f64 / 1e3)
    } else {
        format!("~{}kWh", val as f64 / 1e6)
    }
}

fn format_bound(v: f64) -> String {
    if v >= 10.0 {
        format!("{v:.0}")
    } else if v >= 1.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

/// Range display in the unit that keeps the high bound readable,
/// e.g. `0.13–1.2Wh`.
pub fn format_range(low_mwh: f64, high_mwh: f64) -> String {
    if high_mwh < 1.0 {
        return "~0".to_string();
    }
    // Compare against the rounding edge so 999.7 never prints as "1000mWh"
    let (div, unit) = if high_mwh < 999.5 {
        (1.0, "mWh")
    } else if high_mwh < 999_500.0 {
        (1e3, "Wh")
    } else {
        (1e6, "kWh")
    };
    format!(
        "{}–{}{}",
        format_bound(low_mwh / div),
        format_bound(high_mwh / div),
        unit
    )
}

/// Energy text for a set of day/window counters.
pub fn display(counters: &Counters, mode: EnergyMode) -> String {
    match mode {
        EnergyMode::Mid => format_snapped(MID_RATES.estimate_counters(counters)),
        EnergyMode::Range => format_range(
            LOW_RATES.estimate_counters(counters),
            HIGH_RATES.estimate_counters(counters),
        ),
    }
}

/// One relatable reference per order of magnitude, in Wh.
const OOM_SCALE: &[(f64, &str)] = &[
    (1.0, "a Google search"),
    (10.0, "a phone charge"),
    (100.0, "a laptop charge"),
    (1_000.0, "an hour of AC"),
    (10_000.0, "a day of home electricity"),
    (100_000.0, "a full EV charge"),
    (1_000_000.0, "a month of home electricity"),
    (10_000_000.0, "a year of home electricity"),
];

/// Snapped estimate with the matching everyday comparison, if any.
pub fn comparison(wh: f64) -> String {
    if wh < 0.5 {
        return "~0 Wh".to_string();
    }
    let user = format_snapped(wh * 1000.0);
    for &(ref_wh, label) in OOM_SCALE {
        if format_snapped(ref_wh * 1000.0) == user {
            return format!("{user} ≈ {label} (±3×)");
        }
        if ref_wh >= wh {
            break;
        }
    }
    format!("{user} (±3×)")
}
