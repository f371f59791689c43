//! Numeric scaling from a value domain onto a visual range.
//!
//! Every range-mapping function returns `target_min` when the domain is
//! degenerate (`max == min`), so callers never divide by zero.

/// Linear scaling of `val` from `[min_val, max_val]` onto `[target_min, target_max]`.
pub fn linear(val: f64, min_val: f64, max_val: f64, target_min: f64, target_max: f64) -> f64 {
    if max_val == min_val {
        return target_min;
    }
    target_min + (val - min_val) / (max_val - min_val) * (target_max - target_min)
}

/// Square-root scaling; flattens the growth curve for high-variance data.
pub fn sqrt(val: f64, min_val: f64, max_val: f64, target_min: f64, target_max: f64) -> f64 {
    if max_val == min_val {
        return target_min;
    }
    linear(
        val.sqrt(),
        min_val.sqrt(),
        max_val.sqrt(),
        target_min,
        target_max,
    )
}

/// Logarithmic scaling in `ln(1 + x)` space, normalized to the target range.
pub fn log_range(val: f64, min_val: f64, max_val: f64, target_min: f64, target_max: f64) -> f64 {
    if max_val == min_val {
        return target_min;
    }
    linear(
        val.ln_1p(),
        min_val.ln_1p(),
        max_val.ln_1p(),
        target_min,
        target_max,
    )
}

/// Unbounded `ln(1 + x) * multiplier`.
pub fn log(val: f64, multiplier: f64) -> f64 {
    val.ln_1p() * multiplier
}

/// Unbounded `sqrt(hits) * multiplier` edge width.
pub fn edge_width_sqrt(hits: f64, multiplier: f64) -> f64 {
    hits.sqrt() * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    type Scaler = fn(f64, f64, f64, f64, f64) -> f64;

    const SCALERS: [(&str, Scaler); 3] = [("linear", linear), ("sqrt", sqrt), ("log", log_range)];

    #[test]
    fn test_degenerate_domain_returns_range_min() {
        for (name, f) in SCALERS {
            for v in [0.0, 5.0, 1e6] {
                assert_eq!(f(v, 7.0, 7.0, 3.0, 15.0), 3.0, "{name} at {v}");
            }
            assert_eq!(f(0.0, 0.0, 0.0, 1.5, 9.0), 1.5, "{name} zero domain");
        }
    }

    #[test]
    fn test_endpoints_map_to_range_bounds() {
        for (name, f) in SCALERS {
            assert!((f(1.0, 1.0, 100.0, 2.0, 8.0) - 2.0).abs() < 1e-9, "{name}");
            assert!((f(100.0, 1.0, 100.0, 2.0, 8.0) - 8.0).abs() < 1e-9, "{name}");
        }
    }

    #[test]
    fn test_monotonic() {
        let values = [0.0, 1.0, 2.0, 3.0, 10.0, 50.0, 99.0, 250.0, 1000.0];
        for (name, f) in SCALERS {
            for pair in values.windows(2) {
                let a = f(pair[0], 0.0, 1000.0, 1.0, 6.0);
                let b = f(pair[1], 0.0, 1000.0, 1.0, 6.0);
                assert!(a <= b, "{name}: {} -> {a} > {} -> {b}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_linear_midpoint() {
        assert_eq!(linear(5.0, 0.0, 10.0, 0.0, 100.0), 50.0);
    }

    #[test]
    fn test_sqrt_compresses_high_values() {
        // sqrt(25) sits halfway between sqrt(0) and sqrt(100)
        assert!((sqrt(25.0, 0.0, 100.0, 0.0, 10.0) - 5.0).abs() < 1e-9);
        assert!(sqrt(25.0, 0.0, 100.0, 0.0, 10.0) > linear(25.0, 0.0, 100.0, 0.0, 10.0));
    }

    #[test]
    fn test_log_handles_zero() {
        let v = log_range(0.0, 0.0, 1000.0, 3.0, 15.0);
        assert_eq!(v, 3.0);
        assert!(log(0.0, 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edge_width_sqrt() {
        assert_eq!(edge_width_sqrt(16.0, 0.5), 2.0);
    }
}
