//! Color mapping for nodes and edges.
//!
//! Discrete palettes bucket a `value / max` ratio by ascending thresholds.
//! The smooth gradient interpolates RGB across four stops:
//! green → yellow → orange → red.

/// Safe / low intensity
pub const GREEN: &str = "#2ecc71";
/// Warning, threshold gradient only
pub const ORANGE_WARN: &str = "#f39c12";
pub const YELLOW: &str = "#f1c40f";
pub const ORANGE: &str = "#e67e22";
/// Critical
pub const RED: &str = "#e74c3c";

/// Attacker nodes without intensity coloring
pub const ATTACKER_GRAY: &str = "#bdc3c7";
/// Target nodes in combined sizing
pub const TARGET_BLUE: &str = "#3498db";
/// Target fill in separate sizing; bordered with `TARGET_BLUE`
pub const TARGET_DARK: &str = "#2c3e50";

type Rgb = (f64, f64, f64);

const STOP_GREEN: Rgb = (46.0, 204.0, 113.0);
const STOP_YELLOW: Rgb = (241.0, 196.0, 15.0);
const STOP_ORANGE: Rgb = (230.0, 126.0, 34.0);
const STOP_RED: Rgb = (231.0, 76.0, 60.0);

/// Ratio bands for the smooth gradient, `(lower bound, upper bound, from, to)`.
const BANDS: [(f64, f64, Rgb, Rgb); 3] = [
    (0.0, 0.33, STOP_GREEN, STOP_YELLOW),
    (0.33, 0.67, STOP_YELLOW, STOP_ORANGE),
    (0.67, 1.0, STOP_ORANGE, STOP_RED),
];

/// Green / orange / red by two ascending ratio thresholds.
pub fn threshold_gradient(value: f64, max: f64, thresholds: [f64; 2]) -> &'static str {
    if max == 0.0 {
        return GREEN;
    }
    let ratio = value / max;
    let [low, high] = thresholds;
    if ratio < low {
        GREEN
    } else if ratio < high {
        ORANGE_WARN
    } else {
        RED
    }
}

/// Green / yellow / orange / red by three ascending ratio thresholds.
pub fn heatmap(value: f64, max: f64, thresholds: [f64; 3]) -> &'static str {
    if max == 0.0 {
        return GREEN;
    }
    let ratio = value / max;
    if ratio < thresholds[0] {
        GREEN
    } else if ratio < thresholds[1] {
        YELLOW
    } else if ratio < thresholds[2] {
        ORANGE
    } else {
        RED
    }
}

/// Continuous gradient for `value` positioned within `[min, max]`.
pub fn smooth_gradient(value: f64, min: f64, max: f64) -> String {
    if max == min {
        return GREEN.to_string();
    }
    smooth_gradient_ratio((value - min) / (max - min))
}

/// Continuous gradient for a ratio in `[0, 1]` (clamped).
pub fn smooth_gradient_ratio(ratio: f64) -> String {
    let ratio = ratio.clamp(0.0, 1.0);
    let (lo, hi, from, to) = BANDS
        .iter()
        .copied()
        .find(|(_, hi, _, _)| ratio < *hi)
        .unwrap_or(BANDS[2]);

    let local = (ratio - lo) / (hi - lo);
    let channel = |a: f64, b: f64| (a + (b - a) * local) as u8;

    format!(
        "#{:02x}{:02x}{:02x}",
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_gradient_buckets() {
        assert_eq!(threshold_gradient(1.0, 100.0, [0.2, 0.6]), GREEN);
        assert_eq!(threshold_gradient(20.0, 100.0, [0.2, 0.6]), ORANGE_WARN);
        assert_eq!(threshold_gradient(59.0, 100.0, [0.2, 0.6]), ORANGE_WARN);
        assert_eq!(threshold_gradient(60.0, 100.0, [0.2, 0.6]), RED);
        assert_eq!(threshold_gradient(5.0, 0.0, [0.2, 0.6]), GREEN);
    }

    #[test]
    fn test_heatmap_buckets() {
        let t = [0.15, 0.4, 0.7];
        assert_eq!(heatmap(10.0, 100.0, t), GREEN);
        assert_eq!(heatmap(15.0, 100.0, t), YELLOW);
        assert_eq!(heatmap(50.0, 100.0, t), ORANGE);
        assert_eq!(heatmap(100.0, 100.0, t), RED);
        assert_eq!(heatmap(0.0, 0.0, t), GREEN);
    }

    #[test]
    fn test_smooth_gradient_stops_exact() {
        assert_eq!(smooth_gradient_ratio(0.0), "#2ecc71");
        assert_eq!(smooth_gradient_ratio(0.33), "#f1c40f");
        assert_eq!(smooth_gradient_ratio(0.67), "#e67e22");
        assert_eq!(smooth_gradient_ratio(1.0), "#e74c3c");
    }

    #[test]
    fn test_smooth_gradient_over_domain() {
        assert_eq!(smooth_gradient(2.0, 2.0, 10.0), GREEN);
        assert_eq!(smooth_gradient(10.0, 2.0, 10.0), RED);
        assert_eq!(smooth_gradient(4.0, 4.0, 4.0), GREEN);
    }

    #[test]
    fn test_smooth_gradient_truncates_channels() {
        // Halfway through the first band: r = 46 + 195 * 0.5 = 143.5 -> 143
        let color = smooth_gradient_ratio(0.165);
        assert_eq!(&color[1..3], "8f");
        assert_eq!(color.len(), 7);
    }

    #[test]
    fn test_smooth_gradient_clamps_out_of_range() {
        assert_eq!(smooth_gradient_ratio(-0.5), "#2ecc71");
        assert_eq!(smooth_gradient_ratio(3.0), "#e74c3c");
    }
}
