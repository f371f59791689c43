//! Built-in visualization presets.
//!
//! Each preset fully specifies node sizing, edge scaling, coloring, theme and
//! physics. Lookups construct a fresh value, so callers may modify what they
//! get back without affecting the registry.

use crate::error::{FiregraphError, Result};
use serde::{Deserialize, Serialize};

/// Registry ids in display order.
pub const PRESET_IDS: [&str; 4] = ["intensity", "heatmap", "micro", "balanced"];

/// How node sizes are derived from hit volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSizing {
    /// One pooled volume (outbound + inbound) per IP, log-scaled.
    Combined,
    /// Independent attacker and target volumes and ranges.
    Separate,
}

/// Node scaling in separate sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeScaleMethod {
    Linear,
    Sqrt,
}

/// Edge width scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeScaleMethod {
    /// Interpolate in square-root space of the hit distribution.
    SqrtSimple,
    Linear,
}

/// Discrete color scheme name, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModeName {
    Gradient,
    Heatmap,
}

/// Discrete color scheme with its ascending ratio thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ColorMode {
    /// Green / orange / red.
    Gradient([f64; 2]),
    /// Green / yellow / orange / red.
    Heatmap([f64; 3]),
}

impl ColorMode {
    pub const DEFAULT_GRADIENT: [f64; 2] = [0.2, 0.6];
    pub const DEFAULT_HEATMAP: [f64; 3] = [0.15, 0.4, 0.7];

    pub fn name(&self) -> ColorModeName {
        match self {
            ColorMode::Gradient(_) => ColorModeName::Gradient,
            ColorMode::Heatmap(_) => ColorModeName::Heatmap,
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        match self {
            ColorMode::Gradient(t) => t,
            ColorMode::Heatmap(t) => t,
        }
    }

    /// Build a mode from a name and an optional threshold list.
    pub fn from_parts(name: ColorModeName, thresholds: Option<&[f64]>) -> Result<Self> {
        match (name, thresholds) {
            (ColorModeName::Gradient, None) => Ok(ColorMode::Gradient(Self::DEFAULT_GRADIENT)),
            (ColorModeName::Heatmap, None) => Ok(ColorMode::Heatmap(Self::DEFAULT_HEATMAP)),
            (ColorModeName::Gradient, Some(&[a, b])) => Ok(ColorMode::Gradient([a, b])),
            (ColorModeName::Heatmap, Some(&[a, b, c])) => Ok(ColorMode::Heatmap([a, b, c])),
            (name, Some(t)) => Err(FiregraphError::InvalidConfig(format!(
                "{name:?} color mode takes {} thresholds, got {}",
                if name == ColorModeName::Gradient { 2 } else { 3 },
                t.len()
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        let t = self.thresholds();
        let in_unit = t.iter().all(|v| *v > 0.0 && *v < 1.0);
        let ascending = t.windows(2).all(|w| w[0] < w[1]);
        if in_unit && ascending {
            Ok(())
        } else {
            Err(FiregraphError::InvalidConfig(format!(
                "color thresholds must be ascending within (0, 1), got {t:?}"
            )))
        }
    }
}

/// Inclusive `[min, max]` size or width range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

impl SizeRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Multiply both bounds, then clamp each to at least `floor`.
    pub fn scaled(self, factor: f64, floor: Option<f64>) -> Self {
        let clamp = |v: f64| floor.map_or(v, |f| v.max(f));
        Self {
            min: clamp(self.min * factor),
            max: clamp(self.max * factor),
        }
    }
}

impl From<[f64; 2]> for SizeRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<SizeRange> for [f64; 2] {
    fn from(r: SizeRange) -> Self {
        [r.min, r.max]
    }
}

/// Canvas dimensions and colors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub height: String,
    pub width: String,
    pub bgcolor: String,
    pub font_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            height: "900px".to_string(),
            width: "100%".to_string(),
            bgcolor: "#0b0e11".to_string(),
            font_color: "white".to_string(),
        }
    }
}

/// Barnes-Hut physics and edge rendering parameters handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Physics {
    pub gravitational_constant: f64,
    pub central_gravity: f64,
    pub spring_length: f64,
    pub spring_constant: f64,
    pub damping: f64,
    pub stabilization_iterations: u32,
    pub edge_smooth: bool,
    pub edge_smooth_type: String,
    pub edge_roundness: f64,
    pub arrow_scale: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravitational_constant: -20000.0,
            central_gravity: 0.8,
            spring_length: 100.0,
            spring_constant: 0.05,
            damping: 0.3,
            stabilization_iterations: 40,
            edge_smooth: false,
            edge_smooth_type: "dynamic".to_string(),
            edge_roundness: 0.5,
            arrow_scale: 0.4,
        }
    }
}

/// Whether and how resolved hostnames appear in node labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostnameLabels {
    pub show_in_labels: bool,
    pub prefer_hostname: bool,
    pub show_both: bool,
}

/// A complete visualization configuration.
///
/// Registry entries and overlay results share this type. Optional ranges fall
/// back to builder defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default_output: String,
    pub top_n: Option<usize>,

    pub node_sizing: NodeSizing,
    pub node_size_range: Option<SizeRange>,
    pub target_size_range: Option<SizeRange>,
    pub node_scale_method: NodeScaleMethod,
    /// Attackers at or below this share of the max volume lose their label.
    pub label_threshold: Option<f64>,

    pub edge_width_range: Option<SizeRange>,
    pub edge_scale_method: EdgeScaleMethod,
    pub edge_opacity: Option<f64>,
    pub scale_arrows_with_edges: bool,
    pub base_arrow_scale: f64,

    pub color_mode: ColorMode,
    pub use_smooth_gradient: bool,

    pub hostname_labels: HostnameLabels,
    pub theme: Theme,
    pub physics: Physics,
}

impl PresetConfig {
    /// Name used to match per-preset overrides: lower case, spaces as `_`.
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase().replace(' ', "_")
    }

    /// Check range ordering and threshold invariants.
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("node_size_range", self.node_size_range),
            ("target_size_range", self.target_size_range),
            ("edge_width_range", self.edge_width_range),
        ];
        for (key, range) in ranges {
            if let Some(r) = range {
                if r.min.is_nan() || r.max.is_nan() || r.min > r.max {
                    return Err(FiregraphError::InvalidConfig(format!(
                        "{key} must satisfy min <= max, got [{}, {}]",
                        r.min, r.max
                    )));
                }
            }
        }
        self.color_mode.validate()
    }
}

/// Look up a preset by id.
pub fn get_preset(id: &str) -> Result<PresetConfig> {
    builtin(id).ok_or_else(|| FiregraphError::UnknownPreset {
        name: id.to_string(),
        available: PRESET_IDS.to_vec(),
    })
}

/// `(id, description)` for every preset, in registry order.
pub fn list_presets() -> Vec<(&'static str, String)> {
    PRESET_IDS
        .iter()
        .filter_map(|id| builtin(id).map(|p| (*id, p.description)))
        .collect()
}

fn theme(height: &str, bgcolor: &str, font_color: &str) -> Theme {
    Theme {
        height: height.to_string(),
        width: "100%".to_string(),
        bgcolor: bgcolor.to_string(),
        font_color: font_color.to_string(),
    }
}

fn builtin(id: &str) -> Option<PresetConfig> {
    let preset = match id {
        "intensity" => PresetConfig {
            id: id.to_string(),
            name: "Intensity Map".to_string(),
            description: "Balanced visualization with intensity-based coloring".to_string(),
            default_output: "firewall_intensity_map.html".to_string(),
            top_n: Some(400),
            node_sizing: NodeSizing::Combined,
            node_size_range: Some(SizeRange::new(3.0, 15.0)),
            target_size_range: None,
            node_scale_method: NodeScaleMethod::Linear,
            label_threshold: None,
            edge_width_range: Some(SizeRange::new(1.0, 6.0)),
            edge_scale_method: EdgeScaleMethod::SqrtSimple,
            edge_opacity: None,
            scale_arrows_with_edges: false,
            base_arrow_scale: 0.5,
            color_mode: ColorMode::Gradient([0.2, 0.6]),
            use_smooth_gradient: true,
            hostname_labels: HostnameLabels::default(),
            theme: theme("900px", "#0b0e11", "white"),
            physics: Physics {
                gravitational_constant: -20000.0,
                central_gravity: 0.8,
                spring_length: 100.0,
                arrow_scale: 0.4,
                stabilization_iterations: 40,
                ..Physics::default()
            },
        },
        "heatmap" => PresetConfig {
            id: id.to_string(),
            name: "Security Heatmap".to_string(),
            description: "Advanced heatmap with color-coded nodes by intensity".to_string(),
            default_output: "firewall_security_heatmap.html".to_string(),
            top_n: Some(350),
            node_sizing: NodeSizing::Separate,
            node_size_range: Some(SizeRange::new(3.0, 14.0)),
            target_size_range: Some(SizeRange::new(4.0, 15.0)),
            node_scale_method: NodeScaleMethod::Linear,
            label_threshold: None,
            edge_width_range: Some(SizeRange::new(1.0, 7.0)),
            edge_scale_method: EdgeScaleMethod::Linear,
            edge_opacity: None,
            scale_arrows_with_edges: false,
            base_arrow_scale: 0.5,
            color_mode: ColorMode::Heatmap([0.15, 0.4, 0.7]),
            use_smooth_gradient: true,
            hostname_labels: HostnameLabels::default(),
            theme: theme("950px", "#0d1117", "#f0f6fc"),
            physics: Physics {
                gravitational_constant: -40000.0,
                central_gravity: 0.5,
                spring_length: 180.0,
                spring_constant: 0.05,
                damping: 0.4,
                arrow_scale: 0.4,
                stabilization_iterations: 60,
                ..Physics::default()
            },
        },
        "micro" => PresetConfig {
            id: id.to_string(),
            name: "Micro-Scale Heatmap".to_string(),
            description: "Compact visualization with micro-scale nodes for high-density data"
                .to_string(),
            default_output: "firewall_micro_map.html".to_string(),
            top_n: Some(400),
            node_sizing: NodeSizing::Separate,
            node_size_range: Some(SizeRange::new(2.0, 8.0)),
            target_size_range: Some(SizeRange::new(6.0, 6.0)),
            node_scale_method: NodeScaleMethod::Sqrt,
            label_threshold: Some(0.1),
            edge_width_range: Some(SizeRange::new(0.5, 4.0)),
            edge_scale_method: EdgeScaleMethod::Linear,
            edge_opacity: Some(0.4),
            scale_arrows_with_edges: false,
            base_arrow_scale: 0.5,
            color_mode: ColorMode::Heatmap([0.2, 0.5, 0.8]),
            use_smooth_gradient: true,
            hostname_labels: HostnameLabels::default(),
            theme: theme("1280px", "#ffffff", "#8b949e"),
            physics: Physics {
                gravitational_constant: -50000.0,
                central_gravity: 0.3,
                spring_length: 200.0,
                spring_constant: 0.05,
                damping: 0.5,
                arrow_scale: 0.2,
                stabilization_iterations: 50,
                ..Physics::default()
            },
        },
        "balanced" => PresetConfig {
            id: id.to_string(),
            name: "Balanced Clean Map".to_string(),
            description: "Clean readable version with balanced sizing and spacing".to_string(),
            default_output: "firewall_balanced_map.html".to_string(),
            top_n: Some(350),
            node_sizing: NodeSizing::Combined,
            node_size_range: Some(SizeRange::new(3.0, 12.0)),
            target_size_range: None,
            node_scale_method: NodeScaleMethod::Linear,
            label_threshold: None,
            edge_width_range: Some(SizeRange::new(1.0, 6.0)),
            edge_scale_method: EdgeScaleMethod::Linear,
            edge_opacity: None,
            scale_arrows_with_edges: false,
            base_arrow_scale: 0.5,
            color_mode: ColorMode::Gradient([0.2, 0.6]),
            use_smooth_gradient: true,
            hostname_labels: HostnameLabels::default(),
            theme: theme("900px", "#111111", "#ecf0f1"),
            physics: Physics {
                gravitational_constant: -30000.0,
                central_gravity: 0.3,
                spring_length: 150.0,
                spring_constant: 0.05,
                damping: 0.3,
                arrow_scale: 0.3,
                stabilization_iterations: 50,
                ..Physics::default()
            },
        },
        _ => return None,
    };
    Some(preset)
}
