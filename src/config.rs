//! Global settings and their overlay onto presets.
//!
//! Settings are loaded from a YAML/TOML/JSON file (format by extension) with
//! `FIREGRAPH__*` environment variable overrides. A missing or broken file
//! degrades to built-in defaults.

use crate::error::Result;
use crate::presets::{
    ColorMode, ColorModeName, EdgeScaleMethod, NodeScaleMethod, NodeSizing, PresetConfig,
    SizeRange, PRESET_IDS,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_multiplier")]
    pub node_size_multiplier: f64,

    #[serde(default = "default_multiplier")]
    pub edge_width_multiplier: f64,

    #[serde(default = "default_input")]
    pub default_input: PathBuf,

    #[serde(default = "default_risk_report")]
    pub default_risk_report: PathBuf,

    /// Per-preset overrides keyed by preset id.
    #[serde(default)]
    pub presets: BTreeMap<String, PresetOverride>,

    #[serde(default)]
    pub physics: Option<PhysicsOverride>,

    #[serde(default)]
    pub theme: Option<ThemeOverride>,

    #[serde(default)]
    pub canvas: Option<CanvasOverride>,

    #[serde(default)]
    pub node_settings: Option<NodeSettings>,

    #[serde(default)]
    pub edge_settings: Option<EdgeSettings>,

    #[serde(default = "default_hostname_labels")]
    pub hostname_labels: Option<HostnameLabelsOverride>,

    #[serde(default)]
    pub hostnames: HostnameSettings,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            node_size_multiplier: default_multiplier(),
            edge_width_multiplier: default_multiplier(),
            default_input: default_input(),
            default_risk_report: default_risk_report(),
            presets: BTreeMap::new(),
            physics: None,
            theme: None,
            canvas: None,
            node_settings: None,
            edge_settings: None,
            hostname_labels: default_hostname_labels(),
            hostnames: HostnameSettings::default(),
        }
    }
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_input() -> PathBuf {
    PathBuf::from("sophos_data.csv")
}

fn default_risk_report() -> PathBuf {
    PathBuf::from("high_risk_attackers.csv")
}

fn default_hostname_labels() -> Option<HostnameLabelsOverride> {
    Some(HostnameLabelsOverride {
        show_in_labels: Some(false),
        prefer_hostname: Some(false),
        show_both: Some(false),
    })
}

/// Fields a `presets.<id>` section may replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresetOverride {
    pub top_n: Option<usize>,
    pub default_output: Option<String>,
    pub node_sizing: Option<NodeSizing>,
    pub node_size_range: Option<SizeRange>,
    pub target_size_range: Option<SizeRange>,
    pub node_scale_method: Option<NodeScaleMethod>,
    pub label_threshold: Option<f64>,
    pub edge_width_range: Option<SizeRange>,
    pub edge_scale_method: Option<EdgeScaleMethod>,
    pub edge_opacity: Option<f64>,
    pub color_mode: Option<ColorModeName>,
    pub color_thresholds: Option<Vec<f64>>,
    pub use_smooth_gradient: Option<bool>,
    pub scale_arrows_with_edges: Option<bool>,
    pub base_arrow_scale: Option<f64>,
    pub physics: Option<PhysicsOverride>,
    pub theme: Option<ThemeOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhysicsOverride {
    pub gravitational_constant: Option<f64>,
    pub central_gravity: Option<f64>,
    pub spring_length: Option<f64>,
    pub spring_constant: Option<f64>,
    pub damping: Option<f64>,
    pub stabilization_iterations: Option<u32>,
    pub edge_smooth: Option<bool>,
    pub edge_smooth_type: Option<String>,
    pub edge_roundness: Option<f64>,
    pub arrow_scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeOverride {
    pub height: Option<String>,
    pub width: Option<String>,
    pub bgcolor: Option<String>,
    pub font_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasOverride {
    pub height: Option<String>,
    pub width: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSettings {
    pub default_size_range: Option<SizeRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeSettings {
    pub default_width_range: Option<SizeRange>,
    pub opacity: Option<f64>,
    pub scale_arrows_with_edges: Option<bool>,
    pub base_arrow_scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostnameLabelsOverride {
    pub show_in_labels: Option<bool>,
    pub prefer_hostname: Option<bool>,
    pub show_both: Option<bool>,
}

/// Reverse-DNS cache and worker pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HostnameSettings {
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-lookup timeout in seconds during rendering.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Per-lookup timeout in seconds for `pre-cache`.
    #[serde(default = "default_pre_cache_timeout")]
    pub pre_cache_timeout: f64,
}

impl Default for HostnameSettings {
    fn default() -> Self {
        Self {
            cache_file: default_cache_file(),
            cache_ttl_days: default_cache_ttl_days(),
            max_workers: default_max_workers(),
            timeout: default_timeout(),
            pre_cache_timeout: default_pre_cache_timeout(),
        }
    }
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(".hostname_cache.json")
}

fn default_cache_ttl_days() -> i64 {
    7
}

fn default_max_workers() -> usize {
    50
}

fn default_timeout() -> f64 {
    1.0
}

fn default_pre_cache_timeout() -> f64 {
    2.0
}

fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

impl GlobalSettings {
    /// Load settings from `path` layered with environment overrides.
    ///
    /// Never fails: parse or shape errors are logged and defaults returned.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
        }

        let built = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("FIREGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build();

        match built.and_then(|c| c.try_deserialize::<GlobalSettings>()) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "error loading config, using defaults");
                Self::default()
            }
        }
    }

    /// Find the override bundle for a preset.
    ///
    /// A key equal to the preset id wins. Otherwise the first key (sorted)
    /// naming a registered preset that is a substring of the preset's
    /// normalized name, or contains it, is used.
    pub fn override_for(&self, preset: &PresetConfig) -> Option<(&str, &PresetOverride)> {
        if let Some((key, o)) = self.presets.get_key_value(&preset.id) {
            return Some((key.as_str(), o));
        }
        let name = preset.normalized_name();
        self.presets
            .iter()
            .filter(|(key, _)| PRESET_IDS.contains(&key.as_str()))
            .find(|(key, _)| name.contains(key.as_str()) || key.contains(name.as_str()))
            .map(|(key, o)| (key.as_str(), o))
    }

    /// Resolve a preset against these settings.
    ///
    /// The preset is copied, never modified. The result is validated before
    /// it is returned.
    pub fn apply_to_preset(&self, preset: &PresetConfig) -> Result<PresetConfig> {
        let mut config = preset.clone();

        let node_mult = self.node_size_multiplier;
        config.node_size_range = config.node_size_range.map(|r| r.scaled(node_mult, Some(1.0)));
        config.target_size_range = config
            .target_size_range
            .map(|r| r.scaled(node_mult, Some(1.0)));
        config.edge_width_range = config
            .edge_width_range
            .map(|r| r.scaled(self.edge_width_multiplier, None));

        if let Some((key, o)) = self.override_for(preset) {
            tracing::debug!(preset = %preset.id, key, "applying preset override");
            o.apply(&mut config)?;
        }

        if let Some(physics) = &self.physics {
            physics.apply(&mut config);
        }
        if let Some(theme) = &self.theme {
            theme.apply(&mut config);
        }
        if let Some(canvas) = &self.canvas {
            merge(&mut config.theme.height, &canvas.height);
            merge(&mut config.theme.width, &canvas.width);
        }

        if let Some(nodes) = &self.node_settings {
            if config.node_size_range.is_none() {
                config.node_size_range = nodes.default_size_range;
            }
        }

        if let Some(edges) = &self.edge_settings {
            if config.edge_width_range.is_none() {
                config.edge_width_range = edges.default_width_range;
            }
            if config.edge_opacity.is_none() {
                config.edge_opacity = edges.opacity;
            }
            merge(
                &mut config.scale_arrows_with_edges,
                &edges.scale_arrows_with_edges,
            );
            merge(&mut config.base_arrow_scale, &edges.base_arrow_scale);
        }

        if let Some(labels) = &self.hostname_labels {
            let target = &mut config.hostname_labels;
            merge(&mut target.show_in_labels, &labels.show_in_labels);
            merge(&mut target.prefer_hostname, &labels.prefer_hostname);
            merge(&mut target.show_both, &labels.show_both);
        }

        config.validate()?;
        Ok(config)
    }
}

impl PresetOverride {
    fn apply(&self, config: &mut PresetConfig) -> Result<()> {
        if self.top_n.is_some() {
            config.top_n = self.top_n;
        }
        merge(&mut config.default_output, &self.default_output);
        merge(&mut config.node_sizing, &self.node_sizing);
        if self.node_size_range.is_some() {
            config.node_size_range = self.node_size_range;
        }
        if self.target_size_range.is_some() {
            config.target_size_range = self.target_size_range;
        }
        merge(&mut config.node_scale_method, &self.node_scale_method);
        if self.label_threshold.is_some() {
            config.label_threshold = self.label_threshold;
        }
        if self.edge_width_range.is_some() {
            config.edge_width_range = self.edge_width_range;
        }
        merge(&mut config.edge_scale_method, &self.edge_scale_method);
        if self.edge_opacity.is_some() {
            config.edge_opacity = self.edge_opacity;
        }
        merge(&mut config.use_smooth_gradient, &self.use_smooth_gradient);
        merge(
            &mut config.scale_arrows_with_edges,
            &self.scale_arrows_with_edges,
        );
        merge(&mut config.base_arrow_scale, &self.base_arrow_scale);

        if self.color_mode.is_some() || self.color_thresholds.is_some() {
            let name = self.color_mode.unwrap_or_else(|| config.color_mode.name());
            let thresholds = match &self.color_thresholds {
                Some(t) => Some(t.as_slice()),
                // Same mode keeps its preset thresholds
                None if name == config.color_mode.name() => {
                    Some(config.color_mode.thresholds())
                }
                None => None,
            };
            config.color_mode = ColorMode::from_parts(name, thresholds)?;
        }

        if let Some(physics) = &self.physics {
            physics.apply(config);
        }
        if let Some(theme) = &self.theme {
            theme.apply(config);
        }
        Ok(())
    }
}

impl PhysicsOverride {
    fn apply(&self, config: &mut PresetConfig) {
        let p = &mut config.physics;
        merge(&mut p.gravitational_constant, &self.gravitational_constant);
        merge(&mut p.central_gravity, &self.central_gravity);
        merge(&mut p.spring_length, &self.spring_length);
        merge(&mut p.spring_constant, &self.spring_constant);
        merge(&mut p.damping, &self.damping);
        merge(
            &mut p.stabilization_iterations,
            &self.stabilization_iterations,
        );
        merge(&mut p.edge_smooth, &self.edge_smooth);
        merge(&mut p.edge_smooth_type, &self.edge_smooth_type);
        merge(&mut p.edge_roundness, &self.edge_roundness);
        merge(&mut p.arrow_scale, &self.arrow_scale);
    }
}

impl ThemeOverride {
    fn apply(&self, config: &mut PresetConfig) {
        let t = &mut config.theme;
        merge(&mut t.height, &self.height);
        merge(&mut t.width, &self.width);
        merge(&mut t.bgcolor, &self.bgcolor);
        merge(&mut t.font_color, &self.font_color);
    }
}
