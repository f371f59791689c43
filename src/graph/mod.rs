//! Attack graph construction.
//!
//! Turns aggregated connections into a directed graph whose nodes and edges
//! carry their final visual attributes (size, color, label, tooltip):
//! - Combined sizing pools inbound and outbound hits per address and
//!   log-scales them into one range
//! - Separate sizing scales attackers and targets against their own volumes
//!   and ranges, optionally heat-coloring attackers
//! - Edge width follows the configured scale method, edge color the smooth
//!   gradient unless disabled

pub mod palette;
pub mod scale;

use crate::logs::{attacker_volumes, target_volumes, AggregatedConnection};
use crate::presets::{
    ColorMode, EdgeScaleMethod, NodeScaleMethod, NodeSizing, PresetConfig, SizeRange,
};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

const DEFAULT_COMBINED_RANGE: SizeRange = SizeRange::new(3.0, 15.0);
const DEFAULT_ATTACKER_RANGE: SizeRange = SizeRange::new(6.0, 28.0);
const DEFAULT_TARGET_RANGE: SizeRange = SizeRange::new(8.0, 30.0);
const DEFAULT_EDGE_RANGE: SizeRange = SizeRange::new(1.0, 6.0);

/// Source of resolved hostnames for labels and tooltips.
pub trait HostnameLookup {
    /// Hostname for `ip`, or `ip` itself when unresolved.
    fn hostname<'a>(&'a self, ip: &'a str) -> &'a str;
}

impl HostnameLookup for HashMap<String, String> {
    fn hostname<'a>(&'a self, ip: &'a str) -> &'a str {
        self.get(ip).map(String::as_str).unwrap_or(ip)
    }
}

/// A node keyed by IP address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub size: f64,
    pub color: String,
    pub title: String,
    #[serde(rename = "borderWidth", skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

impl GraphNode {
    fn new(id: &str, label: String, size: f64, color: &str, title: String) -> Self {
        Self {
            id: id.to_string(),
            label,
            size,
            color: color.to_string(),
            title,
            border_width: None,
            border_color: None,
            shape: None,
        }
    }
}

/// A directed edge from attacker to target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub width: f64,
    pub color: String,
    pub title: String,
    /// Per-edge arrow head scale, when arrows follow edge width.
    #[serde(
        rename = "arrows",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_arrows"
    )]
    pub arrow_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

fn serialize_arrows<S: Serializer>(
    scale: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serde_json::json!({ "to": { "enabled": true, "scaleFactor": scale } }).serialize(serializer)
}

/// Directed graph with insertion-ordered nodes and edges.
#[derive(Debug, Clone, Default)]
pub struct AttackGraph {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_index: HashMap<(String, String), usize>,
}

impl AttackGraph {
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&GraphEdge> {
        self.edge_index
            .get(&(from.to_string(), to.to_string()))
            .map(|&i| &self.edges[i])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a node, or update an existing one.
    ///
    /// Required attributes are replaced; optional border and shape attributes
    /// are replaced only when set on `node`.
    pub fn upsert_node(&mut self, node: GraphNode) {
        match self.node_index.get(&node.id) {
            Some(&i) => {
                let existing = &mut self.nodes[i];
                existing.label = node.label;
                existing.size = node.size;
                existing.color = node.color;
                existing.title = node.title;
                if node.border_width.is_some() {
                    existing.border_width = node.border_width;
                }
                if node.border_color.is_some() {
                    existing.border_color = node.border_color;
                }
                if node.shape.is_some() {
                    existing.shape = node.shape;
                }
            }
            None => {
                self.node_index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Insert an edge; an existing edge for the same pair is overwritten.
    pub fn upsert_edge(&mut self, edge: GraphEdge) {
        let key = (edge.from.clone(), edge.to.clone());
        match self.edge_index.get(&key) {
            Some(&i) => self.edges[i] = edge,
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(edge);
            }
        }
    }
}

/// Precomputed node volumes for the configured sizing mode.
enum Volumes<'a> {
    Combined {
        pooled: HashMap<&'a str, u64>,
        min: u64,
        max: u64,
    },
    Separate {
        attackers: HashMap<&'a str, u64>,
        targets: HashMap<&'a str, u64>,
        max_attacker: u64,
        max_target: u64,
    },
}

impl<'a> Volumes<'a> {
    fn compute(sizing: NodeSizing, connections: &'a [AggregatedConnection]) -> Self {
        let attackers = attacker_volumes(connections);
        let targets = target_volumes(connections);
        match sizing {
            NodeSizing::Combined => {
                let mut pooled = attackers;
                for (ip, hits) in targets {
                    let v = pooled.entry(ip).or_insert(0);
                    *v = v.saturating_add(hits);
                }
                let min = pooled.values().copied().min().unwrap_or(0);
                let max = pooled.values().copied().max().unwrap_or(0);
                Volumes::Combined { pooled, min, max }
            }
            NodeSizing::Separate => {
                let max_attacker = attackers.values().copied().max().unwrap_or(0);
                let max_target = targets.values().copied().max().unwrap_or(0);
                Volumes::Separate {
                    attackers,
                    targets,
                    max_attacker,
                    max_target,
                }
            }
        }
    }
}

/// Builds an [`AttackGraph`] from aggregated connections.
pub struct GraphBuilder<'c> {
    config: &'c PresetConfig,
    hostnames: Option<&'c dyn HostnameLookup>,
}

impl<'c> GraphBuilder<'c> {
    pub fn new(config: &'c PresetConfig) -> Self {
        Self {
            config,
            hostnames: None,
        }
    }

    pub fn with_hostnames(mut self, lookup: &'c dyn HostnameLookup) -> Self {
        self.hostnames = Some(lookup);
        self
    }

    /// Build the graph. Connection pairs are expected to be unique.
    pub fn build(&self, connections: &[AggregatedConnection]) -> AttackGraph {
        let mut graph = AttackGraph::default();
        if connections.is_empty() {
            return graph;
        }

        let min_hits = connections.iter().map(|c| c.hits).min().unwrap_or(0) as f64;
        let max_hits = connections.iter().map(|c| c.hits).max().unwrap_or(0) as f64;
        let volumes = Volumes::compute(self.config.node_sizing, connections);

        for conn in connections {
            match &volumes {
                Volumes::Combined { pooled, min, max } => {
                    self.add_combined_nodes(&mut graph, conn, pooled, *min, *max);
                }
                Volumes::Separate {
                    attackers,
                    targets,
                    max_attacker,
                    max_target,
                } => {
                    let src_vol = attackers.get(conn.source_ip.as_str()).copied().unwrap_or(0);
                    let dst_vol = targets
                        .get(conn.destination_ip.as_str())
                        .copied()
                        .unwrap_or(0);
                    graph.upsert_node(self.attacker_node_separate(conn, src_vol, *max_attacker));
                    graph.upsert_node(self.target_node_separate(
                        &conn.destination_ip,
                        dst_vol,
                        *max_target,
                    ));
                }
            }
            graph.upsert_edge(self.edge(conn, min_hits, max_hits));
        }

        tracing::info!(
            preset = %self.config.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph built"
        );
        graph
    }

    fn add_combined_nodes(
        &self,
        graph: &mut AttackGraph,
        conn: &AggregatedConnection,
        pooled: &HashMap<&str, u64>,
        min: u64,
        max: u64,
    ) {
        let range = self.config.node_size_range.unwrap_or(DEFAULT_COMBINED_RANGE);
        let size = |ip: &str| {
            let vol = pooled.get(ip).copied().unwrap_or(0);
            (
                vol,
                scale::log_range(vol as f64, min as f64, max as f64, range.min, range.max),
            )
        };

        let src = conn.source_ip.as_str();
        let (src_vol, src_size) = size(src);
        let src_host = self.hostname(src);
        let title = attacker_title(src, src_host, &conn.source_country, src_vol);
        graph.upsert_node(GraphNode::new(
            src,
            self.label(src, src_host),
            src_size,
            palette::ATTACKER_GRAY,
            title,
        ));

        let dst = conn.destination_ip.as_str();
        let (dst_vol, dst_size) = size(dst);
        let dst_host = self.hostname(dst);
        graph.upsert_node(GraphNode::new(
            dst,
            self.label(dst, dst_host),
            dst_size,
            palette::TARGET_BLUE,
            target_title(dst, dst_host, "Total Hits", dst_vol),
        ));
    }

    fn attacker_node_separate(
        &self,
        conn: &AggregatedConnection,
        volume: u64,
        max_volume: u64,
    ) -> GraphNode {
        let range = self.config.node_size_range.unwrap_or(DEFAULT_ATTACKER_RANGE);
        let size = self.scale_node(volume, max_volume, range);

        let color = match self.config.color_mode {
            ColorMode::Heatmap(thresholds) => {
                palette::heatmap(volume as f64, max_volume as f64, thresholds)
            }
            ColorMode::Gradient(_) => palette::ATTACKER_GRAY,
        };

        let ip = conn.source_ip.as_str();
        let host = self.hostname(ip);
        let label = match self.config.label_threshold.filter(|t| *t > 0.0) {
            Some(t) if volume as f64 <= max_volume as f64 * t => String::new(),
            _ => self.label(ip, host),
        };

        let mut node = GraphNode::new(
            ip,
            label,
            size,
            color,
            attacker_title(ip, host, &conn.source_country, volume),
        );
        node.border_width = Some(2);
        node.shape = Some("dot".to_string());
        node
    }

    fn target_node_separate(&self, ip: &str, volume: u64, max_volume: u64) -> GraphNode {
        let range = self.config.target_size_range.unwrap_or(DEFAULT_TARGET_RANGE);
        let size = self.scale_node(volume, max_volume, range);
        let host = self.hostname(ip);

        let mut node = GraphNode::new(
            ip,
            self.label(ip, host),
            size,
            palette::TARGET_DARK,
            target_title(ip, host, "Incoming Hits", volume),
        );
        node.border_width = Some(3);
        node.border_color = Some(palette::TARGET_BLUE.to_string());
        node
    }

    /// Separate sizing scales against `[0, max_volume]`.
    fn scale_node(&self, volume: u64, max_volume: u64, range: SizeRange) -> f64 {
        let (v, max) = (volume as f64, max_volume as f64);
        match self.config.node_scale_method {
            NodeScaleMethod::Sqrt => scale::sqrt(v, 0.0, max, range.min, range.max),
            NodeScaleMethod::Linear => scale::linear(v, 0.0, max, range.min, range.max),
        }
    }

    fn edge(&self, conn: &AggregatedConnection, min_hits: f64, max_hits: f64) -> GraphEdge {
        let range = self.config.edge_width_range.unwrap_or(DEFAULT_EDGE_RANGE);
        let hits = conn.hits as f64;

        let width = match self.config.edge_scale_method {
            EdgeScaleMethod::SqrtSimple => {
                scale::sqrt(hits, min_hits, max_hits, range.min, range.max)
            }
            EdgeScaleMethod::Linear => {
                scale::linear(hits, min_hits, max_hits, range.min, range.max)
            }
        };

        let color = if self.config.use_smooth_gradient {
            palette::smooth_gradient(hits, min_hits, max_hits)
        } else {
            match self.config.color_mode {
                ColorMode::Heatmap(t) => palette::heatmap(hits, max_hits, t).to_string(),
                ColorMode::Gradient(t) => palette::threshold_gradient(hits, max_hits, t).to_string(),
            }
        };

        let arrow_scale = self.config.scale_arrows_with_edges.then(|| {
            let ratio = if range.min > 0.0 { width / range.min } else { 1.0 };
            self.config.base_arrow_scale * ratio
        });

        GraphEdge {
            from: conn.source_ip.clone(),
            to: conn.destination_ip.clone(),
            width,
            color,
            title: format!("Hits: {}\nType: {}", conn.hits, conn.classification),
            arrow_scale,
            opacity: self.config.edge_opacity.filter(|o| *o != 0.0),
        }
    }

    fn hostname<'a>(&'a self, ip: &'a str) -> &'a str {
        match self.hostnames {
            Some(lookup) => lookup.hostname(ip),
            None => ip,
        }
    }

    /// Label per hostname settings; the raw IP unless a distinct hostname is known.
    fn label(&self, ip: &str, hostname: &str) -> String {
        let settings = self.config.hostname_labels;
        if self.hostnames.is_none() || hostname == ip || !settings.show_in_labels {
            return ip.to_string();
        }
        if settings.prefer_hostname {
            hostname.to_string()
        } else if settings.show_both {
            format!("{ip}\n{hostname}")
        } else {
            ip.to_string()
        }
    }
}

fn attacker_title(ip: &str, hostname: &str, country: &str, volume: u64) -> String {
    let mut title = format!("ATTACKER: {ip}");
    if hostname != ip {
        title.push_str(&format!("\nHostname: {hostname}"));
    }
    title.push_str(&format!("\nCountry: {country}\nTotal Hits: {volume}"));
    title
}

fn target_title(ip: &str, hostname: &str, volume_label: &str, volume: u64) -> String {
    let mut title = format!("TARGET: {ip}");
    if hostname != ip {
        title.push_str(&format!("\nHostname: {hostname}"));
    }
    title.push_str(&format!("\n{volume_label}: {volume}"));
    title
}
