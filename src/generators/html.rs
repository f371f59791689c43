//! Interactive HTML output.
//!
//! Produces a single self-contained page that loads vis-network from a CDN
//! and lets its Barnes-Hut solver lay out the graph. Node and edge data are
//! embedded as JSON; physics and edge styling come from the preset.

use crate::error::Result;
use crate::generators::Generator;
use crate::graph::AttackGraph;
use crate::presets::{Physics, PresetConfig, Theme};
use serde_json::{json, Value};

const VIS_NETWORK_JS: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

/// Milliseconds before a hover tooltip appears.
const TOOLTIP_DELAY_MS: u32 = 100;

/// Renders an attack graph as a vis-network page.
pub struct HtmlGenerator {
    title: String,
    theme: Theme,
    physics: Physics,
}

impl HtmlGenerator {
    pub fn new(preset: &PresetConfig) -> Self {
        Self {
            title: preset.name.clone(),
            theme: preset.theme.clone(),
            physics: preset.physics.clone(),
        }
    }

    /// Network options object handed to `vis.Network`.
    pub fn options(&self) -> Value {
        let p = &self.physics;
        let smooth = if p.edge_smooth {
            json!({
                "enabled": true,
                "type": p.edge_smooth_type,
                "roundness": p.edge_roundness,
            })
        } else {
            Value::Bool(false)
        };

        json!({
            "edges": {
                "smooth": smooth,
                "arrows": { "to": { "enabled": true, "scaleFactor": p.arrow_scale } },
                "color": { "inherit": false },
            },
            "physics": {
                "barnesHut": {
                    "gravitationalConstant": p.gravitational_constant,
                    "centralGravity": p.central_gravity,
                    "springLength": p.spring_length,
                    "springConstant": p.spring_constant,
                    "damping": p.damping,
                },
                "stabilization": { "enabled": true, "iterations": p.stabilization_iterations },
            },
            "interaction": {
                "tooltipDelay": TOOLTIP_DELAY_MS,
                "hideEdgesOnDrag": false,
            },
        })
    }
}

impl Generator for HtmlGenerator {
    fn name(&self) -> &'static str {
        "html"
    }

    fn generate(&self, graph: &AttackGraph) -> Result<String> {
        let nodes = script_json(&serde_json::to_string(graph.nodes())?);
        let edges = script_json(&serde_json::to_string(graph.edges())?);
        let options = script_json(&serde_json::to_string(&self.options())?);
        let theme = &self.theme;
        let font = script_json(&serde_json::to_string(&theme.font_color)?);

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "rendering html"
        );

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{vis}"></script>
<style>
  html, body {{ margin: 0; padding: 0; background-color: {bg}; }}
  #graph {{ height: {height}; width: {width}; background-color: {bg}; }}
</style>
</head>
<body>
<div id="graph"></div>
<script>
  function tooltip(text) {{
    const el = document.createElement("div");
    el.style.whiteSpace = "pre-wrap";
    el.innerText = text;
    return el;
  }}
  const nodes = {nodes}.map(n => Object.assign(n, {{
    title: tooltip(n.title),
    font: {{ color: {font} }},
  }}));
  const edges = {edges}.map(e => {{
    e.title = tooltip(e.title);
    if (e.opacity !== undefined) {{
      e.color = {{ color: e.color, opacity: e.opacity }};
      delete e.opacity;
    }}
    return e;
  }});
  const data = {{ nodes: new vis.DataSet(nodes), edges: new vis.DataSet(edges) }};
  const options = {options};
  new vis.Network(document.getElementById("graph"), data, options);
</script>
</body>
</html>
"#,
            title = escape_html(&self.title),
            vis = VIS_NETWORK_JS,
            bg = escape_html(&theme.bgcolor),
            height = escape_html(&theme.height),
            width = escape_html(&theme.width),
            font = font,
            nodes = nodes,
            edges = edges,
            options = options,
        ))
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}

/// Keep embedded JSON from closing the surrounding script element.
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::output_path;
    use crate::graph::GraphBuilder;
    use crate::logs::{aggregate, LogRecord};
    use crate::presets::get_preset;

    fn rendered(preset: &PresetConfig) -> String {
        let records = vec![
            LogRecord::new("A", "B", 10).with_origin("US", "Scan"),
            LogRecord::new("A", "C", 5).with_origin("US", "Exploit"),
            LogRecord::new("B", "C", 2).with_origin("DE", "Scan"),
        ];
        let graph = GraphBuilder::new(preset).build(&aggregate(&records, None));
        HtmlGenerator::new(preset).generate(&graph).unwrap()
    }

    #[test]
    fn test_page_embeds_graph_and_theme() {
        let preset = get_preset("balanced").unwrap();
        let html = rendered(&preset);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(VIS_NETWORK_JS));
        assert!(html.contains(&preset.theme.bgcolor));
        assert!(html.contains(r#""id":"A""#));
        assert!(html.contains(r#""from":"B","to":"C""#));
        assert!(html.contains("new vis.Network"));
    }

    #[test]
    fn test_options_follow_physics() {
        let mut preset = get_preset("intensity").unwrap();
        preset.physics.edge_smooth = false;
        preset.physics.gravitational_constant = -1234.0;
        preset.physics.stabilization_iterations = 77;
        let options = HtmlGenerator::new(&preset).options();

        assert_eq!(options["edges"]["smooth"], Value::Bool(false));
        assert_eq!(
            options["physics"]["barnesHut"]["gravitationalConstant"],
            -1234.0
        );
        assert_eq!(options["physics"]["stabilization"]["iterations"], 77);
        assert_eq!(options["interaction"]["tooltipDelay"], 100);
        assert_eq!(options["edges"]["color"]["inherit"], false);
    }

    #[test]
    fn test_smooth_edges_carry_type_and_roundness() {
        let mut preset = get_preset("intensity").unwrap();
        preset.physics.edge_smooth = true;
        preset.physics.edge_smooth_type = "curvedCW".to_string();
        preset.physics.edge_roundness = 0.25;
        let options = HtmlGenerator::new(&preset).options();

        assert_eq!(options["edges"]["smooth"]["enabled"], true);
        assert_eq!(options["edges"]["smooth"]["type"], "curvedCW");
        assert_eq!(options["edges"]["smooth"]["roundness"], 0.25);
        assert_eq!(
            options["edges"]["arrows"]["to"]["scaleFactor"],
            preset.physics.arrow_scale
        );
    }

    #[test]
    fn test_markup_is_escaped() {
        let mut preset = get_preset("micro").unwrap();
        preset.name = "<b>x</b>".to_string();
        let html = rendered(&preset);
        assert!(html.contains("<title>&lt;b&gt;x&lt;/b&gt;</title>"));
        assert_eq!(script_json(r#"{"t":"</script>"}"#), r#"{"t":"<\/script>"}"#);
    }

    #[test]
    fn test_font_color_is_a_json_string() {
        let mut preset = get_preset("balanced").unwrap();
        preset.theme.font_color = "a\\b\n\"c".to_string();
        let html = rendered(&preset);
        assert!(html.contains(r#"font: { color: "a\\b\n\"c" }"#));
    }

    #[test]
    fn test_output_path_uses_extension() {
        let preset = get_preset("micro").unwrap();
        let gen = HtmlGenerator::new(&preset);
        assert_eq!(gen.name(), "html");
        assert_eq!(
            output_path(&gen, "maps/firewall_micro_map"),
            std::path::PathBuf::from("maps/firewall_micro_map.html")
        );
        assert_eq!(
            output_path(&gen, "firewall_micro_map.htm"),
            std::path::PathBuf::from("firewall_micro_map.html")
        );
    }

    #[test]
    fn test_empty_graph_renders() {
        let preset = get_preset("heatmap").unwrap();
        let html = HtmlGenerator::new(&preset)
            .generate(&AttackGraph::default())
            .unwrap();
        assert!(html.contains("const nodes = [].map"));
    }
}
