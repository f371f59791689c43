//! Firegraph CLI - render attack graphs and risk reports from firewall logs.

use anyhow::{Context, Result};
use clap::Parser;
use firegraph::config::{GlobalSettings, DEFAULT_CONFIG_FILE};
use firegraph::generators::{output_path, Generator, HtmlGenerator};
use firegraph::graph::GraphBuilder;
use firegraph::hostnames::{HostnameResolver, ResolveOptions};
use firegraph::presets::{get_preset, list_presets, PRESET_IDS};
use firegraph::{logs, risk};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

const RULE: &str = "============================================================";

#[derive(Parser)]
#[command(name = "firegraph")]
#[command(about = "Interactive attack graphs and risk reports from firewall logs")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Render one preset, or all of them, to HTML
    Render {
        /// Input CSV file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output HTML file (only used when rendering a single preset)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preset id, or "all"
        #[arg(short, long, default_value = "all")]
        preset: String,

        /// Keep only the N heaviest connections
        #[arg(long)]
        top_n: Option<usize>,

        /// Risk report CSV path
        #[arg(long)]
        risk_report: Option<PathBuf>,

        /// Print the N highest-risk sources
        #[arg(long, value_name = "N")]
        top_attackers: Option<usize>,

        /// Resolve addresses to hostnames for labels and tooltips
        #[arg(long)]
        resolve_hostnames: bool,

        /// Only resolve private addresses (implies --resolve-hostnames)
        #[arg(long)]
        resolve_internal_only: bool,
    },

    /// List available presets
    Presets,

    /// Resolve every address in the input and fill the hostname cache
    PreCache {
        /// Input CSV file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Delete the hostname cache
    ClearCache,

    /// Show hostname cache statistics
    CacheStats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "firegraph=info"
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = GlobalSettings::load(&cli.config);

    match cli.command {
        Commands::Render {
            input,
            output,
            preset,
            top_n,
            risk_report,
            top_attackers,
            resolve_hostnames,
            resolve_internal_only,
        } => {
            let presets: Vec<String> = if preset == "all" {
                PRESET_IDS.iter().map(|p| p.to_string()).collect()
            } else {
                vec![preset]
            };
            // Reject unknown names before doing any work
            let presets = presets
                .iter()
                .map(|id| get_preset(id))
                .collect::<firegraph::Result<Vec<_>>>()?;

            let mut resolver = None;
            if resolve_hostnames || resolve_internal_only {
                println!("Hostname resolution enabled");
                resolver = Some(HostnameResolver::open(&settings.hostnames));
            }

            let input = input.unwrap_or_else(|| settings.default_input.clone());
            println!("Loading firewall data...");
            let records = logs::load_csv(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;

            if let Some(resolver) = resolver.as_mut() {
                let options = ResolveOptions::render(&settings.hostnames, resolve_internal_only);
                resolver
                    .resolve_batch(&logs::unique_ips(&records), &options)
                    .await;
                let stats = resolver.resolution_stats();
                println!("Resolution complete!");
                println!("  Cache hits: {}", stats.cache_hits);
                println!("  New resolutions: {}", stats.resolved);
                println!("  Failed: {}", stats.failed);
                println!();
            }

            let report = risk::score(&records);
            let report_path = risk_report.unwrap_or_else(|| settings.default_risk_report.clone());
            risk::write_report(&report, &report_path)
                .with_context(|| format!("failed to write {}", report_path.display()))?;
            println!("Risk report: {} ({} sources)", report_path.display(), report.len());

            if let Some(n) = top_attackers.filter(|n| *n > 0) {
                println!("\nTop {n} Attackers (for firewall blocking):");
                for (i, r) in risk::top_attackers(&report, n).iter().enumerate() {
                    println!("  {:2}. {:15} (Risk Score: {})", i + 1, r.source_ip, r.risk_score);
                }
                println!();
            }

            let single = presets.len() == 1;
            for base in &presets {
                println!("\n{RULE}");
                println!("Generating preset: {}", base.id);
                println!("{RULE}");

                let mut config = settings
                    .apply_to_preset(base)
                    .with_context(|| format!("invalid settings for preset '{}'", base.id))?;
                if top_n.is_some() {
                    config.top_n = top_n;
                }

                let gen = HtmlGenerator::new(&config);
                let out = match &output {
                    Some(path) if single => path.clone(),
                    _ => output_path(&gen, &config.default_output),
                };

                match config.top_n {
                    Some(n) if n > 0 => println!("Top N connections: {n}"),
                    _ => println!("Top N connections: all"),
                }
                let connections = logs::aggregate(&records, config.top_n);
                println!("Visualizing {} connections", connections.len());

                let mut builder = GraphBuilder::new(&config);
                if let Some(resolver) = resolver.as_ref() {
                    builder = builder.with_hostnames(resolver);
                }
                let graph = builder.build(&connections);
                println!(
                    "Graph: {} nodes, {} edges",
                    graph.node_count(),
                    graph.edge_count()
                );

                let page = gen.generate(&graph)?;
                fs::write(&out, page)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Generated ({}): {}", gen.name(), out.display());
            }

            println!("\n{RULE}");
            println!("All done! Generated {} visualization(s).", presets.len());
            println!("{RULE}");
        }

        Commands::Presets => {
            println!("Available Visualization Presets:\n");
            for (id, description) in list_presets() {
                println!("  {id:12} - {description}");
            }
        }

        Commands::PreCache { input } => {
            let input = input.unwrap_or_else(|| settings.default_input.clone());
            println!("Pre-caching hostnames for all IPs...\n");
            let records = logs::load_csv(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;

            let mut resolver = HostnameResolver::open(&settings.hostnames);
            let options = ResolveOptions::pre_cache(&settings.hostnames);
            resolver
                .resolve_batch(&logs::unique_ips(&records), &options)
                .await;

            let stats = resolver.stats();
            println!("\nPre-caching complete!");
            println!("  Total cached: {}", stats.total);
            println!("  Internal IPs: {}", stats.internal);
            println!("  External IPs: {}", stats.external);
        }

        Commands::ClearCache => {
            let mut resolver = HostnameResolver::open(&settings.hostnames);
            resolver
                .clear_cache()
                .context("failed to clear hostname cache")?;
            println!("Hostname cache cleared");
        }

        Commands::CacheStats => {
            let stats = HostnameResolver::open(&settings.hostnames).stats();
            println!("\nHostname Cache Statistics:");
            println!("  Total cached: {}", stats.total);
            println!("  Internal IPs: {}", stats.internal);
            println!("  External IPs: {}", stats.external);
            println!("  Failed resolutions: {}", stats.failed);
            println!("  Cache file: {}", stats.cache_file.display());
            println!("  Cache exists: {}", stats.exists);
        }
    }

    Ok(())
}
