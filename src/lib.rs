//! Firegraph - interactive attack graphs from firewall connection logs.
//!
//! Logs are aggregated into attacker to target connections, styled by a
//! named preset layered with global settings, and rendered as a
//! force-directed HTML page. A risk report ranks source addresses, and an
//! optional reverse-DNS cache labels nodes with hostnames.

pub mod config;
pub mod error;
pub mod generators;
pub mod graph;
pub mod hostnames;
pub mod logs;
pub mod presets;
pub mod risk;

pub use config::GlobalSettings;
pub use error::{FiregraphError, Result};
pub use generators::{Generator, HtmlGenerator};
pub use graph::{AttackGraph, GraphBuilder, HostnameLookup};
pub use hostnames::{HostnameResolver, ResolveOptions};
pub use logs::{AggregatedConnection, LogRecord};
pub use presets::{get_preset, list_presets, PresetConfig, PRESET_IDS};
pub use risk::RiskRecord;
