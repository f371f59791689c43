//! Per-source risk ranking.
//!
//! Risk score = total hits + 10 × distinct destinations, so wide scanners
//! outrank sources that hammer a single host. Sums saturate at `u64::MAX`.

use crate::error::Result;
use crate::logs::LogRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Weight of each distinct destination in the risk score.
pub const TARGET_WEIGHT: u64 = 10;

/// Classification reported for a source with no labeled rows.
pub const DEFAULT_CLASSIFICATION: &str = "Misc";

/// One ranked source address, serialized as a report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskRecord {
    #[serde(rename = "Source IP")]
    pub source_ip: String,
    #[serde(rename = "Hits")]
    pub total_hits: u64,
    #[serde(rename = "Destination IP")]
    pub unique_targets: usize,
    #[serde(rename = "Source Country")]
    pub source_country: String,
    #[serde(rename = "Classification")]
    pub classification: String,
    #[serde(rename = "Risk Score")]
    pub risk_score: u64,
}

#[derive(Default)]
struct SourceStats<'a> {
    hits: u64,
    targets: HashSet<&'a str>,
    country: &'a str,
    /// Classification counts in first-seen order.
    classes: Vec<(&'a str, usize)>,
}

impl<'a> SourceStats<'a> {
    fn add(&mut self, record: &'a LogRecord) {
        self.hits = self.hits.saturating_add(record.hits);
        self.targets.insert(&record.destination_ip);
        let class = record.classification.as_str();
        match self.classes.iter_mut().find(|(c, _)| *c == class) {
            Some((_, n)) => *n += 1,
            None => self.classes.push((class, 1)),
        }
    }

    /// Most frequent classification; ties go to the one seen first.
    fn dominant_class(&self) -> &'a str {
        let mut best: Option<(&'a str, usize)> = None;
        for &(class, count) in &self.classes {
            if best.map_or(true, |(_, n)| count > n) {
                best = Some((class, count));
            }
        }
        best.map_or(DEFAULT_CLASSIFICATION, |(c, _)| c)
    }
}

/// Rank sources by risk score, highest first.
///
/// Sources with equal scores keep the order in which they first appear.
pub fn score(records: &[LogRecord]) -> Vec<RiskRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut stats: HashMap<&str, SourceStats> = HashMap::new();
    for r in records {
        let entry = stats.entry(r.source_ip.as_str()).or_insert_with(|| {
            order.push(r.source_ip.as_str());
            SourceStats {
                country: &r.source_country,
                ..SourceStats::default()
            }
        });
        entry.add(r);
    }

    let mut report: Vec<RiskRecord> = order
        .into_iter()
        .filter_map(|ip| {
            let s = stats.get(ip)?;
            let unique_targets = s.targets.len();
            Some(RiskRecord {
                source_ip: ip.to_string(),
                total_hits: s.hits,
                unique_targets,
                source_country: s.country.to_string(),
                classification: s.dominant_class().to_string(),
                risk_score: s
                    .hits
                    .saturating_add(TARGET_WEIGHT.saturating_mul(unique_targets as u64)),
            })
        })
        .collect();

    report.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    report
}

/// Write the report as CSV.
pub fn write_report(report: &[RiskRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in report {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), attackers = report.len(), "risk report written");
    Ok(())
}

/// The `n` highest-risk sources.
pub fn top_attackers(report: &[RiskRecord], n: usize) -> &[RiskRecord] {
    &report[..n.min(report.len())]
}
