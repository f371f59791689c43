//! Firewall log loading, cleaning and aggregation.
//!
//! Input is a CSV export with at least the columns in [`REQUIRED_COLUMNS`].
//! Rows are cleaned on load: addresses are trimmed and hit counts that are
//! missing or non-numeric count as a single hit.

use crate::error::{FiregraphError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

pub const SOURCE_IP: &str = "Source IP";
pub const DESTINATION_IP: &str = "Destination IP";
pub const HITS: &str = "Hits";
pub const SOURCE_COUNTRY: &str = "Source Country";
pub const CLASSIFICATION: &str = "Classification";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    SOURCE_IP,
    DESTINATION_IP,
    HITS,
    SOURCE_COUNTRY,
    CLASSIFICATION,
];

/// One cleaned log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub source_ip: String,
    pub destination_ip: String,
    pub hits: u64,
    pub source_country: String,
    pub classification: String,
}

impl LogRecord {
    pub fn new(source_ip: &str, destination_ip: &str, hits: u64) -> Self {
        Self {
            source_ip: source_ip.to_string(),
            destination_ip: destination_ip.to_string(),
            hits,
            source_country: String::new(),
            classification: String::new(),
        }
    }

    pub fn with_origin(mut self, country: &str, classification: &str) -> Self {
        self.source_country = country.to_string();
        self.classification = classification.to_string();
        self
    }
}

/// Unique (source, destination) pair with summed hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedConnection {
    pub source_ip: String,
    pub destination_ip: String,
    pub hits: u64,
    /// Country of the first row seen for this pair.
    pub source_country: String,
    /// Classification of the first row seen for this pair.
    pub classification: String,
}

/// Load and clean a CSV log export.
pub fn load_csv(path: &Path) -> Result<Vec<LogRecord>> {
    if !path.exists() {
        return Err(FiregraphError::InputNotFound(path.to_path_buf()));
    }
    tracing::info!(path = %path.display(), "loading firewall logs");
    let records = read_records(std::fs::File::open(path)?)?;
    tracing::info!(count = records.len(), "loaded log entries");
    Ok(records)
}

/// Parse and clean log rows from any CSV reader.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<LogRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| column(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FiregraphError::MissingColumns(missing));
    }

    // Presence checked above
    let idx = |name: &str| column(name).unwrap_or_default();
    let (src, dst, hits, country, class) = (
        idx(SOURCE_IP),
        idx(DESTINATION_IP),
        idx(HITS),
        idx(SOURCE_COUNTRY),
        idx(CLASSIFICATION),
    );

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or("");
        records.push(LogRecord {
            source_ip: field(src).trim().to_string(),
            destination_ip: field(dst).trim().to_string(),
            hits: parse_hits(field(hits)),
            source_country: field(country).to_string(),
            classification: field(class).to_string(),
        });
    }
    Ok(records)
}

/// Coerce a hit count; anything that is not a non-negative number counts as 1.
pub fn parse_hits(raw: &str) -> u64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => f as u64,
        _ => 1,
    }
}

/// Group records by (source, destination) and sum hits, saturating at `u64::MAX`.
///
/// Output is ordered by (source, destination). With `top_n` of `Some(n)` and
/// `n > 0`, only the `n` pairs with the most hits are kept, sorted by hits
/// descending; ties keep their pair order.
pub fn aggregate(records: &[LogRecord], top_n: Option<usize>) -> Vec<AggregatedConnection> {
    let mut groups: BTreeMap<(&str, &str), AggregatedConnection> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.source_ip.as_str(), r.destination_ip.as_str()))
            .and_modify(|c| c.hits = c.hits.saturating_add(r.hits))
            .or_insert_with(|| AggregatedConnection {
                source_ip: r.source_ip.clone(),
                destination_ip: r.destination_ip.clone(),
                hits: r.hits,
                source_country: r.source_country.clone(),
                classification: r.classification.clone(),
            });
    }

    let mut connections: Vec<AggregatedConnection> = groups.into_values().collect();
    if let Some(n) = top_n.filter(|n| *n > 0) {
        connections.sort_by(|a, b| b.hits.cmp(&a.hits));
        connections.truncate(n);
    }
    tracing::debug!(count = connections.len(), "aggregated connections");
    connections
}

/// Total outbound hits per source.
pub fn attacker_volumes(connections: &[AggregatedConnection]) -> HashMap<&str, u64> {
    let mut volumes = HashMap::new();
    for c in connections {
        let v = volumes.entry(c.source_ip.as_str()).or_insert(0u64);
        *v = v.saturating_add(c.hits);
    }
    volumes
}

/// Total inbound hits per destination.
pub fn target_volumes(connections: &[AggregatedConnection]) -> HashMap<&str, u64> {
    let mut volumes = HashMap::new();
    for c in connections {
        let v = volumes.entry(c.destination_ip.as_str()).or_insert(0u64);
        *v = v.saturating_add(c.hits);
    }
    volumes
}

/// Every distinct source and destination address, sorted.
pub fn unique_ips(records: &[LogRecord]) -> Vec<String> {
    let ips: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| [r.source_ip.as_str(), r.destination_ip.as_str()])
        .collect();
    ips.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    const SAMPLE: &str = "\
Source IP,Destination IP,Hits,Source Country,Classification,Rule
 10.0.0.1 ,192.168.1.5,10,US,Scan,7
10.0.0.1,192.168.1.5,abc,DE,Exploit,7
10.0.0.2,192.168.1.6,,CN,Scan,8
10.0.0.3,192.168.1.6,4.0,RU,Brute,9
";

    fn pair_sums(conns: &[AggregatedConnection]) -> BTreeMap<(String, String), u64> {
        conns
            .iter()
            .map(|c| ((c.source_ip.clone(), c.destination_ip.clone()), c.hits))
            .collect()
    }

    #[test]
    fn test_read_records_cleans_rows() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].source_ip, "10.0.0.1");
        assert_eq!(records[0].hits, 10);
        assert_eq!(records[1].hits, 1);
        assert_eq!(records[2].hits, 1);
        assert_eq!(records[3].hits, 4);
        assert_eq!(records[3].classification, "Brute");
    }

    #[test]
    fn test_missing_columns_is_fatal() {
        let csv = "Source IP,Destination IP,Hits\n1.1.1.1,2.2.2.2,3\n";
        match read_records(csv.as_bytes()) {
            Err(FiregraphError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Source Country", "Classification"]);
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv(Path::new("/nonexistent/logs.csv")).unwrap_err();
        assert!(matches!(err, FiregraphError::InputNotFound(_)));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_csv(&path).unwrap().len(), 4);
    }

    #[test]
    fn test_parse_hits() {
        assert_eq!(parse_hits("12"), 12);
        assert_eq!(parse_hits(" 7 "), 7);
        assert_eq!(parse_hits("3.9"), 3);
        assert_eq!(parse_hits(""), 1);
        assert_eq!(parse_hits("n/a"), 1);
        assert_eq!(parse_hits("-4"), 1);
    }

    #[test]
    fn test_aggregate_sums_and_keeps_first_seen() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        let conns = aggregate(&records, None);
        assert_eq!(conns.len(), 3);
        assert_eq!(conns[0].hits, 11);
        assert_eq!(conns[0].source_country, "US");
        assert_eq!(conns[0].classification, "Scan");
    }

    #[test]
    fn test_aggregate_order_independent() {
        let mut records = Vec::new();
        for i in 0..40u64 {
            records.push(LogRecord::new(
                &format!("10.0.0.{}", i % 5),
                &format!("172.16.0.{}", i % 3),
                i + 1,
            ));
        }
        let expected = pair_sums(&aggregate(&records, None));

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            records.shuffle(&mut rng);
            assert_eq!(pair_sums(&aggregate(&records, None)), expected);
        }
    }

    #[test]
    fn test_top_n_keeps_largest() {
        let records: Vec<LogRecord> = (1..=10u64)
            .map(|i| LogRecord::new("10.0.0.1", &format!("192.168.0.{i}"), i * 3))
            .collect();
        let all = aggregate(&records, None);

        for n in [1usize, 4, 10, 25] {
            let kept = aggregate(&records, Some(n));
            assert_eq!(kept.len(), n.min(all.len()));
            let floor = kept.iter().map(|c| c.hits).min().unwrap();
            let kept_keys = pair_sums(&kept);
            for c in &all {
                let key = (c.source_ip.clone(), c.destination_ip.clone());
                if !kept_keys.contains_key(&key) {
                    assert!(c.hits <= floor);
                }
            }
        }
    }

    #[test]
    fn test_top_n_zero_means_unlimited() {
        let records = vec![
            LogRecord::new("a", "b", 1),
            LogRecord::new("a", "c", 2),
        ];
        assert_eq!(aggregate(&records, Some(0)).len(), 2);
    }

    #[test]
    fn test_huge_hit_counts_saturate() {
        let csv = "\
Source IP,Destination IP,Hits,Source Country,Classification
1.1.1.1,2.2.2.2,1e20,US,Scan
1.1.1.1,2.2.2.2,1e20,US,Scan
1.1.1.1,3.3.3.3,5,US,Scan
";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].hits, u64::MAX);

        let conns = aggregate(&records, None);
        assert_eq!(conns[0].hits, u64::MAX);
        assert_eq!(attacker_volumes(&conns)["1.1.1.1"], u64::MAX);
        assert_eq!(target_volumes(&conns)["2.2.2.2"], u64::MAX);
        assert_eq!(aggregate(&records, Some(1))[0].destination_ip, "2.2.2.2");
    }

    #[test]
    fn test_volumes_and_unique_ips() {
        let records = vec![
            LogRecord::new("A", "B", 10),
            LogRecord::new("A", "C", 5),
            LogRecord::new("B", "C", 2),
        ];
        let conns = aggregate(&records, None);
        let attackers = attacker_volumes(&conns);
        let targets = target_volumes(&conns);
        assert_eq!(attackers["A"], 15);
        assert_eq!(attackers["B"], 2);
        assert_eq!(targets["C"], 7);
        assert_eq!(targets["B"], 10);
        assert_eq!(unique_ips(&records), vec!["A", "B", "C"]);
    }
}
