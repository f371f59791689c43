//! Reverse-DNS hostname resolution with a persistent JSON cache.
//!
//! Lookups run on tokio's blocking pool, bounded by a semaphore, each under
//! its own timeout. Results (including failures) are cached with a
//! timestamp and expire after the configured TTL.

use crate::config::HostnameSettings;
use crate::error::Result;
use crate::graph::HostnameLookup;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Whether an address belongs to a private network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpKind {
    Internal,
    External,
}

impl IpKind {
    pub fn of(ip: &str) -> Self {
        if is_internal_ip(ip) {
            IpKind::Internal
        } else {
            IpKind::External
        }
    }
}

/// One cached lookup result. Failed lookups store the address as hostname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: IpKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl CacheEntry {
    fn resolved(ip: &str, hostname: String, now: DateTime<Utc>) -> Self {
        Self {
            hostname,
            timestamp: now,
            kind: IpKind::of(ip),
            failed: false,
        }
    }

    fn failed(ip: &str, now: DateTime<Utc>) -> Self {
        Self {
            hostname: ip.to_string(),
            timestamp: now,
            kind: IpKind::of(ip),
            failed: true,
        }
    }
}

/// Knobs for one `resolve_batch` call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Skip addresses outside private ranges.
    pub internal_only: bool,
    /// Per-lookup timeout.
    pub timeout: Duration,
    /// Maximum lookups in flight.
    pub max_workers: usize,
}

impl ResolveOptions {
    /// Options for resolution during rendering.
    pub fn render(settings: &HostnameSettings, internal_only: bool) -> Self {
        Self {
            internal_only,
            timeout: seconds(settings.timeout),
            max_workers: settings.max_workers,
        }
    }

    /// Options for bulk cache warming, with the longer timeout.
    pub fn pre_cache(settings: &HostnameSettings) -> Self {
        Self {
            internal_only: false,
            timeout: seconds(settings.pre_cache_timeout),
            max_workers: settings.max_workers,
        }
    }
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(1))
}

/// Counters for lookups made through one resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub internal: usize,
    pub external: usize,
    pub failed: usize,
    pub cache_file: PathBuf,
    pub exists: bool,
}

/// Cached reverse-DNS resolver.
pub struct HostnameResolver {
    cache_file: PathBuf,
    cache: BTreeMap<String, CacheEntry>,
    stats: ResolutionStats,
}

impl HostnameResolver {
    /// Open the cache file named in `settings`, dropping expired entries.
    ///
    /// A missing file starts an empty cache; an unreadable one is logged and
    /// also starts empty.
    pub fn open(settings: &HostnameSettings) -> Self {
        let ttl = chrono::Duration::days(settings.cache_ttl_days.clamp(0, 36_500));
        let cache = load_cache(&settings.cache_file, ttl, Utc::now());
        tracing::debug!(entries = cache.len(), path = %settings.cache_file.display(), "hostname cache loaded");
        Self {
            cache_file: settings.cache_file.clone(),
            cache,
            stats: ResolutionStats::default(),
        }
    }

    /// Resolve `ips` to hostnames, answering from cache where possible.
    ///
    /// Duplicates are resolved once. Unresolvable addresses map to
    /// themselves. The cache is saved once after every lookup has finished.
    pub async fn resolve_batch(
        &mut self,
        ips: &[String],
        options: &ResolveOptions,
    ) -> HashMap<String, String> {
        let mut unique: BTreeSet<&str> = ips.iter().map(String::as_str).collect();
        if options.internal_only {
            unique.retain(|ip| is_internal_ip(ip));
        }
        tracing::info!(count = unique.len(), "resolving unique addresses");

        let mut results = HashMap::with_capacity(unique.len());
        let mut pending = Vec::new();
        for ip in unique {
            match self.cache.get(ip) {
                Some(entry) => {
                    self.stats.cache_hits += 1;
                    results.insert(ip.to_string(), entry.hostname.clone());
                }
                None => {
                    self.stats.cache_misses += 1;
                    pending.push(ip.to_string());
                }
            }
        }

        let limit = Arc::new(Semaphore::new(options.max_workers.max(1)));
        let mut tasks = JoinSet::new();
        for ip in pending {
            let limit = Arc::clone(&limit);
            let timeout = options.timeout;
            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                let hostname = reverse_lookup(&ip, timeout).await;
                (ip, hostname)
            });
        }

        let now = Utc::now();
        while let Some(joined) = tasks.join_next().await {
            let (ip, hostname) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::warn!(error = %e, "hostname lookup task aborted");
                    continue;
                }
            };
            let entry = match hostname {
                Some(name) => {
                    self.stats.resolved += 1;
                    CacheEntry::resolved(&ip, name, now)
                }
                None => {
                    self.stats.failed += 1;
                    CacheEntry::failed(&ip, now)
                }
            };
            results.insert(ip.clone(), entry.hostname.clone());
            self.cache.insert(ip, entry);
        }

        if let Err(e) = self.save() {
            tracing::warn!(error = %e, path = %self.cache_file.display(), "could not save hostname cache");
        }
        tracing::info!(
            cache_hits = self.stats.cache_hits,
            resolved = self.stats.resolved,
            failed = self.stats.failed,
            "hostname resolution complete"
        );
        results
    }

    /// Cached hostname for `ip`, or `ip` itself.
    pub fn hostname<'a>(&'a self, ip: &'a str) -> &'a str {
        self.cache.get(ip).map_or(ip, |e| e.hostname.as_str())
    }

    /// Write the cache to disk as pretty-printed JSON.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.cache)?;
        std::fs::write(&self.cache_file, json)?;
        Ok(())
    }

    /// Drop every entry and delete the cache file.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear();
        if self.cache_file.exists() {
            std::fs::remove_file(&self.cache_file)?;
        }
        tracing::info!(path = %self.cache_file.display(), "hostname cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let count = |pred: fn(&CacheEntry) -> bool| self.cache.values().filter(|e| pred(e)).count();
        CacheStats {
            total: self.cache.len(),
            internal: count(|e| e.kind == IpKind::Internal),
            external: count(|e| e.kind == IpKind::External),
            failed: count(|e| e.failed),
            cache_file: self.cache_file.clone(),
            exists: self.cache_file.exists(),
        }
    }

    pub fn resolution_stats(&self) -> ResolutionStats {
        self.stats
    }
}

impl HostnameLookup for HostnameResolver {
    fn hostname<'a>(&'a self, ip: &'a str) -> &'a str {
        HostnameResolver::hostname(self, ip)
    }
}

fn load_cache(
    path: &Path,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> BTreeMap<String, CacheEntry> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not read hostname cache");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&text) {
        Ok(mut cache) => {
            cache.retain(|_, e| now - e.timestamp < ttl);
            cache
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not load hostname cache, starting empty");
            BTreeMap::new()
        }
    }
}

/// Reverse lookup on the blocking pool. `None` on parse error, failure or timeout.
async fn reverse_lookup(ip: &str, timeout: Duration) -> Option<String> {
    let addr: IpAddr = match ip.parse() {
        Ok(addr) => addr,
        Err(_) => {
            tracing::debug!(ip, "not an IP address");
            return None;
        }
    };
    // A timed-out lookup frees its permit but its blocking thread runs to
    // completion; runtime shutdown still waits on it.
    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(name))) => Some(name),
        Ok(Ok(Err(e))) => {
            tracing::debug!(ip, error = %e, "reverse lookup failed");
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(ip, error = %e, "reverse lookup task failed");
            None
        }
        Err(_) => {
            tracing::debug!(ip, "reverse lookup timed out");
            None
        }
    }
}

/// True for private, loopback and link-local IPv4 and for loopback,
/// unique-local and link-local IPv6. Unparseable input is external.
pub fn is_internal_ip(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        Ok(IpAddr::V6(v6)) => {
            let first = v6.segments()[0];
            v6.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &Path) -> HostnameSettings {
        HostnameSettings {
            cache_file: dir.join("hosts.json"),
            ..HostnameSettings::default()
        }
    }

    fn entry(hostname: &str, age_days: i64, kind: IpKind, failed: bool) -> CacheEntry {
        CacheEntry {
            hostname: hostname.to_string(),
            timestamp: Utc::now() - chrono::Duration::days(age_days),
            kind,
            failed,
        }
    }

    fn seed(settings: &HostnameSettings, entries: &[(&str, CacheEntry)]) {
        let map: BTreeMap<&str, &CacheEntry> = entries.iter().map(|(ip, e)| (*ip, e)).collect();
        std::fs::write(&settings.cache_file, serde_json::to_string(&map).unwrap()).unwrap();
    }

    fn options() -> ResolveOptions {
        ResolveOptions {
            internal_only: false,
            timeout: Duration::from_millis(200),
            max_workers: 4,
        }
    }

    #[test]
    fn test_is_internal_ip() {
        assert!(is_internal_ip("10.1.2.3"));
        assert!(is_internal_ip("172.16.0.1"));
        assert!(is_internal_ip("192.168.1.1"));
        assert!(is_internal_ip("127.0.0.1"));
        assert!(is_internal_ip("169.254.3.4"));
        assert!(is_internal_ip("::1"));
        assert!(is_internal_ip("fd12:3456::1"));
        assert!(is_internal_ip("fe80::1"));
        assert!(!is_internal_ip("8.8.8.8"));
        assert!(!is_internal_ip("172.32.0.1"));
        assert!(!is_internal_ip("2001:4860::8888"));
        assert!(!is_internal_ip("not-an-ip"));
    }

    #[test]
    fn test_open_drops_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[
                ("10.0.0.1", entry("fresh.lan", 1, IpKind::Internal, false)),
                ("10.0.0.2", entry("stale.lan", 30, IpKind::Internal, false)),
            ],
        );

        let resolver = HostnameResolver::open(&settings);
        assert_eq!(resolver.hostname("10.0.0.1"), "fresh.lan");
        assert_eq!(resolver.hostname("10.0.0.2"), "10.0.0.2");
        assert_eq!(resolver.stats().total, 1);
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        std::fs::write(&settings.cache_file, "{ not json").unwrap();
        let resolver = HostnameResolver::open(&settings);
        assert_eq!(resolver.stats().total, 0);
    }

    #[test]
    fn test_cache_entry_json_shape() {
        let e = entry("host", 0, IpKind::External, false);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "external");
        assert!(json.get("failed").is_none());

        let f = CacheEntry::failed("10.0.0.9", Utc::now());
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "internal");
        assert_eq!(json["failed"], true);
        assert_eq!(json["hostname"], "10.0.0.9");
    }

    #[tokio::test]
    async fn test_resolve_batch_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[
                ("10.0.0.1", entry("gw.lan", 0, IpKind::Internal, false)),
                ("8.8.8.8", entry("dns.google", 0, IpKind::External, false)),
            ],
        );

        let mut resolver = HostnameResolver::open(&settings);
        let ips = vec![
            "10.0.0.1".to_string(),
            "8.8.8.8".to_string(),
            "10.0.0.1".to_string(),
        ];
        let names = resolver.resolve_batch(&ips, &options()).await;
        assert_eq!(names.len(), 2);
        assert_eq!(names["8.8.8.8"], "dns.google");

        let stats = resolver.resolution_stats();
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn test_resolve_batch_internal_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[
                ("10.0.0.1", entry("gw.lan", 0, IpKind::Internal, false)),
                ("8.8.8.8", entry("dns.google", 0, IpKind::External, false)),
            ],
        );

        let mut resolver = HostnameResolver::open(&settings);
        let ips = vec!["10.0.0.1".to_string(), "8.8.8.8".to_string()];
        let opts = ResolveOptions {
            internal_only: true,
            ..options()
        };
        let names = resolver.resolve_batch(&ips, &opts).await;
        assert_eq!(names.len(), 1);
        assert!(names.contains_key("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_unparseable_address_is_cached_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let mut resolver = HostnameResolver::open(&settings);

        let ips = vec!["bogus".to_string()];
        let names = resolver.resolve_batch(&ips, &options()).await;
        assert_eq!(names["bogus"], "bogus");
        assert_eq!(resolver.resolution_stats().failed, 1);
        assert_eq!(resolver.stats().failed, 1);

        // Persisted and answered from cache on reopen
        let mut reopened = HostnameResolver::open(&settings);
        reopened.resolve_batch(&ips, &options()).await;
        assert_eq!(reopened.resolution_stats().cache_hits, 1);
    }

    #[test]
    fn test_clear_cache_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[("10.0.0.1", entry("gw.lan", 0, IpKind::Internal, false))],
        );

        let mut resolver = HostnameResolver::open(&settings);
        assert!(resolver.stats().exists);
        resolver.clear_cache().unwrap();
        let stats = resolver.stats();
        assert_eq!(stats.total, 0);
        assert!(!stats.exists);
    }

    #[test]
    fn test_stats_counts_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[
                ("10.0.0.1", entry("a", 0, IpKind::Internal, false)),
                ("10.0.0.2", entry("10.0.0.2", 0, IpKind::Internal, true)),
                ("1.1.1.1", entry("one.one", 0, IpKind::External, false)),
            ],
        );
        let stats = HostnameResolver::open(&settings).stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.internal, 2);
        assert_eq!(stats.external, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cache_file, settings.cache_file);
    }

    #[test]
    fn test_resolver_as_hostname_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        seed(
            &settings,
            &[("10.0.0.1", entry("gw.lan", 0, IpKind::Internal, false))],
        );
        let resolver = HostnameResolver::open(&settings);
        let lookup: &dyn HostnameLookup = &resolver;
        assert_eq!(lookup.hostname("10.0.0.1"), "gw.lan");
        assert_eq!(lookup.hostname("10.0.0.3"), "10.0.0.3");
    }
}
