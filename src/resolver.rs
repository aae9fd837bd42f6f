//! Metric name resolution
//!
//! Maps exporter metric names onto canonical metrics. Exporter versions drift
//! in naming (`step_count`, `StepCount`, `steps_total`), so matching is fuzzy
//! but deterministic: aliases are tried in priority order, and for each alias
//! three rules are tried across every raw metric before moving to the next
//! alias:
//!
//! 1. case-insensitive exact match
//! 2. case-insensitive match with underscores removed on both sides
//! 3. case-insensitive substring match in either direction

use crate::catalog::CanonicalMetric;
use crate::types::RawMetric;
use tracing::debug;

/// Fuzzy resolver from raw metric names to canonical metrics
pub struct MetricResolver;

impl MetricResolver {
    /// Find the raw metric that best matches `aliases`.
    ///
    /// The first alias that matches anything wins, even if a later alias would
    /// match a metric that comes earlier in `metrics`.
    pub fn resolve<'a, I>(metrics: I, aliases: &[&str]) -> Option<&'a RawMetric>
    where
        I: IntoIterator<Item = &'a RawMetric>,
        I::IntoIter: Clone,
    {
        let metrics = metrics.into_iter();

        for alias in aliases {
            let alias_lower = alias.to_lowercase();
            let alias_bare = strip_underscores(&alias_lower);

            let candidates = metrics.clone().filter(|m| !m.name.is_empty());

            let found = candidates
                .clone()
                .find(|m| m.name.to_lowercase() == alias_lower)
                .or_else(|| {
                    candidates
                        .clone()
                        .find(|m| strip_underscores(&m.name.to_lowercase()) == alias_bare)
                })
                .or_else(|| {
                    candidates.clone().find(|m| {
                        let name = m.name.to_lowercase();
                        name.contains(&alias_lower) || alias_lower.contains(&name)
                    })
                });

            if let Some(metric) = found {
                return Some(metric);
            }
        }

        None
    }

    /// Resolve the raw metric carrying `canonical`
    pub fn resolve_canonical<'a, I>(metrics: I, canonical: CanonicalMetric) -> Option<&'a RawMetric>
    where
        I: IntoIterator<Item = &'a RawMetric>,
        I::IntoIter: Clone,
    {
        let resolved = Self::resolve(metrics, canonical.aliases());
        match resolved {
            Some(metric) => debug!(canonical = %canonical, raw = %metric.name, "resolved metric"),
            None => debug!(canonical = %canonical, "no raw metric matched"),
        }
        resolved
    }
}

fn strip_underscores(name: &str) -> String {
    name.chars().filter(|c| *c != '_').collect()
}
