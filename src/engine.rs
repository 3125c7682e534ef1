// Cross-Filter Engine - single source of truth for "what is in view"
//
// A pure, synchronous function of two inputs: the canonical collection and
// the current filter state. Every presentation surface (table, map ranking,
// pie distribution, trend, KPI strip) renders from one `apply` pass, and any
// surface interaction feeds back a new FilterState and a full recomputation.
// No incremental bookkeeping: the collection is low thousands of rows and a
// pass is O(n) plus one ranking sort.

use crate::record::Record;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Statuses counted as delivered when computing the completion rate.
/// Configuration, not derived data.
pub const DEFAULT_COMPLETED_STATUSES: [&str; 6] =
    ["SIM", "PAGO", "CONCLUÍDO", "REALIZADO", "ASSINADO", "FINALIZADO"];

// ============================================================================
// FILTER STATE
// ============================================================================

/// The four-axis predicate currently applied. Empty/None means "no constraint
/// on this axis". Created unset at session start, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub region: Option<String>,
    pub status: Option<String>,
    pub year: Option<String>,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.region.is_some()
            || self.status.is_some()
            || self.year.is_some()
    }

    pub fn clear(&mut self) {
        *self = FilterState::default();
    }

    /// Short human-readable summary for status bars ("UF=SP ANO=2023 ...").
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.search.is_empty() {
            parts.push(format!("busca=\"{}\"", self.search));
        }
        if let Some(region) = &self.region {
            parts.push(format!("UF={}", region));
        }
        if let Some(status) = &self.status {
            parts.push(format!("situação={}", status));
        }
        if let Some(year) = &self.year {
            parts.push(format!("ano={}", year));
        }
        parts.join(" ")
    }

    fn matches(&self, record: &Record) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            if !record.search_haystack().contains(&needle) {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if &record.region != region {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &record.status != status {
                return false;
            }
        }
        if let Some(year) = &self.year {
            if &record.year != year {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// AGGREGATE BUNDLE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearTotal {
    pub year: String,
    pub total: f64,
}

/// Derived summaries, recomputed from scratch on every collection or filter
/// change. All fields describe the filtered subset except the two picker
/// option lists, which always come from the unfiltered collection so that
/// choosing one filter never hides the other options.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateBundle {
    pub total_value: f64,
    pub count: usize,
    pub average_value: f64,
    /// Share of records in a completed status, percent, one decimal.
    pub completion_rate: f64,
    /// (region, count) descending by count; ties keep first-seen order.
    pub region_ranking: Vec<RegionCount>,
    pub status_distribution: Vec<StatusCount>,
    /// (year, value total) ascending by the year label. The label is a
    /// string, so the order is lexicographic; the "S/A" sentinel sorts after
    /// the four-digit years.
    pub yearly_trend: Vec<YearTotal>,
    /// Largest ranking count, for scaling bars and color ramps. 0 when the
    /// subset is empty; callers must not divide by it unguarded.
    pub max_region_count: usize,
    pub year_options: Vec<String>,
    pub status_options: Vec<String>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct CrossFilterEngine {
    completed_statuses: Vec<String>,
}

impl CrossFilterEngine {
    pub fn new(completed_statuses: Vec<String>) -> Self {
        CrossFilterEngine { completed_statuses }
    }

    /// One full pass: evaluate the AND of the four axis predicates per
    /// record, then derive the aggregate bundle from the survivors. Never
    /// fails; a filter value absent from the data yields an empty subset.
    pub fn apply(
        &self,
        collection: &[Record],
        filter: &FilterState,
    ) -> (Vec<Record>, AggregateBundle) {
        let filtered: Vec<Record> = collection
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        let total_value: f64 = filtered.iter().map(|r| r.transfer_value).sum();
        let count = filtered.len();
        let average_value = if count > 0 {
            total_value / count as f64
        } else {
            0.0
        };

        let completed = filtered
            .iter()
            .filter(|r| self.completed_statuses.iter().any(|s| s == &r.status))
            .count();
        let completion_rate = if count > 0 {
            ((completed as f64 / count as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let mut region_ranking = group_counts(filtered.iter().map(|r| r.region.as_str()));
        region_ranking.sort_by(|a, b| b.1.cmp(&a.1)); // stable: ties keep order
        let max_region_count = region_ranking.first().map(|(_, n)| *n).unwrap_or(0);

        let status_distribution = group_counts(filtered.iter().map(|r| r.status.as_str()));

        let mut yearly =
            group_sums(filtered.iter().map(|r| (r.year.as_str(), r.transfer_value)));
        yearly.sort_by(|a, b| a.0.cmp(&b.0));

        let year_options = distinct_sorted(collection.iter().map(|r| r.year.clone()));
        let status_options = distinct_sorted(collection.iter().map(|r| r.status.clone()));

        let aggregates = AggregateBundle {
            total_value,
            count,
            average_value,
            completion_rate,
            region_ranking: region_ranking
                .into_iter()
                .map(|(region, count)| RegionCount { region, count })
                .collect(),
            status_distribution: status_distribution
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            yearly_trend: yearly
                .into_iter()
                .map(|(year, total)| YearTotal { year, total })
                .collect(),
            max_region_count,
            year_options,
            status_options,
        };

        (filtered, aggregates)
    }
}

impl Default for CrossFilterEngine {
    fn default() -> Self {
        CrossFilterEngine::new(
            DEFAULT_COMPLETED_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// Occurrence counts in first-seen order.
fn group_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut groups: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for key in keys {
        match index.get(key) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(key.to_string(), groups.len());
                groups.push((key.to_string(), 1));
            }
        }
    }
    groups
}

/// Value sums in first-seen order.
fn group_sums<'a>(pairs: impl Iterator<Item = (&'a str, f64)>) -> Vec<(String, f64)> {
    let mut groups: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (key, value) in pairs {
        match index.get(key) {
            Some(&i) => groups[i].1 += value,
            None => {
                index.insert(key.to_string(), groups.len());
                groups.push((key.to_string(), value));
            }
        }
    }
    groups
}

fn distinct_sorted(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(region: &str, year: &str, status: &str, value: f64) -> Record {
        Record {
            id: 0,
            process_number: "—".to_string(),
            entity: "ENTIDADE TESTE".to_string(),
            region: region.to_string(),
            year: year.to_string(),
            status: status.to_string(),
            transfer_value: value,
            extra: HashMap::new(),
        }
    }

    fn fixture() -> Vec<Record> {
        vec![
            record("SP", "2023", "SIM", 1000.0),
            record("SP", "2024", "PENDENTE", 2000.0),
            record("RJ", "2023", "SIM", 500.0),
        ]
    }

    #[test]
    fn test_unfiltered_pass() {
        let engine = CrossFilterEngine::default();
        let (filtered, agg) = engine.apply(&fixture(), &FilterState::default());

        assert_eq!(filtered.len(), 3);
        assert_eq!(agg.count, 3);
        assert_eq!(agg.total_value, 3500.0);
        assert_eq!(agg.region_ranking.len(), 2);
        assert_eq!(agg.region_ranking[0].region, "SP");
        assert_eq!(agg.region_ranking[0].count, 2);
        assert_eq!(agg.region_ranking[1].region, "RJ");
        assert_eq!(agg.region_ranking[1].count, 1);
        assert_eq!(agg.max_region_count, 2);
    }

    #[test]
    fn test_region_filter_scenario() {
        let engine = CrossFilterEngine::default();
        let filter = FilterState {
            region: Some("SP".to_string()),
            ..FilterState::default()
        };
        let (filtered, agg) = engine.apply(&fixture(), &filter);

        assert_eq!(filtered.len(), 2);
        assert_eq!(agg.total_value, 3000.0);
        assert_eq!(agg.completion_rate, 50.0);
    }

    #[test]
    fn test_region_and_status_filter_scenario() {
        let engine = CrossFilterEngine::default();
        let filter = FilterState {
            region: Some("SP".to_string()),
            status: Some("SIM".to_string()),
            ..FilterState::default()
        };
        let (filtered, agg) = engine.apply(&fixture(), &filter);

        assert_eq!(filtered.len(), 1);
        assert_eq!(agg.total_value, 1000.0);
        assert_eq!(agg.completion_rate, 100.0);
    }

    #[test]
    fn test_filter_monotonicity() {
        let engine = CrossFilterEngine::default();
        let collection = fixture();

        let (all, _) = engine.apply(&collection, &FilterState::default());
        let (by_year, _) = engine.apply(
            &collection,
            &FilterState {
                year: Some("2023".to_string()),
                ..FilterState::default()
            },
        );
        let (by_year_and_region, _) = engine.apply(
            &collection,
            &FilterState {
                year: Some("2023".to_string()),
                region: Some("RJ".to_string()),
                ..FilterState::default()
            },
        );

        assert!(by_year.len() <= all.len());
        assert!(by_year_and_region.len() <= by_year.len());
        assert!(by_year.iter().all(|r| collection.contains(r)));
        assert!(by_year_and_region.iter().all(|r| by_year.contains(r)));
    }

    #[test]
    fn test_aggregate_consistency() {
        let engine = CrossFilterEngine::default();
        let filter = FilterState {
            year: Some("2023".to_string()),
            ..FilterState::default()
        };
        let (filtered, agg) = engine.apply(&fixture(), &filter);

        assert_eq!(agg.count, filtered.len());
        let sum: f64 = filtered.iter().map(|r| r.transfer_value).sum();
        assert_eq!(agg.total_value, sum);
        assert_eq!(agg.average_value, sum / filtered.len() as f64);

        let dist_total: usize = agg.status_distribution.iter().map(|s| s.count).sum();
        assert_eq!(dist_total, agg.count);
        let rank_total: usize = agg.region_ranking.iter().map(|r| r.count).sum();
        assert_eq!(rank_total, agg.count);
    }

    #[test]
    fn test_empty_subset_is_not_an_error() {
        let engine = CrossFilterEngine::default();
        let filter = FilterState {
            region: Some("XX".to_string()),
            ..FilterState::default()
        };
        let (filtered, agg) = engine.apply(&fixture(), &filter);

        assert!(filtered.is_empty());
        assert_eq!(agg.count, 0);
        assert_eq!(agg.average_value, 0.0);
        assert_eq!(agg.completion_rate, 0.0);
        assert_eq!(agg.max_region_count, 0);
    }

    #[test]
    fn test_picker_options_ignore_filters() {
        let engine = CrossFilterEngine::default();
        let collection = fixture();

        let (_, unfiltered) = engine.apply(&collection, &FilterState::default());
        let (_, narrowed) = engine.apply(
            &collection,
            &FilterState {
                region: Some("RJ".to_string()),
                status: Some("SIM".to_string()),
                ..FilterState::default()
            },
        );

        assert_eq!(unfiltered.year_options, narrowed.year_options);
        assert_eq!(unfiltered.status_options, narrowed.status_options);
        assert_eq!(unfiltered.year_options, vec!["2023", "2024"]);
        assert_eq!(unfiltered.status_options, vec!["PENDENTE", "SIM"]);
    }

    #[test]
    fn test_search_scans_extra_fields() {
        let engine = CrossFilterEngine::default();
        let mut collection = fixture();
        collection[2]
            .extra
            .insert("CNPJ".to_string(), serde_json::json!("98765432000155"));

        let filter = FilterState {
            search: "98765432".to_string(),
            ..FilterState::default()
        };
        let (filtered, _) = engine.apply(&collection, &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].region, "RJ");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let engine = CrossFilterEngine::default();
        let filter = FilterState {
            search: "entidade teste".to_string(),
            ..FilterState::default()
        };
        let (filtered, _) = engine.apply(&fixture(), &filter);
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_ranking_ties_keep_first_seen_order() {
        let engine = CrossFilterEngine::default();
        let collection = vec![
            record("MG", "2023", "SIM", 1.0),
            record("BA", "2023", "SIM", 1.0),
            record("SP", "2023", "SIM", 1.0),
            record("SP", "2023", "SIM", 1.0),
        ];
        let (_, agg) = engine.apply(&collection, &FilterState::default());

        let order: Vec<&str> = agg.region_ranking.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(order, vec!["SP", "MG", "BA"]);
    }

    #[test]
    fn test_yearly_trend_lexicographic_with_sentinel_last() {
        let engine = CrossFilterEngine::default();
        let collection = vec![
            record("SP", "S/A", "SIM", 10.0),
            record("SP", "2024", "SIM", 20.0),
            record("SP", "2023", "SIM", 30.0),
            record("SP", "2023", "SIM", 5.0),
        ];
        let (_, agg) = engine.apply(&collection, &FilterState::default());

        let years: Vec<&str> = agg.yearly_trend.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(years, vec!["2023", "2024", "S/A"]);
        assert_eq!(agg.yearly_trend[0].total, 35.0);
    }

    #[test]
    fn test_completion_rate_rounds_to_one_decimal() {
        let engine = CrossFilterEngine::default();
        // 1 of 3 completed: 33.333...% rounds to 33.3
        let collection = vec![
            record("SP", "2023", "SIM", 1.0),
            record("SP", "2023", "PENDENTE", 1.0),
            record("SP", "2023", "PENDENTE", 1.0),
        ];
        let (_, agg) = engine.apply(&collection, &FilterState::default());
        assert_eq!(agg.completion_rate, 33.3);
    }

    #[test]
    fn test_custom_completed_status_set() {
        let engine = CrossFilterEngine::new(vec!["ENTREGUE".to_string()]);
        let collection = vec![
            record("SP", "2023", "ENTREGUE", 1.0),
            record("SP", "2023", "SIM", 1.0),
        ];
        let (_, agg) = engine.apply(&collection, &FilterState::default());
        assert_eq!(agg.completion_rate, 50.0);
    }
}
