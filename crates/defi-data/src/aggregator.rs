//! Category aggregation and composability opportunity scoring.
//!
//! Groups protocols by `(category, subcategory)`, derives a heuristic
//! "yield potential" per group and scans every pair of groups for a synergy
//! score.

use std::collections::BTreeMap;

use defi_core::config::{PairMode, ScoringConfig};
use defi_core::models::{CategoryAggregate, ProtocolRecord, SynergyOpportunity};
use tracing::debug;

// ── Heuristics ────────────────────────────────────────────────────────────────

/// `ln(total_tvl) * protocol_count`.
///
/// The logarithm is undefined for `total_tvl <= 0`; such groups get `0.0`.
pub fn yield_potential(total_tvl: f64, protocol_count: usize) -> f64 {
    if total_tvl > 0.0 && total_tvl.is_finite() {
        total_tvl.ln() * protocol_count as f64
    } else {
        0.0
    }
}

/// `(yp(a) + yp(b)) / (tvl(a) + tvl(b))`, or `0.0` when the combined TVL is
/// not positive.
pub fn synergy_score(a: &CategoryAggregate, b: &CategoryAggregate) -> f64 {
    let combined_tvl = a.total_tvl + b.total_tvl;
    if combined_tvl > 0.0 {
        (a.yield_potential + b.yield_potential) / combined_tvl
    } else {
        0.0
    }
}

// ── CategoryAggregator ────────────────────────────────────────────────────────

#[derive(Default)]
struct GroupTotals {
    total_tvl: f64,
    protocol_count: usize,
}

/// Stateless helper that groups protocols and scores group pairs.
pub struct CategoryAggregator;

impl CategoryAggregator {
    /// Aggregate `records` by `(category, subcategory)`.
    ///
    /// Returns groups sorted by total TVL (descending), ties by key.
    pub fn aggregate(records: &[ProtocolRecord]) -> Vec<CategoryAggregate> {
        let mut groups: BTreeMap<(String, String), GroupTotals> = BTreeMap::new();

        for record in records {
            let totals = groups
                .entry((record.category.clone(), record.subcategory.clone()))
                .or_default();
            totals.total_tvl += record.tvl;
            totals.protocol_count += 1;
        }

        let mut aggregates: Vec<CategoryAggregate> = groups
            .into_iter()
            .map(|((category, subcategory), totals)| {
                let avg_tvl = if totals.protocol_count > 0 {
                    totals.total_tvl / totals.protocol_count as f64
                } else {
                    0.0
                };
                CategoryAggregate {
                    category,
                    subcategory,
                    total_tvl: totals.total_tvl,
                    protocol_count: totals.protocol_count,
                    avg_tvl,
                    yield_potential: yield_potential(totals.total_tvl, totals.protocol_count),
                }
            })
            .collect();

        aggregates.sort_by(|a, b| b.total_tvl.total_cmp(&a.total_tvl));
        debug!(
            "CategoryAggregator: {} groups from {} protocols",
            aggregates.len(),
            records.len()
        );
        aggregates
    }

    /// Score every pair of distinct groups and keep those above the threshold,
    /// highest score first.
    ///
    /// Groups are scanned in descending yield potential and the final sort is
    /// stable, so equal scores keep that scan order. This is a plain nested
    /// loop, O(n²) in the number of groups; group counts are small (tens), so
    /// no pruning is attempted. In [`PairMode::Ordered`] both `(A, B)` and
    /// `(B, A)` are emitted with the same score; [`PairMode::Unordered`] keeps
    /// only the first.
    pub fn find_opportunities(
        aggregates: &[CategoryAggregate],
        config: &ScoringConfig,
    ) -> Vec<SynergyOpportunity> {
        let mut scan: Vec<&CategoryAggregate> = aggregates.iter().collect();
        scan.sort_by(|a, b| b.yield_potential.total_cmp(&a.yield_potential));

        let mut opportunities = Vec::new();

        for (i, a) in scan.iter().enumerate() {
            for (j, b) in scan.iter().enumerate() {
                let skip = match config.pair_mode {
                    PairMode::Ordered => i == j,
                    PairMode::Unordered => j <= i,
                };
                if skip {
                    continue;
                }

                let score = synergy_score(a, b);
                if score > config.threshold {
                    opportunities.push(SynergyOpportunity {
                        category_a: a.category.clone(),
                        subcategory_a: a.subcategory.clone(),
                        category_b: b.category.clone(),
                        subcategory_b: b.subcategory.clone(),
                        synergy_score: score,
                    });
                }
            }
        }

        opportunities.sort_by(|x, y| y.synergy_score.total_cmp(&x.synergy_score));
        debug!(
            "Opportunity scan: {} pairs above {} ({:?})",
            opportunities.len(),
            config.threshold,
            config.pair_mode
        );
        opportunities
    }

    /// The `n` largest protocols by TVL. Ties keep input order.
    pub fn top_protocols(records: &[ProtocolRecord], n: usize) -> Vec<ProtocolRecord> {
        let mut sorted: Vec<&ProtocolRecord> = records.iter().collect();
        sorted.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));
        sorted.into_iter().take(n).cloned().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, category: &str, subcategory: &str, tvl: f64) -> ProtocolRecord {
        ProtocolRecord {
            protocol: name.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            tvl,
            raw_function_text: None,
        }
    }

    fn group(category: &str, total_tvl: f64, protocol_count: usize) -> CategoryAggregate {
        CategoryAggregate {
            category: category.to_string(),
            subcategory: "Sub".to_string(),
            total_tvl,
            protocol_count,
            avg_tvl: total_tvl / protocol_count as f64,
            yield_potential: yield_potential(total_tvl, protocol_count),
        }
    }

    fn config(threshold: f64, pair_mode: PairMode) -> ScoringConfig {
        ScoringConfig {
            threshold,
            pair_mode,
        }
    }

    // ── yield_potential ───────────────────────────────────────────────────────

    #[test]
    fn test_yield_potential_formula() {
        let yp = yield_potential(std::f64::consts::E.powi(3), 4);
        assert!((yp - 12.0).abs() < 1e-9, "yp = {yp}");
    }

    #[test]
    fn test_yield_potential_non_positive_tvl_is_zero() {
        assert_eq!(yield_potential(0.0, 3), 0.0);
        assert_eq!(yield_potential(-10.0, 3), 0.0);
        assert_eq!(yield_potential(f64::NAN, 3), 0.0);
    }

    #[test]
    fn test_yield_potential_small_tvl_is_negative() {
        assert!(yield_potential(0.5, 2) < 0.0);
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_single_protocol_avg_equals_total() {
        let groups = CategoryAggregator::aggregate(&[record("A", "Dexes", "AMM", 1_500.0)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].protocol_count, 1);
        assert_eq!(groups[0].avg_tvl, 1_500.0);
        assert_eq!(groups[0].total_tvl, 1_500.0);
    }

    #[test]
    fn test_aggregate_groups_by_category_and_subcategory() {
        let groups = CategoryAggregator::aggregate(&[
            record("A", "Dexes", "AMM", 100.0),
            record("B", "Dexes", "AMM", 300.0),
            record("C", "Dexes", "CLOB", 1_000.0),
            record("D", "Lending", "AMM", 50.0),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].subcategory, "CLOB");
        assert_eq!(groups[1].category, "Dexes");
        assert_eq!(groups[1].subcategory, "AMM");
        assert_eq!(groups[1].protocol_count, 2);
        assert!((groups[1].avg_tvl - 200.0).abs() < 1e-9);
        assert!((groups[1].yield_potential - 400f64.ln() * 2.0).abs() < 1e-9);
        assert_eq!(groups[2].category, "Lending");
    }

    #[test]
    fn test_aggregate_zero_tvl_group() {
        let groups = CategoryAggregator::aggregate(&[record("A", "NFT", "Mint", 0.0)]);
        assert_eq!(groups[0].yield_potential, 0.0);
        assert_eq!(groups[0].avg_tvl, 0.0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(CategoryAggregator::aggregate(&[]).is_empty());
    }

    // ── synergy_score ─────────────────────────────────────────────────────────

    #[test]
    fn test_synergy_score_formula() {
        let a = group("A", 10.0, 2);
        let b = group("B", 20.0, 1);
        let expected = (10f64.ln() * 2.0 + 20f64.ln()) / 30.0;
        assert!((synergy_score(&a, &b) - expected).abs() < 1e-12);
        assert_eq!(synergy_score(&a, &b), synergy_score(&b, &a));
    }

    #[test]
    fn test_synergy_score_zero_combined_tvl() {
        let a = group("A", 0.0, 1);
        let b = group("B", 0.0, 1);
        assert_eq!(synergy_score(&a, &b), 0.0);
    }

    // ── find_opportunities ────────────────────────────────────────────────────

    #[test]
    fn test_find_opportunities_ordered_emits_both_orderings() {
        // Small TVLs keep ln(tvl)/tvl above the threshold.
        let groups = vec![group("A", 2.0, 1), group("B", 3.0, 1)];
        let opps = CategoryAggregator::find_opportunities(&groups, &config(0.1, PairMode::Ordered));

        assert_eq!(opps.len(), 2);
        assert_eq!(opps[0].synergy_score, opps[1].synergy_score);
        assert_eq!(opps[0].category_a, opps[1].category_b);
        assert_eq!(opps[0].category_b, opps[1].category_a);
    }

    #[test]
    fn test_find_opportunities_unordered_emits_once() {
        let groups = vec![group("A", 2.0, 1), group("B", 3.0, 1), group("C", 4.0, 1)];
        let opps =
            CategoryAggregator::find_opportunities(&groups, &config(0.1, PairMode::Unordered));

        assert_eq!(opps.len(), 3);
        for opp in &opps {
            assert_ne!(opp.category_a, opp.category_b);
        }
    }

    #[test]
    fn test_find_opportunities_threshold_is_strict() {
        let groups = vec![group("A", 2.0, 1), group("B", 3.0, 1)];
        let score = synergy_score(&groups[0], &groups[1]);
        let opps =
            CategoryAggregator::find_opportunities(&groups, &config(score, PairMode::Ordered));
        assert!(opps.is_empty());
    }

    #[test]
    fn test_find_opportunities_sorted_descending() {
        let groups = vec![
            group("A", 2.0, 1),
            group("B", 3.0, 2),
            group("C", 1_000_000.0, 1),
        ];
        let opps = CategoryAggregator::find_opportunities(&groups, &config(0.0, PairMode::Ordered));

        assert_eq!(opps.len(), 6);
        assert!(opps
            .windows(2)
            .all(|w| w[0].synergy_score >= w[1].synergy_score));
    }

    #[test]
    fn test_find_opportunities_ties_follow_yield_potential() {
        // Listed by TVL; B has the higher yield potential.
        let groups = vec![group("A", 3.0, 1), group("B", 2.0, 2)];
        assert!(groups[1].yield_potential > groups[0].yield_potential);

        let ordered = CategoryAggregator::find_opportunities(&groups, &config(0.0, PairMode::Ordered));
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].category_a, "B");
        assert_eq!(ordered[1].category_a, "A");

        let unordered =
            CategoryAggregator::find_opportunities(&groups, &config(0.0, PairMode::Unordered));
        assert_eq!(unordered.len(), 1);
        assert_eq!(unordered[0].category_a, "B");
        assert_eq!(unordered[0].category_b, "A");
    }

    #[test]
    fn test_find_opportunities_large_tvl_below_default_threshold() {
        let groups = vec![group("A", 1e9, 5), group("B", 2e9, 3)];
        let opps = CategoryAggregator::find_opportunities(&groups, &ScoringConfig::default());
        assert!(opps.is_empty());
    }

    #[test]
    fn test_find_opportunities_single_group() {
        let groups = vec![group("A", 2.0, 1)];
        let opps = CategoryAggregator::find_opportunities(&groups, &config(-1.0, PairMode::Ordered));
        assert!(opps.is_empty());
    }

    // ── top_protocols ─────────────────────────────────────────────────────────

    #[test]
    fn test_top_protocols() {
        let records = vec![
            record("Small", "Dexes", "AMM", 1.0),
            record("Big", "Dexes", "AMM", 100.0),
            record("Mid", "Dexes", "AMM", 10.0),
        ];
        let top = CategoryAggregator::top_protocols(&records, 2);
        let names: Vec<&str> = top.iter().map(|r| r.protocol.as_str()).collect();
        assert_eq!(names, vec!["Big", "Mid"]);
    }

    #[test]
    fn test_top_protocols_n_larger_than_input() {
        let records = vec![record("Only", "Dexes", "AMM", 1.0)];
        assert_eq!(CategoryAggregator::top_protocols(&records, 10).len(), 1);
    }
}
