//! Free-text function classifier.
//!
//! Splits a protocol's "what can be done today" text into action phrases and
//! maps each phrase onto the fixed [`FunctionLabel`] taxonomy with an ordered,
//! first-match-wins list of regex rules.

use std::collections::{BTreeMap, HashSet};

use defi_core::config::{ClassifierConfig, LpMatching};
use defi_core::models::{FunctionLabel, FunctionRecord, FunctionSummary, ProtocolRecord};
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Rule patterns in priority order. Earlier rules shadow later ones: a phrase
/// such as "liquid staking" matches `staking` before `liquid_staking` is
/// tried. The bare `lp` alternative is a substring match, so it also fires on
/// words like "help"; see [`LpMatching::WholeWord`].
const DEFAULT_RULES: [(&str, FunctionLabel); 14] = [
    (r"stake|staking|restake|restaking", FunctionLabel::Staking),
    (r"liquid\s*stak", FunctionLabel::LiquidStaking),
    (r"trade|trading|swap", FunctionLabel::Trading),
    (r"leverage|leveraged", FunctionLabel::LeveragedTrading),
    (r"perpetual|perps", FunctionLabel::PerpetualsTrading),
    (r"options|option trading", FunctionLabel::OptionsTrading),
    (r"yield\s*farm", FunctionLabel::YieldFarming),
    (
        r"liquidity\s*provision|provide\s*liquidity|lp",
        FunctionLabel::LiquidityProvision,
    ),
    (r"earn\s*yield|yield\s*generation", FunctionLabel::YieldGeneration),
    (r"borrow|lending|lend", FunctionLabel::Lending),
    (r"margin|margined", FunctionLabel::MarginLending),
    (r"governance", FunctionLabel::Governance),
    (r"insurance", FunctionLabel::Insurance),
    (r"launchpad", FunctionLabel::Launchpad),
];

/// Replacement liquidity-provision pattern for [`LpMatching::WholeWord`].
const WHOLE_WORD_LP_PATTERN: &str = r"liquidity\s*provision|provide\s*liquidity|\blp\b";

// ── Splitting ─────────────────────────────────────────────────────────────────

/// Split free text on commas, bullets and newlines into trimmed, lowercase,
/// non-empty fragments.
pub fn split_functions(text: &str) -> Vec<String> {
    text.split([',', '•', '\n'])
        .map(|fragment| fragment.trim().to_lowercase())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

// ── FunctionRule ──────────────────────────────────────────────────────────────

/// One `(pattern, label)` pair.
#[derive(Debug, Clone)]
pub struct FunctionRule {
    pattern: Regex,
    label: FunctionLabel,
}

impl FunctionRule {
    /// Compile `pattern` case-insensitively.
    pub fn new(pattern: &str, label: FunctionLabel) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern, label })
    }

    pub fn matches(&self, fragment: &str) -> bool {
        self.pattern.is_match(fragment)
    }

    pub fn label(&self) -> FunctionLabel {
        self.label
    }
}

// ── FunctionClassifier ────────────────────────────────────────────────────────

/// Ordered rule list evaluated top to bottom; the first match wins and
/// unmatched phrases become [`FunctionLabel::Other`].
#[derive(Debug, Clone)]
pub struct FunctionClassifier {
    rules: Vec<FunctionRule>,
}

impl Default for FunctionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionClassifier {
    /// Classifier with the built-in rule set.
    pub fn new() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }

    /// Built-in rule set adjusted by `config`.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(pattern, label)| {
                let pattern = match (label, config.lp_matching) {
                    (FunctionLabel::LiquidityProvision, LpMatching::WholeWord) => {
                        WHOLE_WORD_LP_PATTERN
                    }
                    _ => *pattern,
                };
                FunctionRule::new(pattern, *label).expect("built-in rule pattern is valid")
            })
            .collect();
        Self::with_rules(rules)
    }

    /// Classifier with caller-supplied rules, kept in the given order.
    pub fn with_rules(rules: Vec<FunctionRule>) -> Self {
        Self { rules }
    }

    /// Label for a single fragment.
    pub fn classify(&self, fragment: &str) -> FunctionLabel {
        self.rules
            .iter()
            .find(|rule| rule.matches(fragment))
            .map(FunctionRule::label)
            .unwrap_or(FunctionLabel::Other)
    }

    /// Labels for every fragment of `text`, in text order. Missing or blank
    /// text yields no labels.
    pub fn classify_text(&self, text: Option<&str>) -> Vec<FunctionLabel> {
        match text {
            Some(text) => split_functions(text)
                .iter()
                .map(|fragment| self.classify(fragment))
                .collect(),
            None => Vec::new(),
        }
    }

    /// One [`FunctionRecord`] per action phrase across all protocols, with
    /// exact duplicates removed (first occurrence kept).
    pub fn standardize(&self, protocols: &[ProtocolRecord]) -> Vec<FunctionRecord> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for protocol in protocols {
            let labels = self.classify_text(protocol.raw_function_text.as_deref());
            if labels.is_empty() {
                skipped += 1;
                continue;
            }
            records.extend(labels.into_iter().map(|function| FunctionRecord {
                protocol: protocol.protocol.clone(),
                function,
                category: protocol.category.clone(),
                tvl: protocol.tvl,
            }));
        }

        let before = records.len();
        let records = dedupe_function_records(records);
        debug!(
            "Classifier: {} function records ({} duplicates dropped, {} protocols without functions)",
            records.len(),
            before - records.len(),
            skipped
        );
        records
    }
}

// ── Post-processing ───────────────────────────────────────────────────────────

/// Drop records equal to an earlier one on every field.
pub fn dedupe_function_records(records: Vec<FunctionRecord>) -> Vec<FunctionRecord> {
    let mut seen: HashSet<(String, FunctionLabel, String, u64)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.protocol.clone(),
                r.function,
                r.category.clone(),
                r.tvl.to_bits(),
            ))
        })
        .collect()
}

/// Record count and TVL sum per label, largest TVL first.
pub fn summarize_functions(records: &[FunctionRecord]) -> Vec<FunctionSummary> {
    let mut by_label: BTreeMap<FunctionLabel, FunctionSummary> = BTreeMap::new();

    for record in records {
        let entry = by_label
            .entry(record.function)
            .or_insert_with(|| FunctionSummary {
                function: record.function,
                protocol_count: 0,
                total_tvl: 0.0,
            });
        entry.protocol_count += 1;
        entry.total_tvl += record.tvl;
    }

    let mut summary: Vec<FunctionSummary> = by_label.into_values().collect();
    // Stable sort keeps label order among equal totals.
    summary.sort_by(|a, b| b.total_tvl.total_cmp(&a.total_tvl));
    summary
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(name: &str, category: &str, tvl: f64, text: Option<&str>) -> ProtocolRecord {
        ProtocolRecord {
            protocol: name.to_string(),
            category: category.to_string(),
            subcategory: "Sub".to_string(),
            tvl,
            raw_function_text: text.map(str::to_string),
        }
    }

    // ── split_functions ───────────────────────────────────────────────────────

    #[test]
    fn test_split_functions_on_all_delimiters() {
        let parts = split_functions("Stake SOL, Swap • Borrow\nGovernance");
        assert_eq!(parts, vec!["stake sol", "swap", "borrow", "governance"]);
    }

    #[test]
    fn test_split_functions_drops_empty_fragments() {
        assert_eq!(split_functions(" , ,\n\n• "), Vec::<String>::new());
        assert_eq!(split_functions("Swap,,Lend\r\n"), vec!["swap", "lend"]);
    }

    // ── classify ──────────────────────────────────────────────────────────────

    #[test]
    fn test_classify_staking_and_yield_farming() {
        let classifier = FunctionClassifier::new();
        assert_eq!(
            classifier.classify_text(Some("Staking, Yield Farming")),
            vec![FunctionLabel::Staking, FunctionLabel::YieldFarming]
        );
    }

    #[test]
    fn test_classify_first_match_wins() {
        let classifier = FunctionClassifier::new();
        // Matches both the staking and liquid-staking patterns.
        assert_eq!(classifier.classify("liquid staking"), FunctionLabel::Staking);
        // Matches trading before leverage.
        assert_eq!(
            classifier.classify("leveraged trading"),
            FunctionLabel::Trading
        );
        // Matches yield farming before liquidity provision.
        assert_eq!(
            classifier.classify("yield farm with lp tokens"),
            FunctionLabel::YieldFarming
        );
    }

    #[test]
    fn test_classify_each_label_reachable() {
        let classifier = FunctionClassifier::new();
        let cases = [
            ("restake jitosol", FunctionLabel::Staking),
            ("swap tokens", FunctionLabel::Trading),
            ("10x leverage", FunctionLabel::LeveragedTrading),
            ("perps on sol", FunctionLabel::PerpetualsTrading),
            ("buy options", FunctionLabel::OptionsTrading),
            ("yield farming", FunctionLabel::YieldFarming),
            ("provide liquidity", FunctionLabel::LiquidityProvision),
            ("deposit as lp", FunctionLabel::LiquidityProvision),
            ("earn yield on usdc", FunctionLabel::YieldGeneration),
            ("borrow usdc", FunctionLabel::Lending),
            ("margin accounts", FunctionLabel::MarginLending),
            ("vote in governance", FunctionLabel::Governance),
            ("buy insurance cover", FunctionLabel::Insurance),
            ("join launchpad sales", FunctionLabel::Launchpad),
            ("mint nfts", FunctionLabel::Other),
        ];
        for (fragment, expected) in cases {
            assert_eq!(classifier.classify(fragment), expected, "fragment {fragment:?}");
        }
    }

    #[test]
    fn test_classify_lp_substring_by_default() {
        let classifier = FunctionClassifier::new();
        assert_eq!(
            classifier.classify("deposit lps"),
            FunctionLabel::LiquidityProvision
        );
        assert_eq!(
            classifier.classify("lp tokens"),
            FunctionLabel::LiquidityProvision
        );
        assert_eq!(
            classifier.classify("help desk"),
            FunctionLabel::LiquidityProvision
        );
    }

    #[test]
    fn test_classify_lp_whole_word_opt_in() {
        let classifier = FunctionClassifier::from_config(&ClassifierConfig {
            lp_matching: LpMatching::WholeWord,
        });
        assert_eq!(classifier.rules.len(), DEFAULT_RULES.len());
        assert_eq!(
            classifier.classify("lp tokens"),
            FunctionLabel::LiquidityProvision
        );
        assert_eq!(classifier.classify("deposit lps"), FunctionLabel::Other);
        assert_eq!(classifier.classify("help desk"), FunctionLabel::Other);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let classifier = FunctionClassifier::new();
        assert_eq!(classifier.classify("GOVERNANCE"), FunctionLabel::Governance);
    }

    #[test]
    fn test_classify_text_missing_or_empty() {
        let classifier = FunctionClassifier::new();
        assert!(classifier.classify_text(None).is_empty());
        assert!(classifier.classify_text(Some("")).is_empty());
        assert!(classifier.classify_text(Some(" \n ")).is_empty());
    }

    #[test]
    fn test_with_rules_preserves_order() {
        let classifier = FunctionClassifier::with_rules(vec![
            FunctionRule::new("swap", FunctionLabel::LiquidityProvision).unwrap(),
            FunctionRule::new("swap", FunctionLabel::Trading).unwrap(),
        ]);
        assert_eq!(
            classifier.classify("swap"),
            FunctionLabel::LiquidityProvision
        );
    }

    #[test]
    fn test_rule_invalid_pattern() {
        assert!(FunctionRule::new("(unclosed", FunctionLabel::Other).is_err());
    }

    // ── standardize ───────────────────────────────────────────────────────────

    #[test]
    fn test_standardize_carries_category_and_tvl() {
        let classifier = FunctionClassifier::new();
        let records = classifier.standardize(&[protocol(
            "Jito",
            "Liquid Staking",
            100.0,
            Some("Staking, Yield Farming"),
        )]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].protocol, "Jito");
        assert_eq!(records[0].function, FunctionLabel::Staking);
        assert_eq!(records[0].category, "Liquid Staking");
        assert_eq!(records[0].tvl, 100.0);
        assert_eq!(records[1].function, FunctionLabel::YieldFarming);
    }

    #[test]
    fn test_standardize_skips_missing_text() {
        let classifier = FunctionClassifier::new();
        let records = classifier.standardize(&[
            protocol("A", "Dexes", 1.0, None),
            protocol("B", "Dexes", 2.0, Some("")),
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_standardize_dedupes_identical_tuples() {
        let classifier = FunctionClassifier::new();
        let records = classifier.standardize(&[protocol(
            "Raydium",
            "Dexes",
            5.0,
            Some("Swap tokens, Trade memecoins, mint"),
        )]);

        // "swap tokens" and "trade memecoins" both become trading.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].function, FunctionLabel::Trading);
        assert_eq!(records[1].function, FunctionLabel::Other);
    }

    #[test]
    fn test_dedupe_keeps_distinct_tvl() {
        let record = |tvl| FunctionRecord {
            protocol: "A".to_string(),
            function: FunctionLabel::Trading,
            category: "Dexes".to_string(),
            tvl,
        };
        let deduped = dedupe_function_records(vec![record(1.0), record(2.0), record(1.0)]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].tvl, 1.0);
        assert_eq!(deduped[1].tvl, 2.0);
    }

    // ── summarize_functions ───────────────────────────────────────────────────

    #[test]
    fn test_summarize_functions_counts_and_sorts() {
        let classifier = FunctionClassifier::new();
        let records = classifier.standardize(&[
            protocol("A", "Dexes", 10.0, Some("swap, governance")),
            protocol("B", "Dexes", 30.0, Some("trade")),
            protocol("C", "Lending", 5.0, Some("borrow")),
        ]);
        let summary = summarize_functions(&records);

        assert_eq!(summary[0].function, FunctionLabel::Trading);
        assert_eq!(summary[0].protocol_count, 2);
        assert!((summary[0].total_tvl - 40.0).abs() < 1e-9);
        assert_eq!(summary[1].function, FunctionLabel::Governance);
        assert_eq!(summary[2].function, FunctionLabel::Lending);
        assert_eq!(summary.len(), 3);
    }

    #[test]
    fn test_summarize_functions_empty() {
        assert!(summarize_functions(&[]).is_empty());
    }
}
