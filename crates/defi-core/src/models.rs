use serde::{Deserialize, Serialize};
use std::fmt;

/// One protocol row from the source CSV after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    /// Protocol display name.
    pub protocol: String,
    /// Top-level category, e.g. `"Dexes"`.
    pub category: String,
    /// Finer-grained subcategory, e.g. `"AMM"`.
    pub subcategory: String,
    /// Total value locked in USD. Never negative; malformed source values are 0.
    pub tvl: f64,
    /// Free-text description of what can be done with the protocol.
    /// `None` when the source cell was empty.
    #[serde(default)]
    pub raw_function_text: Option<String>,
}

/// Standardized protocol function taxonomy.
///
/// The declaration order matches the classifier's rule order, with
/// [`FunctionLabel::Other`] as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionLabel {
    Staking,
    LiquidStaking,
    Trading,
    LeveragedTrading,
    PerpetualsTrading,
    OptionsTrading,
    YieldFarming,
    LiquidityProvision,
    YieldGeneration,
    Lending,
    MarginLending,
    Governance,
    Insurance,
    Launchpad,
    Other,
}

impl FunctionLabel {
    /// Every label, in declaration order.
    pub const ALL: [FunctionLabel; 15] = [
        FunctionLabel::Staking,
        FunctionLabel::LiquidStaking,
        FunctionLabel::Trading,
        FunctionLabel::LeveragedTrading,
        FunctionLabel::PerpetualsTrading,
        FunctionLabel::OptionsTrading,
        FunctionLabel::YieldFarming,
        FunctionLabel::LiquidityProvision,
        FunctionLabel::YieldGeneration,
        FunctionLabel::Lending,
        FunctionLabel::MarginLending,
        FunctionLabel::Governance,
        FunctionLabel::Insurance,
        FunctionLabel::Launchpad,
        FunctionLabel::Other,
    ];

    /// The snake_case name written to CSV and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionLabel::Staking => "staking",
            FunctionLabel::LiquidStaking => "liquid_staking",
            FunctionLabel::Trading => "trading",
            FunctionLabel::LeveragedTrading => "leveraged_trading",
            FunctionLabel::PerpetualsTrading => "perpetuals_trading",
            FunctionLabel::OptionsTrading => "options_trading",
            FunctionLabel::YieldFarming => "yield_farming",
            FunctionLabel::LiquidityProvision => "liquidity_provision",
            FunctionLabel::YieldGeneration => "yield_generation",
            FunctionLabel::Lending => "lending",
            FunctionLabel::MarginLending => "margin_lending",
            FunctionLabel::Governance => "governance",
            FunctionLabel::Insurance => "insurance",
            FunctionLabel::Launchpad => "launchpad",
            FunctionLabel::Other => "other",
        }
    }
}

impl fmt::Display for FunctionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single standardized action offered by a protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    #[serde(rename = "Protocol")]
    pub protocol: String,
    #[serde(rename = "Function")]
    pub function: FunctionLabel,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "TVL")]
    pub tvl: f64,
}

/// Per-label totals over all [`FunctionRecord`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSummary {
    #[serde(rename = "Function")]
    pub function: FunctionLabel,
    #[serde(rename = "Number of Protocols")]
    pub protocol_count: usize,
    #[serde(rename = "Total TVL")]
    pub total_tvl: f64,
}

/// TVL and protocol totals for one `(category, subcategory)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub category: String,
    pub subcategory: String,
    pub total_tvl: f64,
    pub protocol_count: usize,
    pub avg_tvl: f64,
    /// `ln(total_tvl) * protocol_count`, or `0.0` when `total_tvl <= 0`.
    pub yield_potential: f64,
}

/// A pair of category groups whose combined yield potential is high
/// relative to their combined TVL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynergyOpportunity {
    pub category_a: String,
    pub subcategory_a: String,
    pub category_b: String,
    pub subcategory_b: String,
    pub synergy_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_label_as_str_matches_serde() {
        for label in FunctionLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
    }

    #[test]
    fn test_function_label_display() {
        assert_eq!(FunctionLabel::YieldFarming.to_string(), "yield_farming");
        assert_eq!(FunctionLabel::Other.to_string(), "other");
    }

    #[test]
    fn test_function_record_serializes_with_report_headers() {
        let record = FunctionRecord {
            protocol: "Jito".to_string(),
            function: FunctionLabel::LiquidStaking,
            category: "Liquid Staking".to_string(),
            tvl: 10.5,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Protocol"], "Jito");
        assert_eq!(value["Function"], "liquid_staking");
        assert_eq!(value["TVL"], 10.5);
    }
}
