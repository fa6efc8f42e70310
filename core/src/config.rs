use crate::{
    clock::RatingClock,
    rate_table::{
        ApplyMode, ModalFactor, RateFactor, RateFee, RateRider, RateTable, RateTableCatalog,
    },
    types::PaymentMode,
};
use std::collections::BTreeMap;

/// Version string stamped on every RateOutput and RatingRun.
pub const ENGINE_VERSION: &str = concat!("rating-engine/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub engine_version: String,
    pub clock:          RatingClock,
    pub rate_tables:    Vec<RateTable>,
}

impl EngineConfig {
    /// Load from the data/ directory: every `*.json` file under
    /// `rate_tables/` is one versioned rate table.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let dir = format!("{data_dir}/rate_tables");
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| anyhow::anyhow!("Cannot read {dir}: {e}"))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rate_tables = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
            let table: RateTable = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid rate table {}: {e}", path.display()))?;
            log::debug!(
                "config: loaded rate table {}@{} from {}",
                table.product_type, table.version, path.display()
            );
            rate_tables.push(table);
        }

        if rate_tables.is_empty() {
            log::warn!("config: no rate tables found under {dir}");
        }

        Ok(Self {
            engine_version: ENGINE_VERSION.to_string(),
            clock:          RatingClock::System,
            rate_tables,
        })
    }

    pub fn catalog(&self) -> RateTableCatalog {
        RateTableCatalog::from_tables(self.rate_tables.iter().cloned())
    }

    /// Config with hand-seeded tables and a pinned date for unit tests.
    pub fn default_test() -> Self {
        Self {
            engine_version: ENGINE_VERSION.to_string(),
            clock:          RatingClock::fixed(2026, 10, 18).unwrap_or_default(),
            rate_tables:    vec![
                disability_income_test_table(),
                disability_income_retired_table(),
                long_term_care_test_table(),
            ],
        }
    }
}

fn factor(code: &str, label: &str, option: &str, mode: ApplyMode, value: f64, is_default: bool) -> RateFactor {
    RateFactor {
        code:         code.into(),
        label:        label.into(),
        option_value: option.into(),
        apply_mode:   mode,
        value,
        is_default,
    }
}

fn rider(code: &str, label: &str, mode: ApplyMode, value: f64, is_default: bool) -> RateRider {
    RateRider {
        code:  code.into(),
        label: label.into(),
        apply_mode: mode,
        value,
        is_default,
    }
}

fn policy_fee(value: f64) -> RateFee {
    RateFee {
        code:       "policy_fee".into(),
        label:      "Annual policy fee".into(),
        fee_type:   "policy".into(),
        apply_mode: ApplyMode::Add,
        value,
    }
}

fn modal(mode: PaymentMode, factor: f64, flat_fee: f64) -> ModalFactor {
    ModalFactor { mode, factor, flat_fee }
}

fn disability_income_test_table() -> RateTable {
    let base_rates: BTreeMap<String, f64> = [
        ("age:30-34|tob:N|ep:90|bp:to65", 24.10),
        ("age:35-39|tob:N|ep:90|bp:to65", 28.50),
        ("age:35-39|tob:T|ep:90|bp:to65", 41.30),
        ("age:35-39|tob:N|ep:30|bp:to65", 36.20),
        ("age:35-39|tob:N|ep:90|bp:5yr",  19.75),
        ("age:40-44|tob:N|ep:90|bp:to65", 34.80),
        ("age:45-49|tob:N|ep:90|bp:to65", 42.60),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    use ApplyMode::*;
    RateTable {
        product_type: "disability_income".into(),
        version:      "2026.1".into(),
        active:       true,
        base_rates,
        factors: vec![
            factor("uw_class", "Underwriting class", "preferred",   Multiply, 0.90, false),
            factor("uw_class", "Underwriting class", "standard",    Multiply, 1.00, true),
            factor("uw_class", "Underwriting class", "substandard", Multiply, 1.25, false),
            factor("state", "State", "TX", Multiply, 0.97, false),
            factor("state", "State", "CA", Multiply, 1.08, false),
            factor("state", "State", "NY", Multiply, 1.12, false),
            factor("occupation_class", "Occupation class", "1", Multiply, 0.85, false),
            factor("occupation_class", "Occupation class", "2", Multiply, 1.00, true),
            factor("occupation_class", "Occupation class", "3", Multiply, 1.20, false),
            factor("occupation_class", "Occupation class", "4", Multiply, 1.45, false),
        ],
        riders: vec![
            rider("cola", "Cost of living adjustment", Percent, 0.18, false),
            rider("residual", "Residual disability", Percent, 0.12, false),
            rider("future_increase", "Future increase option", Add, 45.0, false),
        ],
        fees: vec![policy_fee(50.0)],
        modal_factors: vec![
            modal(PaymentMode::Annual,     1.0,    0.0),
            modal(PaymentMode::Semiannual, 0.52,   0.0),
            modal(PaymentMode::Quarterly,  0.265,  0.0),
            modal(PaymentMode::Monthly,    0.0875, 1.50),
        ],
    }
}

/// Previous DI table, kept so pinned versions and replays still resolve.
fn disability_income_retired_table() -> RateTable {
    let mut table = disability_income_test_table();
    table.version = "2025.4".into();
    table.active = false;
    table
        .base_rates
        .insert("age:35-39|tob:N|ep:90|bp:to65".into(), 27.00);
    table
}

fn long_term_care_test_table() -> RateTable {
    let base_rates: BTreeMap<String, f64> = [
        ("age:50-54|bp:3y", 25.60),
        ("age:55-59|bp:3y", 31.40),
        ("age:55-59|bp:5y", 42.75),
        ("age:60-64|bp:3y", 38.90),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    use ApplyMode::*;
    RateTable {
        product_type: "long_term_care".into(),
        version:      "2026.1".into(),
        active:       true,
        base_rates,
        factors: vec![
            factor("uw_class", "Underwriting class", "preferred", Multiply, 0.85, false),
            factor("uw_class", "Underwriting class", "standard",  Multiply, 1.00, true),
            factor("uw_class", "Underwriting class", "class_2",   Multiply, 1.30, false),
            factor("inflation_protection", "Inflation protection", "none",       Multiply, 1.00, true),
            factor("inflation_protection", "Inflation protection", "simple_3",   Multiply, 1.35, false),
            factor("inflation_protection", "Inflation protection", "compound_3", Multiply, 1.70, false),
            factor("elimination_period", "Elimination period", "30",  Multiply, 1.15, false),
            factor("elimination_period", "Elimination period", "90",  Multiply, 1.00, true),
            factor("elimination_period", "Elimination period", "180", Multiply, 0.90, false),
        ],
        riders: vec![
            rider("shared_care", "Shared care", Percent, 0.10, false),
            rider("return_of_premium", "Return of premium", Percent, 0.25, false),
        ],
        fees: vec![policy_fee(35.0)],
        modal_factors: vec![
            modal(PaymentMode::Annual,  1.0,  0.0),
            modal(PaymentMode::Monthly, 0.09, 0.0),
        ],
    }
}
