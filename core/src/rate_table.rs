//! Rate table catalog: read-only, versioned pricing data per product type.
//!
//! Tables are seeded elsewhere and loaded through `EngineConfig`.
//! Plugins and the options query only ever read them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::types::PaymentMode;

/// How a catalog value is applied to a running premium.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// delta = running × (value − 1)
    Multiply,
    /// delta = value
    Add,
    /// delta = running × value
    Percent,
}

impl ApplyMode {
    pub fn delta(&self, running: f64, value: f64) -> f64 {
        match self {
            Self::Multiply => running * (value - 1.0),
            Self::Add      => value,
            Self::Percent  => running * value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateFactor {
    pub code:         String,
    pub label:        String,
    pub option_value: String,
    pub apply_mode:   ApplyMode,
    pub value:        f64,
    #[serde(default)]
    pub is_default:   bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateRider {
    pub code:       String,
    pub label:      String,
    pub apply_mode: ApplyMode,
    pub value:      f64,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateFee {
    pub code:       String,
    pub label:      String,
    pub fee_type:   String,
    pub apply_mode: ApplyMode,
    pub value:      f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalFactor {
    pub mode:     PaymentMode,
    pub factor:   f64,
    #[serde(default)]
    pub flat_fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateTable {
    pub product_type: String,
    pub version:      String,
    #[serde(default = "default_active")]
    pub active:       bool,
    /// Annual rate per unit of exposure, keyed by the plugin's rate key.
    pub base_rates:   BTreeMap<String, f64>,
    #[serde(default)]
    pub factors:       Vec<RateFactor>,
    #[serde(default)]
    pub riders:        Vec<RateRider>,
    #[serde(default)]
    pub fees:          Vec<RateFee>,
    #[serde(default)]
    pub modal_factors: Vec<ModalFactor>,
}

fn default_active() -> bool {
    true
}

impl RateTable {
    pub fn base_rate(&self, key: &str) -> Option<f64> {
        self.base_rates.get(key).copied()
    }

    pub fn modal_factor(&self, mode: PaymentMode) -> Option<&ModalFactor> {
        self.modal_factors.iter().find(|m| m.mode == mode)
    }

    /// Distinct factor codes in catalog order.
    pub fn factor_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for f in &self.factors {
            if !codes.contains(&f.code.as_str()) {
                codes.push(&f.code);
            }
        }
        codes
    }

    pub fn factor_option(&self, code: &str, option_value: &str) -> Option<&RateFactor> {
        self.factors
            .iter()
            .find(|f| f.code == code && f.option_value.eq_ignore_ascii_case(option_value))
    }

    pub fn default_factor(&self, code: &str) -> Option<&RateFactor> {
        self.factors.iter().find(|f| f.code == code && f.is_default)
    }
}

/// Read access to rate tables. Implemented by the in-memory catalog;
/// a database-backed source can implement it the same way.
pub trait RateTableSource: Send + Sync {
    /// With `version` pinned, the exact version (active or retired).
    /// Otherwise the active table with the greatest version.
    fn active_table(&self, product_type: &str, version: Option<&str>) -> Option<Arc<RateTable>>;
}

#[derive(Debug, Clone, Default)]
pub struct RateTableCatalog {
    tables: HashMap<String, Vec<Arc<RateTable>>>,
}

impl RateTableCatalog {
    pub fn from_tables(tables: impl IntoIterator<Item = RateTable>) -> Self {
        let mut catalog = Self::default();
        for table in tables {
            catalog.insert(table);
        }
        catalog
    }

    pub fn insert(&mut self, table: RateTable) {
        let versions = self.tables.entry(table.product_type.clone()).or_default();
        versions.retain(|t| t.version != table.version);
        versions.push(Arc::new(table));
    }

    pub fn product_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.tables.keys().cloned().collect();
        types.sort();
        types
    }
}

impl RateTableSource for RateTableCatalog {
    fn active_table(&self, product_type: &str, version: Option<&str>) -> Option<Arc<RateTable>> {
        let versions = self.tables.get(product_type)?;
        match version {
            Some(v) => versions.iter().find(|t| t.version == v).cloned(),
            None => versions
                .iter()
                .filter(|t| t.active)
                .max_by(|a, b| a.version.cmp(&b.version))
                .cloned(),
        }
    }
}

// ── Options projection ──────────────────────────────────────────────

/// Picklist-shaped view of a rate table for configuration UIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductOptions {
    pub product_type:       String,
    pub rate_table_version: String,
    pub factors:            BTreeMap<String, FactorGroup>,
    pub riders:             Vec<RiderOption>,
    pub fees:               Vec<FeeOption>,
    pub modal_factors:      Vec<ModalOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorGroup {
    pub code:    String,
    pub label:   String,
    pub options: Vec<FactorOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorOption {
    pub value:      String,
    pub apply_mode: ApplyMode,
    pub factor:     f64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiderOption {
    pub code:       String,
    pub label:      String,
    pub apply_mode: ApplyMode,
    pub value:      f64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeOption {
    pub code:       String,
    pub label:      String,
    pub fee_type:   String,
    pub apply_mode: ApplyMode,
    pub value:      f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalOption {
    pub mode:     PaymentMode,
    pub factor:   f64,
    pub flat_fee: f64,
}

impl ProductOptions {
    pub fn from_table(table: &RateTable) -> Self {
        let mut factors: BTreeMap<String, FactorGroup> = BTreeMap::new();
        for f in &table.factors {
            let group = factors.entry(f.code.clone()).or_insert_with(|| FactorGroup {
                code:    f.code.clone(),
                label:   f.label.clone(),
                options: Vec::new(),
            });
            group.options.push(FactorOption {
                value:      f.option_value.clone(),
                apply_mode: f.apply_mode,
                factor:     f.value,
                is_default: f.is_default,
            });
        }

        Self {
            product_type:       table.product_type.clone(),
            rate_table_version: table.version.clone(),
            factors,
            riders: table
                .riders
                .iter()
                .map(|r| RiderOption {
                    code:       r.code.clone(),
                    label:      r.label.clone(),
                    apply_mode: r.apply_mode,
                    value:      r.value,
                    is_default: r.is_default,
                })
                .collect(),
            fees: table
                .fees
                .iter()
                .map(|f| FeeOption {
                    code:       f.code.clone(),
                    label:      f.label.clone(),
                    fee_type:   f.fee_type.clone(),
                    apply_mode: f.apply_mode,
                    value:      f.value,
                })
                .collect(),
            modal_factors: table
                .modal_factors
                .iter()
                .map(|m| ModalOption {
                    mode:     m.mode,
                    factor:   m.factor,
                    flat_fee: m.flat_fee,
                })
                .collect(),
        }
    }
}
