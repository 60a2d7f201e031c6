use std::collections::{BTreeMap, HashMap};

use parley_protocol::{CategoryId, ResourceId};
use serde::Deserialize;
use thiserror::Error;

use crate::rules::{
    AcceptanceRules, BalanceRules, GoldRules, NegotiationRules, RawCategory, RawResource,
    ValuationRules,
};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    /// Path to a negotiation YAML file.
    Path(String),
    Bytes(&'a [u8]),
}

#[derive(Debug, Deserialize)]
struct RawRules {
    #[serde(default)]
    balance: BalanceRules,
    #[serde(default)]
    gold: GoldRules,
    #[serde(default)]
    acceptance: AcceptanceRules,
    #[serde(default)]
    valuation: ValuationRules,
    #[serde(default = "default_haggle_cap")]
    haggle_cap: u8,
    #[serde(default)]
    categories: BTreeMap<String, RawCategory>,
    #[serde(default)]
    resources: BTreeMap<String, RawResource>,
}

fn default_haggle_cap() -> u8 {
    5
}

pub fn load_rules(source: RulesSource<'_>) -> Result<NegotiationRules, RulesError> {
    let raw: RawRules = match source {
        RulesSource::Embedded => {
            let yaml = include_str!("../../data/negotiation.yaml");
            serde_yaml::from_str(yaml)?
        }
        RulesSource::Path(path) => {
            let yaml = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&yaml)?
        }
        RulesSource::Bytes(bytes) => serde_yaml::from_str(std::str::from_utf8(bytes)?)?,
    };

    let rules = compile_rules(raw)?;
    tracing::debug!(
        resources = rules.resources.len(),
        categories = rules.categories.len(),
        "negotiation rules loaded"
    );
    Ok(rules)
}

fn compile_rules(raw: RawRules) -> Result<NegotiationRules, RulesError> {
    validate(&raw)?;

    let category_ids = raw
        .categories
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), CategoryId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let resource_ids = raw
        .resources
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), ResourceId::new(i as u16)))
        .collect::<HashMap<_, _>>();

    let categories = raw
        .categories
        .into_iter()
        .map(|(k, c)| c.compile(k))
        .collect::<Vec<_>>();
    let resources = raw
        .resources
        .into_iter()
        .map(|(k, r)| r.compile(k, &category_ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NegotiationRules {
        balance: raw.balance,
        gold: raw.gold,
        acceptance: raw.acceptance,
        valuation: raw.valuation,
        haggle_cap: raw.haggle_cap,
        categories,
        resources,
        category_ids,
        resource_ids,
    })
}

fn validate(raw: &RawRules) -> Result<(), RulesError> {
    let checks: [(&'static str, i64, bool); 7] = [
        ("balance.granularity", raw.balance.granularity.into(), raw.balance.granularity >= 0),
        (
            "balance.human_generosity_percent",
            raw.balance.human_generosity_percent.into(),
            raw.balance.human_generosity_percent >= 100,
        ),
        ("gold.base_percent", raw.gold.base_percent.into(), raw.gold.base_percent > 0),
        ("gold.min_percent", raw.gold.min_percent.into(), raw.gold.min_percent > 0),
        (
            "gold.rounding_percent",
            raw.gold.rounding_percent.into(),
            raw.gold.rounding_percent > 0,
        ),
        (
            "gold.per_turn_horizon",
            raw.gold.per_turn_horizon.into(),
            raw.gold.per_turn_horizon > 0,
        ),
        (
            "acceptance.disposition_divisor",
            raw.acceptance.disposition_divisor.into(),
            raw.acceptance.disposition_divisor > 0,
        ),
    ];
    for (field, value, ok) in checks {
        if !ok {
            return Err(RulesError::InvalidValue { field, value });
        }
    }
    if raw.resources.len() > usize::from(u16::MAX) {
        return Err(RulesError::InvalidValue {
            field: "resources",
            value: raw.resources.len() as i64,
        });
    }
    Ok(())
}
