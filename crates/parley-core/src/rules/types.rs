use std::collections::{BTreeMap, HashMap};

use parley_protocol::{CategoryId, DataId, ResourceId, TradeItemKind};
use serde::Deserialize;

use crate::rules::RulesError;

// =============================================================================
// Tunables
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BalanceRules {
    pub granularity: i32,
    pub swap_tolerance: i32,
    pub category_cap: u8,
    pub human_generosity_percent: i32,
}

impl Default for BalanceRules {
    fn default() -> Self {
        Self {
            granularity: 5,
            swap_tolerance: 15,
            category_cap: 2,
            human_generosity_percent: 125,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GoldRules {
    pub base_percent: i32,
    pub min_percent: i32,
    pub decay_percent: i32,
    pub decay_interval_turns: u32,
    pub rounding_percent: i32,
    pub per_turn_horizon: i32,
}

impl Default for GoldRules {
    fn default() -> Self {
        Self {
            base_percent: 100,
            min_percent: 40,
            decay_percent: 10,
            decay_interval_turns: 60,
            rounding_percent: 10,
            per_turn_horizon: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AcceptanceRules {
    pub base_percent: i32,
    pub disposition_divisor: i32,
    pub duration_step_turns: u32,
    pub duration_cap_percent: i32,
    pub rank_step_percent: i32,
    pub rank_cap_percent: i32,
    pub war_penalty_percent: i32,
    pub wronged_penalty_percent: i32,
    pub haggle_step_percent: i32,
    pub reconsider_decay_percent: i32,
    pub reconsider_penalty_percent: i32,
    pub gift_allowance_divisor: i32,
    pub gift_allowance_cap: i32,
    pub min_percent: i32,
    pub max_percent: i32,
}

impl Default for AcceptanceRules {
    fn default() -> Self {
        Self {
            base_percent: 100,
            disposition_divisor: 5,
            duration_step_turns: 25,
            duration_cap_percent: 10,
            rank_step_percent: 3,
            rank_cap_percent: 12,
            war_penalty_percent: 30,
            wronged_penalty_percent: 20,
            haggle_step_percent: 4,
            reconsider_decay_percent: 50,
            reconsider_penalty_percent: 10,
            gift_allowance_divisor: 4,
            gift_allowance_cap: 25,
            min_percent: 60,
            max_percent: 200,
        }
    }
}

/// Per-kind reference values for the table-driven oracle.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ValuationRules {
    /// Owners value losing an item at this percentage of its gain value.
    #[serde(default = "default_loss_percent")]
    pub loss_percent: i32,
    #[serde(default)]
    pub base: BTreeMap<TradeItemKind, i32>,
}

fn default_loss_percent() -> i32 {
    100
}

impl Default for ValuationRules {
    fn default() -> Self {
        Self {
            loss_percent: default_loss_percent(),
            base: BTreeMap::new(),
        }
    }
}

impl ValuationRules {
    pub fn base_value(&self, kind: TradeItemKind) -> Option<i32> {
        self.base.get(&kind).copied()
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceCategory {
    pub data_id: DataId,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceType {
    pub data_id: DataId,
    /// Protected category this resource counts toward, if any.
    pub category: Option<CategoryId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCategory {
    #[serde(default)]
    pub description: String,
}

impl RawCategory {
    pub(crate) fn compile(self, data_id: DataId) -> ResourceCategory {
        ResourceCategory {
            data_id,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawResource {
    #[serde(default)]
    pub category: Option<DataId>,
}

impl RawResource {
    pub(crate) fn compile(
        self,
        data_id: DataId,
        category_ids: &HashMap<DataId, CategoryId>,
    ) -> Result<ResourceType, RulesError> {
        let category = match self.category {
            Some(name) => Some(
                category_ids
                    .get(&name)
                    .copied()
                    .ok_or(RulesError::MissingId(name))?,
            ),
            None => None,
        };
        Ok(ResourceType { data_id, category })
    }
}

// =============================================================================
// Compiled rules
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct NegotiationRules {
    pub balance: BalanceRules,
    pub gold: GoldRules,
    pub acceptance: AcceptanceRules,
    pub valuation: ValuationRules,
    pub haggle_cap: u8,

    pub categories: Vec<ResourceCategory>,
    pub resources: Vec<ResourceType>,

    pub category_ids: HashMap<DataId, CategoryId>,
    pub resource_ids: HashMap<DataId, ResourceId>,
}

impl NegotiationRules {
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceType> {
        self.resources.get(id.raw as usize)
    }

    /// Protected category of `id`, `None` for unprotected or unknown resources.
    pub fn resource_category(&self, id: ResourceId) -> Option<CategoryId> {
        self.resource(id).and_then(|r| r.category)
    }

    pub fn category(&self, id: CategoryId) -> Option<&ResourceCategory> {
        self.categories.get(id.raw as usize)
    }

    pub fn resource_id(&self, data_id: &str) -> Option<ResourceId> {
        self.resource_ids.get(data_id).copied()
    }

    pub fn category_id(&self, data_id: &str) -> Option<CategoryId> {
        self.category_ids.get(data_id).copied()
    }
}
