//! # models::position
//!
//! Defines [`Position`] — the order/holding descriptor that entry and action
//! nodes declare.  Exit, modify and retry nodes never own positions; they
//! point at them through `targetPositionId` / `targetPositionVpi` /
//! `targetNodeId`, which is why every position carries a stable `id` plus the
//! user-facing VPI/VPT labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FlowError;
use crate::models::graph::NodeId;

// ─── Enums ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductType {
    #[default]
    Intraday,
    CarryForward,
}

/// Call / Put leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    CE,
    PE,
}

// ─── OptionDetails ────────────────────────────────────────────────────────────

/// Option leg description for positions on an options instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDetails {
    /// Expiry selector, e.g. `"W0"` (current weekly) or `"M1"`.
    pub expiry: String,
    /// Strike selection mode, e.g. `"ATM"`, `"ITM"`, `"OTM"`, `"premium"`.
    pub strike_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_value: Option<f64>,
    pub option_type: OptionType,
}

// ─── Position ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,

    /// Virtual position identifier — referenced by exit nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpi: Option<String>,

    /// Virtual position tag — free-form grouping label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    #[serde(default)]
    pub position_type: PositionSide,

    #[serde(default)]
    pub order_type: OrderType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lots: Option<u32>,

    #[serde(default)]
    pub product_type: ProductType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_details: Option<OptionDetails>,

    /// Node that declared this position (filled in by the editor on insert).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_node_id: Option<NodeId>,

    #[serde(rename = "_lastUpdated", default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// A 1-lot intraday market order on `side` with a fresh id.
    pub fn new(side: PositionSide) -> Self {
        Self {
            id:             format!("pos-{}", Uuid::new_v4().simple()),
            vpi:            None,
            vpt:            None,
            priority:       None,
            position_type:  side,
            order_type:     OrderType::Market,
            limit_price:    None,
            lots:           Some(1),
            product_type:   ProductType::Intraday,
            option_details: None,
            source_node_id: None,
            last_updated:   Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Field-level checks the editor runs before accepting a position.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.order_type == OrderType::Limit {
            match self.limit_price {
                Some(p) if p > 0.0 => {}
                _ => {
                    return Err(FlowError::InvalidPosition {
                        id:     self.id.clone(),
                        reason: "limit orders need a positive limitPrice".into(),
                    })
                }
            }
        }
        if self.lots == Some(0) {
            return Err(FlowError::InvalidPosition {
                id:     self.id.clone(),
                reason: "lots must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Does `label` name this position through its id or VPI?
    pub fn answers_to(&self, label: &str) -> bool {
        self.id == label || self.vpi.as_deref() == Some(label)
    }
}
