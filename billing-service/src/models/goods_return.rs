//! Goods return model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Disposition of returned goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Available,
    Used,
    Damaged,
    Disposed,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Available => "available",
            ReturnStatus::Used => "used",
            ReturnStatus::Damaged => "damaged",
            ReturnStatus::Disposed => "disposed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "available" => Some(ReturnStatus::Available),
            "used" => Some(ReturnStatus::Used),
            "damaged" => Some(ReturnStatus::Damaged),
            "disposed" => Some(ReturnStatus::Disposed),
            _ => None,
        }
    }
}

/// Return record against a single order line. Immutable once disposed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoodsReturn {
    pub return_id: Uuid,
    pub org_id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub returned_quantity: Decimal,
    pub reason: Option<String>,
    pub status: String,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for recording a return.
#[derive(Debug, Clone)]
pub struct CreateReturn {
    pub org_id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub returned_quantity: Decimal,
    pub reason: Option<String>,
    pub created_by: Uuid,
}
