//! Unified activity timeline model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Kind of source record behind a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Order,
    Invoice,
    Return,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Order => "order",
            ActivityType::Invoice => "invoice",
            ActivityType::Return => "return",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "order" => Some(ActivityType::Order),
            "invoice" => Some(ActivityType::Invoice),
            "return" => Some(ActivityType::Return),
            _ => None,
        }
    }
}

/// Normalized timeline entry. Returns always carry `amount = 0`: they have
/// no direct monetary value in this view.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub activity_type: ActivityType,
    pub activity_sub_type: String,
    pub description: String,
    pub activity_date: DateTime<Utc>,
    pub amount: Decimal,
    pub client_info: Option<String>,
    pub performed_by_info: Option<String>,
}
