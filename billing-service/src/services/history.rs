//! Activity timeline filtering and pagination over normalized entries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{ActivityEntry, ActivityType};

/// Filter predicates for the unified timeline.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub activity_type: Option<ActivityType>,
    pub client: Option<String>,
    pub performer: Option<String>,
    pub status: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub search: Option<String>,
}

/// One page of the timeline plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub entries: Vec<ActivityEntry>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn matches(entry: &ActivityEntry, filter: &HistoryFilter) -> bool {
    let date = entry.activity_date.date_naive();
    if filter.from.is_some_and(|from| date < from) {
        return false;
    }
    if filter.to.is_some_and(|to| date > to) {
        return false;
    }
    if filter
        .activity_type
        .is_some_and(|t| t != entry.activity_type)
    {
        return false;
    }
    if let Some(client) = &filter.client {
        if !contains_ci(entry.client_info.as_deref(), client) {
            return false;
        }
    }
    if let Some(performer) = &filter.performer {
        if !contains_ci(entry.performed_by_info.as_deref(), performer) {
            return false;
        }
    }
    if let Some(status) = &filter.status {
        if entry.activity_sub_type != *status {
            return false;
        }
    }
    if filter.min_amount.is_some_and(|min| entry.amount < min) {
        return false;
    }
    if filter.max_amount.is_some_and(|max| entry.amount > max) {
        return false;
    }
    if let Some(search) = &filter.search {
        let hit = contains_ci(Some(&entry.description), search)
            || contains_ci(entry.client_info.as_deref(), search)
            || contains_ci(entry.performed_by_info.as_deref(), search);
        if !hit {
            return false;
        }
    }
    true
}

/// Apply the filter, sort by activity date descending, and slice out one
/// page (1-based).
pub fn filter_page(
    entries: Vec<ActivityEntry>,
    filter: &HistoryFilter,
    page: usize,
    page_size: usize,
) -> HistoryPage {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);

    let mut matched: Vec<ActivityEntry> = entries
        .into_iter()
        .filter(|e| matches(e, filter))
        .collect();
    matched.sort_by(|a, b| b.activity_date.cmp(&a.activity_date));

    let total = matched.len();
    let entries = matched
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    HistoryPage {
        total,
        page,
        page_size,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn entry(
        activity_type: ActivityType,
        sub_type: &str,
        description: &str,
        day: u32,
        amount: &str,
        client: Option<&str>,
    ) -> ActivityEntry {
        ActivityEntry {
            activity_type,
            activity_sub_type: sub_type.to_string(),
            description: description.to_string(),
            activity_date: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            amount: dec(amount),
            client_info: client.map(|c| c.to_string()),
            performed_by_info: Some("pharmacist-anna".to_string()),
        }
    }

    fn sample() -> Vec<ActivityEntry> {
        vec![
            entry(ActivityType::Order, "pending", "Order for Ward 3", 1, "120", Some("Ward 3")),
            entry(ActivityType::Invoice, "sent", "Invoice #7", 5, "105", Some("Ward 3")),
            entry(ActivityType::Return, "available", "Return of 3 x Saline", 9, "0", Some("Ward 3")),
            entry(ActivityType::Invoice, "pending", "Invoice #8", 12, "60", Some("Clinic A")),
        ]
    }

    #[test]
    fn sorted_most_recent_first() {
        let page = filter_page(sample(), &HistoryFilter::default(), 1, 10);
        assert_eq!(page.total, 4);
        assert_eq!(page.entries[0].description, "Invoice #8");
        assert_eq!(page.entries[3].description, "Order for Ward 3");
    }

    #[test]
    fn type_and_status_filters() {
        let filter = HistoryFilter {
            activity_type: Some(ActivityType::Invoice),
            status: Some("sent".to_string()),
            ..Default::default()
        };
        let page = filter_page(sample(), &filter, 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].description, "Invoice #7");
    }

    #[test]
    fn date_range_filter() {
        let filter = HistoryFilter {
            from: Some("2026-03-05".parse().unwrap()),
            to: Some("2026-03-09".parse().unwrap()),
            ..Default::default()
        };
        let page = filter_page(sample(), &filter, 1, 10);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn amount_range_excludes_returns_when_min_set() {
        let filter = HistoryFilter {
            min_amount: Some(dec("1")),
            ..Default::default()
        };
        let page = filter_page(sample(), &filter, 1, 10);
        assert!(page
            .entries
            .iter()
            .all(|e| e.activity_type != ActivityType::Return));
    }

    #[test]
    fn free_text_search_spans_fields() {
        let filter = HistoryFilter {
            search: Some("clinic".to_string()),
            ..Default::default()
        };
        let page = filter_page(sample(), &filter, 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].description, "Invoice #8");
    }

    #[test]
    fn pagination_slices_and_reports_total() {
        let page = filter_page(sample(), &HistoryFilter::default(), 2, 3);
        assert_eq!(page.total, 4);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].description, "Order for Ward 3");
    }
}
