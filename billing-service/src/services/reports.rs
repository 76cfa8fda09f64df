//! Financial aggregation helpers: aging buckets, monthly trend merge, tax
//! estimate. Read-only; the SQL sums live in the database service.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::services::money;

/// Outstanding invoice amounts bucketed by days overdue.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgingBuckets {
    pub days_0_7: Decimal,
    pub days_8_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_plus: Decimal,
}

/// Bucket outstanding amounts by age since due date, relative to the
/// caller-supplied `today` (injected so results are testable and stable
/// within one request). Invoices not yet due land in the 0-7 bucket.
pub fn bucket_outstanding(items: &[(NaiveDate, Decimal)], today: NaiveDate) -> AgingBuckets {
    let mut buckets = AgingBuckets::default();

    for (due_date, outstanding) in items {
        let days = (today - *due_date).num_days().max(0);
        let slot = match days {
            0..=7 => &mut buckets.days_0_7,
            8..=30 => &mut buckets.days_8_30,
            31..=60 => &mut buckets.days_31_60,
            _ => &mut buckets.days_61_plus,
        };
        *slot = money::add(*slot, *outstanding);
    }

    buckets
}

/// One month of the revenue/expense trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// Calendar month, `YYYY-MM`.
    pub month: String,
    pub revenue: Decimal,
    pub expenses: Decimal,
}

/// Merge per-month revenue and expense sums into one ordered trend. Months
/// present on only one side appear with zero on the other.
pub fn merge_monthly(
    revenue: &[(NaiveDate, Decimal)],
    expenses: &[(NaiveDate, Decimal)],
) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

    for (month, amount) in revenue {
        let entry = months.entry(month.format("%Y-%m").to_string()).or_default();
        entry.0 = money::add(entry.0, *amount);
    }
    for (month, amount) in expenses {
        let entry = months.entry(month.format("%Y-%m").to_string()).or_default();
        entry.1 = money::add(entry.1, *amount);
    }

    months
        .into_iter()
        .map(|(month, (revenue, expenses))| MonthlyTrend {
            month,
            revenue,
            expenses,
        })
        .collect()
}

/// Estimated tax liability on net profit. Never negative: a loss owes no
/// tax.
pub fn tax_estimate(net_profit: Decimal, rate: Decimal) -> Decimal {
    if net_profit <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        money::multiply(net_profit, rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn buckets_split_on_boundaries() {
        let today = date("2026-08-07");
        let items = vec![
            (date("2026-08-07"), dec("10")),  // 0 days
            (date("2026-07-31"), dec("20")),  // 7 days
            (date("2026-07-30"), dec("30")),  // 8 days
            (date("2026-07-08"), dec("40")),  // 30 days
            (date("2026-07-07"), dec("50")),  // 31 days
            (date("2026-06-08"), dec("60")),  // 60 days
            (date("2026-06-07"), dec("70")),  // 61 days
        ];
        let buckets = bucket_outstanding(&items, today);

        assert_eq!(buckets.days_0_7, dec("30"));
        assert_eq!(buckets.days_8_30, dec("70"));
        assert_eq!(buckets.days_31_60, dec("110"));
        assert_eq!(buckets.days_61_plus, dec("70"));
    }

    #[test]
    fn not_yet_due_counts_as_current() {
        let buckets = bucket_outstanding(&[(date("2026-09-01"), dec("15"))], date("2026-08-07"));
        assert_eq!(buckets.days_0_7, dec("15"));
    }

    #[test]
    fn monthly_merge_aligns_months() {
        let trend = merge_monthly(
            &[(date("2026-01-01"), dec("100")), (date("2026-02-01"), dec("200"))],
            &[(date("2026-02-01"), dec("80"))],
        );

        assert_eq!(
            trend,
            vec![
                MonthlyTrend {
                    month: "2026-01".to_string(),
                    revenue: dec("100.00"),
                    expenses: Decimal::ZERO,
                },
                MonthlyTrend {
                    month: "2026-02".to_string(),
                    revenue: dec("200.00"),
                    expenses: dec("80.00"),
                },
            ]
        );
    }

    #[test]
    fn tax_estimate_is_never_negative() {
        assert_eq!(tax_estimate(dec("100"), dec("0.18")), dec("18.00"));
        assert_eq!(tax_estimate(dec("-50"), dec("0.18")), Decimal::ZERO);
    }
}
