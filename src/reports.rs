use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::filter::FilteredView;
use crate::models::{Field, SalesRecord};

pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 90;
pub const DEFAULT_TOP_N: usize = 5;

/// Knobs for the aggregate views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    pub expiry_window_days: i64,
    pub top_n: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

pub fn total_amount(view: &FilteredView) -> f64 {
    view.records().iter().filter_map(|r| r.amount).sum()
}

/// Total quantity, truncated to whole units. `None` when the table has no `Qty` column.
pub fn total_qty(view: &FilteredView) -> Option<i64> {
    if !view.has(Field::Qty) {
        return None;
    }
    let total: f64 = view.records().iter().filter_map(|r| r.qty).sum();
    Some(total as i64)
}

/// Mean scheme discount. `None` for an empty view.
pub fn avg_discount(view: &FilteredView) -> Option<f64> {
    if view.is_empty() {
        return None;
    }
    let total: f64 = view.records().iter().map(|r| r.scm_disc).sum();
    Some(total / view.len() as f64)
}

fn expiring<'v>(
    view: &'v FilteredView<'v>,
    limit: NaiveDateTime,
) -> impl Iterator<Item = &'v SalesRecord> + 'v {
    view.records()
        .iter()
        .copied()
        .filter(move |r| r.exp_date.is_some_and(|exp| exp < limit))
}

/// Rows whose batch expires before `limit`, already-expired ones included.
/// `None` when the table has no `Exp_date` column.
pub fn expiring_batches(view: &FilteredView, limit: NaiveDateTime) -> Option<usize> {
    view.has(Field::ExpDate).then(|| expiring(view, limit).count())
}

// ---------------------------------------------------------------------------
// Monthly trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    /// e.g. "Jan 2025"
    pub label: String,
    pub amount: f64,
}

pub fn monthly_trend(view: &FilteredView) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in view.records() {
        let Some(date) = record.vch_date else {
            continue;
        };
        *months.entry((date.year(), date.month())).or_default() += record.amount.unwrap_or(0.0);
    }
    months
        .into_iter()
        .map(|((year, month), amount)| MonthlyTotal {
            year,
            month,
            label: month_label(year, month),
            amount,
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

// ---------------------------------------------------------------------------
// Top-N
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub name: String,
    pub total: f64,
}

/// Sum `value` per `key`, largest first; equal totals keep first-appearance order.
fn rank_by(
    records: &[&SalesRecord],
    key: impl Fn(&SalesRecord) -> Option<&str>,
    value: impl Fn(&SalesRecord) -> Option<f64>,
    n: usize,
) -> Vec<RankedItem> {
    let mut items: Vec<RankedItem> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for &record in records {
        let Some(name) = key(record) else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            items.push(RankedItem {
                name: name.to_string(),
                total: 0.0,
            });
            items.len() - 1
        });
        items[slot].total += value(record).unwrap_or(0.0);
    }
    items.sort_by(|a, b| b.total.total_cmp(&a.total));
    items.truncate(n);
    items
}

pub fn top_customers(view: &FilteredView, n: usize) -> Vec<RankedItem> {
    rank_by(view.records(), |r| r.customer.as_deref(), |r| r.amount, n)
}

/// Products by quantity sold. `None` when the table has no `Qty` column.
pub fn top_products(view: &FilteredView, n: usize) -> Option<Vec<RankedItem>> {
    view.has(Field::Qty)
        .then(|| rank_by(view.records(), |r| r.product.as_deref(), |r| r.qty, n))
}

// ---------------------------------------------------------------------------
// Discount bucketing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiscountLevel {
    Low,
    Medium,
    High,
}

impl DiscountLevel {
    pub const ALL: [DiscountLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn classify(discount: f64) -> Self {
        if discount <= 10.0 {
            Self::Low
        } else if discount <= 50.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn range(&self) -> &'static str {
        match self {
            Self::Low => "0-10",
            Self::Medium => "10-50",
            Self::High => "50+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountPoint {
    pub discount: f64,
    pub amount: f64,
    pub level: DiscountLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotal {
    pub level: DiscountLevel,
    pub count: usize,
    pub amount: f64,
}

/// One point per row that has an amount, for a discount-vs-sales scatter.
pub fn discount_points(view: &FilteredView) -> Vec<DiscountPoint> {
    view.records()
        .iter()
        .filter_map(|r| {
            r.amount.map(|amount| DiscountPoint {
                discount: r.scm_disc,
                amount,
                level: DiscountLevel::classify(r.scm_disc),
            })
        })
        .collect()
}

pub fn discount_buckets(points: &[DiscountPoint]) -> Vec<BucketTotal> {
    DiscountLevel::ALL
        .iter()
        .map(|&level| {
            let (count, amount) = points
                .iter()
                .filter(|p| p.level == level)
                .fold((0, 0.0), |(c, a), p| (c + 1, a + p.amount));
            BucketTotal { level, count, amount }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Expiring stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiryGroup {
    pub exp_date: NaiveDate,
    pub product: String,
    pub amount: f64,
}

/// Value of stock expiring before `limit`, per (expiry day, product), ordered by day then product.
/// `None` when the table has no `Exp_date` column.
pub fn expiring_soon(view: &FilteredView, limit: NaiveDateTime) -> Option<Vec<ExpiryGroup>> {
    if !view.has(Field::ExpDate) {
        return None;
    }
    let mut groups: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    for record in expiring(view, limit) {
        let (Some(exp), Some(product)) = (record.exp_date, record.product.as_deref()) else {
            continue;
        };
        *groups.entry((exp.date(), product)).or_default() += record.amount.unwrap_or(0.0);
    }
    Some(
        groups
            .into_iter()
            .map(|((exp_date, product), amount)| ExpiryGroup {
                exp_date,
                product: product.to_string(),
                amount,
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Every view derived from one filtered table. Views whose source column is
/// missing are `None` and left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub record_count: usize,
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_qty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiring_batches: Option<usize>,
    pub monthly_trend: Vec<MonthlyTotal>,
    pub top_customers: Vec<RankedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_products: Option<Vec<RankedItem>>,
    pub discount_points: Vec<DiscountPoint>,
    pub discount_buckets: Vec<BucketTotal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiring_soon: Option<Vec<ExpiryGroup>>,
}

pub fn summarize(view: &FilteredView, now: NaiveDateTime, options: &SummaryOptions) -> SalesSummary {
    let limit = chrono::Duration::try_days(options.expiry_window_days)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(NaiveDateTime::MAX);
    let discount_points = discount_points(view);
    SalesSummary {
        record_count: view.len(),
        total_amount: total_amount(view),
        total_qty: total_qty(view),
        avg_discount: avg_discount(view),
        expiring_batches: expiring_batches(view, limit),
        monthly_trend: monthly_trend(view),
        top_customers: top_customers(view, options.top_n),
        top_products: top_products(view, options.top_n),
        discount_buckets: discount_buckets(&discount_points),
        discount_points,
        expiring_soon: expiring_soon(view, limit),
    }
}
