use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, SmartMedError};
use crate::models::{CleanedTable, Column, Field, SalesRecord};

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Inclusive range of voucher dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SmartMedError::InvalidFilter(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds are midnight timestamps, so a sale later in the day on
    /// `end` falls outside the range.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.and_time(NaiveTime::MIN) <= at && at <= self.end.and_time(NaiveTime::MIN)
    }
}

/// What the user picked. `None` means "no filter" for that dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub date_range: Option<DateRange>,
    pub customer: Option<String>,
    pub product: Option<String>,
}

impl FilterCriteria {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        if let Some(range) = &self.date_range {
            match record.vch_date {
                Some(at) if range.contains(at) => {}
                _ => return false,
            }
        }
        if let Some(customer) = &self.customer {
            if record.customer.as_deref() != Some(customer.as_str()) {
                return false;
            }
        }
        if let Some(product) = &self.product {
            if record.product.as_deref() != Some(product.as_str()) {
                return false;
            }
        }
        true
    }
}

fn parse_day(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        SmartMedError::InvalidFilter(format!("{flag} expects YYYY-MM-DD, got '{raw}'"))
    })
}

/// Build the date range from optional `--from`/`--to` input. A missing bound
/// is taken from `span`, widened so it never lands on the wrong side of the
/// given one; with no bounds at all the whole span is used. Only two
/// user-given bounds in the wrong order are an error.
/// Returns `None` only when nothing bounds the range (no input, no dated rows).
pub fn resolve_date_range(
    from: Option<&str>,
    to: Option<&str>,
    span: Option<(NaiveDate, NaiveDate)>,
) -> Result<Option<DateRange>> {
    let from = from.map(|f| parse_day(f, "--from")).transpose()?;
    let to = to.map(|t| parse_day(t, "--to")).transpose()?;
    if let (Some(start), Some(end)) = (from, to) {
        return DateRange::new(start, end).map(Some);
    }
    // A bound completed from the data never flips the range.
    let start = from.or(span.map(|(lo, _)| to.map_or(lo, |end| lo.min(end))));
    let end = to.or(span.map(|(_, hi)| from.map_or(hi, |start| hi.max(start))));
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end).map(Some),
        (Some(start), None) => DateRange::new(start, NaiveDate::MAX).map(Some),
        (None, Some(end)) => DateRange::new(NaiveDate::MIN, end).map(Some),
        (None, None) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// Borrowed subset of a cleaned table, in source order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a CleanedTable,
    rows: Vec<&'a SalesRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a SalesRecord] {
        &self.rows
    }

    pub fn columns(&self) -> &'a [Column] {
        self.table.columns()
    }

    pub fn has(&self, field: Field) -> bool {
        self.table.has(field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep the rows that satisfy every active criterion.
pub fn apply_filters<'a>(table: &'a CleanedTable, criteria: &FilterCriteria) -> FilteredView<'a> {
    let rows: Vec<&SalesRecord> = table
        .records()
        .iter()
        .filter(|r| criteria.matches(r))
        .collect();
    log::debug!("filter kept {} of {} rows", rows.len(), table.len());
    FilteredView { table, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, RawTable};
    use crate::normalizer::{normalize, Schema};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table(rows: &[(&str, &str, &str, &str)]) -> CleanedTable {
        let raw = RawTable::new(
            vec!["Vch_date".into(), "Particulars".into(), "Unnamed: 1".into(), "Amount".into()],
            rows.iter()
                .map(|(date, cust, prod, amt)| {
                    vec![
                        Cell::from_text(date),
                        Cell::from_text(cust),
                        Cell::from_text(prod),
                        Cell::from_text(amt),
                    ]
                })
                .collect(),
        );
        normalize(&raw, &Schema::default()).unwrap()
    }

    fn amounts(view: &FilteredView) -> Vec<f64> {
        view.records().iter().filter_map(|r| r.amount).collect()
    }

    #[test]
    fn test_no_criteria_keeps_everything() {
        let t = table(&[("2025-01-01", "A", "P", "1"), ("", "", "", "2")]);
        let view = apply_filters(&t, &FilterCriteria::default());
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let t = table(&[
            ("2025-01-01", "A", "P", "1"),
            ("2025-01-15", "A", "P", "2"),
            ("2025-01-31", "A", "P", "3"),
            ("2025-02-01", "A", "P", "4"),
            ("2024-12-31", "A", "P", "5"),
        ]);
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()),
            ..Default::default()
        };
        let view = apply_filters(&t, &criteria);
        assert_eq!(amounts(&view), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_date_range_ends_at_midnight_of_end_day() {
        let t = table(&[
            ("2025-01-01 09:00:00", "A", "P", "1"),
            ("2025-01-31 00:00:00", "A", "P", "2"),
            ("2025-01-31 18:30:00", "A", "P", "3"),
        ]);
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()),
            ..Default::default()
        };
        assert_eq!(amounts(&apply_filters(&t, &criteria)), vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_dates_excluded_when_date_filter_active() {
        let t = table(&[("garbage", "A", "P", "1"), ("2025-01-10", "A", "P", "2")]);
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(d(2000, 1, 1), d(2100, 1, 1)).unwrap()),
            ..Default::default()
        };
        assert_eq!(amounts(&apply_filters(&t, &criteria)), vec![2.0]);
    }

    #[test]
    fn test_customer_filter_exact_match() {
        let t = table(&[
            ("2025-01-01", "A", "P", "100"),
            ("2025-01-02", "B", "P", "200"),
            ("2025-01-03", "A", "P", "50"),
        ]);
        let criteria = FilterCriteria {
            customer: Some("A".to_string()),
            ..Default::default()
        };
        let view = apply_filters(&t, &criteria);
        assert_eq!(view.len(), 2);
        assert_eq!(amounts(&view).iter().sum::<f64>(), 150.0);
    }

    #[test]
    fn test_empty_string_filter_is_not_a_wildcard() {
        let t = table(&[("2025-01-01", "A", "P", "100")]);
        let criteria = FilterCriteria {
            customer: Some(String::new()),
            ..Default::default()
        };
        assert!(apply_filters(&t, &criteria).is_empty());
    }

    #[test]
    fn test_filters_compose_with_and() {
        let t = table(&[
            ("2025-01-01", "A", "Paracetamol", "1"),
            ("2025-01-02", "A", "Cetirizine", "2"),
            ("2025-03-01", "A", "Paracetamol", "3"),
            ("2025-01-03", "B", "Paracetamol", "4"),
        ]);
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()),
            customer: Some("A".to_string()),
            product: Some("Paracetamol".to_string()),
        };
        assert_eq!(amounts(&apply_filters(&t, &criteria)), vec![1.0]);
    }

    #[test]
    fn test_resolve_date_range_defaults_to_span() {
        let span = Some((d(2025, 1, 1), d(2025, 3, 31)));
        let range = resolve_date_range(None, None, span).unwrap().unwrap();
        assert_eq!(range, DateRange { start: d(2025, 1, 1), end: d(2025, 3, 31) });

        let range = resolve_date_range(Some("2025-02-01"), None, span).unwrap().unwrap();
        assert_eq!(range.start, d(2025, 2, 1));
        assert_eq!(range.end, d(2025, 3, 31));

        assert_eq!(resolve_date_range(None, None, None).unwrap(), None);
    }

    #[test]
    fn test_one_sided_bound_outside_span_gives_empty_range() {
        let span = Some((d(2025, 1, 1), d(2025, 3, 31)));

        let range = resolve_date_range(Some("2025-04-01"), None, span).unwrap().unwrap();
        assert_eq!(range, DateRange { start: d(2025, 4, 1), end: d(2025, 4, 1) });

        let range = resolve_date_range(None, Some("2024-12-01"), span).unwrap().unwrap();
        assert_eq!(range, DateRange { start: d(2024, 12, 1), end: d(2024, 12, 1) });

        let t = table(&[("2025-01-10", "A", "P", "1"), ("2025-03-31", "A", "P", "2")]);
        let criteria = FilterCriteria {
            date_range: resolve_date_range(Some("2025-04-01"), None, t.date_span()).unwrap(),
            ..Default::default()
        };
        assert!(apply_filters(&t, &criteria).is_empty());
    }

    #[test]
    fn test_resolve_date_range_rejects_bad_input() {
        assert!(resolve_date_range(Some("01/02/2025"), None, None).is_err());
        assert!(resolve_date_range(Some("2025-02-01"), Some("2025-01-01"), None).is_err());
        let span = Some((d(2025, 1, 1), d(2025, 3, 31)));
        assert!(resolve_date_range(Some("2025-02-01"), Some("2025-01-01"), span).is_err());
    }
}
