//! Type coercion, date ordering and the missing-value policy.
//!
//! Severity is two-tiered: a single unparseable date fails the whole table,
//! while a numeric cell that cannot be read simply becomes missing and is
//! counted for the caller's later decision.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::{
        Cell, CleanTable, DateFormat, RawTable, SupplyRecord, TypedRow, TypedTable, coerce_cell,
        is_missing_token,
    },
    error::IntakeError,
    schema::{FIELD_COUNT, FieldKind, REQUIRED_SCHEMA, RequiredField},
};

/// Extracts and coerces the required fields of `table`.
///
/// Every required field must already have a column; callers run
/// [`crate::schema::detect_missing`] first.
pub fn coerce_types(table: &RawTable) -> Result<TypedTable, IntakeError> {
    let mut columns = Vec::with_capacity(REQUIRED_SCHEMA.len());
    for field in REQUIRED_SCHEMA {
        let index = table.column_index(field.name()).ok_or_else(|| {
            IntakeError::MissingColumns {
                missing: vec![field],
            }
        })?;
        columns.push((field, index));
    }

    let date_format = column_date_format(table, &columns)?;
    let mut typed = TypedTable::default();
    for (row_idx, raw) in table.rows.iter().enumerate() {
        let line = row_idx + 1;
        let mut cells: [Option<Cell>; FIELD_COUNT] = std::array::from_fn(|_| None);
        for (field, index) in &columns {
            let value = raw.get(*index).map(String::as_str).unwrap_or("");
            let kind = field.kind();
            let cell = coerce_cell(value, kind, date_format).map_err(|_| {
                IntakeError::UnparseableDate {
                    row: line,
                    value: value.to_string(),
                }
            })?;
            if cell.is_none()
                && matches!(kind, FieldKind::Numeric | FieldKind::Percent)
                && !is_missing_token(value)
            {
                *typed.coercion_failures.entry(*field).or_insert(0) += 1;
            }
            cells[field.position()] = cell;
        }
        typed.rows.push(TypedRow { line, cells });
    }

    for (field, count) in &typed.coercion_failures {
        warn!("{count} value(s) in '{field}' could not be read as numbers");
    }
    debug!("Coerced {} row(s)", typed.row_count());
    Ok(typed)
}

/// Layout for the whole date column, taken from its first present value.
fn column_date_format(
    table: &RawTable,
    columns: &[(RequiredField, usize)],
) -> Result<Option<DateFormat>, IntakeError> {
    let Some((_, index)) = columns
        .iter()
        .find(|(field, _)| field.kind() == FieldKind::Date)
    else {
        return Ok(None);
    };
    let Some((row_idx, value)) = table
        .column_values(*index)
        .enumerate()
        .find(|(_, value)| !is_missing_token(value))
    else {
        return Ok(None);
    };
    let format = DateFormat::detect(value).ok_or_else(|| IntakeError::UnparseableDate {
        row: row_idx + 1,
        value: value.to_string(),
    })?;
    debug!("Reading dates with layout {format}");
    Ok(Some(format))
}

/// Stable ascending sort by date; rows without a date go last.
pub fn sort_by_date(mut table: TypedTable) -> TypedTable {
    table.rows.sort_by(|left, right| match (left.date(), right.date()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    table
}

/// Missing-value counts across the required fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingSummary {
    pub per_field: BTreeMap<RequiredField, usize>,
    pub affected_rows: usize,
    pub total_rows: usize,
}

impl MissingSummary {
    pub fn from_table(table: &TypedTable) -> Self {
        let mut summary = MissingSummary {
            total_rows: table.row_count(),
            ..Default::default()
        };
        for row in &table.rows {
            if row.is_complete() {
                continue;
            }
            summary.affected_rows += 1;
            for field in REQUIRED_SCHEMA {
                if row.get(field).is_none() {
                    *summary.per_field.entry(field).or_insert(0) += 1;
                }
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.per_field.is_empty()
    }
}

/// What the caller decided about rows with missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDecision {
    Confirm,
    Decline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    Clean(CleanTable),
    NeedsDecision(MissingSummary),
    Halted(MissingSummary),
}

/// Passes a complete table through, otherwise applies `decision` (or asks
/// for one when it is `None`).
pub fn apply_missing_value_policy(
    table: &TypedTable,
    decision: Option<MissingDecision>,
) -> PolicyOutcome {
    let summary = MissingSummary::from_table(table);
    if summary.is_empty() {
        return PolicyOutcome::Clean(into_clean(table));
    }
    for (field, count) in &summary.per_field {
        warn!("'{field}' has {count} missing value(s)");
    }
    match decision {
        None => PolicyOutcome::NeedsDecision(summary),
        Some(MissingDecision::Decline) => {
            info!("Stopping: rows with missing values were not accepted for removal");
            PolicyOutcome::Halted(summary)
        }
        Some(MissingDecision::Confirm) => {
            let clean = into_clean(table);
            info!(
                "Rows with missing values have been removed. Remaining rows: {}",
                clean.row_count()
            );
            PolicyOutcome::Clean(clean)
        }
    }
}

fn into_clean(table: &TypedTable) -> CleanTable {
    CleanTable {
        records: table.rows.iter().filter_map(SupplyRecord::from_row).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 13] = [
        "Product Category",
        "Inventory Level",
        "Supplier",
        "Lead Time",
        "Order Quantity",
        "Sales",
        "Quality Rating",
        "On-Time Delivery Rate",
        "Date",
        "Warehouse/Location",
        "Shipping Cost",
        "Delivery Time",
        "COGS (Cost of Goods Sold)",
    ];

    fn row(date: &str, lead: &str, quality: &str, otd: &str) -> Vec<String> {
        [
            "Widgets", "100", "Acme", lead, "40", "30", quality, otd, date, "North", "12.5",
            "3", "250",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn raw(rows: Vec<Vec<String>>) -> RawTable {
        RawTable::new(HEADERS.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn coerce_types_converts_each_kind() {
        let typed = coerce_types(&raw(vec![row("2023-01-05", "4", "0.9", "95%")])).unwrap();
        let first = &typed.rows[0];
        assert_eq!(first.get(RequiredField::LeadTime), Some(&Cell::Number(4.0)));
        assert_eq!(
            first.get(RequiredField::OnTimeDeliveryRate),
            Some(&Cell::Number(0.95))
        );
        assert_eq!(
            first.get(RequiredField::Supplier),
            Some(&Cell::Text("Acme".to_string()))
        );
        assert!(first.date().is_some());
        assert!(typed.coercion_failures.is_empty());
    }

    #[test]
    fn unreadable_numbers_become_missing() {
        let typed =
            coerce_types(&raw(vec![row("2023-01-05", "N/A", "great", "95%")])).unwrap();
        let first = &typed.rows[0];
        assert_eq!(first.get(RequiredField::LeadTime), None);
        assert_eq!(first.get(RequiredField::QualityRating), None);
        assert_eq!(
            typed.coercion_failures.get(&RequiredField::QualityRating),
            Some(&1)
        );
        assert_eq!(typed.coercion_failures.get(&RequiredField::LeadTime), None);
    }

    #[test]
    fn one_bad_date_fails_the_table() {
        let err = coerce_types(&raw(vec![
            row("2023-01-05", "4", "0.9", "95%"),
            row("31-31-2023", "4", "0.9", "95%"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            IntakeError::UnparseableDate {
                row: 2,
                value: "31-31-2023".to_string()
            }
        );
    }

    #[test]
    fn date_column_keeps_one_field_order() {
        let err = coerce_types(&raw(vec![
            row("03/04/2023", "4", "0.9", "95%"),
            row("13/04/2023", "4", "0.9", "95%"),
            row("05/04/2023", "4", "0.9", "95%"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            IntakeError::UnparseableDate {
                row: 2,
                value: "13/04/2023".to_string()
            }
        );
    }

    #[test]
    fn date_layout_comes_from_first_present_value() {
        let typed = coerce_types(&raw(vec![
            row("NA", "4", "0.9", "95%"),
            row("14/03/2023", "4", "0.9", "95%"),
            row("02/04/2023", "4", "0.9", "95%"),
        ]))
        .unwrap();
        let dates = typed
            .rows
            .iter()
            .map(|r| r.date().map(|d| d.format("%Y-%m-%d").to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            dates,
            vec![
                None,
                Some("2023-03-14".to_string()),
                Some("2023-04-02".to_string())
            ]
        );
    }

    #[test]
    fn sort_by_date_is_stable_and_puts_missing_last() {
        let typed = coerce_types(&raw(vec![
            row("2023-03-01", "1", "0.9", "95%"),
            row("", "2", "0.9", "95%"),
            row("2023-01-01", "3", "0.9", "95%"),
            row("2023-03-01", "4", "0.9", "95%"),
        ]))
        .unwrap();
        let sorted = sort_by_date(typed);
        let lines = sorted.rows.iter().map(|r| r.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![3, 1, 4, 2]);
    }

    #[test]
    fn missing_values_need_a_decision() {
        let mut rows = (1..=10)
            .map(|day| row(&format!("2023-01-{day:02}"), "4", "0.9", "95%"))
            .collect::<Vec<_>>();
        rows[2][6] = String::new();
        rows[7][6] = "n/a".to_string();
        let typed = coerce_types(&raw(rows)).unwrap();

        let PolicyOutcome::NeedsDecision(summary) = apply_missing_value_policy(&typed, None)
        else {
            panic!("expected a pending decision");
        };
        assert_eq!(summary.per_field.get(&RequiredField::QualityRating), Some(&2));
        assert_eq!(summary.affected_rows, 2);

        assert!(matches!(
            apply_missing_value_policy(&typed, Some(MissingDecision::Decline)),
            PolicyOutcome::Halted(_)
        ));
        let PolicyOutcome::Clean(clean) =
            apply_missing_value_policy(&typed, Some(MissingDecision::Confirm))
        else {
            panic!("expected a clean table");
        };
        assert_eq!(clean.row_count(), 8);
    }

    #[test]
    fn complete_table_passes_without_decision() {
        let typed = coerce_types(&raw(vec![row("2023-01-05", "4", "0.9", "95%")])).unwrap();
        let outcome = apply_missing_value_policy(&typed, Some(MissingDecision::Decline));
        assert!(matches!(outcome, PolicyOutcome::Clean(ref t) if t.row_count() == 1));
    }
}
