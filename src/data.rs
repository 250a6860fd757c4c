use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use encoding_rs::Encoding;
use serde::Serialize;

use crate::{
    io_utils,
    schema::{FIELD_COUNT, FieldKind, REQUIRED_SCHEMA, RequiredField, normalize_header},
};

/// Tokens read as "no value", matching what common dataframe CSV readers
/// treat as missing. Comparison is case-sensitive.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%d.%m.%Y",
    "%Y%m%d", "%b %d %Y", "%d %b %Y", "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// An uploaded table before any validation: headers plus string cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Reads a delimited file into memory. Ragged rows are rejected.
    pub fn read(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::UploadReader::open(path, delimiter, encoding)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let rows = reader.rows()?;
        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column whose normalized header equals `name`'s.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.headers
            .iter()
            .position(|header| normalize_header(header) == wanted)
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(value) => f.write_str(value),
            Cell::Number(value) => write!(f, "{}", format_number(*value)),
            Cell::Date(value) => write!(f, "{}", format_date(value)),
        }
    }
}

/// One row of required fields after coercion; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    /// 1-based data row number in the uploaded file.
    pub line: usize,
    pub cells: [Option<Cell>; FIELD_COUNT],
}

impl TypedRow {
    pub fn get(&self, field: RequiredField) -> Option<&Cell> {
        self.cells[field.position()].as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get(RequiredField::Date).and_then(Cell::as_date)
    }
}

/// Required fields after type coercion, before missing-value resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedTable {
    pub rows: Vec<TypedRow>,
    /// Cells that held a value which failed numeric coercion, per field.
    pub coercion_failures: BTreeMap<RequiredField, usize>,
}

impl TypedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A fully populated row. Only produced from a complete [`TypedRow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRecord {
    #[serde(rename = "product category")]
    pub product_category: String,
    #[serde(rename = "inventory level")]
    pub inventory_level: f64,
    pub supplier: String,
    #[serde(rename = "lead time")]
    pub lead_time: f64,
    #[serde(rename = "order quantity")]
    pub order_quantity: f64,
    pub sales: f64,
    #[serde(rename = "quality rating")]
    pub quality_rating: f64,
    #[serde(rename = "on-time delivery rate")]
    pub on_time_delivery_rate: f64,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDateTime,
    #[serde(rename = "warehouse/location")]
    pub warehouse_location: String,
    #[serde(rename = "shipping cost")]
    pub shipping_cost: f64,
    #[serde(rename = "delivery time")]
    pub delivery_time: f64,
    #[serde(rename = "cogs (cost of goods sold)")]
    pub cost_of_goods_sold: f64,
}

impl SupplyRecord {
    pub fn from_row(row: &TypedRow) -> Option<Self> {
        let text = |field| row.get(field).and_then(Cell::as_text).map(str::to_string);
        let number = |field| row.get(field).and_then(Cell::as_number);
        Some(Self {
            product_category: text(RequiredField::ProductCategory)?,
            inventory_level: number(RequiredField::InventoryLevel)?,
            supplier: text(RequiredField::Supplier)?,
            lead_time: number(RequiredField::LeadTime)?,
            order_quantity: number(RequiredField::OrderQuantity)?,
            sales: number(RequiredField::Sales)?,
            quality_rating: number(RequiredField::QualityRating)?,
            on_time_delivery_rate: number(RequiredField::OnTimeDeliveryRate)?,
            date: row.date()?,
            warehouse_location: text(RequiredField::WarehouseLocation)?,
            shipping_cost: number(RequiredField::ShippingCost)?,
            delivery_time: number(RequiredField::DeliveryTime)?,
            cost_of_goods_sold: number(RequiredField::CostOfGoodsSold)?,
        })
    }

    /// Cells in [`REQUIRED_SCHEMA`] order, rendered for display.
    pub fn display_cells(&self) -> Vec<String> {
        vec![
            self.product_category.clone(),
            format_number(self.inventory_level),
            self.supplier.clone(),
            format_number(self.lead_time),
            format_number(self.order_quantity),
            format_number(self.sales),
            format_number(self.quality_rating),
            format_number(self.on_time_delivery_rate),
            format_date(&self.date),
            self.warehouse_location.clone(),
            format_number(self.shipping_cost),
            format_number(self.delivery_time),
            format_number(self.cost_of_goods_sold),
        ]
    }
}

/// Output of a successful intake: every required field present on every row,
/// sorted ascending by date.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CleanTable {
    pub records: Vec<SupplyRecord>,
}

impl CleanTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn headers() -> Vec<String> {
        REQUIRED_SCHEMA
            .iter()
            .map(|field| field.name().to_string())
            .collect()
    }
}

pub fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS.contains(&value) || MISSING_TOKENS.contains(&value.trim())
}

/// One accepted date layout. A date column is read with a single layout,
/// picked from its first present value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    DateTime(&'static str),
    Date(&'static str),
    Rfc3339,
}

impl DateFormat {
    /// First accepted layout that reads `value`, date-times before dates.
    pub fn detect(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        DATETIME_FORMATS
            .iter()
            .map(|layout| DateFormat::DateTime(*layout))
            .chain(DATE_FORMATS.iter().map(|layout| DateFormat::Date(*layout)))
            .chain(std::iter::once(DateFormat::Rfc3339))
            .find(|format| format.parse(trimmed).is_some())
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let trimmed = value.trim();
        match self {
            DateFormat::DateTime(layout) => NaiveDateTime::parse_from_str(trimmed, layout).ok(),
            DateFormat::Date(layout) => NaiveDate::parse_from_str(trimmed, layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0)),
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|parsed| parsed.naive_local()),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormat::DateTime(layout) | DateFormat::Date(layout) => f.write_str(layout),
            DateFormat::Rfc3339 => f.write_str("RFC 3339"),
        }
    }
}

/// Parses a lone date value with whichever accepted layout fits it.
pub fn parse_date_value(value: &str) -> Result<NaiveDateTime> {
    DateFormat::detect(value)
        .and_then(|format| format.parse(value))
        .ok_or_else(|| anyhow!("Failed to parse '{value}' as date"))
}

/// Parses a float, reading `NaN` as no value.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| !parsed.is_nan())
}

/// Strips trailing `%` signs and scales to a fraction.
pub fn parse_percent(value: &str) -> Option<f64> {
    let stripped = value.trim().trim_end_matches('%');
    parse_number(stripped).map(|parsed| parsed / 100.0)
}

/// Coerces one raw cell. `Ok(None)` is a missing value; `Err` is only
/// returned for unparseable dates. Dates are read with `date_format` when
/// given, otherwise with any accepted layout.
pub fn coerce_cell(
    value: &str,
    kind: FieldKind,
    date_format: Option<DateFormat>,
) -> Result<Option<Cell>> {
    if is_missing_token(value) {
        return Ok(None);
    }
    let cell = match (kind, date_format) {
        (FieldKind::Text, _) => Some(Cell::Text(value.trim().to_string())),
        (FieldKind::Numeric, _) => parse_number(value).map(Cell::Number),
        (FieldKind::Percent, _) => parse_percent(value).map(Cell::Number),
        (FieldKind::Date, Some(format)) => {
            let parsed = format
                .parse(value)
                .ok_or_else(|| anyhow!("'{value}' does not match the column's {format} layout"))?;
            Some(Cell::Date(parsed))
        }
        (FieldKind::Date, None) => Some(Cell::Date(parse_date_value(value)?)),
    };
    Ok(cell)
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.is_finite() {
        let rendered = format!("{value:.4}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        value.to_string()
    }
}

pub fn format_date(value: &NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 && value.nanosecond() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn serialize_date<S>(value: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_date(value))
}
