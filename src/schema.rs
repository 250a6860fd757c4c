//! Required schema, column-name normalization, and missing-field detection.
//!
//! The intake contract is a fixed, ordered set of thirteen logical fields.
//! Uploaded headers are matched against those names after normalization:
//! trimmed, lower-cased, `_` treated as a space and internal whitespace runs
//! collapsed. Matching is exact after that; there is no synonym support.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{data::RawTable, error::IntakeError};

/// How a required field's raw cells are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Numeric,
    Percent,
    Date,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Numeric => "numeric",
            FieldKind::Percent => "percent",
            FieldKind::Date => "date",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RequiredField {
    ProductCategory,
    InventoryLevel,
    Supplier,
    LeadTime,
    OrderQuantity,
    Sales,
    QualityRating,
    OnTimeDeliveryRate,
    Date,
    WarehouseLocation,
    ShippingCost,
    DeliveryTime,
    CostOfGoodsSold,
}

pub const FIELD_COUNT: usize = 13;

/// The thirteen required fields in contract order.
pub const REQUIRED_SCHEMA: [RequiredField; FIELD_COUNT] = [
    RequiredField::ProductCategory,
    RequiredField::InventoryLevel,
    RequiredField::Supplier,
    RequiredField::LeadTime,
    RequiredField::OrderQuantity,
    RequiredField::Sales,
    RequiredField::QualityRating,
    RequiredField::OnTimeDeliveryRate,
    RequiredField::Date,
    RequiredField::WarehouseLocation,
    RequiredField::ShippingCost,
    RequiredField::DeliveryTime,
    RequiredField::CostOfGoodsSold,
];

impl RequiredField {
    /// Normalized column name the field is matched against.
    pub fn name(&self) -> &'static str {
        match self {
            RequiredField::ProductCategory => "product category",
            RequiredField::InventoryLevel => "inventory level",
            RequiredField::Supplier => "supplier",
            RequiredField::LeadTime => "lead time",
            RequiredField::OrderQuantity => "order quantity",
            RequiredField::Sales => "sales",
            RequiredField::QualityRating => "quality rating",
            RequiredField::OnTimeDeliveryRate => "on-time delivery rate",
            RequiredField::Date => "date",
            RequiredField::WarehouseLocation => "warehouse/location",
            RequiredField::ShippingCost => "shipping cost",
            RequiredField::DeliveryTime => "delivery time",
            RequiredField::CostOfGoodsSold => "cogs (cost of goods sold)",
        }
    }

    /// Title-cased label for prompts and listings.
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::ProductCategory => "Product Category",
            RequiredField::InventoryLevel => "Inventory Level",
            RequiredField::Supplier => "Supplier",
            RequiredField::LeadTime => "Lead Time",
            RequiredField::OrderQuantity => "Order Quantity",
            RequiredField::Sales => "Sales",
            RequiredField::QualityRating => "Quality Rating",
            RequiredField::OnTimeDeliveryRate => "On-Time Delivery Rate",
            RequiredField::Date => "Date",
            RequiredField::WarehouseLocation => "Warehouse/Location",
            RequiredField::ShippingCost => "Shipping Cost",
            RequiredField::DeliveryTime => "Delivery Time",
            RequiredField::CostOfGoodsSold => "COGS (Cost of Goods Sold)",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            RequiredField::ProductCategory
            | RequiredField::Supplier
            | RequiredField::WarehouseLocation => FieldKind::Text,
            RequiredField::OnTimeDeliveryRate => FieldKind::Percent,
            RequiredField::Date => FieldKind::Date,
            RequiredField::InventoryLevel
            | RequiredField::LeadTime
            | RequiredField::OrderQuantity
            | RequiredField::Sales
            | RequiredField::QualityRating
            | RequiredField::ShippingCost
            | RequiredField::DeliveryTime
            | RequiredField::CostOfGoodsSold => FieldKind::Numeric,
        }
    }

    /// Position of the field in [`REQUIRED_SCHEMA`].
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RequiredField {
    type Err = IntakeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_header(value);
        REQUIRED_SCHEMA
            .iter()
            .copied()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| IntakeError::UnknownField(value.to_string()))
    }
}

impl TryFrom<String> for RequiredField {
    type Error = IntakeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RequiredField> for String {
    fn from(field: RequiredField) -> Self {
        field.name().to_string()
    }
}

pub fn normalize_header(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Rewrites every header of `table` into its normalized form.
pub fn normalize_columns(mut table: RawTable) -> RawTable {
    for header in table.headers.iter_mut() {
        *header = normalize_header(header);
    }
    table
}

/// Required fields, in schema order, with no matching normalized header.
pub fn detect_missing(table: &RawTable) -> Vec<RequiredField> {
    let present = table
        .headers
        .iter()
        .map(|header| normalize_header(header))
        .collect::<HashSet<_>>();
    REQUIRED_SCHEMA
        .iter()
        .copied()
        .filter(|field| !present.contains(field.name()))
        .collect()
}
