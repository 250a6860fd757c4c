//! Derived metrics over a [`CleanTable`].
//!
//! Everything here is a deterministic column-wise expression or a grouped
//! aggregate; ratios follow IEEE division, so a zero denominator yields
//! `inf` or `NaN` rather than an error.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::Serialize;

use crate::data::{CleanTable, SupplyRecord, format_date};

pub const CARBON_FACTOR: f64 = 0.01;

/// Per-row derived values, in the same order as the table's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRow {
    #[serde(rename = "stock turnover rate")]
    pub stock_turnover_rate: f64,
    #[serde(rename = "days of inventory")]
    pub days_of_inventory: f64,
    #[serde(rename = "purchase order cycle time")]
    pub purchase_order_cycle_time: f64,
    #[serde(rename = "supplier risk score")]
    pub supplier_risk_score: f64,
    #[serde(rename = "order backlog")]
    pub order_backlog: f64,
    #[serde(rename = "total supply chain cost")]
    pub total_supply_chain_cost: f64,
    #[serde(rename = "cost per unit")]
    pub cost_per_unit: f64,
    pub oee: f64,
    #[serde(rename = "warehouse utilization")]
    pub warehouse_utilization: f64,
    #[serde(rename = "carbon footprint")]
    pub carbon_footprint: f64,
    #[serde(rename = "waste reduction")]
    pub waste_reduction: f64,
    #[serde(rename = "collaboration index")]
    pub collaboration_index: f64,
}

impl DerivedRow {
    pub const NAMES: [&'static str; 12] = [
        "stock turnover rate",
        "days of inventory",
        "purchase order cycle time",
        "supplier risk score",
        "order backlog",
        "total supply chain cost",
        "cost per unit",
        "oee",
        "warehouse utilization",
        "carbon footprint",
        "waste reduction",
        "collaboration index",
    ];

    fn compute(record: &SupplyRecord, location_count: usize) -> Self {
        let total_cost = record.cost_of_goods_sold + record.shipping_cost;
        Self {
            stock_turnover_rate: record.sales / record.inventory_level,
            days_of_inventory: record.inventory_level / record.sales,
            purchase_order_cycle_time: record.delivery_time + record.lead_time,
            supplier_risk_score: (record.lead_time * 0.5
                + (1.0 - record.quality_rating) * 0.3
                + (1.0 - record.on_time_delivery_rate) * 0.2)
                * 100.0,
            order_backlog: record.order_quantity - record.sales,
            total_supply_chain_cost: total_cost,
            cost_per_unit: total_cost / record.sales,
            oee: record.quality_rating * record.on_time_delivery_rate,
            warehouse_utilization: record.inventory_level / location_count as f64,
            carbon_footprint: record.shipping_cost * CARBON_FACTOR,
            waste_reduction: (record.inventory_level - record.sales) / record.inventory_level,
            collaboration_index: record.on_time_delivery_rate * record.quality_rating
                / record.lead_time,
        }
    }

    pub fn values(&self) -> [f64; 12] {
        [
            self.stock_turnover_rate,
            self.days_of_inventory,
            self.purchase_order_cycle_time,
            self.supplier_risk_score,
            self.order_backlog,
            self.total_supply_chain_cost,
            self.cost_per_unit,
            self.oee,
            self.warehouse_utilization,
            self.carbon_footprint,
            self.waste_reduction,
            self.collaboration_index,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub name: &'static str,
    pub value: f64,
}

/// A named aggregate: one value per group key, keys ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub title: &'static str,
    pub key: &'static str,
    pub value: &'static str,
    pub points: Vec<(String, f64)>,
}

/// Per-supplier averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierPerformance {
    pub supplier: String,
    #[serde(rename = "lead time")]
    pub lead_time: f64,
    #[serde(rename = "quality rating")]
    pub quality_rating: f64,
    #[serde(rename = "on-time delivery rate")]
    pub on_time_delivery_rate: f64,
    #[serde(rename = "purchase order cycle time")]
    pub purchase_order_cycle_time: f64,
    #[serde(rename = "supplier risk score")]
    pub supplier_risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub rows: Vec<DerivedRow>,
    pub kpis: Vec<Kpi>,
    pub summaries: Vec<Summary>,
    pub suppliers: Vec<SupplierPerformance>,
}

impl DerivedMetrics {
    pub fn compute(table: &CleanTable) -> Self {
        let records = &table.records;
        let location_count = records
            .iter()
            .map(|r| r.warehouse_location.as_str())
            .unique()
            .count();
        let rows = records
            .iter()
            .map(|record| DerivedRow::compute(record, location_count))
            .collect::<Vec<_>>();
        let pairs = records.iter().zip(rows.iter()).collect::<Vec<_>>();

        let kpis = vec![
            Kpi {
                name: "Average Inventory Level",
                value: mean(records.iter().map(|r| r.inventory_level)),
            },
            Kpi {
                name: "Average Lead Time",
                value: mean(records.iter().map(|r| r.lead_time)),
            },
            Kpi {
                name: "Total Supply Chain Cost",
                value: rows.iter().map(|d| d.total_supply_chain_cost).sum(),
            },
        ];

        let summaries = vec![
            Summary {
                title: "Stock Levels by Product Category",
                key: "product category",
                value: "inventory level",
                points: aggregate(
                    &pairs,
                    |(r, _)| r.product_category.clone(),
                    |(r, _)| r.inventory_level,
                    Agg::Sum,
                ),
            },
            Summary {
                title: "Total Shipping Costs by Location",
                key: "warehouse/location",
                value: "shipping cost",
                points: aggregate(
                    &pairs,
                    |(r, _)| r.warehouse_location.clone(),
                    |(r, _)| r.shipping_cost,
                    Agg::Sum,
                ),
            },
            Summary {
                title: "Warehouse Utilization by Location",
                key: "warehouse/location",
                value: "warehouse utilization",
                points: aggregate(
                    &pairs,
                    |(r, _)| r.warehouse_location.clone(),
                    |(_, d)| d.warehouse_utilization,
                    Agg::Mean,
                ),
            },
            Summary {
                title: "Waste Reduction by Product Category",
                key: "product category",
                value: "waste reduction",
                points: aggregate(
                    &pairs,
                    |(r, _)| r.product_category.clone(),
                    |(_, d)| d.waste_reduction,
                    Agg::Mean,
                ),
            },
            Summary {
                title: "Order Backlog Over Time",
                key: "date",
                value: "order backlog",
                points: aggregate(
                    &pairs,
                    |(r, _)| date_key(&r.date),
                    |(_, d)| d.order_backlog,
                    Agg::Sum,
                ),
            },
            Summary {
                title: "Total Supply Chain Cost Over Time",
                key: "date",
                value: "total supply chain cost",
                points: aggregate(
                    &pairs,
                    |(r, _)| date_key(&r.date),
                    |(_, d)| d.total_supply_chain_cost,
                    Agg::Sum,
                ),
            },
        ];

        let suppliers = pairs
            .iter()
            .into_group_map_by(|(record, _)| record.supplier.clone())
            .into_iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(supplier, group)| SupplierPerformance {
                supplier,
                lead_time: mean(group.iter().map(|(r, _)| r.lead_time)),
                quality_rating: mean(group.iter().map(|(r, _)| r.quality_rating)),
                on_time_delivery_rate: mean(group.iter().map(|(r, _)| r.on_time_delivery_rate)),
                purchase_order_cycle_time: mean(
                    group.iter().map(|(_, d)| d.purchase_order_cycle_time),
                ),
                supplier_risk_score: mean(group.iter().map(|(_, d)| d.supplier_risk_score)),
            })
            .collect();

        Self {
            rows,
            kpis,
            summaries,
            suppliers,
        }
    }

    pub fn kpi(&self, name: &str) -> Option<f64> {
        self.kpis.iter().find(|k| k.name == name).map(|k| k.value)
    }

    pub fn summary(&self, title: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.title == title)
    }
}

#[derive(Debug, Clone, Copy)]
enum Agg {
    Sum,
    Mean,
}

type Pair<'a> = (&'a SupplyRecord, &'a DerivedRow);

fn aggregate<K, V>(pairs: &[Pair<'_>], key: K, value: V, agg: Agg) -> Vec<(String, f64)>
where
    K: Fn(&Pair<'_>) -> String,
    V: Fn(&Pair<'_>) -> f64,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for pair in pairs {
        groups.entry(key(pair)).or_default().push(value(pair));
    }
    groups
        .into_iter()
        .map(|(group, values)| {
            let reduced = match agg {
                Agg::Sum => values.iter().sum::<f64>(),
                Agg::Mean => mean(values.iter().copied()),
            };
            (group, reduced)
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn date_key(date: &NaiveDateTime) -> String {
    format_date(date)
}
