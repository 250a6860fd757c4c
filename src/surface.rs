//! Hand-off to whatever displays the cleaned data.
//!
//! A surface receives the [`CleanTable`] and its [`DerivedMetrics`] and owns
//! all presentation. Two ship with the crate: aligned text tables for a
//! terminal, and a single JSON document for a browser front end.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    data::{CleanTable, SupplyRecord, format_number},
    metrics::{DerivedMetrics, DerivedRow, Kpi, Summary, SupplierPerformance},
    table,
};

pub trait VisualizationSurface {
    fn render(&mut self, table: &CleanTable, metrics: &DerivedMetrics) -> Result<()>;
}

/// Writes KPIs, grouped summaries and supplier averages as text tables.
pub struct TerminalSurface<W: Write> {
    out: W,
    preview_rows: usize,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            preview_rows: 0,
        }
    }

    /// Also print the first `rows` cleaned records with their derived values.
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn section(&mut self, title: &str, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
        writeln!(self.out, "\n{title}")?;
        write!(self.out, "{}", table::render_table(headers, rows))?;
        Ok(())
    }
}

impl<W: Write> VisualizationSurface for TerminalSurface<W> {
    fn render(&mut self, table: &CleanTable, metrics: &DerivedMetrics) -> Result<()> {
        writeln!(self.out, "Rows analysed: {}", table.row_count())?;

        let kpi_rows = metrics
            .kpis
            .iter()
            .map(|kpi| vec![kpi.name.to_string(), format_number(kpi.value)])
            .collect::<Vec<_>>();
        self.section(
            "Key Performance Indicators",
            &["indicator".to_string(), "value".to_string()],
            &kpi_rows,
        )?;

        for summary in &metrics.summaries {
            let rows = summary
                .points
                .iter()
                .map(|(key, value)| vec![key.clone(), format_number(*value)])
                .collect::<Vec<_>>();
            self.section(
                summary.title,
                &[summary.key.to_string(), summary.value.to_string()],
                &rows,
            )?;
        }

        let supplier_rows = metrics
            .suppliers
            .iter()
            .map(|s| {
                vec![
                    s.supplier.clone(),
                    format_number(s.lead_time),
                    format_number(s.quality_rating),
                    format_number(s.on_time_delivery_rate),
                    format_number(s.purchase_order_cycle_time),
                    format_number(s.supplier_risk_score),
                ]
            })
            .collect::<Vec<_>>();
        let supplier_headers = [
            "supplier",
            "lead time",
            "quality rating",
            "on-time delivery rate",
            "purchase order cycle time",
            "supplier risk score",
        ]
        .map(String::from);
        self.section("Supplier Performance", &supplier_headers, &supplier_rows)?;

        if self.preview_rows > 0 {
            let mut headers = CleanTable::headers();
            headers.extend(DerivedRow::NAMES.iter().map(|name| name.to_string()));
            let rows = table
                .records
                .iter()
                .zip(&metrics.rows)
                .take(self.preview_rows)
                .map(|(record, derived)| {
                    let mut cells = record.display_cells();
                    cells.extend(derived.values().into_iter().map(format_number));
                    cells
                })
                .collect::<Vec<_>>();
            self.section("Cleaned Data", &headers, &rows)?;
        }
        self.out.flush().context("Flushing dashboard output")
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    row_count: usize,
    records: &'a [SupplyRecord],
    rows: &'a [DerivedRow],
    kpis: &'a [Kpi],
    summaries: &'a [Summary],
    suppliers: &'a [SupplierPerformance],
}

/// Writes one pretty-printed JSON document per render.
pub struct JsonSurface<W: Write> {
    out: W,
}

impl<W: Write> JsonSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> VisualizationSurface for JsonSurface<W> {
    fn render(&mut self, table: &CleanTable, metrics: &DerivedMetrics) -> Result<()> {
        let payload = Payload {
            row_count: table.row_count(),
            records: &table.records,
            rows: &metrics.rows,
            kpis: &metrics.kpis,
            summaries: &metrics.summaries,
            suppliers: &metrics.suppliers,
        };
        serde_json::to_writer_pretty(&mut self.out, &payload)
            .context("Serializing dashboard payload")?;
        writeln!(self.out)?;
        self.out.flush().context("Flushing dashboard output")
    }
}
