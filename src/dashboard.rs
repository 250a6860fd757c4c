use std::io::{self, Write};

use anyhow::Result;
use log::info;

use crate::{
    check::{load_session, print_raw, report},
    cli::{DashboardArgs, InteractiveArgs, OutputFormat},
    data::CleanTable,
    interactive::{TerminalPrompter, drive},
    metrics::DerivedMetrics,
    pipeline::Stage,
    surface::{JsonSurface, TerminalSurface, VisualizationSurface},
};

pub fn execute(args: &DashboardArgs) -> Result<()> {
    let session = load_session(&args.input, Some(&args.choices))?;
    let stage = session.run();
    let mut out = io::stdout().lock();
    if session.choices().show_raw {
        print_raw(&session, &mut out)?;
    }
    finish(&stage, args.format, args.rows, &mut out)
}

pub fn execute_interactive(args: &InteractiveArgs) -> Result<()> {
    let mut session = load_session(&args.input, None)?;
    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stderr());
    let stage = drive(&mut session, &mut prompter)?;
    let mut out = io::stdout().lock();
    if session.choices().show_raw {
        print_raw(&session, &mut out)?;
    }
    finish(&stage, args.format, args.rows, &mut out)
}

fn finish<W: Write>(stage: &Stage, format: OutputFormat, rows: usize, out: &mut W) -> Result<()> {
    let Some(clean) = report(stage, out)? else {
        return Ok(());
    };
    render(clean, format, rows, out)
}

/// Computes derived metrics and hands both tables to the chosen surface.
pub fn render<W: Write>(
    clean: &CleanTable,
    format: OutputFormat,
    rows: usize,
    out: W,
) -> Result<()> {
    let metrics = DerivedMetrics::compute(clean);
    info!(
        "Rendering {} row(s) with {} summary group(s)",
        clean.row_count(),
        metrics.summaries.len()
    );
    match format {
        OutputFormat::Table => TerminalSurface::new(out)
            .with_preview_rows(rows)
            .render(clean, &metrics),
        OutputFormat::Json => JsonSurface::new(out).render(clean, &metrics),
    }
}
