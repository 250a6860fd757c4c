use std::io::Write;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::{CheckArgs, ChoiceArgs, InputArgs},
    clean::{MissingDecision, MissingSummary},
    data::{CleanTable, RawTable},
    io_utils,
    mapping::{MappingFile, parse_selections},
    pipeline::{Choices, Session, Stage},
    table,
};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let session = load_session(&args.input, Some(&args.choices))?;
    let stage = session.run();
    let mut out = std::io::stdout().lock();
    if session.choices().show_raw {
        print_raw(&session, &mut out)?;
    }
    if let Some(clean) = report(&stage, &mut out)? {
        writeln!(
            out,
            "Cleaned: {} row(s) ready for analysis, sorted by date",
            clean.row_count()
        )?;
    }
    Ok(())
}

/// Reads the upload and seeds a session with the answers given on the
/// command line.
pub(crate) fn load_session(input: &InputArgs, choices: Option<&ChoiceArgs>) -> Result<Session> {
    let delimiter = io_utils::resolve_input_delimiter(&input.input, input.delimiter);
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        input.input.display(),
        crate::printable_delimiter(delimiter)
    );
    let raw = RawTable::read(&input.input, delimiter, encoding)
        .with_context(|| format!("Reading upload {:?}", input.input))?;
    info!(
        "Loaded {} row(s) across {} column(s)",
        raw.row_count(),
        raw.headers.len()
    );
    let session_choices = match choices {
        Some(args) => build_choices(args)?,
        None => Choices::default(),
    };
    let mut session = Session::with_choices(raw, session_choices);
    session.set_show_raw(input.show_raw);
    Ok(session)
}

fn build_choices(args: &ChoiceArgs) -> Result<Choices> {
    let mut selections = match &args.mapping {
        Some(path) => MappingFile::load(path)
            .with_context(|| format!("Loading mappings from {path:?}"))?
            .into_selections(),
        None => Default::default(),
    };
    selections.extend(parse_selections(&args.map)?);
    let missing_decision = if args.confirm_missing {
        Some(MissingDecision::Confirm)
    } else if args.decline_missing {
        Some(MissingDecision::Decline)
    } else {
        None
    };
    Ok(Choices {
        mapping_submitted: !selections.is_empty(),
        selections,
        missing_decision,
        show_raw: false,
    })
}

pub(crate) fn print_raw<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    if let Some(raw) = session.raw_view() {
        writeln!(out, "Raw Data")?;
        write!(out, "{}", table::render_table(&raw.headers, &raw.rows))?;
    }
    Ok(())
}

/// Describes a resting stage. Returns the clean table on success, `None`
/// when the user chose to stop, and an error for fatal or unanswered stages.
pub(crate) fn report<'a, W: Write>(stage: &'a Stage, out: &mut W) -> Result<Option<&'a CleanTable>> {
    match stage {
        Stage::Cleaned(table) => Ok(Some(table)),
        Stage::Halted(summary) => {
            write_missing(summary, out)?;
            writeln!(
                out,
                "Stopped: rows with missing values were not accepted for removal"
            )?;
            Ok(None)
        }
        Stage::AwaitingMapping { table, missing } => {
            writeln!(out, "The following required columns are missing:")?;
            for field in missing {
                writeln!(out, "  {field}")?;
            }
            writeln!(out, "Columns in the uploaded file: {}", table.headers.join(", "))?;
            Err(anyhow!(
                "Column mapping required: rerun with --map FIELD=COLUMN for each missing column"
            ))
        }
        Stage::AwaitingMissingValueDecision { summary, .. } => {
            write_missing(summary, out)?;
            Err(anyhow!(
                "Decision required: rerun with --confirm-missing to drop {} row(s) or --decline-missing to stop",
                summary.affected_rows
            ))
        }
        Stage::MappingFailed(err) | Stage::DateFailed(err) => Err(err.clone().into()),
        other => Err(anyhow!("Pipeline stopped unexpectedly at {other}")),
    }
}

fn write_missing<W: Write>(summary: &MissingSummary, out: &mut W) -> Result<()> {
    writeln!(out, "The following columns have missing values:")?;
    for (field, count) in &summary.per_field {
        writeln!(out, "  {field}: {count}")?;
    }
    Ok(())
}
