//! The intake state machine.
//!
//! One upload cycle moves through [`Stage`]s via the pure [`step`] function.
//! Two stages pause for outside input (`AwaitingMapping` and
//! `AwaitingMissingValueDecision`); a paused stage steps to itself until the
//! matching answer is present in [`Choices`]. [`Session`] owns the uploaded
//! table and the answers given so far and re-runs the whole machine from the
//! top after every interaction.

use std::fmt;

use log::{debug, info, warn};

use crate::{
    clean::{
        MissingDecision, MissingSummary, PolicyOutcome, apply_missing_value_policy,
        coerce_types, sort_by_date,
    },
    data::{CleanTable, RawTable, TypedTable},
    error::IntakeError,
    mapping::{ColumnMapping, Selections, apply_mapping, resolve_mapping},
    schema::{RequiredField, detect_missing, normalize_columns},
};

/// Answers supplied from outside for the current upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices {
    pub selections: Selections,
    /// Set once the caller has answered the mapping request, even with
    /// nothing selected.
    pub mapping_submitted: bool,
    pub missing_decision: Option<MissingDecision>,
    /// Display-only; never consulted by the pipeline itself.
    pub show_raw: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    NoFile,
    Uploaded(RawTable),
    ColumnsNormalized(RawTable),
    AwaitingMapping {
        table: RawTable,
        missing: Vec<RequiredField>,
    },
    SchemaComplete {
        table: RawTable,
        mapping: ColumnMapping,
    },
    TypesCoerced(TypedTable),
    AwaitingMissingValueDecision {
        table: TypedTable,
        summary: MissingSummary,
    },
    NoMissingValues(TypedTable),
    Cleaned(CleanTable),
    MappingFailed(IntakeError),
    DateFailed(IntakeError),
    Halted(MissingSummary),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::NoFile => "NoFile",
            Stage::Uploaded(_) => "Uploaded",
            Stage::ColumnsNormalized(_) => "ColumnsNormalized",
            Stage::AwaitingMapping { .. } => "AwaitingMapping",
            Stage::SchemaComplete { .. } => "SchemaComplete",
            Stage::TypesCoerced(_) => "TypesCoerced",
            Stage::AwaitingMissingValueDecision { .. } => "AwaitingMissingValueDecision",
            Stage::NoMissingValues(_) => "NoMissingValues",
            Stage::Cleaned(_) => "Cleaned",
            Stage::MappingFailed(_) => "MappingFailed",
            Stage::DateFailed(_) => "DateFailed",
            Stage::Halted(_) => "Halted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::Cleaned(_) | Stage::MappingFailed(_) | Stage::DateFailed(_) | Stage::Halted(_)
        )
    }

    /// True for stages that wait on an outside answer.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self,
            Stage::AwaitingMapping { .. } | Stage::AwaitingMissingValueDecision { .. }
        )
    }

    /// True for a paused stage whose answer is not in `choices` yet.
    pub fn awaits_answer(&self, choices: &Choices) -> bool {
        match self {
            Stage::AwaitingMapping { .. } => !choices.mapping_submitted,
            Stage::AwaitingMissingValueDecision { .. } => choices.missing_decision.is_none(),
            _ => false,
        }
    }

    /// True for stages at which the machine stops given `choices`: terminal,
    /// waiting on an upload, or paused without an answer.
    pub fn is_resting(&self, choices: &Choices) -> bool {
        matches!(self, Stage::NoFile) || self.is_terminal() || self.awaits_answer(choices)
    }

    pub fn clean_table(&self) -> Option<&CleanTable> {
        match self {
            Stage::Cleaned(table) => Some(table),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Advances the machine by one transition.
pub fn step(stage: Stage, choices: &Choices) -> Stage {
    match stage {
        Stage::Uploaded(table) => Stage::ColumnsNormalized(normalize_columns(table)),
        Stage::ColumnsNormalized(table) => {
            let missing = detect_missing(&table);
            if missing.is_empty() {
                Stage::SchemaComplete {
                    table,
                    mapping: ColumnMapping::default(),
                }
            } else {
                info!(
                    "The following required columns are missing: {}",
                    missing.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
                );
                Stage::AwaitingMapping { table, missing }
            }
        }
        Stage::AwaitingMapping { table, missing } if choices.mapping_submitted => {
            let mapping = resolve_mapping(&table, &missing, &choices.selections);
            let mapped = apply_mapping(table, &mapping);
            let still_missing = detect_missing(&mapped);
            if still_missing.is_empty() {
                Stage::SchemaComplete {
                    table: mapped,
                    mapping,
                }
            } else {
                Stage::MappingFailed(IntakeError::MissingColumns {
                    missing: still_missing,
                })
            }
        }
        Stage::SchemaComplete { table, mapping } => {
            debug!("Schema complete ({} mapped field(s))", mapping.len());
            match coerce_types(&table) {
                Ok(typed) => Stage::TypesCoerced(sort_by_date(typed)),
                Err(err @ IntakeError::UnparseableDate { .. }) => Stage::DateFailed(err),
                Err(err) => Stage::MappingFailed(err),
            }
        }
        Stage::TypesCoerced(table) => {
            let summary = MissingSummary::from_table(&table);
            if summary.is_empty() {
                Stage::NoMissingValues(table)
            } else {
                Stage::AwaitingMissingValueDecision { table, summary }
            }
        }
        Stage::NoMissingValues(table) => finish(&table, None),
        Stage::AwaitingMissingValueDecision { table, .. } if choices.missing_decision.is_some() => {
            finish(&table, choices.missing_decision)
        }
        resting => resting,
    }
}

fn finish(table: &TypedTable, decision: Option<MissingDecision>) -> Stage {
    match apply_missing_value_policy(table, decision) {
        PolicyOutcome::Clean(clean) => Stage::Cleaned(clean),
        PolicyOutcome::Halted(summary) => Stage::Halted(summary),
        PolicyOutcome::NeedsDecision(summary) => Stage::AwaitingMissingValueDecision {
            table: table.clone(),
            summary,
        },
    }
}

/// Steps from `stage` until the machine rests.
pub fn run(mut stage: Stage, choices: &Choices) -> Stage {
    while !stage.is_resting(choices) {
        let from = stage.name();
        stage = step(stage, choices);
        debug!("{from} -> {}", stage.name());
    }
    match &stage {
        Stage::MappingFailed(err) | Stage::DateFailed(err) => warn!("{err}"),
        Stage::Cleaned(table) => info!("Intake complete with {} row(s)", table.row_count()),
        _ => {}
    }
    stage
}

/// State for one user's upload cycle, passed explicitly between
/// interaction handlers.
#[derive(Debug, Clone, Default)]
pub struct Session {
    upload: Option<RawTable>,
    choices: Choices,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choices(upload: RawTable, choices: Choices) -> Self {
        Self {
            upload: Some(upload),
            choices,
        }
    }

    /// Replaces the current table and forgets every earlier answer.
    pub fn upload(&mut self, table: RawTable) {
        self.upload = Some(table);
        self.choices = Choices::default();
    }

    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    pub fn select_column(&mut self, field: RequiredField, column: impl Into<String>) {
        self.choices.selections.insert(field, column.into());
    }

    pub fn submit_mapping(&mut self) {
        self.choices.mapping_submitted = true;
    }

    pub fn decide_missing(&mut self, decision: MissingDecision) {
        self.choices.missing_decision = Some(decision);
    }

    pub fn set_show_raw(&mut self, show: bool) {
        self.choices.show_raw = show;
    }

    /// Re-executes the pipeline from the top with the answers given so far.
    pub fn run(&self) -> Stage {
        match &self.upload {
            Some(table) => run(Stage::Uploaded(table.clone()), &self.choices),
            None => Stage::NoFile,
        }
    }

    /// The uploaded table with normalized headers and any resolved mappings
    /// applied, for display.
    pub fn raw_view(&self) -> Option<RawTable> {
        let table = normalize_columns(self.upload.clone()?);
        let missing = detect_missing(&table);
        if missing.is_empty() || !self.choices.mapping_submitted {
            return Some(table);
        }
        let mapping = resolve_mapping(&table, &missing, &self.choices.selections);
        Some(apply_mapping(table, &mapping))
    }
}
