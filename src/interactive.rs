//! Terminal prompts for the two suspension points.
//!
//! [`drive`] re-runs the session after every answer, so a prompt only ever
//! sees the stage the pipeline actually paused at.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use log::debug;

use crate::{
    clean::{MissingDecision, MissingSummary},
    pipeline::{Session, Stage},
    schema::RequiredField,
};

pub trait Prompter {
    /// Returns the chosen column, or `None` when the user picks nothing.
    fn choose_column(&mut self, field: RequiredField, options: &[String]) -> Result<Option<String>>;

    /// Returns whether rows with missing values may be dropped.
    fn confirm_missing(&mut self, summary: &MissingSummary) -> Result<bool>;
}

/// Numbered-list picker over any line-based input.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> Result<Option<String>> {
        self.output.flush().context("Failed to write prompt")?;
        let mut line = String::new();
        let bytes = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if bytes == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose_column(&mut self, field: RequiredField, options: &[String]) -> Result<Option<String>> {
        writeln!(self.output, "Select column for {}:", field.label())?;
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "{:>3}) {option}", idx + 1)?;
        }
        loop {
            write!(
                self.output,
                "Choose 1-{} or type a column name (blank for none): ",
                options.len()
            )?;
            let Some(answer) = self.read_answer()? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            if let Some(column) = options.iter().find(|option| **option == answer) {
                return Ok(Some(column.clone()));
            }
            if let Ok(choice) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&choice) {
                    return Ok(Some(options[choice - 1].clone()));
                }
                writeln!(
                    self.output,
                    "Invalid choice: {choice}. Enter a number between 1 and {}.",
                    options.len()
                )?;
                continue;
            }
            return Ok(Some(answer));
        }
    }

    fn confirm_missing(&mut self, summary: &MissingSummary) -> Result<bool> {
        writeln!(self.output, "The following columns have missing values:")?;
        for (field, count) in &summary.per_field {
            writeln!(self.output, "  {field}: {count}")?;
        }
        loop {
            write!(
                self.output,
                "Drop the {} affected row(s) and continue? [y/n]: ",
                summary.affected_rows
            )?;
            let Some(answer) = self.read_answer()? else {
                return Ok(false);
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

/// Runs `session` to rest, asking `prompter` at each pause.
pub fn drive<P: Prompter>(session: &mut Session, prompter: &mut P) -> Result<Stage> {
    loop {
        let stage = session.run();
        match &stage {
            Stage::AwaitingMapping { table, missing } if !session.choices().mapping_submitted => {
                for field in missing {
                    if let Some(column) = prompter.choose_column(*field, &table.headers)? {
                        debug!("Selected '{column}' for '{field}'");
                        session.select_column(*field, column);
                    }
                }
                session.submit_mapping();
            }
            Stage::AwaitingMissingValueDecision { summary, .. }
                if session.choices().missing_decision.is_none() =>
            {
                let decision = if prompter.confirm_missing(summary)? {
                    MissingDecision::Confirm
                } else {
                    MissingDecision::Decline
                };
                session.decide_missing(decision);
            }
            Stage::AwaitingMapping { .. } | Stage::AwaitingMissingValueDecision { .. } => {
                bail!("Pipeline paused at {stage} after the answer was recorded")
            }
            _ => return Ok(stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::RawTable, schema::REQUIRED_SCHEMA};

    fn session(headers: Vec<String>, rows: Vec<Vec<String>>) -> Session {
        let mut session = Session::new();
        session.upload(RawTable::new(headers, rows));
        session
    }

    fn row(quality: &str) -> Vec<String> {
        [
            "Widgets", "100", "Acme", "4", "40", "30", quality, "95%", "2023-01-05", "North",
            "12", "3", "250",
        ]
        .map(String::from)
        .to_vec()
    }

    fn headers_with(position: usize, name: &str) -> Vec<String> {
        let mut headers = REQUIRED_SCHEMA
            .iter()
            .map(|f| f.label().to_string())
            .collect::<Vec<_>>();
        headers[position] = name.to_string();
        headers
    }

    #[test]
    fn picker_accepts_number_and_confirms() {
        let mut session = session(
            headers_with(RequiredField::Supplier.position(), "Vendor"),
            vec![row("0.9"), row("")],
        );
        let input = format!("{}\ny\n", RequiredField::Supplier.position() + 1);
        let mut prompter = TerminalPrompter::new(input.as_bytes(), Vec::new());
        let stage = drive(&mut session, &mut prompter).unwrap();
        assert_eq!(stage.clean_table().map(|t| t.row_count()), Some(1));
    }

    #[test]
    fn blank_selection_fails_mapping() {
        let mut session = session(
            headers_with(RequiredField::CostOfGoodsSold.position(), "unit cost"),
            vec![row("0.9")],
        );
        let mut prompter = TerminalPrompter::new("\n".as_bytes(), Vec::new());
        let stage = drive(&mut session, &mut prompter).unwrap();
        assert_eq!(stage.name(), "MappingFailed");
    }

    #[test]
    fn invalid_number_reprompts_then_declines() {
        let mut session = session(
            headers_with(RequiredField::Supplier.position(), "Vendor"),
            vec![row("")],
        );
        let mut prompter = TerminalPrompter::new("99\nvendor\nmaybe\nn\n".as_bytes(), Vec::new());
        let stage = drive(&mut session, &mut prompter).unwrap();
        assert_eq!(stage.name(), "Halted");
    }

    #[test]
    fn numeric_header_is_chosen_by_name() {
        let mut session = session(
            headers_with(RequiredField::Supplier.position(), "2023"),
            vec![row("0.9")],
        );
        let mut prompter = TerminalPrompter::new("2023\n".as_bytes(), Vec::new());
        let stage = drive(&mut session, &mut prompter).unwrap();
        let clean = stage.clean_table().expect("cleaned");
        assert_eq!(clean.records[0].supplier, "Acme");
    }

    #[test]
    fn closed_input_declines() {
        let mut session = session(headers_with(0, "Product Category"), vec![row("")]);
        let mut prompter = TerminalPrompter::new("".as_bytes(), Vec::new());
        assert_eq!(drive(&mut session, &mut prompter).unwrap().name(), "Halted");
    }
}
