//! Column mapping for required fields that had no automatic match.
//!
//! Selections arrive from outside the pipeline (CLI flags, a YAML mapping
//! file, or the terminal picker). [`resolve_mapping`] keeps only selections
//! that name an existing column; [`apply_mapping`] materializes each mapped
//! field as a copy of its source column so that two fields mapped to the same
//! source, or a field mapped onto another required column, stay well-defined.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::RawTable,
    error::IntakeError,
    schema::{RequiredField, normalize_header},
};

/// Externally supplied column choices, keyed by required field.
pub type Selections = BTreeMap<RequiredField, String>;

/// Resolved correspondence from a required field to an existing column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: BTreeMap<RequiredField, String>,
}

impl ColumnMapping {
    pub fn insert(&mut self, field: RequiredField, column: impl Into<String>) {
        self.entries.insert(field, column.into());
    }

    pub fn get(&self, field: RequiredField) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RequiredField, &str)> {
        self.entries
            .iter()
            .map(|(field, column)| (*field, column.as_str()))
    }

    /// Source columns claimed by more than one required field.
    pub fn duplicates(&self) -> Vec<(String, Vec<RequiredField>)> {
        self.entries
            .iter()
            .map(|(field, column)| (normalize_header(column), *field))
            .into_group_map()
            .into_iter()
            .filter(|(_, fields)| fields.len() > 1)
            .sorted()
            .collect()
    }
}

/// Picks, for every missing field, the selected column if it exists in
/// `table`. Unknown columns and absent selections leave the field unmapped.
pub fn resolve_mapping(
    table: &RawTable,
    missing: &[RequiredField],
    selections: &Selections,
) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for field in missing {
        let Some(choice) = selections.get(field) else {
            debug!("No column selected for '{field}'");
            continue;
        };
        match table.column_index(choice) {
            Some(index) => mapping.insert(*field, table.headers[index].clone()),
            None => warn!("Ignoring selection '{choice}' for '{field}': no such column"),
        }
    }
    for (column, fields) in mapping.duplicates() {
        warn!(
            "Column '{column}' is mapped to several required fields ({}); their values will be identical",
            fields.iter().map(|field| field.name()).join(", ")
        );
    }
    mapping
}

/// Adds one column per mapped field, named after the field and holding a
/// copy of the source column.
pub fn apply_mapping(mut table: RawTable, mapping: &ColumnMapping) -> RawTable {
    let sources = mapping
        .iter()
        .filter_map(|(field, column)| table.column_index(column).map(|index| (field, index)))
        .collect::<Vec<_>>();
    for (field, index) in sources {
        debug!("Mapping '{}' -> '{field}'", table.headers[index]);
        table.headers.push(field.name().to_string());
        for row in table.rows.iter_mut() {
            let value = row.get(index).cloned().unwrap_or_default();
            row.push(value);
        }
    }
    table
}

/// Parses `FIELD=COLUMN` pairs as given on the command line.
pub fn parse_selections(entries: &[String]) -> Result<Selections, IntakeError> {
    let mut selections = Selections::new();
    for entry in entries {
        let (field, column) = entry
            .split_once('=')
            .map(|(field, column)| (field.trim(), column.trim()))
            .filter(|(field, column)| !field.is_empty() && !column.is_empty())
            .ok_or_else(|| IntakeError::InvalidSelection(entry.clone()))?;
        selections.insert(field.parse()?, column.to_string());
    }
    Ok(selections)
}

/// YAML document holding previously chosen mappings:
///
/// ```yaml
/// mappings:
///   supplier: vendor
///   cogs (cost of goods sold): unit cost
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub mappings: HashMap<RequiredField, String>,
}

impl MappingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing mapping YAML")
    }

    pub fn into_selections(self) -> Selections {
        self.mappings.into_iter().collect()
    }
}
