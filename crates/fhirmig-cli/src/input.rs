//! Loading the input collection from a JSON records file.

use std::path::Path;

use anyhow::{Context, bail};
use fhirmig_core::Record;
use fhirmig_engine::MigrationInput;
use indexmap::IndexMap;
use serde_json::Value;

/// Reads a records file into engine input.
///
/// Two shapes are accepted: a JSON array of record objects (flat input), or
/// a JSON object mapping a group key to an array of record objects (grouped
/// input — every row for a key lands in the same chunk). Every record object
/// must carry an `id` (or `ID`) field.
pub fn load_input(path: &Path) -> anyhow::Result<MigrationInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read input file {}", path.display()))?;
    parse_input(&content).with_context(|| format!("Invalid input file {}", path.display()))
}

fn parse_input(content: &str) -> anyhow::Result<MigrationInput> {
    let value: Value = serde_json::from_str(content)?;
    match value {
        Value::Array(rows) => {
            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                records.push(parse_record(row)?);
            }
            Ok(MigrationInput::Flat(records))
        }
        Value::Object(groups) => {
            let mut grouped = IndexMap::with_capacity(groups.len());
            for (key, rows) in groups {
                let Value::Array(rows) = rows else {
                    bail!("group {key:?} must map to an array of records");
                };
                let mut records = Vec::with_capacity(rows.len());
                for row in rows {
                    records.push(parse_record(row)?);
                }
                grouped.insert(key, records);
            }
            Ok(MigrationInput::Grouped(grouped))
        }
        _ => bail!("input must be a JSON array of records or an object of groups"),
    }
}

fn parse_record(row: Value) -> anyhow::Result<Record> {
    let Value::Object(fields) = row else {
        bail!("each record must be a JSON object");
    };
    Ok(Record::from_json_object(fields)?)
}
