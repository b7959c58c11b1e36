use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::constants::tables::{
    DATE_READ_FORMAT, DATE_WRITE_FORMAT, DATETIME_READ_FORMATS, DELIMITER,
};
use crate::data::{AnswerItem, PairRow, TextItem};
use crate::errors::PairsError;
use crate::types::{GroupKey, ItemId};

/// Wire shape of a canonical or duplicate row.
#[derive(Debug, Serialize, Deserialize)]
struct ItemRecord {
    #[serde(rename = "Id")]
    id: ItemId,
    #[serde(rename = "AnswerId", alias = "GroupKey")]
    group_key: GroupKey,
    #[serde(rename = "Text", alias = "Text0")]
    text: String,
    #[serde(rename = "CreationDate", default)]
    creation_date: String,
}

/// Wire shape of an answers row.
#[derive(Debug, Deserialize)]
struct AnswerRecord {
    #[serde(rename = "Id")]
    id: GroupKey,
    #[serde(rename = "Text", alias = "Text0", default)]
    text: String,
}

/// Parse a creation date cell; an empty cell means "unknown".
pub fn parse_creation_date(raw: &str) -> Result<Option<NaiveDateTime>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    for format in DATETIME_READ_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(parsed));
        }
    }
    NaiveDate::parse_from_str(raw, DATE_READ_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Some)
        .ok_or_else(|| format!("unrecognized creation date '{raw}'"))
}

fn format_creation_date(date: Option<&NaiveDateTime>) -> String {
    date.map(|date| date.format(DATE_WRITE_FORMAT).to_string())
        .unwrap_or_default()
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> PairsError + '_ {
    move |source| PairsError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn reader_from<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(false)
        .from_reader(input)
}

fn writer_to<W: Write>(output: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_writer(output)
}

fn open(path: &Path) -> Result<File, PairsError> {
    File::open(path).map_err(|err| {
        PairsError::Io(std::io::Error::new(
            err.kind(),
            format!("failed to open '{}': {err}", path.display()),
        ))
    })
}

fn create(path: &Path) -> Result<File, PairsError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

fn read_item_records<R: Read>(
    input: R,
    path: &Path,
    clean: bool,
) -> Result<Vec<TextItem>, PairsError> {
    let mut reader = reader_from(input);
    let mut items = Vec::new();
    for (idx, result) in reader.deserialize::<ItemRecord>().enumerate() {
        let record = result.map_err(csv_err(path))?;
        // Header is line 1; the first data row is line 2.
        let row = idx + 2;
        let creation_date = parse_creation_date(&record.creation_date)
            .map_err(|details| PairsError::Parse { row, details })?;
        let clean_text = if clean { record.text.clone() } else { String::new() };
        items.push(TextItem {
            id: record.id,
            group_key: record.group_key,
            raw_text: record.text,
            clean_text,
            creation_date,
        });
    }
    Ok(items)
}

/// Read a source table of canonical or duplicate items (clean text left empty).
pub fn read_raw_items(path: &Path) -> Result<Vec<TextItem>, PairsError> {
    read_item_records(open(path)?, path, false)
}

/// Read a table written by [`write_clean_items`]; its text column is already normalized.
pub fn read_clean_items(path: &Path) -> Result<Vec<TextItem>, PairsError> {
    read_item_records(open(path)?, path, true)
}

/// Read the answers table.
pub fn read_answers(path: &Path) -> Result<Vec<AnswerItem>, PairsError> {
    let mut reader = reader_from(open(path)?);
    let mut answers = Vec::new();
    for result in reader.deserialize::<AnswerRecord>() {
        let record = result.map_err(csv_err(path))?;
        answers.push(AnswerItem::new(record.id, record.text));
    }
    Ok(answers)
}

/// Write cleaned items as `Id, AnswerId, Text, CreationDate` (text is the clean text).
pub fn write_clean_items(path: &Path, items: &[TextItem]) -> Result<(), PairsError> {
    let mut writer = writer_to(create(path)?);
    for item in items {
        writer
            .serialize(ItemRecord {
                id: item.id,
                group_key: item.group_key.clone(),
                text: item.clean_text.clone(),
                creation_date: format_creation_date(item.creation_date.as_ref()),
            })
            .map_err(csv_err(path))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a pair table with the fixed pair-table header.
pub fn write_pairs(path: &Path, rows: &[PairRow]) -> Result<(), PairsError> {
    let mut writer = writer_to(create(path)?);
    if rows.is_empty() {
        writer
            .write_record(crate::constants::tables::PAIR_COLUMNS)
            .map_err(csv_err(path))?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err(path))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a pair table back.
pub fn read_pairs(path: &Path) -> Result<Vec<PairRow>, PairsError> {
    let mut reader = reader_from(open(path)?);
    reader
        .deserialize::<PairRow>()
        .map(|row| row.map_err(csv_err(path)))
        .collect()
}
