use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::format::UploadFormat;
use crate::error::{Error, Result};

/// One question as it appears in the uploaded file, before validation.
pub type RawRecord = Map<String, Value>;

#[derive(Deserialize)]
struct QuestionFile {
    questions: Option<Vec<Value>>,
}

/// Reads the upload into raw records in file order. Tabular formats yield
/// one record per non-empty row with every value as a string.
pub fn read_records(format: UploadFormat, reader: impl Read) -> Result<Vec<RawRecord>> {
    match format {
        UploadFormat::Json => read_json(reader),
        UploadFormat::Csv => read_csv(reader),
        UploadFormat::Spreadsheet => read_spreadsheet(reader),
    }
}

fn read_json(reader: impl Read) -> Result<Vec<RawRecord>> {
    let file: QuestionFile = serde_json::from_reader(reader)
        .map_err(|e| Error::parse(format!("invalid JSON file: {e}")))?;

    let questions = file
        .questions
        .ok_or_else(|| Error::parse("invalid JSON format: questions array not found"))?;

    questions
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(record) => Ok(record),
            _ => Err(Error::parse("question entry is not an object").at_record(idx + 1)),
        })
        .collect()
}

fn read_csv(reader: impl Read) -> Result<Vec<RawRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv
        .headers()
        .map_err(|e| Error::parse(format!("invalid CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for (idx, row) in csv.records().enumerate() {
        let row = row.map_err(|e| Error::parse(format!("invalid CSV row: {e}")).at_record(idx + 1))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(tabular_record(&headers, row.iter().map(str::to_string)));
    }

    Ok(records)
}

fn read_spreadsheet(mut reader: impl Read) -> Result<Vec<RawRecord>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::parse(format!("invalid spreadsheet: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::parse("spreadsheet has no worksheets"))?
        .map_err(|e| Error::parse(format!("invalid worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    Ok(rows
        .filter(|row| row.iter().any(|cell| !cell_text(cell).trim().is_empty()))
        .map(|row| tabular_record(&headers, row.iter().map(cell_text)))
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn tabular_record(headers: &[String], cells: impl Iterator<Item = String>) -> RawRecord {
    headers
        .iter()
        .zip(cells)
        .filter(|(header, _)| !header.is_empty())
        .map(|(header, cell)| (header.clone(), Value::String(cell)))
        .collect()
}
