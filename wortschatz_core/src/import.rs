//! Catalog import from spreadsheet files (Excel and CSV)

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Utc;
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{CefrLevel, ExampleSentence, Gender, WordCatalog, WordEntry, WordType};
use crate::error::CoreError;

const DEFAULT_CATEGORY: &str = "Allgemein";
const DEFAULT_DIFFICULTY: u8 = 50;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),
    #[error("missing required '{0}' column in file header")]
    MissingColumn(&'static str),
    #[error("empty file - no header row")]
    EmptyFile,
    #[error("no sheets found in Excel file")]
    NoSheets,
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read spreadsheet: {0}")]
    Excel(#[from] calamine::Error),
    #[error(transparent)]
    Catalog(#[from] CoreError),
}

/// Load a catalog from a CSV file or a spreadsheet (`.xlsx`, `.xls`, `.ods`, ...)
pub fn load_catalog(path: impl AsRef<Path>) -> Result<WordCatalog, ImportError> {
    let entries = load_file(path)?;
    Ok(WordCatalog::new(entries)?)
}

/// Parse entries from a spreadsheet, dispatching on the file extension
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<WordEntry>, ImportError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let entries = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_excel(path)?,
        "csv" => load_csv(path)?,
        _ => return Err(ImportError::UnsupportedFormat(extension)),
    };
    info!(path = %path.display(), words = entries.len(), "catalog file imported");
    Ok(entries)
}

/// Column index mapping
#[derive(Debug, Default, Clone)]
struct ColumnMapping {
    target: usize,
    native: usize,
    id: Option<usize>,
    gender: Option<usize>,
    plural: Option<usize>,
    level: Option<usize>,
    category: Option<usize>,
    word_type: Option<usize>,
    pronunciation: Option<usize>,
    difficulty: Option<usize>,
    example_target: Option<usize>,
    example_native: Option<usize>,
}

/// Detect column indices from header names
fn detect_columns(headers: &[String]) -> Result<ColumnMapping, ImportError> {
    let mut mapping = ColumnMapping::default();
    let mut target = None;
    let mut native = None;

    for (i, header) in headers.iter().enumerate() {
        match header.trim().to_lowercase().as_str() {
            "german" | "deutsch" | "target" | "word" => target = Some(i),
            "turkish" | "türkçe" | "native" | "meaning" | "translation" => native = Some(i),
            "id" => mapping.id = Some(i),
            "gender" | "article" | "artikel" => mapping.gender = Some(i),
            "plural" => mapping.plural = Some(i),
            "level" | "cefr" => mapping.level = Some(i),
            "category" | "kategorie" => mapping.category = Some(i),
            "type" | "word_type" | "wordtype" => mapping.word_type = Some(i),
            "pronunciation" | "ipa" => mapping.pronunciation = Some(i),
            "difficulty" => mapping.difficulty = Some(i),
            "example" | "example_german" | "example_target" => mapping.example_target = Some(i),
            "example_turkish" | "example_native" => mapping.example_native = Some(i),
            _ => {} // Unknown columns ignored
        }
    }

    mapping.target = target.ok_or(ImportError::MissingColumn("German"))?;
    mapping.native = native.ok_or(ImportError::MissingColumn("Turkish"))?;
    Ok(mapping)
}

/// Build an entry from one data row; rows missing either word are skipped
fn entry_from_row(mapping: &ColumnMapping, row: &[String], row_number: usize) -> Option<WordEntry> {
    let cell = |index: Option<usize>| {
        index
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    };

    let target = cell(Some(mapping.target))?.to_string();
    let Some(native) = cell(Some(mapping.native)) else {
        warn!(row = row_number, word = %target, "no translation, row skipped");
        return None;
    };
    let native = native.to_string();

    let level = match cell(mapping.level) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(row = row_number, level = raw, "unknown level, using A1");
            CefrLevel::A1
        }),
        None => CefrLevel::A1,
    };

    let difficulty = cell(mapping.difficulty)
        .and_then(|raw| raw.parse::<f64>().ok())
        .map(|d| d.clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_DIFFICULTY);

    let examples = match (cell(mapping.example_target), cell(mapping.example_native)) {
        (Some(t), n) => vec![ExampleSentence::new(t, n.unwrap_or_default())],
        (None, _) => Vec::new(),
    };

    Some(WordEntry {
        id: cell(mapping.id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{row_number}")),
        native,
        target,
        gender: cell(mapping.gender).and_then(Gender::parse),
        plural: cell(mapping.plural).map(str::to_string),
        level,
        category: cell(mapping.category).unwrap_or(DEFAULT_CATEGORY).to_string(),
        word_type: cell(mapping.word_type)
            .and_then(WordType::parse)
            .unwrap_or(WordType::Noun),
        examples,
        pronunciation: cell(mapping.pronunciation).map(str::to_string),
        difficulty,
        next_review_at: Utc::now(),
    })
}

/// Parse the first sheet of a workbook; the reader is picked from the extension
pub fn load_excel(path: impl AsRef<Path>) -> Result<Vec<WordEntry>, ImportError> {
    let mut workbook = open_workbook_auto(path.as_ref())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(ImportError::EmptyFile)?;
    let headers: Vec<String> = header_row.iter().map(get_cell_string).collect();
    let mapping = detect_columns(&headers)?;

    let entries = rows
        .enumerate()
        .filter_map(|(i, row)| {
            let cells: Vec<String> = row.iter().map(get_cell_string).collect();
            entry_from_row(&mapping, &cells, i + 2)
        })
        .collect();
    Ok(entries)
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<WordEntry>, ImportError> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;
    read_csv_records(reader)
}

/// Parse CSV from any reader (header row required)
pub fn read_csv<R: Read>(input: R) -> Result<Vec<WordEntry>, ImportError> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    read_csv_records(reader)
}

fn read_csv_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<WordEntry>, ImportError> {
    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::EmptyFile);
    }
    let mapping = detect_columns(&headers)?;

    let mut entries = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        if let Some(entry) = entry_from_row(&mapping, &cells, i + 2) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Helper to extract string from Excel cell
fn get_cell_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        Data::Empty => String::new(),
    }
}
