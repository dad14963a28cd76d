//! Spreadsheet report seam and the header heuristics that turn a decoded
//! workbook into [`FinancialStatementLine`]s.
//!
//! Decoding bytes into sheets is delegated to a [`WorkbookDecoder`]; this
//! module only decides which row is the header, which columns are periods,
//! and which rows are data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_source::{DataWarning, SourceError};
use crate::normalize::{parse_number, LabelDeduper};
use crate::{
    ComparisonSubject, FinancialStatementLine, Period, ProviderId, RatioComparisonLine,
    StatementType, Symbol,
};

/// Labels that open the header row of a statement table.
const HEADER_LABELS: [&str; 8] = [
    "chỉ số",
    "chỉ tiêu",
    "khoản mục",
    "item",
    "items",
    "indicator",
    "indicators",
    "ratio",
];

/// Provider attribution and footer rows that are not line items.
const ATTRIBUTION_MARKERS: [&str; 3] = ["được cung cấp bởi", "fiintrade.vn", "provided by"];

pub const STATEMENT_CURRENCY: &str = "VND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(text) => Some(text.trim().to_owned()).filter(|text| !text.is_empty()),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", *value as i64))
            }
            Self::Number(value) => Some(value.to_string()),
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Number(value) => Some(*value).filter(|value| value.is_finite()),
            Self::Text(text) => parse_number(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workbook decode failed: {message}")]
pub struct WorkbookError {
    message: String,
}

impl WorkbookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Report-decoding collaborator: binary blob in, labeled sheets out.
pub trait WorkbookDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Sheet>, WorkbookError>;
}

/// `.xlsx` decoder backed by calamine.
#[cfg(feature = "xlsx")]
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWorkbookDecoder;

#[cfg(feature = "xlsx")]
impl WorkbookDecoder for XlsxWorkbookDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Sheet>, WorkbookError> {
        use calamine::{Data, Reader, Xlsx};

        let cursor = std::io::Cursor::new(bytes.to_vec());
        let mut workbook: Xlsx<_> =
            Xlsx::new(cursor).map_err(|error| WorkbookError::new(error.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|error| WorkbookError::new(format!("sheet '{name}': {error}")))?;
            let rows = range
                .rows()
                .map(|row| {
                    row.iter()
                        .map(|cell| match cell {
                            Data::Empty => Cell::Empty,
                            Data::Int(value) => Cell::Number(*value as f64),
                            Data::Float(value) => Cell::Number(*value),
                            Data::String(value) => Cell::Text(value.clone()),
                            other => Cell::Text(other.to_string()),
                        })
                        .collect()
                })
                .collect();
            sheets.push(Sheet { name, rows });
        }
        Ok(sheets)
    }
}

/// Stand-in used when the crate is built without `xlsx`: every report
/// download fails with a decode error.
#[cfg(not(feature = "xlsx"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedWorkbookDecoder;

#[cfg(not(feature = "xlsx"))]
impl WorkbookDecoder for UnsupportedWorkbookDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<Vec<Sheet>, WorkbookError> {
        Err(WorkbookError::new(
            "spreadsheet support is disabled; enable the `xlsx` feature",
        ))
    }
}

/// Header row position inside one sheet.
#[derive(Debug, Clone, PartialEq)]
struct TableHeader {
    sheet: usize,
    row: usize,
    label_column: usize,
    columns: Vec<PeriodColumn>,
}

/// A header cell that parsed as a reporting period.
#[derive(Debug, Clone, PartialEq)]
struct PeriodColumn {
    index: usize,
    period: Period,
    label: String,
}

fn normalize_label(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}

fn locate_header(sheets: &[Sheet]) -> Option<TableHeader> {
    for (sheet_index, sheet) in sheets.iter().enumerate() {
        for (row_index, row) in sheet.rows.iter().enumerate() {
            let Some((label_column, label)) = row
                .iter()
                .enumerate()
                .find_map(|(column, cell)| cell.text().map(|text| (column, text)))
            else {
                continue;
            };
            if !HEADER_LABELS.contains(&normalize_label(&label).as_str()) {
                continue;
            }

            let columns: Vec<PeriodColumn> = row
                .iter()
                .enumerate()
                .skip(label_column + 1)
                .filter_map(|(index, cell)| {
                    let label = cell.text()?;
                    Period::parse_label(&label).map(|period| PeriodColumn {
                        index,
                        period,
                        label,
                    })
                })
                .collect();
            if !columns.is_empty() {
                return Some(TableHeader {
                    sheet: sheet_index,
                    row: row_index,
                    label_column,
                    columns,
                });
            }
        }
    }
    None
}

/// Keep the first column for each `(key, period)`; later repeats become
/// `ColumnDropped` warnings.
fn unique_columns<K: PartialEq>(
    columns: Vec<(K, usize, Period)>,
    warnings: &mut Vec<DataWarning>,
) -> Vec<(K, usize, Period)> {
    let mut kept: Vec<(K, usize, Period)> = Vec::with_capacity(columns.len());
    for (key, index, period) in columns {
        if kept
            .iter()
            .any(|(seen_key, _, seen_period)| *seen_key == key && *seen_period == period)
        {
            warnings.push(DataWarning::ColumnDropped {
                index,
                reason: format!("period {period} already read from an earlier column"),
            });
        } else {
            kept.push((key, index, period));
        }
    }
    kept
}

/// Scale of reported values from a `Đơn vị: Tỷ VND` / `Unit: VND million` banner.
fn detect_unit(rows: &[Vec<Cell>], statement: StatementType) -> String {
    let banner = rows
        .iter()
        .flat_map(|row| row.iter().filter_map(Cell::text))
        .map(|text| text.to_lowercase())
        .find(|text| is_unit_banner(text));

    let Some(banner) = banner else {
        let fallback = if statement == StatementType::Ratio {
            "ratio"
        } else {
            "one"
        };
        return fallback.to_owned();
    };

    let unit = if banner.contains("tỷ") || banner.contains("billion") {
        "billion"
    } else if banner.contains("triệu") || banner.contains("million") {
        "million"
    } else if banner.contains("nghìn") || banner.contains("ngàn") || banner.contains("thousand") {
        "thousand"
    } else {
        "one"
    };
    unit.to_owned()
}

/// `lower` is already lowercased.
fn is_unit_banner(lower: &str) -> bool {
    ["đơn vị", "unit:", "unit :"]
        .iter()
        .any(|prefix| lower.trim_start().starts_with(prefix))
}

fn is_attribution(label: &str) -> bool {
    let lower = label.to_lowercase();
    ATTRIBUTION_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Data rows below the header: `(row index, label, cells)`, attribution and
/// unlabeled rows skipped.
fn data_rows<'a>(
    sheet: &'a Sheet,
    header: &TableHeader,
) -> impl Iterator<Item = (usize, String, &'a [Cell])> + 'a {
    let label_column = header.label_column;
    sheet
        .rows
        .iter()
        .enumerate()
        .skip(header.row + 1)
        .filter_map(move |(row_index, row)| {
            let label = row.get(label_column).and_then(Cell::text)?;
            (!is_attribution(&label)).then_some((row_index, label, row.as_slice()))
        })
}

fn header_not_found(
    provider: ProviderId,
    sheets: &[Sheet],
    symbol: &Symbol,
    statement: StatementType,
) -> SourceError {
    let names: Vec<&str> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    let error = SourceError::report_format(
        provider,
        format!("no {statement} header row found in sheets {names:?}"),
    );
    tracing::warn!(provider = %provider, symbol = %symbol, "{error}");
    error
}

/// Extract canonical lines from a decoded statement workbook.
///
/// Output order is row order, then period-column order, so decoding the
/// same bytes twice yields identical sequences. A period that appears in
/// more than one column (a restated year, say) is read from its first column.
///
/// # Errors
///
/// [`SourceErrorKind::ReportFormat`](crate::SourceErrorKind::ReportFormat)
/// when no sheet has a header row with a known label and at least one period
/// column.
pub fn extract_statement(
    provider: ProviderId,
    sheets: &[Sheet],
    symbol: &Symbol,
    statement: StatementType,
) -> Result<(Vec<FinancialStatementLine>, Vec<DataWarning>), SourceError> {
    let Some(header) = locate_header(sheets) else {
        return Err(header_not_found(provider, sheets, symbol, statement));
    };

    let sheet = &sheets[header.sheet];
    let unit = detect_unit(&sheet.rows[..header.row], statement);
    let mut warnings = Vec::new();
    let periods = unique_columns(
        header
            .columns
            .iter()
            .map(|column| ((), column.index, column.period))
            .collect(),
        &mut warnings,
    );
    tracing::debug!(
        provider = %provider,
        sheet = %sheet.name,
        header_row = header.row,
        periods = periods.len(),
        unit = %unit,
        "located statement header"
    );

    let mut lines = Vec::new();
    let mut labels = LabelDeduper::default();

    for (row_index, label, row) in data_rows(sheet, &header) {
        let values: Vec<(Period, f64)> = periods
            .iter()
            .filter_map(|(_, column, period)| {
                row.get(*column)
                    .and_then(Cell::number)
                    .map(|value| (*period, value))
            })
            .collect();
        if values.is_empty() {
            continue;
        }

        let line_item = labels.unique(&label);
        for (period, value) in values {
            match FinancialStatementLine::new(
                symbol.clone(),
                period,
                statement,
                line_item.clone(),
                value,
                unit.clone(),
                STATEMENT_CURRENCY,
            ) {
                Ok(line) => lines.push(line),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index: row_index,
                    reason: error.to_string(),
                }),
            }
        }
    }

    Ok((lines, warnings))
}

/// Subject named by a header or banner cell: a requested ticker as a whole
/// word, or an industry marker.
fn subject_in(text: &str, symbol: &Symbol, peers: &[Symbol]) -> Option<ComparisonSubject> {
    let tokens: Vec<String> = text
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_uppercase)
        .collect();
    let named = std::iter::once(symbol)
        .chain(peers)
        .find(|candidate| tokens.iter().any(|token| token == candidate.as_str()));
    if let Some(named) = named {
        return Some(ComparisonSubject::Company(named.clone()));
    }

    let lower = text.to_lowercase();
    (lower.contains("ngành") || lower.contains("industry")).then_some(ComparisonSubject::Industry)
}

/// Subject of each period column. The header cell wins; otherwise the nearest
/// banner cell at or left of the column in the row above (merged group
/// titles); otherwise the requested company.
fn column_subjects(
    sheet: &Sheet,
    header: &TableHeader,
    symbol: &Symbol,
    peers: &[Symbol],
) -> Vec<(ComparisonSubject, usize, Period)> {
    let banner = header
        .row
        .checked_sub(1)
        .and_then(|row| sheet.rows.get(row));

    header
        .columns
        .iter()
        .map(|column| {
            let from_banner = || {
                let banner = banner?;
                (header.label_column + 1..=column.index)
                    .rev()
                    .find_map(|index| banner.get(index).and_then(Cell::text))
                    .and_then(|text| subject_in(&text, symbol, peers))
            };
            let subject = subject_in(&column.label, symbol, peers)
                .or_else(from_banner)
                .unwrap_or_else(|| ComparisonSubject::Company(symbol.clone()));
            (subject, column.index, column.period)
        })
        .collect()
}

/// Extract a ratio comparison workbook: one line per subject, period and
/// ratio, in row order then column order.
///
/// # Errors
///
/// [`SourceErrorKind::ReportFormat`](crate::SourceErrorKind::ReportFormat)
/// when no header row is found.
pub fn extract_ratio_comparison(
    provider: ProviderId,
    sheets: &[Sheet],
    symbol: &Symbol,
    peers: &[Symbol],
) -> Result<(Vec<RatioComparisonLine>, Vec<DataWarning>), SourceError> {
    let Some(header) = locate_header(sheets) else {
        return Err(header_not_found(provider, sheets, symbol, StatementType::Ratio));
    };

    let sheet = &sheets[header.sheet];
    let unit = detect_unit(&sheet.rows[..header.row], StatementType::Ratio);
    let mut warnings = Vec::new();
    let columns = unique_columns(column_subjects(sheet, &header, symbol, peers), &mut warnings);
    tracing::debug!(
        provider = %provider,
        sheet = %sheet.name,
        columns = columns.len(),
        peers = peers.len(),
        "located ratio comparison header"
    );

    let mut lines = Vec::new();
    let mut labels = LabelDeduper::default();

    for (row_index, label, row) in data_rows(sheet, &header) {
        let values: Vec<(&ComparisonSubject, Period, f64)> = columns
            .iter()
            .filter_map(|(subject, column, period)| {
                row.get(*column)
                    .and_then(Cell::number)
                    .map(|value| (subject, *period, value))
            })
            .collect();
        if values.is_empty() {
            continue;
        }

        let line_item = labels.unique(&label);
        for (subject, period, value) in values {
            match RatioComparisonLine::new(
                subject.clone(),
                period,
                line_item.clone(),
                value,
                unit.clone(),
            ) {
                Ok(line) => lines.push(line),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index: row_index,
                    reason: error.to_string(),
                }),
            }
        }
    }

    Ok((lines, warnings))
}
