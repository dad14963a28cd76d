//! Raw provider payload → canonical record helpers shared by adapters.

use std::collections::HashMap;

use serde_json::Value;
use time::Date;

use crate::data_source::{Batch, DataWarning, HistoryRequest, Operation, SourceError};
use crate::domain::timestamp::{local_date_from_millis, parse_provider_date};
use crate::{PriceBar, ProviderId};

/// Epoch-millisecond values are at least this large (2001-09-09).
const MIN_EPOCH_MILLIS: i64 = 1_000_000_000_000;

/// Parse a response body as JSON, keeping a fragment of the body on failure.
pub fn decode_json(provider: ProviderId, body: &[u8]) -> Result<Value, SourceError> {
    serde_json::from_slice(body).map_err(|error| {
        let raw = String::from_utf8_lossy(body);
        let error = SourceError::adapter_parse(provider, format!("invalid JSON: {error}"), &raw);
        tracing::warn!(
            provider = %provider,
            fragment = error.fragment().unwrap_or_default(),
            "{error}"
        );
        error
    })
}

/// Pull the row array stored under the first present key.
///
/// A present key holding `null` or `[]` means "no data". A payload with none
/// of the keys, or a non-array value, is a shape change and fails.
pub fn row_array<'a>(
    provider: ProviderId,
    payload: &'a Value,
    keys: &[&str],
) -> Result<&'a [Value], SourceError> {
    let Some(object) = payload.as_object() else {
        return Err(parse_error(provider, "expected a JSON object", payload));
    };

    for key in keys {
        match object.get(*key) {
            Some(Value::Null) => return Ok(&[]),
            Some(Value::Array(rows)) => return Ok(rows.as_slice()),
            Some(_) => {
                return Err(parse_error(
                    provider,
                    &format!("field '{key}' is not an array"),
                    payload,
                ))
            }
            None => {}
        }
    }

    Err(parse_error(
        provider,
        &format!("none of the fields {keys:?} are present"),
        payload,
    ))
}

/// Build an `AdapterParse` error from a JSON value and log it.
pub fn parse_error(provider: ProviderId, message: &str, raw: &Value) -> SourceError {
    let error = SourceError::adapter_parse(provider, message, raw.to_string());
    tracing::warn!(
        provider = %provider,
        fragment = error.fragment().unwrap_or_default(),
        "{error}"
    );
    error
}

/// View `raw` as an object row, failing with its fragment otherwise.
pub fn object_row(provider: ProviderId, raw: &Value) -> Result<Row<'_>, SourceError> {
    Row::new(raw).ok_or_else(|| parse_error(provider, "expected an object row", raw))
}

/// Field accessor over one JSON object row that tolerates alternate field
/// names, numeric strings and several date encodings.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    value: &'a Value,
}

impl<'a> Row<'a> {
    pub fn new(value: &'a Value) -> Option<Self> {
        value.is_object().then_some(Self { value })
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    /// First non-null field among `names`.
    pub fn field(&self, names: &[&str]) -> Option<&'a Value> {
        names
            .iter()
            .filter_map(|name| self.value.get(*name))
            .find(|value| !value.is_null())
    }

    pub fn nested(&self, names: &[&str]) -> Option<Row<'a>> {
        self.field(names).and_then(Row::new)
    }

    pub fn array(&self, names: &[&str]) -> &'a [Value] {
        self.field(names)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn f64(&self, names: &[&str]) -> Option<f64> {
        match self.field(names)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => parse_number(text),
            _ => None,
        }
        .filter(|value| value.is_finite())
    }

    /// Non-negative integer (volumes); fractional values are rounded.
    pub fn u64(&self, names: &[&str]) -> Option<u64> {
        let value = self.f64(names)?;
        (value >= 0.0).then(|| value.round() as u64)
    }

    pub fn i64(&self, names: &[&str]) -> Option<i64> {
        self.f64(names).map(|value| value.round() as i64)
    }

    pub fn str(&self, names: &[&str]) -> Option<&'a str> {
        self.field(names)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn string(&self, names: &[&str]) -> Option<String> {
        match self.field(names)? {
            Value::String(text) => Some(text.trim().to_owned()).filter(|text| !text.is_empty()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// Exchange-local date from epoch millis, a millis string, or a date string.
    pub fn date(&self, names: &[&str]) -> Option<Date> {
        match self.field(names)? {
            Value::Number(number) => number.as_i64().and_then(date_from_millis),
            Value::String(text) => parse_provider_date(text).or_else(|| {
                text.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(date_from_millis)
            }),
            _ => None,
        }
    }
}

fn date_from_millis(millis: i64) -> Option<Date> {
    (millis >= MIN_EPOCH_MILLIS)
        .then(|| local_date_from_millis(millis))
        .flatten()
}

/// Parse provider number text: thousands separators, `%` suffixes and
/// accounting negatives `(1,234)`. Dashes and blanks are missing values.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .trim_end_matches('%')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    let value = cleaned.parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some(if negative { -value } else { value })
}

/// Sort bars by date, keep the last row per date, drop rows outside
/// `[start, end]` and apply `count_back`.
pub fn finalize_bars(
    mut bars: Vec<PriceBar>,
    start: Date,
    end: Date,
    count_back: Option<usize>,
) -> (Vec<PriceBar>, Vec<DataWarning>) {
    let mut warnings = Vec::new();

    bars.sort_by_key(|bar| bar.date);
    let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match unique.last_mut() {
            Some(previous) if previous.date == bar.date => *previous = bar,
            _ => unique.push(bar),
        }
    }

    let before = unique.len();
    unique.retain(|bar| bar.date >= start && bar.date <= end);
    let dropped = before - unique.len();
    if dropped > 0 {
        warnings.push(DataWarning::RowsOutsideRange { dropped });
    }

    if let Some(count) = count_back {
        if unique.len() > count {
            unique.drain(..unique.len() - count);
        }
    }

    (unique, warnings)
}

/// Finalize parsed bars into a history batch. A result left empty after
/// range truncation carries the `DataUnavailable` signal.
pub fn history_batch(
    provider: ProviderId,
    bars: Vec<PriceBar>,
    row_warnings: Vec<DataWarning>,
    req: &HistoryRequest,
) -> Batch<PriceBar> {
    let (bars, range_warnings) = finalize_bars(bars, req.start, req.end, req.count_back);
    let warnings = row_warnings.into_iter().chain(range_warnings);
    if bars.is_empty() {
        return Batch::unavailable(provider, Operation::History).with_warnings(warnings);
    }
    Batch::new(bars).with_warnings(warnings)
}

/// Assigns `"Label (2)"`, `"Label (3)"`… to repeated labels.
#[derive(Debug, Default)]
pub struct LabelDeduper {
    seen: HashMap<String, usize>,
}

impl LabelDeduper {
    pub fn unique(&mut self, label: &str) -> String {
        let count = self.seen.entry(label.to_owned()).or_insert(0);
        *count += 1;
        if *count == 1 {
            label.to_owned()
        } else {
            format!("{label} ({count})")
        }
    }
}
