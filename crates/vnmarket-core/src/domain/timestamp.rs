//! Calendar helpers pinned to the Ho Chi Minh City trading clock (UTC+7, no DST).

use time::format_description::BorrowedFormatItem;
use time::macros::{format_description, offset};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::ValidationError;

/// Exchange-local offset for HOSE, HNX and UPCoM.
pub const VN_OFFSET: UtcOffset = offset!(+7);

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const COMPACT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
const DMY_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");
const ISO_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const CLOCK_TIME: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Parse a caller-supplied `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Parse the date formats seen across provider payloads:
/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS…`, `DD/MM/YYYY` and `YYYYMMDD`.
pub fn parse_provider_date(input: &str) -> Option<Date> {
    let trimmed = input.trim();
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = Date::parse(prefix, ISO_DATE) {
            return Some(date);
        }
        if let Ok(date) = Date::parse(prefix, DMY_DATE) {
            return Some(date);
        }
    }
    Date::parse(trimmed, COMPACT_DATE).ok()
}

/// Parse `HH:MM:SS` clock strings used by intraday trade feeds.
pub fn parse_clock_time(input: &str) -> Option<Time> {
    Time::parse(input.trim(), CLOCK_TIME).ok()
}

/// Convert epoch milliseconds into an exchange-local wall-clock datetime.
pub fn local_datetime_from_millis(millis: i64) -> Option<PrimitiveDateTime> {
    let utc = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()?;
    let local = utc.to_offset(VN_OFFSET);
    Some(PrimitiveDateTime::new(local.date(), local.time()))
}

/// Convert epoch milliseconds into the exchange-local trading date.
pub fn local_date_from_millis(millis: i64) -> Option<Date> {
    local_datetime_from_millis(millis).map(PrimitiveDateTime::date)
}

/// Epoch milliseconds at local midnight of `date`.
pub fn local_midnight_millis(date: Date) -> i64 {
    let instant = PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(VN_OFFSET);
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Today's date on the exchange clock.
pub fn local_today() -> Date {
    OffsetDateTime::now_utc().to_offset(VN_OFFSET).date()
}

/// `(end - 365 days, end)`, saturating at `Date::MIN`.
pub fn trailing_year(end: Date) -> (Date, Date) {
    let start = end.checked_sub(Duration::days(365)).unwrap_or(Date::MIN);
    (start, end)
}

pub fn format_iso_date(date: Date) -> String {
    date.format(ISO_DATE)
        .unwrap_or_else(|_| String::from("<unformattable>"))
}

pub fn format_compact_date(date: Date) -> String {
    date.format(COMPACT_DATE)
        .unwrap_or_else(|_| String::from("<unformattable>"))
}

pub fn format_iso_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(ISO_DATETIME)
        .unwrap_or_else(|_| String::from("<unformattable>"))
}

/// Serde adapter for `time::Date` as `YYYY-MM-DD`.
pub mod iso_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso_date(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::de::Error as DeError;
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(date) => serializer.serialize_some(&super::super::format_iso_date(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|value| super::super::parse_date(&value).map_err(D::Error::custom))
                .transpose()
        }
    }
}

/// Serde adapter for exchange-local `PrimitiveDateTime` as `YYYY-MM-DDTHH:MM:SS`.
pub mod iso_datetime {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::PrimitiveDateTime;

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso_datetime(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        PrimitiveDateTime::parse(&value, super::ISO_DATETIME).map_err(D::Error::custom)
    }
}
