//! 出生日期的格式转换
//!
//! 存储端使用 ISO `yyyy-mm-dd`，展示/编辑端使用 `dd/mm/yyyy`。
//! 两个方向对合法日历日期互为逆运算。

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::SharedError;

/// 展示格式 dd/mm/yyyy
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";
/// 存储格式 yyyy-mm-dd
pub const ISO_FORMAT: &str = "%Y-%m-%d";

static DISPLAY_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("display date pattern"));

static OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("utc offset pattern"));

/// 客户端逐键校验使用：只检查 `dd/mm/yyyy` 形状，不检查日历合法性
pub fn is_display_format(value: &str) -> bool {
    DISPLAY_DATE_RE.is_match(value)
}

/// `dd/mm/yyyy` -> 日期。形状和日历都必须合法
pub fn to_storage(value: &str) -> Result<NaiveDate, SharedError> {
    let caps = DISPLAY_DATE_RE
        .captures(value)
        .ok_or_else(|| SharedError::InvalidDate(format!("{value:?} is not dd/mm/yyyy")))?;

    let day: u32 = caps[1]
        .parse()
        .map_err(|_| SharedError::InvalidDate(value.to_string()))?;
    let month: u32 = caps[2]
        .parse()
        .map_err(|_| SharedError::InvalidDate(value.to_string()))?;
    let year: i32 = caps[3]
        .parse()
        .map_err(|_| SharedError::InvalidDate(value.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| SharedError::InvalidDate(format!("{value:?} is not a calendar date")))
}

/// 日期 -> `dd/mm/yyyy`
pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// 日期 -> `yyyy-mm-dd`
pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

pub fn parse_iso(value: &str) -> Result<NaiveDate, SharedError> {
    NaiveDate::parse_from_str(value, ISO_FORMAT)
        .map_err(|e| SharedError::InvalidDate(format!("{value:?}: {e}")))
}

/// 解析 `+05:30` / `-0800` / `Z` / `UTC` 形式的时区偏移
pub fn parse_offset(value: &str) -> Result<FixedOffset, SharedError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }

    let caps = OFFSET_RE
        .captures(value)
        .ok_or_else(|| SharedError::InvalidTimezone(value.to_string()))?;
    let hours: i32 = caps[2]
        .parse()
        .map_err(|_| SharedError::InvalidTimezone(value.to_string()))?;
    let minutes: i32 = caps[3]
        .parse()
        .map_err(|_| SharedError::InvalidTimezone(value.to_string()))?;
    if minutes >= 60 {
        return Err(SharedError::InvalidTimezone(value.to_string()));
    }

    let seconds = (hours * 60 + minutes) * 60;
    let seconds = if &caps[1] == "-" { -seconds } else { seconds };
    FixedOffset::east_opt(seconds).ok_or_else(|| SharedError::InvalidTimezone(value.to_string()))
}

fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}

/// 带显式时区的日期转换器
///
/// 某些驱动会把 DATE 列表示成"当天零点"的时间戳，直接取 UTC 日期会差一天。
/// 这里在取日期之前先把时间戳换算到配置的时区。纯 ISO 日期不做偏移。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCodec {
    offset: FixedOffset,
}

impl Default for DateCodec {
    fn default() -> Self {
        Self::utc()
    }
}

impl DateCodec {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(utc_offset())
    }

    pub fn from_offset_str(value: &str) -> Result<Self, SharedError> {
        parse_offset(value).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_storage(&self, value: &str) -> Result<NaiveDate, SharedError> {
        to_storage(value)
    }

    /// 日历日期没有时区，偏移不参与转换
    pub fn to_display(&self, date: NaiveDate) -> String {
        to_display(date)
    }

    pub fn display_from_timestamp(&self, ts: DateTime<Utc>) -> String {
        to_display(ts.with_timezone(&self.offset).date_naive())
    }

    /// 接受线上出现的两种形式：`yyyy-mm-dd` 或 RFC 3339 时间戳
    pub fn display_from_wire(&self, value: &str) -> Result<String, SharedError> {
        if let Ok(date) = parse_iso(value) {
            return Ok(to_display(date));
        }
        DateTime::parse_from_rfc3339(value)
            .map(|ts| self.display_from_timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| SharedError::InvalidDate(format!("{value:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_round_trip_for_every_day_of_a_leap_year() {
        let mut day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        while day.year() == 2024 {
            let display = to_display(day);
            assert_eq!(to_display(to_storage(&display).unwrap()), display);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_round_trip_edge_years() {
        for s in ["01/01/0005", "31/12/9999", "29/02/2000", "28/02/1900"] {
            assert_eq!(to_display(to_storage(s).unwrap()), s);
        }
    }

    #[test]
    fn test_example_record_date() {
        let stored = to_storage("15/06/1990").unwrap();
        assert_eq!(to_iso(stored), "1990-06-15");
        assert_eq!(to_display(parse_iso("1990-06-15").unwrap()), "15/06/1990");
    }

    #[test]
    fn test_rejects_malformed_shapes() {
        for s in [
            "1/6/1990",
            "15-06-1990",
            "1990-06-15",
            " 15/06/1990",
            "15/06/1990 ",
            "15/06/90",
            "",
        ] {
            assert!(!is_display_format(s), "{s:?} should not match");
            assert!(to_storage(s).is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn test_rejects_impossible_calendar_dates() {
        for s in ["31/02/2020", "29/02/2019", "00/01/2000", "15/13/1990"] {
            assert!(is_display_format(s));
            assert!(matches!(to_storage(s), Err(SharedError::InvalidDate(_))));
        }
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+05:30").unwrap().local_minus_utc(), 330 * 60);
        assert_eq!(parse_offset("-0800").unwrap().local_minus_utc(), -8 * 3600);
        assert_eq!(parse_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_offset("+05:75").is_err());
        assert!(parse_offset("IST").is_err());
    }

    #[test]
    fn test_timestamp_display_uses_configured_offset() {
        // 1990-06-15 在 +05:30 的零点
        let ts = DateTime::parse_from_rfc3339("1990-06-14T18:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let india = DateCodec::from_offset_str("+05:30").unwrap();
        assert_eq!(india.display_from_timestamp(ts), "15/06/1990");
        assert_eq!(DateCodec::utc().display_from_timestamp(ts), "14/06/1990");
    }

    #[test]
    fn test_display_from_wire() {
        let codec = DateCodec::from_offset_str("+05:30").unwrap();
        assert_eq!(codec.display_from_wire("1990-06-15").unwrap(), "15/06/1990");
        assert_eq!(
            codec
                .display_from_wire("1990-06-14T18:30:00.000Z")
                .unwrap(),
            "15/06/1990"
        );
        assert!(codec.display_from_wire("15/06/1990").is_err());
    }
}
