use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

pub mod rtvslo;

lazy_static! {
    static ref SLOVENIAN_DATETIME: Regex =
        Regex::new(r"(\d{1,2})\.\s*(\w+)\s+(\d{4})\s+ob\s+(\d{1,2})\.(\d{2})").unwrap();
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januar" | "januarja" => 1,
        "februar" | "februarja" => 2,
        "marec" | "marca" => 3,
        "april" | "aprila" => 4,
        "maj" | "maja" => 5,
        "junij" | "junija" => 6,
        "julij" | "julija" => 7,
        "avgust" | "avgusta" => 8,
        "september" | "septembra" => 9,
        "oktober" | "oktobra" => 10,
        "november" | "novembra" => 11,
        "december" | "decembra" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses stamps like "12. oktober 2023 ob 14.35".
///
/// Pages show the publication stamp and, once edited, a second
/// "last updated" stamp; the second one wins.
pub fn parse_slovenian_datetime(text: &str, utc_offset_hours: i32) -> Option<DateTime<Utc>> {
    let captures = SLOVENIAN_DATETIME.captures_iter(text).take(2).last()?;

    let day: u32 = captures[1].parse().ok()?;
    let month = month_number(&captures[2])?;
    let year: i32 = captures[3].parse().ok()?;
    let hour: u32 = captures[4].parse().ok()?;
    let minute: u32 = captures[5].parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publication_stamp() {
        let at = parse_slovenian_datetime("Objavljeno: 3. marec 2024 ob 9.05", 1).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-03T08:05:00+00:00");
    }

    #[test]
    fn test_parse_prefers_update_stamp() {
        let text = "12. oktober 2023 ob 14.35 | posodobljeno 13. oktober 2023 ob 8.10";
        let at = parse_slovenian_datetime(text, 0).unwrap();
        assert_eq!(at.to_rfc3339(), "2023-10-13T08:10:00+00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_slovenian_datetime("včeraj", 0).is_none());
        assert!(parse_slovenian_datetime("31. februar 2023 ob 10.00", 0).is_none());
        assert!(parse_slovenian_datetime("1. smarch 2023 ob 10.00", 0).is_none());
    }
}
