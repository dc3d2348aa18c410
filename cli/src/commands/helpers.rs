use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use liftlog_core::models::Food;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// `None`/"now" is the current instant. Otherwise RFC 3339, or a local
/// `YYYY-MM-DD HH:MM` / `YYYY-MM-DDTHH:MM`.
pub(crate) fn parse_datetime(s: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(s) = s.map(str::trim) else {
        return Ok(Utc::now());
    };
    if s == "now" {
        return Ok(Utc::now());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .with_context(|| {
            format!("Invalid time '{s}'. Use 'now', RFC 3339 or 'YYYY-MM-DD HH:MM'")
        })?;
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => bail!("'{s}' does not exist in the local timezone"),
    }
}

pub(crate) fn local_time(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Reports an empty result and exits with status 2.
pub(crate) fn nothing_found(json: bool, message: &str) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Same as [`nothing_found`] for list commands: JSON output is `[]`.
pub(crate) fn empty_list(json: bool, message: &str) -> ! {
    if json {
        println!("[]");
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Rounded table with the given column range right-aligned.
pub(crate) fn render_table<T: Tabled>(rows: &[T], numeric: std::ops::RangeFrom<usize>) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(numeric)).with(Alignment::right()))
        .to_string()
}

pub(crate) fn print_food_table(foods: &[Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: truncate(&f.id, 24),
            name: truncate(&f.name, 35),
            brand: f
                .brand
                .as_deref()
                .map(|b| truncate(b, 20))
                .unwrap_or_default(),
            serving: format!("{}{}", f.serving_size, f.serving_unit),
            calories: format!("{:.0}", f.calories),
            protein: format!("{:.1}", f.protein),
            carbs: format!("{:.1}", f.carbs),
            fat: format!("{:.1}", f.fat),
        })
        .collect();

    println!("{}", render_table(&rows, 3..));
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime(Some("2024-06-15T07:30:00Z")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 6, 15, 7, 30, 0).unwrap());

        let offset = parse_datetime(Some("2024-06-15T09:30:00+02:00")).unwrap();
        assert_eq!(offset, dt);
    }

    #[test]
    fn test_parse_datetime_local() {
        let dt = parse_datetime(Some("2024-06-15 07:30")).unwrap();
        let local = dt.with_timezone(&Local);
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-06-15 07:30");
        assert_eq!(parse_datetime(Some("2024-06-15T07:30")).unwrap(), dt);
    }

    #[test]
    fn test_parse_datetime_now_and_invalid() {
        let before = Utc::now();
        assert!(parse_datetime(None).unwrap() >= before);
        assert!(parse_datetime(Some("now")).unwrap() >= before);
        assert!(parse_datetime(Some("half past seven")).is_err());
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(json_error("no \"food\""), r#"{"error":"no \"food\""}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
    }
}
