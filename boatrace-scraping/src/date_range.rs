use boatrace_scraping_utils::regex;
use chrono::NaiveDate;

use crate::normalize::normalize;

/// Parses an `M/D-M/D` event range into concrete dates of `year`.
/// A range starting in December and ending in January spans the year
/// boundary, so its end date lands in `year + 1`.
///
/// Returns `None` for text that is not a range (or names an impossible
/// date); callers treat that as an ordinary "skip this row" outcome.
pub fn parse_mmdd_range(text: &str, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let s = normalize(text);
    let captures = regex!(r"^(\d{1,2})/(\d{1,2})-(\d{1,2})/(\d{1,2})").captures(&s)?;
    let start_month: u32 = captures[1].parse().ok()?;
    let start_day: u32 = captures[2].parse().ok()?;
    let end_month: u32 = captures[3].parse().ok()?;
    let end_day: u32 = captures[4].parse().ok()?;

    let start = NaiveDate::from_ymd_opt(year, start_month, start_day)?;
    let end_year = if start_month == 12 && end_month == 1 {
        year + 1
    } else {
        year
    };
    let end = NaiveDate::from_ymd_opt(end_year, end_month, end_day)?;
    Some((start, end))
}
