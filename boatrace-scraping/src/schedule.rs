use std::collections::BTreeMap;

use boatrace_scraping_utils::{regex, selector};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use log::{debug, info, warn};
use scraper::{ElementRef, Html};
use url::Url;

use crate::{
    api::BoatraceClient,
    chrono_util::DateKey,
    date_range::parse_mmdd_range,
    normalize::normalize,
    venue::{GradeTier, VenueCode, VenueTable},
};

const GRADE_SCHEDULE_URL: &str = "https://www.boatrace.jp/owpc/pc/race/gradesch";

/// The three tier pages of the grade schedule, in processing order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum ScheduleSource {
    #[strum(serialize = "SG/PG1")]
    SgPg1,
    #[strum(serialize = "G1/G2")]
    G1G2,
    #[strum(serialize = "G3")]
    G3,
}

impl ScheduleSource {
    pub const ALL: [ScheduleSource; 3] = [Self::SgPg1, Self::G1G2, Self::G3];

    fn hcd(self) -> &'static str {
        match self {
            Self::SgPg1 => "01",
            Self::G1G2 => "02",
            Self::G3 => "03",
        }
    }

    /// Tier assumed for a row whose images reveal no grade: being listed on
    /// this page already guarantees at least this much.
    fn floor(self) -> GradeTier {
        match self {
            Self::SgPg1 => GradeTier::SG,
            Self::G1G2 => GradeTier::G1,
            Self::G3 => GradeTier::G3,
        }
    }

    pub fn url(self, year: i32) -> Url {
        Url::parse_with_params(
            GRADE_SCHEDULE_URL,
            [("hcd", self.hcd().to_owned()), ("year", year.to_string())],
        )
        .unwrap()
    }
}

/// Venue-code → tier mapping for one day. Holds exactly one entry per venue
/// of the table it was built from and is read-only once the resolver
/// returns it.
#[derive(Clone, Debug)]
pub struct GradeMap {
    grades: BTreeMap<VenueCode, GradeTier>,
}

impl GradeMap {
    pub fn new(table: &VenueTable) -> Self {
        Self {
            grades: table
                .codes()
                .map(|code| (code, GradeTier::General))
                .collect(),
        }
    }

    pub fn get(&self, code: VenueCode) -> GradeTier {
        self.grades
            .get(&code)
            .copied()
            .unwrap_or(GradeTier::General)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VenueCode, GradeTier)> + '_ {
        self.grades.iter().map(|(&code, &grade)| (code, grade))
    }

    /// Rank-respecting merge: an equal or stronger tier overwrites, so among
    /// equal ranks the later-processed source wins.
    pub fn apply(&mut self, code: VenueCode, grade: GradeTier) {
        let entry = self.grades.entry(code).or_insert(GradeTier::General);
        if grade >= *entry {
            *entry = grade;
        }
    }
}

/// One schedule-page row that turned out to be relevant: a venue, its
/// event's date range, and whatever grade the row's images revealed.
#[derive(Clone, Debug)]
struct ScheduleEvent {
    venue: VenueCode,
    grade: Option<GradeTier>,
    start: NaiveDate,
    end: NaiveDate,
}

/// Builds the day's grade mapping from the three schedule sources. A source
/// that cannot be fetched is skipped; the worst case is every venue staying
/// at 一般. Never fails.
pub async fn resolve_grades(
    client: &BoatraceClient,
    table: &VenueTable,
    date: DateKey,
) -> GradeMap {
    let target = date.date();
    let mut grades = GradeMap::new(table);
    for source in ScheduleSource::ALL {
        let url = source.url(target.year());
        let page = match client.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping schedule source {source}: {e:#}");
                continue;
            }
        };
        if !page.is_success() {
            warn!(
                "Skipping schedule source {source}: server returned {}",
                page.status
            );
            continue;
        }
        scan_schedule_page(
            &Html::parse_document(&page.body),
            source,
            target,
            table,
            &mut grades,
        );
    }
    let graded = grades
        .iter()
        .filter(|&(_, grade)| grade != GradeTier::General)
        .count();
    info!("Grade map ready: {graded} venue(s) carry a graded meet");
    grades
}

/// Folds every relevant row of one schedule page into the mapping.
pub fn scan_schedule_page(
    html: &Html,
    source: ScheduleSource,
    target: NaiveDate,
    table: &VenueTable,
    grades: &mut GradeMap,
) {
    for row in html.select(selector!("tr")) {
        let Some(event) = parse_schedule_row(row, table, target) else {
            continue;
        };
        let grade = event.grade.unwrap_or_else(|| source.floor());
        debug!(
            "{source}: {} {}〜{} -> {grade}",
            event.venue, event.start, event.end
        );
        grades.apply(event.venue, grade);
    }
}

/// A row is relevant iff it carries a date-range token whose range contains
/// the target date and it names a known venue. Header and footer rows fail
/// the first check; decorative rows fail the second.
fn parse_schedule_row(
    row: ElementRef,
    table: &VenueTable,
    target: NaiveDate,
) -> Option<ScheduleEvent> {
    let row_norm = normalize(&row_text(row));
    let token = regex!(r"\d{1,2}/\d{1,2}-\d{1,2}/\d{1,2}").find(&row_norm)?;
    let (start, end) = parse_mmdd_range(token.as_str(), target.year())?;
    if !(start..=end).contains(&target) {
        return None;
    }
    let venue = detect_venue(row, table)?;
    Some(ScheduleEvent {
        venue,
        grade: detect_grade(row),
        start,
        end,
    })
}

fn row_text(row: ElementRef) -> String {
    row.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .join(" ")
}

fn detect_venue(row: ElementRef, table: &VenueTable) -> Option<VenueCode> {
    let strategies: [fn(ElementRef, &VenueTable) -> Option<VenueCode>; 2] =
        [venue_from_image_labels, venue_from_row_text];
    strategies
        .into_iter()
        .find_map(|strategy| strategy(row, table))
}

fn venue_from_image_labels(row: ElementRef, table: &VenueTable) -> Option<VenueCode> {
    row.select(selector!("img"))
        .filter_map(|img| img.value().attr("alt"))
        .find_map(|alt| table.code_by_name(alt.trim()))
}

fn venue_from_row_text(row: ElementRef, table: &VenueTable) -> Option<VenueCode> {
    let text = row_text(row);
    table
        .entries()
        .find(|&(_, name)| text.contains(name))
        .map(|(code, _)| code)
}

fn detect_grade(row: ElementRef) -> Option<GradeTier> {
    let strategies: [fn(ElementRef) -> Option<GradeTier>; 2] =
        [grade_from_image_labels, grade_from_image_sources];
    strategies.into_iter().find_map(|strategy| strategy(row))
}

fn grade_from_image_labels(row: ElementRef) -> Option<GradeTier> {
    row.select(selector!("img"))
        .filter_map(|img| img.value().attr("alt"))
        .find_map(|alt| grade_marker(alt))
}

fn grade_marker(label: &str) -> Option<GradeTier> {
    use GradeTier::*;
    Some(match label.trim().to_ascii_uppercase().as_str() {
        "SG" => SG,
        "PG1" => PG1,
        "G1" => G1,
        "G2" => G2,
        "G3" => G3,
        _ => return None,
    })
}

fn grade_from_image_sources(row: ElementRef) -> Option<GradeTier> {
    // "pg1" must be probed before "g1": a bare "g1" check would also hit
    // inside pg1-style file names.
    const BY_SOURCE: [(&str, GradeTier); 5] = [
        ("pg1", GradeTier::PG1),
        ("sg", GradeTier::SG),
        ("g1", GradeTier::G1),
        ("g2", GradeTier::G2),
        ("g3", GradeTier::G3),
    ];
    row.select(selector!("img"))
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| {
            let src = src.to_ascii_lowercase();
            BY_SOURCE
                .iter()
                .find(|(needle, _)| src.contains(needle))
                .map(|&(_, grade)| grade)
        })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use scraper::Html;

    use crate::venue::{GradeTier, VenueTable};

    use super::{scan_schedule_page, GradeMap, ScheduleSource};

    fn schedule_page(rows: &str) -> Html {
        Html::parse_document(&format!("<html><body><table>{rows}</table></body></html>"))
    }

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
    }

    #[test]
    fn merge_never_downgrades() {
        let table = VenueTable::official();
        let marugame = table.code_by_name("丸亀").unwrap();
        let mut grades = GradeMap::new(table);

        grades.apply(marugame, GradeTier::G2);
        grades.apply(marugame, GradeTier::G1);
        assert_eq!(grades.get(marugame), GradeTier::G1);

        grades.apply(marugame, GradeTier::SG);
        grades.apply(marugame, GradeTier::G1);
        assert_eq!(grades.get(marugame), GradeTier::SG);
    }

    #[test]
    fn map_starts_with_one_general_entry_per_venue() {
        let table = VenueTable::official();
        let grades = GradeMap::new(table);
        assert_eq!(grades.iter().count(), 24);
        assert!(grades.iter().all(|(_, g)| g == GradeTier::General));
    }

    #[test]
    fn ungraded_row_falls_back_to_the_page_floor() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let html = schedule_page(
            r#"<tr><td>開催日程</td><td>グレード</td></tr>
               <tr><td>丸亀</td><td>06/10-06/15</td><td>さぬき王座決定戦</td></tr>"#,
        );
        scan_schedule_page(&html, ScheduleSource::G1G2, target(), table, &mut grades);
        let marugame = table.code_by_name("丸亀").unwrap();
        assert_eq!(marugame.as_str(), "15");
        assert_eq!(grades.get(marugame), GradeTier::G1);
    }

    #[test]
    fn image_labels_win_over_the_floor() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let html = schedule_page(
            r#"<tr>
                 <td><img src="/images/venue_01.png" alt="桐生"></td>
                 <td><img src="/images/icon.png" alt="pg1"></td>
                 <td>06/10-06/15</td>
               </tr>"#,
        );
        scan_schedule_page(&html, ScheduleSource::SgPg1, target(), table, &mut grades);
        let kiryu = table.code_by_name("桐生").unwrap();
        assert_eq!(grades.get(kiryu), GradeTier::PG1);
    }

    #[test]
    fn image_sources_resolve_pg1_before_g1() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let html = schedule_page(
            r#"<tr>
                 <td>戸田</td>
                 <td><img src="/images/icon_grade_PG1.png"></td>
                 <td>06/10-06/15</td>
               </tr>
               <tr>
                 <td>津</td>
                 <td><img src="/images/icon_grade_g2.png"></td>
                 <td>06/11-06/16</td>
               </tr>"#,
        );
        scan_schedule_page(&html, ScheduleSource::SgPg1, target(), table, &mut grades);
        assert_eq!(
            grades.get(table.code_by_name("戸田").unwrap()),
            GradeTier::PG1
        );
        assert_eq!(grades.get(table.code_by_name("津").unwrap()), GradeTier::G2);
    }

    #[test]
    fn rows_outside_the_target_date_are_ignored() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let html = schedule_page(
            r#"<tr><td>丸亀</td><td>06/13-06/18</td></tr>
               <tr><td>住之江</td><td>優勝戦</td></tr>"#,
        );
        scan_schedule_page(&html, ScheduleSource::G1G2, target(), table, &mut grades);
        assert!(grades.iter().all(|(_, g)| g == GradeTier::General));
    }

    #[test]
    fn year_boundary_ranges_match_december_dates() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let html = schedule_page(r#"<tr><td>住之江</td><td>12/28-01/03</td></tr>"#);
        let december = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        scan_schedule_page(&html, ScheduleSource::SgPg1, december, table, &mut grades);
        assert_eq!(
            grades.get(table.code_by_name("住之江").unwrap()),
            GradeTier::SG
        );
    }

    #[test]
    fn later_page_never_downgrades_an_earlier_one() {
        let table = VenueTable::official();
        let mut grades = GradeMap::new(table);
        let row = r#"<tr><td>丸亀</td><td>06/10-06/15</td></tr>"#;
        let html = schedule_page(row);
        scan_schedule_page(&html, ScheduleSource::G1G2, target(), table, &mut grades);
        scan_schedule_page(&html, ScheduleSource::G3, target(), table, &mut grades);
        assert_eq!(
            grades.get(table.code_by_name("丸亀").unwrap()),
            GradeTier::G1
        );
    }
}
