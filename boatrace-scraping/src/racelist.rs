use anyhow::Context;
use boatrace_scraping_utils::regex;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::debug;
use scraper::Html;
use serde::Serialize;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    api::{BoatraceClient, FetchedPage},
    chrono_util::DateKey,
    normalize::normalize,
    schedule::GradeMap,
    venue::{GradeTier, VenueCode, VenueTable},
};

const RACELIST_URL: &str = "https://www.boatrace.jp/owpc/pc/race/racelist";

/// Markers of site-level interstitial pages (bad-URL notice, login
/// redirect, congestion notice). Any of these preempts every other check.
const BLOCKED_MARKERS: [&str; 4] = [
    "不正なURLへのリクエストです",
    "ログインページ",
    "アクセスが集中",
    "/login",
];

/// The site serves a minimal placeholder instead of a 404 when no meet is
/// scheduled; anything at or below this size cannot be a real race list.
const NO_RACE_MAX_BYTES: u64 = 20_000;

const NO_DATA_PHRASES: [&str; 2] = ["該当するデータがありません", "データがありません"];

/// Keywords anchoring the active-race search, strongest signal first.
const RACE_KEYWORDS: [&str; 3] = ["現在", "発売中", "締切"];
const KEYWORD_WINDOW_CHARS: usize = 250;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusNote {
    Ok,
    NoRace,
    Blocked,
    Error,
}

/// What a fetched race-list page turned out to be, decided before any
/// parsing is attempted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PageClass {
    Blocked,
    NoRace,
    Held,
}

/// Race fields that only exist on a held venue's record. Kept as one unit
/// so an unheld record structurally cannot carry any of them.
#[derive(Clone, Debug, Getters, CopyGetters, Serialize, TypedBuilder)]
pub struct HeldRace {
    #[getset(get_copy = "pub")]
    grade: GradeTier,
    #[getset(get = "pub")]
    day: String,
    #[getset(get = "pub")]
    race: String,
    #[getset(get = "pub")]
    time: String,
}

/// Per-venue result row of the snapshot. The held payload is flattened into
/// the JSON object when present and omitted entirely when absent.
#[derive(Clone, Debug, Getters, CopyGetters, Serialize, TypedBuilder)]
pub struct VenueRecord {
    #[getset(get_copy = "pub")]
    jcd: VenueCode,
    #[getset(get_copy = "pub")]
    name: &'static str,
    #[getset(get = "pub")]
    url: Url,
    #[getset(get_copy = "pub")]
    status_code: u16,
    #[getset(get_copy = "pub")]
    bytes: u64,
    #[getset(get_copy = "pub")]
    held: bool,
    #[getset(get_copy = "pub")]
    note: StatusNote,
    #[serde(flatten)]
    #[getset(get = "pub")]
    race: Option<HeldRace>,
}

pub fn racelist_url(code: VenueCode, date: DateKey) -> Url {
    // rno=1 only lands us on a page exposing the day's overall status;
    // the first race itself is irrelevant.
    Url::parse_with_params(
        RACELIST_URL,
        [
            ("rno", "1".to_owned()),
            ("jcd", code.as_str().to_owned()),
            ("hd", date.to_string()),
        ],
    )
    .unwrap()
}

/// Fetches one venue's daily race list and interprets it. Transport errors
/// propagate to the caller; everything observed on a fetched page is data.
pub async fn fetch_venue_record(
    client: &BoatraceClient,
    table: &VenueTable,
    code: VenueCode,
    date: DateKey,
    grades: &GradeMap,
) -> anyhow::Result<VenueRecord> {
    let url = racelist_url(code, date);
    let page = client
        .fetch(&url)
        .await
        .with_context(|| format!("While fetching the race list of venue {code}"))?;
    Ok(interpret_page(table, code, url, date, grades, &page))
}

pub fn classify_page(page: &FetchedPage) -> PageClass {
    if BLOCKED_MARKERS.iter().any(|m| page.body.contains(m)) {
        return PageClass::Blocked;
    }
    if page.bytes <= NO_RACE_MAX_BYTES || NO_DATA_PHRASES.iter().any(|p| page.body.contains(p)) {
        return PageClass::NoRace;
    }
    PageClass::Held
}

/// Builds the record for one fetched page: classify, then parse the race
/// fields only for a held page that was served successfully. The grade is
/// looked up in the prebuilt mapping, never derived from this page.
pub fn interpret_page(
    table: &VenueTable,
    code: VenueCode,
    url: Url,
    date: DateKey,
    grades: &GradeMap,
    page: &FetchedPage,
) -> VenueRecord {
    let (held, note) = match classify_page(page) {
        PageClass::Blocked => (false, StatusNote::Blocked),
        PageClass::NoRace => (false, StatusNote::NoRace),
        PageClass::Held => (true, StatusNote::Ok),
    };
    debug!(
        "{code}: note={note} status={} bytes={}",
        page.status, page.bytes
    );

    let record = VenueRecord::builder()
        .jcd(code)
        .name(table.name_of(code).unwrap_or(code.as_str()))
        .url(url)
        .status_code(page.status)
        .bytes(page.bytes)
        .held(held)
        .note(note);
    if !held || !page.is_success() {
        return record.race(None).build();
    }

    let html = Html::parse_document(&page.body);
    let (race, time) = pick_active_race_and_cutoff(&html);
    let held_race = HeldRace::builder()
        .grade(grades.get(code))
        .day(pick_day_label(&html, date))
        .race(race)
        .time(time)
        .build();
    record.race(Some(held_race)).build()
}

/// Finds the `N日目` label for the page's `M月D日` line matching the target
/// date, falling back to the first `N日目` anywhere on the page. Empty
/// string when the page carries no such label.
pub fn pick_day_label(html: &Html, date: DateKey) -> String {
    let month_day = format!("{}月{}日", date.month(), date.day());
    for line in html.root_element().text() {
        let line = normalize(line);
        if line.contains(&month_day) {
            if let Some(day) = day_token(&line) {
                return day;
            }
        }
    }
    day_token(&normalized_page_text(html)).unwrap_or_default()
}

/// Best-effort extraction of the active race number and the next betting
/// cutoff: a window around the first priority keyword, then the whole page.
/// Both come back as empty strings when nothing matches.
pub fn pick_active_race_and_cutoff(html: &Html) -> (String, String) {
    let text = normalized_page_text(html);
    let race = RACE_KEYWORDS
        .iter()
        .find_map(|key| race_token(keyword_window(&text, key)?))
        .or_else(|| race_token(&text))
        .unwrap_or_default();
    let time = keyword_window(&text, "締切")
        .and_then(time_token)
        .or_else(|| time_token(&text))
        .unwrap_or_default();
    (race, time)
}

fn normalized_page_text(html: &Html) -> String {
    normalize(
        &html
            .root_element()
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .join("\n"),
    )
}

/// `KEYWORD_WINDOW_CHARS` characters to each side of the keyword's first
/// occurrence, clamped to the text and kept on char boundaries.
fn keyword_window<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let pos = text.find(keyword)?;
    let start = text[..pos]
        .char_indices()
        .rev()
        .nth(KEYWORD_WINDOW_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[pos..]
        .char_indices()
        .nth(KEYWORD_WINDOW_CHARS)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len());
    Some(&text[start..end])
}

fn day_token(text: &str) -> Option<String> {
    let n: u32 = regex!(r"(\d{1,2})日目").captures(text)?[1].parse().ok()?;
    Some(format!("{n}日目"))
}

fn race_token(text: &str) -> Option<String> {
    let n: u32 = regex!(r"(\d{1,2})R").captures(text)?[1].parse().ok()?;
    Some(format!("{n}R"))
}

fn time_token(text: &str) -> Option<String> {
    let captures = regex!(r"(\d{1,2}):(\d{2})").captures(text)?;
    let hour: u32 = captures[1].parse().ok()?;
    Some(format!("{hour:02}:{}", &captures[2]))
}
