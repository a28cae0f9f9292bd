use getset::{CopyGetters, Getters};
use log::{error, info};
use serde::Serialize;
use typed_builder::TypedBuilder;

use crate::{
    api::BoatraceClient,
    chrono_util::{jst_now, DateKey},
    racelist::{self, StatusNote, VenueRecord},
    schedule::resolve_grades,
    venue::{VenueCode, VenueTable},
};

/// Why one venue produced no real record. The venue itself still appears in
/// `venues` as a synthetic `error` row.
#[derive(Clone, Debug, Serialize)]
pub struct VenueError {
    jcd: VenueCode,
    error: String,
}

/// The day's report: one record per venue in enumeration order, plus the
/// failures that were substituted along the way. Replaces the previous
/// document wholesale when written.
#[derive(Debug, Getters, CopyGetters, Serialize, TypedBuilder)]
pub struct Snapshot {
    #[getset(get = "pub")]
    time: String,
    #[getset(get_copy = "pub")]
    hd: DateKey,
    #[getset(get_copy = "pub")]
    count: usize,
    #[getset(get = "pub")]
    venues: Vec<VenueRecord>,
    #[getset(get = "pub")]
    errors: Vec<VenueError>,
    #[getset(get_copy = "pub")]
    ok: bool,
}

/// Resolves grades once, then walks the venues in table order. A venue
/// whose fetch fails is logged, recorded in `errors`, and replaced by a
/// synthetic record, so the snapshot always covers the whole table.
pub async fn build_snapshot(
    client: &BoatraceClient,
    table: &VenueTable,
    date: DateKey,
) -> Snapshot {
    info!("Building venue snapshot for {date}");
    let grades = resolve_grades(client, table, date).await;

    let mut venues = Vec::with_capacity(table.len());
    let mut errors = vec![];
    for code in table.codes() {
        match racelist::fetch_venue_record(client, table, code, date, &grades).await {
            Ok(record) => venues.push(record),
            Err(e) => {
                error!("Venue {code}: {e:#}");
                errors.push(VenueError {
                    jcd: code,
                    error: format!("{e:#}"),
                });
                venues.push(error_record(table, code, date));
            }
        }
    }

    let ok = errors.is_empty();
    Snapshot::builder()
        .time(jst_now().format("%Y-%m-%d %H:%M:%S").to_string())
        .hd(date)
        .count(venues.len())
        .venues(venues)
        .errors(errors)
        .ok(ok)
        .build()
}

fn error_record(table: &VenueTable, code: VenueCode, date: DateKey) -> VenueRecord {
    VenueRecord::builder()
        .jcd(code)
        .name(table.name_of(code).unwrap_or(code.as_str()))
        .url(racelist::racelist_url(code, date))
        .status_code(0)
        .bytes(0)
        .held(false)
        .note(StatusNote::Error)
        .race(None)
        .build()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::{chrono_util::DateKey, racelist::StatusNote, venue::VenueTable};

    use super::{error_record, Snapshot, VenueError};

    fn date() -> DateKey {
        "20250612".parse().unwrap()
    }

    #[test]
    fn synthetic_error_record_carries_classification_fields_only() {
        let table = VenueTable::official();
        let code = table.code_by_name("大村").unwrap();
        let record = error_record(table, code, date());

        assert_eq!(record.jcd(), code);
        assert_eq!(record.name(), "大村");
        assert_eq!(record.status_code(), 0);
        assert_eq!(record.bytes(), 0);
        assert!(!record.held());
        assert_eq!(record.note(), StatusNote::Error);

        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object["note"], "error");
        for key in ["grade", "day", "race", "time"] {
            assert!(!object.contains_key(key), "unexpected key {key}");
        }
    }

    #[test]
    fn snapshot_document_has_the_reporting_fields() {
        let table = VenueTable::official();
        let venues = table
            .codes()
            .map(|code| error_record(table, code, date()))
            .collect_vec();
        let errors = vec![VenueError {
            jcd: table.code_by_name("桐生").unwrap(),
            error: "connection timed out".to_owned(),
        }];
        let ok = errors.is_empty();
        let snapshot = Snapshot::builder()
            .time("2025-06-12 10:00:00".to_owned())
            .hd(date())
            .count(venues.len())
            .venues(venues)
            .errors(errors)
            .ok(ok)
            .build();

        let json = serde_json::to_value(&snapshot).unwrap();
        let object = json.as_object().unwrap();
        for key in ["time", "hd", "count", "venues", "errors", "ok"] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(object["hd"], "20250612");
        assert_eq!(object["count"], 24);
        assert_eq!(object["ok"], false);
        assert_eq!(object["errors"][0]["jcd"], "01");
        // one record per venue, in table order
        let jcds = object["venues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["jcd"].as_str().unwrap())
            .collect_vec();
        assert_eq!(jcds, table.codes().map(|c| c.as_str()).collect_vec());
    }
}
