use once_cell::sync::Lazy;
use serde::Serialize;

/// Grade tiers in ascending strength. The derived ordering is the conflict
/// resolution rule when schedule sources disagree about a venue: a stronger
/// tier always wins.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, strum::Display,
)]
pub enum GradeTier {
    #[serde(rename = "一般")]
    #[strum(serialize = "一般")]
    General,
    G3,
    G2,
    G1,
    SG,
    PG1,
}

/// Two-digit venue code (`"01"`..`"24"`). Only the venue table mints these,
/// so a `VenueCode` in hand always refers to a known venue.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, derive_more::Display, Serialize,
)]
#[display("{_0}")]
pub struct VenueCode(&'static str);

impl VenueCode {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

const OFFICIAL_VENUES: [(&str, &str); 24] = [
    ("01", "桐生"),
    ("02", "戸田"),
    ("03", "江戸川"),
    ("04", "平和島"),
    ("05", "多摩川"),
    ("06", "浜名湖"),
    ("07", "蒲郡"),
    ("08", "常滑"),
    ("09", "津"),
    ("10", "三国"),
    ("11", "びわこ"),
    ("12", "住之江"),
    ("13", "尼崎"),
    ("14", "鳴門"),
    ("15", "丸亀"),
    ("16", "児島"),
    ("17", "宮島"),
    ("18", "徳山"),
    ("19", "下関"),
    ("20", "若松"),
    ("21", "芦屋"),
    ("22", "福岡"),
    ("23", "唐津"),
    ("24", "大村"),
];

static OFFICIAL: Lazy<VenueTable> = Lazy::new(|| VenueTable::new(&OFFICIAL_VENUES));

/// Immutable venue reference data: codes and display names in enumeration
/// order. Components take a `&VenueTable` so tests can substitute a smaller
/// table for the official 24 venues.
#[derive(Clone, Debug)]
pub struct VenueTable {
    venues: Vec<(VenueCode, &'static str)>,
}

impl VenueTable {
    pub fn new(entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            venues: entries
                .iter()
                .map(|&(code, name)| (VenueCode(code), name))
                .collect(),
        }
    }

    pub fn official() -> &'static VenueTable {
        &OFFICIAL
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = VenueCode> + '_ {
        self.venues.iter().map(|&(code, _)| code)
    }

    pub fn entries(&self) -> impl Iterator<Item = (VenueCode, &'static str)> + '_ {
        self.venues.iter().copied()
    }

    pub fn name_of(&self, code: VenueCode) -> Option<&'static str> {
        self.venues
            .iter()
            .find(|&&(c, _)| c == code)
            .map(|&(_, name)| name)
    }

    pub fn code_by_name(&self, name: &str) -> Option<VenueCode> {
        self.venues
            .iter()
            .find(|&&(_, n)| n == name)
            .map(|&(code, _)| code)
    }
}
