use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// 日期欄位的輸入/儲存格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Wing A-F, floor 1-13, unit 01-04 (A-101, B-902, F-1002, F-1304)
static FLAT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-F])-((?:10[1-4])|(?:[2-9]0[1-4])|(?:1[0-3]0[1-4]))$")
        .expect("flat number pattern is valid")
});

static PHONE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("phone number pattern is valid"));

/// Formats a date the way the board displays it, e.g. `27 Aug 2025`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Morning, Slot::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "Morning",
            Slot::Evening => "Evening",
        }
    }

    /// Exact match against the stored representation. Anything else is
    /// treated as not-a-slot.
    pub fn from_stored(value: &str) -> Option<Slot> {
        match value {
            "Morning" => Some(Slot::Morning),
            "Evening" => Some(Slot::Evening),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Slot::Morning),
            "evening" => Ok(Slot::Evening),
            other => Err(format!("unknown slot '{}'", other)),
        }
    }
}

/// Wing letter plus the floor/unit digits, e.g. `F-1304` → wing `F`, number `1304`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNumber {
    pub wing: char,
    pub number: String,
}

impl FlatNumber {
    pub fn wing_str(&self) -> String {
        self.wing.to_string()
    }
}

impl fmt::Display for FlatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wing, self.number)
    }
}

impl FromStr for FlatNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let caps = FLAT_NUMBER_RE.captures(&normalized).ok_or(())?;
        let wing = caps[1].chars().next().ok_or(())?;
        Ok(FlatNumber {
            wing,
            number: caps[2].to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = ();

    // 表單輸入常帶前後空白，比對前先去除；內部空白仍視為無效
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if PHONE_NUMBER_RE.is_match(trimmed) {
            Ok(PhoneNumber(trimmed.to_string()))
        } else {
            Err(())
        }
    }
}

/// Inclusive range of calendar days during which nominations are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every day of the window in chronological order. Empty when start > end.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len(&self) -> usize {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collection path shared by every client of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn for_deployment(app_id: &str) -> Self {
        Self(format!("artifacts/{}/public/data/nominations", app_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated nomination, ready to be appended to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nomination {
    pub submitter_id: String,
    pub full_name: String,
    pub flat: FlatNumber,
    pub phone_number: PhoneNumber,
    pub date: NaiveDate,
    pub slot: Slot,
    pub brings_own_offering_set: bool,
}

/// A nomination as read back from the store.
///
/// The store is writable by any anonymous client, so nothing here is trusted:
/// every field is optional and date/slot stay as the raw stored text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominationRecord {
    pub id: Option<String>,
    pub submitter_id: Option<String>,
    pub full_name: Option<String>,
    pub wing: Option<String>,
    pub unit_number: Option<String>,
    pub phone_number: Option<String>,
    pub date: Option<String>,
    pub slot: Option<String>,
    pub brings_own_offering_set: Option<bool>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl NominationRecord {
    pub fn from_nomination(
        nomination: &Nomination,
        id: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            submitter_id: Some(nomination.submitter_id.clone()),
            full_name: Some(nomination.full_name.clone()),
            wing: Some(nomination.flat.wing_str()),
            unit_number: Some(nomination.flat.number.clone()),
            phone_number: Some(nomination.phone_number.as_str().to_string()),
            date: Some(nomination.date.format(DATE_FORMAT).to_string()),
            slot: Some(nomination.slot.as_str().to_string()),
            brings_own_offering_set: Some(nomination.brings_own_offering_set),
            submitted_at: Some(submitted_at),
        }
    }

    /// Only the canonical `YYYY-MM-DD` text counts; `2025-8-30` or padded
    /// values written by other clients are treated as not-a-date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .ok()
            .filter(|date| date.format(DATE_FORMAT).to_string() == raw)
    }

    pub fn parsed_slot(&self) -> Option<Slot> {
        self.slot.as_deref().and_then(Slot::from_stored)
    }
}

/// Morning/evening counts for a single day of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayTally {
    pub date: NaiveDate,
    pub morning: u32,
    pub evening: u32,
}

impl DayTally {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            morning: 0,
            evening: 0,
        }
    }

    pub fn count(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Morning => self.morning,
            Slot::Evening => self.evening,
        }
    }
}

/// An authenticated anonymous session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub submitter_id: String,
}
