use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PlannerError;

// Type aliases for clarity
pub type Minute = u16;
/// One chosen record per class type per subject, placeholders dropped.
pub type Candidate = Vec<ClassRecord>;

// Snapshot clock format, e.g. "09:00"
const CLOCK_FMT: &str = "%H:%M";

/// Weekday a class can fall on. Ordering follows the school week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub fn from_code(code: &str) -> Result<Self, PlannerError> {
        match code.trim() {
            "MON" => Ok(Day::Mon),
            "TUE" => Ok(Day::Tue),
            "WED" => Ok(Day::Wed),
            "THU" => Ok(Day::Thu),
            "FRI" => Ok(Day::Fri),
            other => Err(PlannerError::UnknownDay(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Day::Mon => "MON",
            Day::Tue => "TUE",
            Day::Wed => "WED",
            Day::Thu => "THU",
            Day::Fri => "FRI",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of class a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    Lecture,
    Practical,
    Workshop,
}

impl ClassType {
    pub fn from_label(label: &str) -> Result<Self, PlannerError> {
        match label.trim() {
            "Lecture" => Ok(ClassType::Lecture),
            "Practical" => Ok(ClassType::Practical),
            "Workshop" => Ok(ClassType::Workshop),
            other => Err(PlannerError::UnknownClassType(other.to_string())),
        }
    }
}

/// Parses a 24-hour "HH:MM" clock string into minutes since midnight.
pub fn parse_clock(text: &str) -> Result<Minute, PlannerError> {
    let trimmed = text.trim();
    let clock = NaiveTime::parse_from_str(trimmed, CLOCK_FMT).map_err(|source| {
        PlannerError::MalformedTime {
            value: trimmed.to_string(),
            source,
        }
    })?;
    Ok((clock.hour() * 60 + clock.minute()) as Minute)
}

/// Canonical subject key: the human name after the "CODE - " prefix.
/// The code prefix is advisory; a cell without it is used whole.
pub fn subject_key(cell: &str) -> String {
    match cell.split_once(" - ") {
        Some((_code, name)) => name.trim().to_string(),
        None => cell.trim().to_string(),
    }
}

/// One row of the scraper's tabular snapshot, column headers as scraped.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSlotRow {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Class Type")]
    pub class_type: String,
    #[serde(rename = "Group Number")]
    pub group_number: String,
    #[serde(rename = "Teacher")]
    pub teacher: String,
    #[serde(rename = "Day")]
    pub day: String,
    #[serde(rename = "Start Time")]
    pub start_time: String,
    #[serde(rename = "End Time")]
    pub end_time: String,
}

/// A single offered class instance at a fixed day and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub subject: String,
    pub class_type: ClassType,
    pub group_number: String,
    pub teacher: String,
    pub day: Day,
    pub start_minute: Minute,
    pub end_minute: Minute,
}

impl ClassRecord {
    /// Validates and converts one snapshot row. Malformed fields are
    /// surfaced as errors, never coerced.
    pub fn from_row(row: &RawSlotRow) -> Result<Self, PlannerError> {
        let start_minute = parse_clock(&row.start_time)?;
        let end_minute = parse_clock(&row.end_time)?;
        if start_minute >= end_minute {
            return Err(PlannerError::InvertedInterval {
                start: start_minute,
                end: end_minute,
            });
        }

        Ok(ClassRecord {
            subject: subject_key(&row.subject),
            class_type: ClassType::from_label(&row.class_type)?,
            group_number: row.group_number.trim().to_string(),
            teacher: row.teacher.trim().to_string(),
            day: Day::from_code(&row.day)?,
            start_minute,
            end_minute,
        })
    }

    pub fn interval(&self) -> (Minute, Minute) {
        (self.start_minute, self.end_minute)
    }
}

/// One slot choice inside a subject's offering list. `Absent` keeps the
/// cross-product arity for a class type the subject does not offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offering {
    Real(ClassRecord),
    Absent,
}

impl Offering {
    pub fn as_real(&self) -> Option<&ClassRecord> {
        match self {
            Offering::Real(record) => Some(record),
            Offering::Absent => None,
        }
    }
}

/// A subject's slot lists, one per class type. Each list is non-empty;
/// a missing type holds a single `Absent` placeholder.
#[derive(Debug, Clone, Default)]
pub struct TypeOfferings {
    pub lectures: Vec<Offering>,
    pub practicals: Vec<Offering>,
    pub workshops: Vec<Offering>,
}

impl TypeOfferings {
    pub fn list_mut(&mut self, class_type: ClassType) -> &mut Vec<Offering> {
        match class_type {
            ClassType::Lecture => &mut self.lectures,
            ClassType::Practical => &mut self.practicals,
            ClassType::Workshop => &mut self.workshops,
        }
    }

    pub fn pad_missing(&mut self) {
        for list in [&mut self.lectures, &mut self.practicals, &mut self.workshops] {
            if list.is_empty() {
                list.push(Offering::Absent);
            }
        }
    }
}

/// All offerings of the current snapshot, keyed by canonical subject.
/// Rebuilt whole on every refresh; immutable between refreshes.
#[derive(Debug, Clone, Default)]
pub struct SubjectOfferings {
    pub subjects: BTreeMap<String, TypeOfferings>,
}

/// A conflict-free timetable candidate with its rank score. Lower is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub score: i32,
    pub classes: Candidate,
}

/// Structural exclusions applied on top of the ranked list. Active flags
/// combine with logical AND; all off keeps everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterFlags {
    pub one_day_off: bool,
    pub two_days_off: bool,
    pub three_days_off: bool,
    pub no_long_gap: bool,
    pub at_most_one_long_gap_day: bool,
    pub no_single_class_day: bool,
}

/// Chosen group tokens for one subject, ready to hand to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSelection {
    pub subject: String,
    pub lecture_group: Option<String>,
    pub practical_group: Option<String>,
    pub workshop_group: Option<String>,
}

/// Counts reported after a snapshot refresh.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub records: usize,
    pub rejected_records: usize,
    pub subjects: usize,
    pub candidates: usize,
    pub valid_candidates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, class_type: &str, day: &str, start: &str, end: &str) -> RawSlotRow {
        RawSlotRow {
            subject: subject.to_string(),
            class_type: class_type.to_string(),
            group_number: "Group 1".to_string(),
            teacher: " A. Tan ".to_string(),
            day: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn parses_clock_strings() {
        assert_eq!(parse_clock("09:00").unwrap(), 540);
        assert_eq!(parse_clock("9:05").unwrap(), 545);
        assert_eq!(parse_clock(" 20:00 ").unwrap(), 1200);
        assert_eq!(parse_clock("23:59").unwrap(), 1439);
    }

    #[test]
    fn rejects_malformed_clock_strings() {
        for bad in ["25:00", "0900", "20:00:00", "noon", ""] {
            assert!(parse_clock(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parses_day_codes() {
        assert_eq!(Day::from_code("MON").unwrap(), Day::Mon);
        assert_eq!(Day::from_code(" FRI ").unwrap(), Day::Fri);
        assert!(Day::from_code("SAT").is_err());
        assert!(Day::from_code("monday").is_err());
    }

    #[test]
    fn days_order_along_the_week() {
        assert!(Day::Mon < Day::Tue);
        assert!(Day::Thu < Day::Fri);
    }

    #[test]
    fn parses_class_type_labels() {
        assert_eq!(ClassType::from_label("Lecture").unwrap(), ClassType::Lecture);
        assert_eq!(ClassType::from_label("Workshop").unwrap(), ClassType::Workshop);
        assert!(ClassType::from_label("Seminar").is_err());
    }

    #[test]
    fn subject_key_takes_name_after_code() {
        assert_eq!(subject_key("CSC1024 - Web Fundamentals"), "Web Fundamentals");
        assert_eq!(subject_key("Web Fundamentals"), "Web Fundamentals");
    }

    #[test]
    fn converts_a_well_formed_row() {
        let record = ClassRecord::from_row(&row(
            "CSC1024 - Web Fundamentals",
            "Lecture",
            "TUE",
            "09:00",
            "11:00",
        ))
        .unwrap();
        assert_eq!(record.subject, "Web Fundamentals");
        assert_eq!(record.class_type, ClassType::Lecture);
        assert_eq!(record.day, Day::Tue);
        assert_eq!(record.interval(), (540, 660));
        assert_eq!(record.teacher, "A. Tan");
    }

    #[test]
    fn rejects_inverted_and_empty_intervals() {
        assert!(ClassRecord::from_row(&row("X - Y", "Lecture", "MON", "11:00", "09:00")).is_err());
        assert!(ClassRecord::from_row(&row("X - Y", "Lecture", "MON", "09:00", "09:00")).is_err());
    }

    #[test]
    fn filter_flags_default_off_and_accept_partial_json() {
        let flags: FilterFlags = serde_json::from_str(r#"{"noLongGap": true}"#).unwrap();
        assert!(flags.no_long_gap);
        assert!(!flags.one_day_off);
        assert_eq!(FilterFlags::default(), serde_json::from_str("{}").unwrap());
    }

    #[test]
    fn day_serializes_to_snapshot_codes() {
        assert_eq!(serde_json::to_string(&Day::Wed).unwrap(), r#""WED""#);
        let day: Day = serde_json::from_str(r#""MON""#).unwrap();
        assert_eq!(day, Day::Mon);
    }
}
