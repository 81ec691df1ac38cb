use crate::data::{
    Candidate, ClassRecord, ClassType, Day, FilterFlags, Minute, Offering, RefreshSummary,
    ScoredCandidate, SubjectOfferings, SubjectSelection, TypeOfferings,
};
use crate::error::{PlannerError, PlannerResult};
use itertools::{Itertools, iproduct};
use log::info;
use std::collections::BTreeMap;

// Scoring weights, empirically tuned
const SINGLE_DAY_PENALTY: i32 = 40;
const LONG_GAP_PENALTY: i32 = 100;
const LONG_GAP_MIN: i32 = 240;
const DAY_OFF_BONUS: i32 = 20;
const WEEK_DAYS: i32 = 5;

// Width of one display-grid column in minutes
const SLOT_STEP: Minute = 30;

/// Groups raw records by subject and class type. A class type with no
/// records for a subject is padded with a single `Absent` placeholder so
/// the subject still appears in every candidate.
pub fn build_offerings(records: Vec<ClassRecord>) -> SubjectOfferings {
    let mut subjects: BTreeMap<String, TypeOfferings> = BTreeMap::new();

    for record in records {
        let offer = subjects.entry(record.subject.clone()).or_default();
        offer.list_mut(record.class_type).push(Offering::Real(record));
    }

    for offer in subjects.values_mut() {
        offer.pad_missing();
    }

    SubjectOfferings { subjects }
}

// All (lecture, practical, workshop) choices for one subject, flattened to
// the real records each choice contributes.
fn subject_choices(offer: &TypeOfferings) -> Vec<Candidate> {
    iproduct!(&offer.lectures, &offer.practicals, &offer.workshops)
        .map(|(lecture, practical, workshop)| {
            [lecture, practical, workshop]
                .into_iter()
                .filter_map(|slot| slot.as_real().cloned())
                .collect()
        })
        .collect()
}

/// Lazily enumerates the full cross-subject product of candidates. The
/// output size is the product of every subject's triple count, so callers
/// should consume this as a stream rather than collecting it blindly.
pub fn enumerate_candidates(offerings: &SubjectOfferings) -> impl Iterator<Item = Candidate> {
    let per_subject: Vec<Vec<Candidate>> =
        offerings.subjects.values().map(subject_choices).collect();

    per_subject
        .into_iter()
        .multi_cartesian_product()
        .map(|chosen| chosen.into_iter().flatten().collect())
}

/// True if any two classes in the candidate share a day and overlap in
/// time. Intervals are half-open, so back-to-back classes do not conflict.
pub fn has_overlap(candidate: &[ClassRecord]) -> bool {
    let mut seen: BTreeMap<Day, Vec<(Minute, Minute)>> = BTreeMap::new();

    for class in candidate {
        let (start, end) = class.interval();
        let day = seen.entry(class.day).or_default();
        if day.iter().any(|&(s, e)| start < e && end > s) {
            return true;
        }
        day.push((start, end));
    }

    false
}

fn day_intervals(candidate: &[ClassRecord]) -> BTreeMap<Day, Vec<(Minute, Minute)>> {
    let mut daily: BTreeMap<Day, Vec<(Minute, Minute)>> = BTreeMap::new();
    for class in candidate {
        daily.entry(class.day).or_default().push(class.interval());
    }
    for times in daily.values_mut() {
        times.sort_unstable();
    }
    daily
}

// Idle minutes between consecutive classes of one day, sorted by start.
fn gaps(times: &[(Minute, Minute)]) -> impl Iterator<Item = i32> + '_ {
    times
        .windows(2)
        .map(|pair| i32::from(pair[1].0) - i32::from(pair[0].1))
}

/// Desirability score, lower is better: total idle gap minutes, plus a
/// penalty per single-class day and per gap of four hours or more, minus a
/// bonus per fully free weekday.
pub fn score(candidate: &[ClassRecord]) -> i32 {
    let daily = day_intervals(candidate);

    let school_days = daily.len() as i32;
    let mut total_gap = 0;
    let mut single_days = 0;
    let mut long_gap_penalty = 0;

    for times in daily.values() {
        if times.len() == 1 {
            single_days += 1;
        }
        for gap in gaps(times) {
            total_gap += gap;
            if gap >= LONG_GAP_MIN {
                long_gap_penalty += LONG_GAP_PENALTY;
            }
        }
    }

    total_gap + SINGLE_DAY_PENALTY * single_days + long_gap_penalty
        - DAY_OFF_BONUS * (WEEK_DAYS - school_days)
}

fn school_days(candidate: &[ClassRecord]) -> usize {
    candidate.iter().map(|class| class.day).unique().count()
}

fn has_long_gap(candidate: &[ClassRecord]) -> bool {
    day_intervals(candidate)
        .values()
        .any(|times| gaps(times).any(|gap| gap >= LONG_GAP_MIN))
}

fn long_gap_days(candidate: &[ClassRecord]) -> usize {
    day_intervals(candidate)
        .values()
        .filter(|times| gaps(times).any(|gap| gap >= LONG_GAP_MIN))
        .count()
}

fn has_single_class_day(candidate: &[ClassRecord]) -> bool {
    day_intervals(candidate).values().any(|times| times.len() == 1)
}

fn keeps(flags: &FilterFlags, candidate: &[ClassRecord]) -> bool {
    let days = school_days(candidate);
    if flags.one_day_off && days != 4 {
        return false;
    }
    if flags.two_days_off && days != 3 {
        return false;
    }
    if flags.three_days_off && days != 2 {
        return false;
    }
    if flags.no_long_gap && has_long_gap(candidate) {
        return false;
    }
    if flags.at_most_one_long_gap_day && long_gap_days(candidate) > 1 {
        return false;
    }
    if flags.no_single_class_day && has_single_class_day(candidate) {
        return false;
    }
    true
}

/// Applies every active flag as a logical AND over the ranked list. The
/// master list is untouched; survivors keep their score-ascending order.
pub fn filter_candidates(ranked: &[ScoredCandidate], flags: &FilterFlags) -> Vec<ScoredCandidate> {
    ranked
        .iter()
        .filter(|entry| keeps(flags, &entry.classes))
        .cloned()
        .collect()
}

/// 30-minute display-grid boundaries spanning the earliest start through
/// the latest end across all valid candidates. Empty input yields an empty
/// grid.
pub fn build_display_slots(ranked: &[ScoredCandidate]) -> Vec<Minute> {
    let mut earliest: Option<Minute> = None;
    let mut latest: Minute = 0;

    for class in ranked.iter().flat_map(|entry| &entry.classes) {
        earliest = Some(earliest.map_or(class.start_minute, |e| e.min(class.start_minute)));
        latest = latest.max(class.end_minute);
    }

    let Some(earliest) = earliest else {
        return Vec::new();
    };

    let mut slots = Vec::new();
    let mut boundary = earliest;
    while boundary < latest + SLOT_STEP {
        slots.push(boundary);
        boundary += SLOT_STEP;
    }
    slots
}

fn group_token(group_number: &str) -> String {
    group_number
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Decomposes a chosen candidate into per-subject group tokens for the
/// submitter, subjects in first-seen order.
pub fn group_selections(candidate: &[ClassRecord]) -> Vec<SubjectSelection> {
    let mut selections: Vec<SubjectSelection> = Vec::new();

    for class in candidate {
        let subject = class.subject.to_lowercase();
        let position = match selections.iter().position(|s| s.subject == subject) {
            Some(found) => found,
            None => {
                selections.push(SubjectSelection {
                    subject,
                    lecture_group: None,
                    practical_group: None,
                    workshop_group: None,
                });
                selections.len() - 1
            }
        };

        let token = Some(group_token(&class.group_number));
        match class.class_type {
            ClassType::Lecture => selections[position].lecture_group = token,
            ClassType::Practical => selections[position].practical_group = token,
            ClassType::Workshop => selections[position].workshop_group = token,
        }
    }

    selections
}

/// Owns all state derived from one snapshot: the offerings, the ranked
/// conflict-free candidates, and the display grid. A refresh replaces the
/// whole engine, so a host holding it behind a lock swaps atomically and
/// readers never observe a partially rebuilt list.
#[derive(Debug, Default)]
pub struct SchedulingEngine {
    pub offerings: SubjectOfferings,
    pub ranked: Vec<ScoredCandidate>,
    pub display_slots: Vec<Minute>,
    record_count: usize,
    enumerated: usize,
}

impl SchedulingEngine {
    /// Builds the complete ranked state from raw records: enumerate, drop
    /// conflicting candidates, score, sort ascending.
    pub fn from_records(records: Vec<ClassRecord>) -> Self {
        let record_count = records.len();
        let offerings = build_offerings(records);

        let mut enumerated = 0usize;
        let mut ranked = Vec::new();
        for candidate in enumerate_candidates(&offerings) {
            enumerated += 1;
            if !has_overlap(&candidate) {
                ranked.push(ScoredCandidate {
                    score: score(&candidate),
                    classes: candidate,
                });
            }
        }
        ranked.sort_by_key(|entry| entry.score);

        let display_slots = build_display_slots(&ranked);

        info!(
            "Ranked {} of {} candidates from {} records across {} subjects",
            ranked.len(),
            enumerated,
            record_count,
            offerings.subjects.len()
        );

        SchedulingEngine {
            offerings,
            ranked,
            display_slots,
            record_count,
            enumerated,
        }
    }

    /// Wholesale replacement; any outstanding view or cursor is invalid
    /// after this returns.
    pub fn refresh(&mut self, records: Vec<ClassRecord>) {
        *self = SchedulingEngine::from_records(records);
    }

    pub fn filter(&self, flags: &FilterFlags) -> Vec<ScoredCandidate> {
        filter_candidates(&self.ranked, flags)
    }

    /// Submitter handoff for the candidate at `index` of the filtered view.
    pub fn selection(
        &self,
        flags: &FilterFlags,
        index: usize,
    ) -> PlannerResult<Vec<SubjectSelection>> {
        let view = self.filter(flags);
        let entry = view.get(index).ok_or(PlannerError::SelectionOutOfRange {
            index,
            len: view.len(),
        })?;
        Ok(group_selections(&entry.classes))
    }

    pub fn summary(&self, rejected_records: usize) -> RefreshSummary {
        RefreshSummary {
            records: self.record_count,
            rejected_records,
            subjects: self.offerings.subjects.len(),
            candidates: self.enumerated,
            valid_candidates: self.ranked.len(),
        }
    }
}

/// Sequential browser over one ranked view. Navigation clamps to the view
/// bounds; a refresh invalidates the cursor along with its view.
#[derive(Debug)]
pub struct ScheduleCursor {
    view: Vec<ScoredCandidate>,
    index: usize,
}

impl ScheduleCursor {
    pub fn new(view: Vec<ScoredCandidate>) -> Self {
        ScheduleCursor { view, index: 0 }
    }

    pub fn current(&self) -> Option<&ScoredCandidate> {
        self.view.get(self.index)
    }

    pub fn advance(&mut self) {
        if self.index + 1 < self.view.len() {
            self.index += 1;
        }
    }

    pub fn retreat(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}
