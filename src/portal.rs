use crate::data::{ClassRecord, RawSlotRow, SubjectSelection};
use crate::error::{PlannerError, PlannerResult};
use log::warn;
use std::path::{Path, PathBuf};

/// Result of pulling one snapshot from a slot source. Malformed rows are
/// rejected individually and counted, never silently dropped.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLoad {
    pub records: Vec<ClassRecord>,
    pub rejected: usize,
}

/// Source of raw class records: the portal scraper, or the snapshot it
/// saved. Long-running and allowed to fail; the progress callback replaces
/// any direct printing the collaborator would otherwise do.
pub trait SlotSource {
    fn fetch(&self, progress: &mut dyn FnMut(&str)) -> PlannerResult<SnapshotLoad>;
}

/// External system that turns a chosen timetable into an actual
/// enrollment. Succeeds completely or fails with a descriptive error; the
/// caller leaves engine state untouched on failure.
pub trait SlotSubmitter {
    fn submit(
        &self,
        selections: &[SubjectSelection],
        progress: &mut dyn FnMut(&str),
    ) -> PlannerResult<()>;
}

/// The scraper's exported tabular snapshot on disk.
pub struct CsvSnapshot {
    path: PathBuf,
}

impl CsvSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSnapshot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot_error(&self, source: csv::Error) -> PlannerError {
        PlannerError::Snapshot {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SlotSource for CsvSnapshot {
    fn fetch(&self, progress: &mut dyn FnMut(&str)) -> PlannerResult<SnapshotLoad> {
        progress(&format!("Reading snapshot {}...", self.path.display()));

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|source| self.snapshot_error(source))?;

        let mut load = SnapshotLoad::default();
        for (line, row) in reader.deserialize::<RawSlotRow>().enumerate() {
            let outcome = match row {
                Ok(raw) => ClassRecord::from_row(&raw),
                Err(source) => Err(self.snapshot_error(source)),
            };
            match outcome {
                Ok(record) => load.records.push(record),
                Err(reason) => {
                    // header is line 1, first data row line 2
                    warn!("Rejecting snapshot row {}: {}", line + 2, reason);
                    load.rejected += 1;
                }
            }
        }

        progress(&format!(
            "Loaded {} records ({} rejected)",
            load.records.len(),
            load.rejected
        ));
        Ok(load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Subject,Class Type,Group Number,Teacher,Day,Start Time,End Time";

    fn snapshot_file(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    #[test]
    fn loads_a_well_formed_snapshot() {
        let file = snapshot_file(&[
            "CSC1024 - Web Fundamentals,Lecture,Group 1,A. Tan,MON,09:00,11:00",
            "CSC1024 - Web Fundamentals,Practical,Group 2,B. Lee,TUE,14:00,16:00",
        ]);

        let mut messages = Vec::new();
        let load = CsvSnapshot::new(file.path())
            .fetch(&mut |message| messages.push(message.to_string()))
            .unwrap();

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.rejected, 0);
        assert_eq!(load.records[0].subject, "Web Fundamentals");
        assert_eq!(load.records[1].interval(), (840, 960));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn counts_malformed_rows_without_aborting() {
        let file = snapshot_file(&[
            "A - Alpha,Lecture,Group 1,A. Tan,MON,09:00,11:00",
            "B - Beta,Lecture,Group 1,A. Tan,MON,eleven,12:00",
            "C - Gamma,Lecture,Group 1,A. Tan,XYZ,09:00,11:00",
        ]);

        let load = CsvSnapshot::new(file.path()).fetch(&mut |_| {}).unwrap();
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.rejected, 2);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let result = CsvSnapshot::new("/nonexistent/slots.csv").fetch(&mut |_| {});
        assert!(matches!(result, Err(PlannerError::Snapshot { .. })));
    }

    // Test double standing in for the portal submitter.
    struct RecordingSubmitter {
        fail_on: Option<String>,
    }

    impl SlotSubmitter for RecordingSubmitter {
        fn submit(
            &self,
            selections: &[SubjectSelection],
            progress: &mut dyn FnMut(&str),
        ) -> PlannerResult<()> {
            for selection in selections {
                if self.fail_on.as_deref() == Some(selection.subject.as_str()) {
                    return Err(PlannerError::Submission(format!(
                        "group full for {}",
                        selection.subject
                    )));
                }
                progress(&format!("Selecting slot for {:?}...", selection.subject));
            }
            Ok(())
        }
    }

    #[test]
    fn submitter_reports_progress_per_subject() {
        let selections = vec![
            SubjectSelection {
                subject: "web fundamentals".to_string(),
                lecture_group: Some("1".to_string()),
                practical_group: Some("2".to_string()),
                workshop_group: None,
            },
            SubjectSelection {
                subject: "operating systems".to_string(),
                lecture_group: Some("1".to_string()),
                practical_group: None,
                workshop_group: None,
            },
        ];

        let mut messages = Vec::new();
        RecordingSubmitter { fail_on: None }
            .submit(&selections, &mut |message| messages.push(message.to_string()))
            .unwrap();
        assert_eq!(messages.len(), 2);

        let failing = RecordingSubmitter {
            fail_on: Some("operating systems".to_string()),
        };
        let result = failing.submit(&selections, &mut |_| {});
        assert!(matches!(result, Err(PlannerError::Submission(_))));
    }
}
