//! Reminder list for the dashboard.
//!
//! [`ReminderSource`] is the capability the dashboard needs: "the current
//! reminders, or a failure". [`ReminderFile`] satisfies it from a local
//! JSON export; calendar servers are expected to write that file.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reminder errors
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Failed to read reminders {path}: {reason}")]
    File { path: String, reason: String },

    #[error("Reminder '{summary}' has an unreadable due date: {value}")]
    Due { summary: String, value: String },
}

/// One to-do item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderItem {
    pub summary: String,
    pub due: Option<NaiveDateTime>,
    pub completed: bool,
}

impl ReminderItem {
    pub fn new(summary: &str, due: Option<NaiveDateTime>) -> Self {
        Self {
            summary: summary.trim().to_string(),
            due,
            completed: false,
        }
    }
}

/// Anything that can list reminders
#[allow(async_fn_in_trait)]
pub trait ReminderSource {
    async fn fetch(&self) -> Result<Vec<ReminderItem>, ReminderError>;
}

/// Drop completed items unless wanted, order by due date and cap the list
///
/// Undated items sort after every dated one; ties keep their input order.
pub fn prepare_reminders(mut items: Vec<ReminderItem>, max_items: usize, show_completed: bool) -> Vec<ReminderItem> {
    if !show_completed {
        items.retain(|item| !item.completed);
    }
    items.sort_by_key(|item| (item.due.is_none(), item.due));
    items.truncate(max_items);
    items
}

/// Record as written in the reminders file
#[derive(Debug, Deserialize)]
struct RawReminder {
    summary: String,
    #[serde(default)]
    due: Option<String>,
    #[serde(default)]
    completed: bool,
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]` or a bare date (taken as midnight)
fn parse_due(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Reminders from a JSON file of `{summary, due?, completed?}` records
///
/// Without a path the list is simply empty.
pub struct ReminderFile {
    path: Option<PathBuf>,
    max_items: usize,
    show_completed: bool,
}

impl ReminderFile {
    pub fn new(path: Option<PathBuf>, max_items: usize, show_completed: bool) -> Self {
        Self {
            path,
            max_items,
            show_completed,
        }
    }

    fn read(path: &Path) -> Result<Vec<ReminderItem>, ReminderError> {
        let file_error = |reason: String| ReminderError::File {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let raw: Vec<RawReminder> = serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))?;

        raw.into_iter()
            .map(|record| {
                let due = match record.due.as_deref() {
                    None | Some("") => None,
                    Some(value) => Some(parse_due(value).ok_or_else(|| ReminderError::Due {
                        summary: record.summary.clone(),
                        value: value.to_string(),
                    })?),
                };
                Ok(ReminderItem {
                    completed: record.completed,
                    ..ReminderItem::new(&record.summary, due)
                })
            })
            .collect()
    }
}

impl ReminderSource for ReminderFile {
    async fn fetch(&self) -> Result<Vec<ReminderItem>, ReminderError> {
        let Some(path) = &self.path else {
            tracing::info!("No reminders file configured");
            return Ok(Vec::new());
        };

        let items = Self::read(path)?;
        tracing::info!("Loaded {} reminders from {}", items.len(), path.display());
        Ok(prepare_reminders(items, self.max_items, self.show_completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 3, day).and_then(|d| d.and_hms_opt(hour, 0, 0))
    }

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("manul-frame-reminders-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_prepare_sorts_by_due_with_undated_last() {
        let items = vec![
            ReminderItem::new("undated", None),
            ReminderItem::new("later", at(12, 9)),
            ReminderItem::new("sooner", at(10, 18)),
        ];
        let summaries: Vec<String> = prepare_reminders(items, 8, false)
            .into_iter()
            .map(|item| item.summary)
            .collect();
        assert_eq!(summaries, vec!["sooner", "later", "undated"]);
    }

    #[test]
    fn test_prepare_caps_and_hides_completed() {
        let mut done = ReminderItem::new("done", at(1, 8));
        done.completed = true;
        let items = vec![
            done,
            ReminderItem::new("a", at(2, 8)),
            ReminderItem::new("b", at(3, 8)),
            ReminderItem::new("c", at(4, 8)),
        ];

        let open = prepare_reminders(items.clone(), 2, false);
        assert_eq!(open.iter().map(|i| i.summary.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let all = prepare_reminders(items, 2, true);
        assert_eq!(all[0].summary, "done");
    }

    #[test]
    fn test_parse_due_formats() {
        assert_eq!(parse_due("2024-03-10T18:00:00"), at(10, 18));
        assert_eq!(parse_due("2024-03-10 18:00"), at(10, 18));
        assert_eq!(parse_due("2024-03-10"), at(10, 0));
        assert_eq!(parse_due("tomorrow"), None);
    }

    #[tokio::test]
    async fn test_file_source_reads_and_prepares() {
        let path = scratch_file(
            "ok",
            r#"[
                {"summary": "Water plants"},
                {"summary": "Vet visit", "due": "2024-03-11T09:30"},
                {"summary": "Old task", "due": "2024-03-01", "completed": true}
            ]"#,
        );
        let source = ReminderFile::new(Some(path.clone()), 8, false);
        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].summary, "Vet visit");
        assert_eq!(items[1].due, None);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_bad_due_date_is_an_error() {
        let path = scratch_file("bad", r#"[{"summary": "Vet", "due": "next week"}]"#);
        let err = ReminderFile::new(Some(path.clone()), 8, false).fetch().await.unwrap_err();
        assert!(matches!(err, ReminderError::Due { .. }));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_path_means_no_reminders() {
        let items = ReminderFile::new(None, 8, false).fetch().await.unwrap();
        assert!(items.is_empty());

        let missing = ReminderFile::new(Some(PathBuf::from("/nonexistent/reminders.json")), 8, false);
        assert!(matches!(missing.fetch().await, Err(ReminderError::File { .. })));
    }
}
