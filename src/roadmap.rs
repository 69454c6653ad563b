//! Normalization of raw store records into [`Roadmap`]s.
//!
//! The external schema is not guaranteed to populate any single field, and the
//! same concept appears under several field names depending on which version
//! of the automation wrote the row. Parsing is therefore tolerant: every field
//! resolves through a declared, ordered fallback chain instead of a strict
//! schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{Roadmap, Task, TaskStatus};

/// Field names tried, in order, for a task's description.
const DESCRIPTION_FIELDS: &[&str] = &["Task Description", "Description", "Task", "Topic", "Title"];

/// One raw row from the record store: an opaque id plus untyped fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier assigned by the store
    pub id: String,
    /// Raw field map as returned by the API
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// First non-empty string value among the given field names.
fn text_field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Numeric field, accepting both JSON numbers and numeric strings.
fn numeric_field(fields: &Map<String, Value>, name: &str) -> Option<u32> {
    match fields.get(name)? {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map one raw record to a [`Task`].
///
/// `index` is the record's position in the fetched batch and feeds the final
/// fallbacks for `task_id` and the description.
pub fn task_from_record(record: &Record, index: usize) -> Task {
    let fields = &record.fields;

    let week = numeric_field(fields, "Week").unwrap_or(1);
    let task_id = numeric_field(fields, "TaskID").unwrap_or(index as u32 + 1);

    let theme = text_field(fields, &["Theme", "Topic"])
        .unwrap_or("Learning Phase")
        .to_string();

    let description = match text_field(fields, DESCRIPTION_FIELDS) {
        Some(text) => text.to_string(),
        None => match text_field(fields, &["Theme"]) {
            Some(theme) => format!("Learn {theme}"),
            None => format!(
                "Week {} Task",
                numeric_field(fields, "Week").unwrap_or(index as u32 + 1)
            ),
        },
    };

    let link = text_field(fields, &["Link", "Resource"]).map(str::to_string);

    let status = match text_field(fields, &["Status"]) {
        Some("Completed") => TaskStatus::Completed,
        _ => TaskStatus::Pending,
    };

    Task {
        id: record.id.clone(),
        task_id,
        week,
        theme,
        description,
        link,
        status,
    }
}

/// Assemble the fetched rows for a user into a [`Roadmap`] projection.
///
/// Returns `None` for zero rows. That signal is ambiguous by contract: it can
/// mean "user unknown" or "submission accepted but not yet generated", and
/// callers must not assume either reading.
pub fn assemble(user_id: &str, records: &[Record]) -> Option<Roadmap> {
    if records.is_empty() {
        debug!(user_id, "no records for user");
        return None;
    }

    let mut tasks: Vec<Task> = records
        .iter()
        .enumerate()
        .map(|(index, record)| task_from_record(record, index))
        .collect();

    // Rows are requested sorted, but the server-side sort parameters are not
    // contractual. Re-sort so display grouping is deterministic either way.
    tasks.sort_by_key(|t| (t.week, t.task_id));

    let skill = records
        .first()
        .and_then(|r| text_field(&r.fields, &["Skill"]))
        .unwrap_or("Your Skill")
        .to_string();

    let total_weeks = tasks.iter().map(|t| t.week).max().unwrap_or(0);
    let total_tasks = tasks.len() as u32;
    let completed_tasks = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as u32;

    Some(Roadmap {
        skill,
        user_id: user_id.to_string(),
        tasks,
        total_weeks,
        total_tasks,
        completed_tasks,
    })
}
