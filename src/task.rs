//! Task data model and the derived views over it.
//!
//! Tasks serialize to the same shape the `tasks` storage entry has always
//! used: `{"id", "text", "completed", "priority", "tags"}` with priorities
//! spelled `HIGH`, `MEDIUM`, `LOW`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Label of the synthetic group holding tasks without tags.
pub const OTHERS_GROUP: &str = "Others";

/// Task identifier: creation time in epoch milliseconds, bumped past the
/// largest existing id when the clock does not move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Id for a new task given the ids already in `used`: `now_ms` when it is
    /// past all of them, else one past the largest. When the largest id is
    /// `u64::MAX`, the lowest id not in `used` is taken instead.
    pub fn next(now_ms: u64, used: &[TaskId]) -> TaskId {
        let Some(&TaskId(last)) = used.iter().max() else {
            return TaskId(now_ms);
        };
        if now_ms > last {
            return TaskId(now_ms);
        }
        if let Some(id) = last.checked_add(1) {
            return TaskId(id);
        }

        // `used` has fewer than `len + 1` ids, so `0..=len` holds a free one.
        let taken: HashSet<u64> = used.iter().map(|id| id.0).collect();
        (0..=used.len() as u64)
            .find(|id| !taken.contains(id))
            .map_or(TaskId(last), TaskId)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidArgument(format!("invalid task id '{}'", s.trim())))
    }
}

/// Task priority. Variant order is sort order: `High < Medium < Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(Error::InvalidArgument(format!(
                "invalid priority '{trimmed}' (expected high|medium|low)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|entry| entry == tag)
    }
}

/// Input for [`crate::store::TaskStore::add_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub text: String,
    pub priority: Priority,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update for [`crate::store::TaskStore::edit_task`]. `None` fields
/// are left untouched; `tags: Some(vec![])` clears the tags.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.priority.is_none() && self.tags.is_none()
    }
}

/// Trimmed task text, or `None` when nothing is left.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Keep the requested tags that exist in `registry`, trimmed and without
/// duplicates, in request order.
pub fn normalize_tags<S: AsRef<str>>(requested: &[S], registry: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in requested {
        let tag = tag.as_ref().trim();
        if registry.iter().any(|known| known == tag) && !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Tasks ordered `HIGH`, `MEDIUM`, `LOW`. Stable: equal priorities keep
/// their relative order.
pub fn sort_by_priority(tasks: &[Task]) -> Vec<&Task> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by_key(|task| task.priority);
    sorted
}

/// A display bucket of tasks sharing a tag, or the untagged bucket.
#[derive(Debug, Clone, Serialize)]
pub struct TaskGroup<'a> {
    pub name: &'a str,
    pub untagged: bool,
    pub tasks: Vec<&'a Task>,
}

/// Bucket `sorted` by tag. A task lands in every one of its tag groups;
/// untagged tasks land in [`OTHERS_GROUP`]. Groups appear in the order they
/// are first encountered.
///
/// The untagged bucket is keyed separately from tag names, so a user tag
/// literally named "Others" gets its own group.
pub fn group_by_tag<'a>(sorted: &[&'a Task]) -> Vec<TaskGroup<'a>> {
    let mut groups: Vec<TaskGroup<'a>> = Vec::new();
    let mut by_tag: HashMap<&'a str, usize> = HashMap::new();
    let mut others: Option<usize> = None;

    for &task in sorted {
        if task.tags.is_empty() {
            let index = *others.get_or_insert_with(|| {
                groups.push(TaskGroup {
                    name: OTHERS_GROUP,
                    untagged: true,
                    tasks: Vec::new(),
                });
                groups.len() - 1
            });
            groups[index].tasks.push(task);
            continue;
        }

        for tag in &task.tags {
            let index = *by_tag.entry(tag.as_str()).or_insert_with(|| {
                groups.push(TaskGroup {
                    name: tag.as_str(),
                    untagged: false,
                    tasks: Vec::new(),
                });
                groups.len() - 1
            });
            groups[index].tasks.push(task);
        }
    }

    groups
}
