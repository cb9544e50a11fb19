//! The task store: the task list, the tag registry, and their persistence.
//!
//! `TaskStore::load` rehydrates both collections once; every mutation that
//! changes state is followed by a synchronous [`TaskStore::save`] that
//! rewrites both storage entries in full. Invalid input (blank text, unknown
//! id, duplicate tag) changes nothing and writes nothing; those calls return
//! `None`/`false` rather than an error.
//!
//! Loading repairs what it reads so every invariant holds afterwards:
//!
//! - elements that fail to decode are skipped; an entry that is not a JSON
//!   array at all is set aside with [`KeyValueStore::backup`] before the
//!   first save overwrites it
//! - registry names are trimmed, blank ones dropped, duplicates collapsed
//! - task text is trimmed and tasks with blank text are dropped
//! - task tags are trimmed, deduplicated and limited to the registry
//! - a task repeating an earlier task's id gets a fresh one

use std::collections::HashSet;

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::storage::{KeyValueStore, TAGS_KEY, TASKS_KEY};
use crate::task::{
    self, normalize_tags, normalize_text, NewTask, Task, TaskGroup, TaskId, TaskPatch,
};

#[derive(Debug)]
pub struct TaskStore<S: KeyValueStore> {
    storage: S,
    tasks: Vec<Task>,
    tags: Vec<String>,
    /// Entries that were unreadable at load; backed up before the next save.
    unreadable: Vec<&'static str>,
}

/// Decode a JSON array entry one element at a time. Missing entries come
/// back empty; `None` means the entry is not a JSON array.
fn read_list<S, T>(storage: &S, key: &str) -> Result<Option<Vec<T>>>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let Some(raw) = storage.get(key)? else {
        return Ok(Some(Vec::new()));
    };
    let elements: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(elements) => elements,
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring unreadable storage entry");
            return Ok(None);
        }
    };

    let mut items = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value(element) {
            Ok(item) => items.push(item),
            Err(err) => tracing::warn!(key, index, error = %err, "skipping malformed element"),
        }
    }
    Ok(Some(items))
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Rehydrate the store from `storage`.
    pub fn load(storage: S) -> Result<Self> {
        let mut unreadable = Vec::new();
        let raw_tags: Vec<String> = read_list(&storage, TAGS_KEY)?.unwrap_or_else(|| {
            unreadable.push(TAGS_KEY);
            Vec::new()
        });
        let raw_tasks: Vec<Task> = read_list(&storage, TASKS_KEY)?.unwrap_or_else(|| {
            unreadable.push(TASKS_KEY);
            Vec::new()
        });

        let mut tags: Vec<String> = Vec::with_capacity(raw_tags.len());
        for tag in raw_tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|known| known == tag) {
                tags.push(tag.to_string());
            }
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(raw_tasks.len());
        let mut seen: HashSet<TaskId> = HashSet::new();
        let mut collisions: Vec<usize> = Vec::new();
        for mut task in raw_tasks {
            let Some(text) = normalize_text(&task.text) else {
                tracing::warn!(id = %task.id, "dropping task with blank text");
                continue;
            };
            task.text = text;

            let kept = normalize_tags(&task.tags, &tags);
            if kept.len() != task.tags.len() {
                let unregistered = task
                    .tags
                    .iter()
                    .filter(|tag| !tags.iter().any(|known| known == tag.trim()))
                    .count();
                tracing::warn!(
                    id = %task.id,
                    unregistered,
                    duplicates = task.tags.len() - kept.len() - unregistered,
                    "repaired task tags"
                );
                task.tags = kept;
            }

            if !seen.insert(task.id) {
                collisions.push(tasks.len());
            }
            tasks.push(task);
        }

        for index in collisions {
            let used: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
            let fresh = TaskId::next(now_ms(), &used);
            tracing::warn!(old = %tasks[index].id, new = %fresh, "reassigning duplicate task id");
            tasks[index].id = fresh;
        }

        tracing::debug!(tasks = tasks.len(), tags = tags.len(), "loaded task store");
        Ok(Self {
            storage,
            tasks,
            tags,
            unreadable,
        })
    }

    /// Write both collections to storage in full.
    pub fn save(&mut self) -> Result<()> {
        for key in &self.unreadable {
            self.storage.backup(key)?;
        }
        self.unreadable.clear();

        let tasks = serde_json::to_string(&self.tasks)?;
        let tags = serde_json::to_string(&self.tags)?;
        self.storage
            .set_all(&[(TASKS_KEY, tasks.as_str()), (TAGS_KEY, tags.as_str())])?;
        tracing::debug!(
            tasks = self.tasks.len(),
            tags = self.tags.len(),
            "saved task store"
        );
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn next_id(&self) -> TaskId {
        let used: Vec<TaskId> = self.tasks.iter().map(|task| task.id).collect();
        TaskId::next(now_ms(), &used)
    }

    /// Append a task. Returns `None` when the trimmed text is empty.
    pub fn add_task(&mut self, new: NewTask) -> Result<Option<Task>> {
        let Some(text) = normalize_text(&new.text) else {
            return Ok(None);
        };

        let task = Task {
            id: self.next_id(),
            text,
            completed: false,
            priority: new.priority,
            tags: normalize_tags(&new.tags, &self.tags),
        };
        self.tasks.push(task.clone());
        self.save()?;
        Ok(Some(task))
    }

    /// Apply `patch` to the task in place. Returns `None` when the id is
    /// unknown or the resulting text would be blank.
    pub fn edit_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let mut updated = self.tasks[index].clone();
        if let Some(text) = patch.text.as_deref() {
            let Some(text) = normalize_text(text) else {
                return Ok(None);
            };
            updated.text = text;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(tags) = patch.tags.as_deref() {
            updated.tags = normalize_tags(tags, &self.tags);
        }

        self.tasks[index] = updated.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Flip `completed`. Returns the updated task, or `None` for an unknown id.
    pub fn toggle_complete(&mut self, id: TaskId) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        let updated = task.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Delete a task. Returns the removed task, or `None` for an unknown id.
    pub fn remove_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let removed = self.tasks.remove(index);
        self.save()?;
        Ok(Some(removed))
    }

    /// Register a tag. Returns `false` when the trimmed name is empty or
    /// already registered (exact, case-sensitive match).
    pub fn add_tag(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() || self.tags.iter().any(|tag| tag == name) {
            return Ok(false);
        }

        self.tags.push(name.to_string());
        self.save()?;
        Ok(true)
    }

    /// Unregister a tag and strip it from every task. Tasks themselves are
    /// kept. Returns `false` when the tag was not registered.
    pub fn remove_tag(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        let Some(index) = self.tags.iter().position(|tag| tag == name) else {
            return Ok(false);
        };

        self.tags.remove(index);
        for task in &mut self.tasks {
            task.tags.retain(|tag| tag != name);
        }
        self.save()?;
        Ok(true)
    }

    /// Tasks in display order: `HIGH`, `MEDIUM`, `LOW`, ties in list order.
    pub fn sorted(&self) -> Vec<&Task> {
        task::sort_by_priority(&self.tasks)
    }

    /// Priority-sorted tasks bucketed by tag; see [`task::group_by_tag`].
    pub fn sorted_and_grouped(&self) -> Vec<TaskGroup<'_>> {
        task::group_by_tag(&self.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::task::{Priority, OTHERS_GROUP};
    use tempfile::TempDir;

    fn empty_store() -> TaskStore<MemoryStorage> {
        TaskStore::load(MemoryStorage::new()).unwrap()
    }

    fn store_with_tags(tags: &[&str]) -> TaskStore<MemoryStorage> {
        let mut store = empty_store();
        for tag in tags {
            assert!(store.add_tag(tag).unwrap());
        }
        store
    }

    #[test]
    fn blank_text_is_rejected_without_writing() {
        let mut store = empty_store();

        assert!(store.add_task(NewTask::new("")).unwrap().is_none());
        assert!(store.add_task(NewTask::new("   ")).unwrap().is_none());

        assert!(store.tasks().is_empty());
        assert!(store.storage().is_empty());
    }

    #[test]
    fn add_then_toggle_completes_single_task() {
        let mut store = empty_store();
        let task = store.add_task(NewTask::new("Buy milk")).unwrap().unwrap();
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);

        let toggled = store.toggle_complete(task.id).unwrap().unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert!(toggled.completed);
        assert_eq!(toggled.text, "Buy milk");
        assert_eq!(store.tasks()[0], toggled);

        let back = store.toggle_complete(task.id).unwrap().unwrap();
        assert!(!back.completed);
    }

    #[test]
    fn add_trims_text() {
        let mut store = empty_store();
        let task = store.add_task(NewTask::new("  Walk dog  ")).unwrap().unwrap();
        assert_eq!(task.text, "Walk dog");
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = empty_store();
        let mut ids = Vec::new();
        for n in 0..20 {
            let task = store.add_task(NewTask::new(format!("task {n}"))).unwrap().unwrap();
            ids.push(task.id);
        }
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn add_keeps_only_registered_tags() {
        let mut store = store_with_tags(&["home", "work"]);
        let task = store
            .add_task(NewTask::new("Fix sink").tags(["home", "gym", "home"]))
            .unwrap()
            .unwrap();
        assert_eq!(task.tags, vec!["home".to_string()]);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut store = empty_store();
        store.add_task(NewTask::new("Only task")).unwrap();
        let before = store.tasks().to_vec();

        let missing = TaskId(1);
        assert!(store.toggle_complete(missing).unwrap().is_none());
        assert!(store.remove_task(missing).unwrap().is_none());
        assert!(store
            .edit_task(missing, TaskPatch::default().text("x"))
            .unwrap()
            .is_none());

        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn edit_replaces_in_place() {
        let mut store = store_with_tags(&["work"]);
        let first = store.add_task(NewTask::new("first")).unwrap().unwrap();
        let second = store.add_task(NewTask::new("second")).unwrap().unwrap();
        let third = store.add_task(NewTask::new("third")).unwrap().unwrap();
        store.toggle_complete(second.id).unwrap();

        let edited = store
            .edit_task(
                second.id,
                TaskPatch::default()
                    .text(" second, edited ")
                    .priority(Priority::High)
                    .tags(["work"]),
            )
            .unwrap()
            .unwrap();

        assert_eq!(edited.id, second.id);
        assert_eq!(edited.text, "second, edited");
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.tags, vec!["work".to_string()]);
        assert!(edited.completed);

        let order: Vec<TaskId> = store.tasks().iter().map(|task| task.id).collect();
        assert_eq!(order, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn edit_rejects_blank_text() {
        let mut store = empty_store();
        let task = store.add_task(NewTask::new("keep me")).unwrap().unwrap();

        let result = store
            .edit_task(
                task.id,
                TaskPatch::default().text("   ").priority(Priority::Low),
            )
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.get(task.id), Some(&task));
    }

    #[test]
    fn edit_without_text_keeps_text() {
        let mut store = empty_store();
        let task = store.add_task(NewTask::new("keep me")).unwrap().unwrap();

        let edited = store
            .edit_task(task.id, TaskPatch::default().priority(Priority::Low))
            .unwrap()
            .unwrap();
        assert_eq!(edited.text, "keep me");
        assert_eq!(edited.priority, Priority::Low);
    }

    #[test]
    fn remove_task_deletes_only_that_task() {
        let mut store = empty_store();
        let first = store.add_task(NewTask::new("first")).unwrap().unwrap();
        let second = store.add_task(NewTask::new("second")).unwrap().unwrap();

        let removed = store.remove_task(first.id).unwrap().unwrap();

        assert_eq!(removed, first);
        assert_eq!(store.tasks(), &[second]);
    }

    #[test]
    fn add_tag_is_idempotent_and_trimmed() {
        let mut store = empty_store();

        assert!(store.add_tag("x").unwrap());
        assert!(!store.add_tag("x").unwrap());
        assert!(!store.add_tag("  x ").unwrap());
        assert!(!store.add_tag("   ").unwrap());
        assert!(store.add_tag("X").unwrap());

        assert_eq!(store.tags(), &["x".to_string(), "X".to_string()]);
    }

    #[test]
    fn remove_tag_strips_it_from_tasks() {
        let mut store = store_with_tags(&["work", "urgent"]);
        let both = store
            .add_task(NewTask::new("report").tags(["work", "urgent"]))
            .unwrap()
            .unwrap();
        let only_work = store
            .add_task(NewTask::new("email").tags(["work"]))
            .unwrap()
            .unwrap();

        assert!(store.remove_tag("work").unwrap());

        assert_eq!(store.tags(), &["urgent".to_string()]);
        assert_eq!(store.get(both.id).unwrap().tags, vec!["urgent".to_string()]);
        assert!(store.get(only_work.id).unwrap().tags.is_empty());
        assert_eq!(store.tasks().len(), 2);

        assert!(!store.remove_tag("work").unwrap());
    }

    #[test]
    fn sorted_and_grouped_matches_priority_and_tags() {
        let mut store = store_with_tags(&["urgent", "home"]);
        let low = store
            .add_task(NewTask::new("low").priority(Priority::Low))
            .unwrap()
            .unwrap();
        let high_1 = store
            .add_task(
                NewTask::new("high 1")
                    .priority(Priority::High)
                    .tags(["urgent", "home"]),
            )
            .unwrap()
            .unwrap();
        let medium = store
            .add_task(NewTask::new("medium").priority(Priority::Medium))
            .unwrap()
            .unwrap();
        let high_2 = store
            .add_task(NewTask::new("high 2").priority(Priority::High))
            .unwrap()
            .unwrap();

        let sorted: Vec<TaskId> = store.sorted().iter().map(|task| task.id).collect();
        assert_eq!(sorted, vec![high_1.id, high_2.id, medium.id, low.id]);

        let groups = store.sorted_and_grouped();
        let summary: Vec<(&str, Vec<TaskId>)> = groups
            .iter()
            .map(|group| (group.name, group.tasks.iter().map(|task| task.id).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("urgent", vec![high_1.id]),
                ("home", vec![high_1.id]),
                (OTHERS_GROUP, vec![high_2.id, medium.id, low.id]),
            ]
        );
    }

    #[test]
    fn every_mutation_is_persisted() {
        let mut store = empty_store();
        store.add_tag("home").unwrap();
        let task = store
            .add_task(NewTask::new("Buy milk").tags(["home"]))
            .unwrap()
            .unwrap();
        store.toggle_complete(task.id).unwrap();

        let reloaded = TaskStore::load(store.storage().clone()).unwrap();
        assert_eq!(reloaded.tasks(), store.tasks());
        assert_eq!(reloaded.tags(), store.tags());
        assert!(reloaded.tasks()[0].completed);
    }

    #[test]
    fn file_round_trip_reproduces_collections() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::load(FileStorage::new(temp.path())).unwrap();
        store.add_tag("home").unwrap();
        store.add_tag("unused").unwrap();
        store
            .add_task(NewTask::new("Buy milk").priority(Priority::High).tags(["home"]))
            .unwrap();
        store.add_task(NewTask::new("Call mom")).unwrap();

        let reloaded = TaskStore::load(FileStorage::new(temp.path())).unwrap();
        assert_eq!(reloaded.tasks(), store.tasks());
        assert_eq!(reloaded.tags(), store.tags());

        let raw = std::fs::read_to_string(temp.path().join("tags.json")).unwrap();
        assert_eq!(raw, r#"["home","unused"]"#);
    }

    #[test]
    fn malformed_entries_load_as_empty() {
        let storage = MemoryStorage::new()
            .with_entry(TASKS_KEY, "{not json")
            .with_entry(TAGS_KEY, r#"["home"]"#);

        let store = TaskStore::load(storage).unwrap();
        assert!(store.tasks().is_empty());
        assert_eq!(store.tags(), &["home".to_string()]);
        assert!(store.storage().get("tasks.bak").unwrap().is_none());
    }

    #[test]
    fn unreadable_entry_is_backed_up_before_overwrite() {
        let storage = MemoryStorage::new().with_entry(TASKS_KEY, "{not json");
        let mut store = TaskStore::load(storage).unwrap();

        store.add_task(NewTask::new("new")).unwrap();

        assert_eq!(
            store.storage().get("tasks.bak").unwrap().as_deref(),
            Some("{not json")
        );
        let reloaded = TaskStore::load(store.storage().clone()).unwrap();
        assert_eq!(reloaded.tasks(), store.tasks());

        store.add_task(NewTask::new("newer")).unwrap();
        assert_eq!(
            store.storage().get("tasks.bak").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn malformed_element_does_not_erase_its_neighbours() {
        let storage = MemoryStorage::new().with_entry(
            TASKS_KEY,
            r#"[{"id":1,"text":"keep me"},{"id":2,"text":"bad","priority":"URGENT"}]"#,
        );
        let mut store = TaskStore::load(storage).unwrap();
        assert_eq!(store.tasks().len(), 1);

        store.add_task(NewTask::new("new")).unwrap();

        let reloaded = TaskStore::load(store.storage().clone()).unwrap();
        let texts: Vec<&str> = reloaded.tasks().iter().map(|task| task.text.as_str()).collect();
        assert_eq!(texts, vec!["keep me", "new"]);
        assert_eq!(reloaded.get(TaskId(1)).unwrap().text, "keep me");
    }

    #[test]
    fn load_repairs_text_and_duplicate_ids() {
        let storage = MemoryStorage::new().with_entry(
            TASKS_KEY,
            r#"[{"id":5,"text":"  padded "},{"id":6,"text":"   "},{"id":5,"text":"twin"}]"#,
        );

        let store = TaskStore::load(storage).unwrap();

        let texts: Vec<&str> = store.tasks().iter().map(|task| task.text.as_str()).collect();
        assert_eq!(texts, vec!["padded", "twin"]);
        assert_eq!(store.tasks()[0].id, TaskId(5));
        assert_ne!(store.tasks()[1].id, TaskId(5));
    }

    #[test]
    fn load_repairs_unregistered_tags() {
        let storage = MemoryStorage::new()
            .with_entry(
                TASKS_KEY,
                r#"[{"id": 1, "text": "a", "completed": true, "priority": "LOW", "tags": ["home", "gone"]}]"#,
            )
            .with_entry(TAGS_KEY, r#"["home", " home ", ""]"#);

        let store = TaskStore::load(storage).unwrap();
        assert_eq!(store.tags(), &["home".to_string()]);
        assert_eq!(store.tasks()[0].tags, vec!["home".to_string()]);
        assert!(store.tasks()[0].completed);
        assert_eq!(store.tasks()[0].priority, Priority::Low);
    }

    #[test]
    fn load_collapses_duplicate_task_tags() {
        let storage = MemoryStorage::new()
            .with_entry(TASKS_KEY, r#"[{"id":1,"text":"a","tags":["home"," home","home"]}]"#)
            .with_entry(TAGS_KEY, r#"["home"]"#);

        let store = TaskStore::load(storage).unwrap();
        assert_eq!(store.tasks()[0].tags, vec!["home".to_string()]);
    }

    #[test]
    fn next_id_moves_past_loaded_ids() {
        let far_future = u64::MAX - 10;
        let storage = MemoryStorage::new().with_entry(
            TASKS_KEY,
            format!(r#"[{{"id": {far_future}, "text": "from the future"}}]"#),
        );
        let mut store = TaskStore::load(storage).unwrap();

        let task = store.add_task(NewTask::new("now")).unwrap().unwrap();
        assert_eq!(task.id, TaskId(far_future + 1));
    }

    #[test]
    fn next_id_stays_unique_at_max() {
        let storage = MemoryStorage::new().with_entry(
            TASKS_KEY,
            format!(r#"[{{"id": {}, "text": "max"}}]"#, u64::MAX),
        );
        let mut store = TaskStore::load(storage).unwrap();

        let first = store.add_task(NewTask::new("next")).unwrap().unwrap();
        let second = store.add_task(NewTask::new("after")).unwrap().unwrap();

        assert_ne!(first.id, TaskId(u64::MAX));
        assert_ne!(second.id, TaskId(u64::MAX));
        assert_ne!(first.id, second.id);
        assert!(store.toggle_complete(first.id).unwrap().unwrap().completed);
        assert!(!store.get(TaskId(u64::MAX)).unwrap().completed);
    }
}
