//! todo task command implementations.

use chrono::Local;
use serde::Serialize;

use crate::cli::{load_context, GlobalOptions};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{NewTask, Priority, Task, TaskGroup, TaskId, TaskPatch};

pub struct AddOptions {
    pub text: String,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub id: String,
    pub text: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub globals: GlobalOptions,
}

pub struct ToggleOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

pub struct RmOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

pub struct ListOptions {
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct TaskChangeOutput {
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dropped_tags: Vec<String>,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    date: String,
    total: usize,
    completed: usize,
    tags: &'a [String],
    groups: Vec<TaskGroup<'a>>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    // Parse flags before touching storage so a typo never writes.
    let explicit_priority = parse_priority(options.priority.as_deref())?;
    let mut ctx = load_context(&options.globals)?;
    let priority = match explicit_priority {
        Some(priority) => priority,
        None => ctx.config.tasks.priority()?,
    };

    let added = ctx.store.add_task(
        NewTask::new(options.text)
            .priority(priority)
            .tags(options.tags.iter().cloned()),
    )?;

    let Some(task) = added else {
        return emit_unchanged(&options.globals, "add", "task text cannot be blank");
    };

    let dropped_tags = dropped_tags(&options.tags, &task);
    let mut human = HumanOutput::new("Task added");
    push_task_summary(&mut human, &task);
    push_dropped_tags(&mut human, &dropped_tags);
    human.push_next_step("todo list");

    emit_success(
        options.globals.output(),
        "add",
        &TaskChangeOutput {
            changed: true,
            task: Some(task),
            dropped_tags,
        },
        Some(&human),
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let id: TaskId = options.id.parse()?;
    let mut patch = TaskPatch {
        text: options.text,
        priority: parse_priority(options.priority.as_deref())?,
        tags: None,
    };
    if options.clear_tags {
        patch.tags = Some(Vec::new());
    } else if !options.tags.is_empty() {
        patch.tags = Some(options.tags.clone());
    }
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "edit requires --text, --priority, --tag or --clear-tags".to_string(),
        ));
    }

    let mut ctx = load_context(&options.globals)?;
    let Some(task) = ctx.store.edit_task(id, patch)? else {
        let reason = if ctx.store.get(id).is_none() {
            format!("no task with id {id}")
        } else {
            "task text cannot be blank".to_string()
        };
        return emit_unchanged(&options.globals, "edit", &reason);
    };

    let dropped_tags = dropped_tags(&options.tags, &task);
    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task);
    push_dropped_tags(&mut human, &dropped_tags);

    emit_success(
        options.globals.output(),
        "edit",
        &TaskChangeOutput {
            changed: true,
            task: Some(task),
            dropped_tags,
        },
        Some(&human),
    )
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let id: TaskId = options.id.parse()?;
    let mut ctx = load_context(&options.globals)?;
    let Some(task) = ctx.store.toggle_complete(id)? else {
        return emit_unchanged(&options.globals, "toggle", &format!("no task with id {id}"));
    };

    let header = if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    };
    let mut human = HumanOutput::new(header);
    push_task_summary(&mut human, &task);

    emit_success(
        options.globals.output(),
        "toggle",
        &TaskChangeOutput {
            changed: true,
            task: Some(task),
            dropped_tags: Vec::new(),
        },
        Some(&human),
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let id: TaskId = options.id.parse()?;
    let mut ctx = load_context(&options.globals)?;
    let Some(task) = ctx.store.remove_task(id)? else {
        return emit_unchanged(&options.globals, "rm", &format!("no task with id {id}"));
    };

    let mut human = HumanOutput::new("Task removed");
    push_task_summary(&mut human, &task);

    emit_success(
        options.globals.output(),
        "rm",
        &TaskChangeOutput {
            changed: true,
            task: Some(task),
            dropped_tags: Vec::new(),
        },
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let store = &ctx.store;
    let date = Local::now().format("%A, %B %-d, %Y").to_string();
    let completed = store.tasks().iter().filter(|task| task.completed).count();

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Date", date.clone());
    human.push_summary("Total", store.tasks().len().to_string());
    human.push_summary("Completed", completed.to_string());

    let groups = store.sorted_and_grouped();
    for group in &groups {
        human.push_section(group.name);
        for task in &group.tasks {
            human.push_detail(format_task_line(task));
        }
    }
    if store.tasks().is_empty() {
        human.push_next_step("todo add <text>");
    }

    emit_success(
        options.globals.output(),
        "list",
        &TaskListOutput {
            date,
            total: store.tasks().len(),
            completed,
            tags: store.tags(),
            groups,
        },
        Some(&human),
    )
}

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>> {
    value.map(str::parse::<Priority>).transpose()
}

fn emit_unchanged(globals: &GlobalOptions, command: &str, reason: &str) -> Result<()> {
    tracing::debug!(command, reason, "no change");
    let mut human = HumanOutput::new("Nothing changed");
    human.push_summary("Reason", reason);

    emit_success(
        globals.output(),
        command,
        &TaskChangeOutput {
            changed: false,
            task: None,
            dropped_tags: Vec::new(),
        },
        Some(&human),
    )
}

/// Requested tags that did not end up on the task.
fn dropped_tags(requested: &[String], task: &Task) -> Vec<String> {
    let mut dropped: Vec<String> = Vec::new();
    for tag in requested {
        let tag = tag.trim();
        if !tag.is_empty() && !task.has_tag(tag) && !dropped.iter().any(|seen| seen == tag) {
            dropped.push(tag.to_string());
        }
    }
    dropped
}

fn push_dropped_tags(human: &mut HumanOutput, dropped: &[String]) {
    if dropped.is_empty() {
        return;
    }
    human.push_warning(format!("unknown tags ignored: {}", dropped.join(", ")));
    for tag in dropped {
        human.push_next_step(format!("todo tag add {tag}"));
    }
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Text", task.text.clone());
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary("Completed", if task.completed { "yes" } else { "no" });
    if !task.tags.is_empty() {
        human.push_summary("Tags", task.tags.join(", "));
    }
}

fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{mark} {:<6} {} {}", task.priority, task.id, task.text);
    if !task.tags.is_empty() {
        line.push_str(&format!(" ({})", task.tags.join(", ")));
    }
    line
}
