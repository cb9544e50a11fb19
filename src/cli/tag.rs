//! todo tag command implementations.

use serde::Serialize;

use crate::cli::{load_context, GlobalOptions};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub struct AddOptions {
    pub name: String,
    pub globals: GlobalOptions,
}

pub struct RmOptions {
    pub name: String,
    pub globals: GlobalOptions,
}

pub struct LsOptions {
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct TagChangeOutput<'a> {
    changed: bool,
    name: &'a str,
    /// Tasks that lost the tag
    #[serde(skip_serializing_if = "Option::is_none")]
    untagged_tasks: Option<usize>,
    tags: &'a [String],
}

#[derive(Serialize)]
struct TagListOutput<'a> {
    total: usize,
    tags: Vec<TagUsage<'a>>,
}

#[derive(Serialize)]
struct TagUsage<'a> {
    name: &'a str,
    tasks: usize,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals)?;
    let name = options.name.trim();
    let changed = ctx.store.add_tag(name)?;

    let human = if changed {
        let mut human = HumanOutput::new("Tag added");
        human.push_summary("Name", name);
        human.push_next_step(format!("todo add <text> --tag {name}"));
        human
    } else {
        let reason = if name.is_empty() {
            "tag name cannot be blank".to_string()
        } else {
            format!("tag '{name}' already exists")
        };
        let mut human = HumanOutput::new("Nothing changed");
        human.push_summary("Reason", reason);
        human
    };

    emit_success(
        options.globals.output(),
        "tag add",
        &TagChangeOutput {
            changed,
            name,
            untagged_tasks: None,
            tags: ctx.store.tags(),
        },
        Some(&human),
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals)?;
    let name = options.name.trim();
    let tagged = ctx
        .store
        .tasks()
        .iter()
        .filter(|task| task.has_tag(name))
        .count();
    let changed = ctx.store.remove_tag(name)?;

    let human = if changed {
        let mut human = HumanOutput::new("Tag removed");
        human.push_summary("Name", name);
        human.push_summary("Tasks untagged", tagged.to_string());
        human
    } else {
        let mut human = HumanOutput::new("Nothing changed");
        human.push_summary("Reason", format!("no tag named '{name}'"));
        human
    };

    emit_success(
        options.globals.output(),
        "tag rm",
        &TagChangeOutput {
            changed,
            name,
            untagged_tasks: changed.then_some(tagged),
            tags: ctx.store.tags(),
        },
        Some(&human),
    )
}

pub fn run_ls(options: LsOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let tags: Vec<TagUsage<'_>> = ctx
        .store
        .tags()
        .iter()
        .map(|name| TagUsage {
            name,
            tasks: ctx
                .store
                .tasks()
                .iter()
                .filter(|task| task.has_tag(name))
                .count(),
        })
        .collect();

    let mut human = HumanOutput::new("Tags");
    human.push_summary("Total", tags.len().to_string());
    human.push_section("Registered");
    for tag in &tags {
        human.push_detail(format!("{} ({} tasks)", tag.name, tag.tasks));
    }
    if tags.is_empty() {
        human.push_next_step("todo tag add <name>");
    }

    emit_success(
        options.globals.output(),
        "tag ls",
        &TagListOutput {
            total: tags.len(),
            tags,
        },
        Some(&human),
    )
}
