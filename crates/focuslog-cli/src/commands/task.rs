use std::path::Path;

use chrono::DateTime;
use focuslog_core::models::{Task, TaskState};

use crate::cli::PriorityArg;
use crate::commands::common::{open_store, task_to_item, TaskListItem};
use crate::error::CliError;

pub async fn run_add(
    title: &[String],
    project: Option<i64>,
    estimate: Option<i64>,
    priority: PriorityArg,
    due: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = title.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(CliError::EmptyTaskTitle);
    }
    let due_date = due
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|date| date.timestamp_millis())
                .map_err(|_| CliError::InvalidDueDate(raw.to_string()))
        })
        .transpose()?;

    let store = open_store(db_path).await?;
    let mut task = Task::new(&title);
    task.project_id = project;
    task.estimate_minutes = estimate;
    task.priority = priority.into();
    task.due_date = due_date;
    store.save_task(&mut task).await?;

    println!("Created task {} ({title})", task.id.unwrap_or_default());
    Ok(())
}

pub async fn run_list(
    project: Option<i64>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let tasks = store.list_tasks(project).await?;

    if as_json {
        let items = tasks.iter().map(task_to_item).collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks yet.");
        return Ok(());
    }
    for task in &tasks {
        let item = task_to_item(task);
        let due = item
            .due_date
            .map_or_else(String::new, |date| format!("  due {date}"));
        println!(
            "{:>4}  [{}] {} ({}){due}",
            item.id, item.state, item.title, item.priority
        );
    }
    Ok(())
}

pub async fn run_done(id: i64, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let mut task = store
        .get_task(id)
        .await?
        .ok_or(CliError::TaskNotFound(id))?;

    task.state = TaskState::Done;
    store.save_task(&mut task).await?;

    println!("Done: {}", task.title);
    Ok(())
}
