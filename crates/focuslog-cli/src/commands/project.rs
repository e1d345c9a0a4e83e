use std::path::Path;

use focuslog_core::models::Project;

use crate::commands::common::{open_store, project_to_item, ProjectListItem};
use crate::error::CliError;

pub async fn run_add(name: &[String], db_path: &Path) -> Result<(), CliError> {
    let name = name.join(" ").trim().to_string();
    if name.is_empty() {
        return Err(CliError::EmptyProjectName);
    }

    let store = open_store(db_path).await?;
    let mut project = Project::new(&name);
    store.save_project(&mut project).await?;

    println!(
        "Created project {} ({name})",
        project.id.unwrap_or_default()
    );
    Ok(())
}

pub async fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let projects = store.list_projects().await?;

    if as_json {
        let items = projects
            .iter()
            .map(project_to_item)
            .collect::<Vec<ProjectListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects yet.");
        return Ok(());
    }
    for project in &projects {
        let item = project_to_item(project);
        println!("{:>4}  {}  [{}]", item.id, item.name, item.sync_status);
    }
    Ok(())
}
