//! Project commands

use colored::Colorize;

use crate::api::{CreateProjectRequest, UpdateProjectRequest};
use crate::client::CockpitClient;
use crate::commands::print_json;
use crate::error::{CockpitError, Result};
use crate::render;

/// List all projects
pub async fn list_projects(client: &CockpitClient, json: bool) -> Result<()> {
    let projects = client.api().list_projects().await?;
    client.store().set_projects(projects.clone());

    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects");
        return Ok(());
    }
    render::projects_table(&projects).printstd();
    Ok(())
}

pub async fn show_project(client: &CockpitClient, id: &str) -> Result<()> {
    let project = client.api().get_project(id).await?;
    println!("{}", project.name.bold());
    println!("  id:          {}", project.id);
    println!("  repository:  {}", project.repo_path);
    if !project.description.is_empty() {
        println!("  description: {}", project.description);
    }
    println!("  sessions:    {}", project.session_count);
    println!("  updated:     {}", project.updated_at);
    Ok(())
}

pub async fn create_project(client: &CockpitClient, request: CreateProjectRequest) -> Result<()> {
    let project = client.api().create_project(&request).await?;
    tracing::info!(project_id = %project.id, "Project created");
    println!("{} {} ({})", "Created".green(), project.name, project.id);
    Ok(())
}

/// Update the given fields of a project
///
/// # Errors
///
/// Returns [`CockpitError::Config`] if no field was given.
pub async fn update_project(
    client: &CockpitClient,
    id: &str,
    request: UpdateProjectRequest,
) -> Result<()> {
    if request.is_empty() {
        return Err(CockpitError::Config("Nothing to update".to_string()).into());
    }
    let project = client.api().update_project(id, &request).await?;
    println!("{} {} ({})", "Updated".green(), project.name, project.id);
    Ok(())
}

pub async fn delete_project(client: &CockpitClient, id: &str) -> Result<()> {
    let response = client.api().delete_project(id).await?;
    println!("Project {}: {}", id, response.status);
    Ok(())
}

pub async fn project_sessions(client: &CockpitClient, id: &str) -> Result<()> {
    let sessions = client.api().project_sessions(id).await?;
    if sessions.is_empty() {
        println!("No sessions in project {}", id);
        return Ok(());
    }
    render::sessions_table(&sessions).printstd();
    Ok(())
}
