//! Session commands
//!
//! Listing, inspection and lifecycle of backend sessions, plus the REST
//! message paths (`send`, `oneshot`) that work without a live stream.

use colored::Colorize;

use crate::api::CreateSessionRequest;
use crate::client::CockpitClient;
use crate::commands::print_json;
use crate::error::{CockpitError, Result};
use crate::render;

/// List all sessions
pub async fn list_sessions(client: &CockpitClient, json: bool) -> Result<()> {
    let sessions = client.api().list_sessions().await?;
    client.store().set_sessions(sessions.clone());

    if json {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }
    render::sessions_table(&sessions).printstd();
    Ok(())
}

/// Show one session
pub async fn show_session(client: &CockpitClient, id: &str, json: bool) -> Result<()> {
    let session = client.api().get_session(id).await?;
    if json {
        return print_json(&session);
    }

    println!("{}", session.name.bold());
    println!("  id:            {}", session.id);
    println!("  project:       {} ({})", session.project_name, session.project_id);
    println!("  repository:    {}", session.repo_path);
    println!("  account:       {}", session.account_id);
    println!("  status:        {}", session.status);
    println!("  messages:      {}", session.message_count);
    println!("  created:       {}", session.created_at);
    println!("  last activity: {}", session.last_activity);
    Ok(())
}

/// Start a session in `project_id`
pub async fn create_session(
    client: &CockpitClient,
    project_id: String,
    name: Option<String>,
    account_id: Option<String>,
) -> Result<()> {
    let request = CreateSessionRequest {
        project_id,
        name,
        account_id,
    };
    let session = client.api().create_session(&request).await?;
    tracing::info!(session_id = %session.id, "Session created");
    println!("{} {} ({})", "Created".green(), session.name, session.id);
    Ok(())
}

/// Start a session from a saved template
pub async fn create_from_template(client: &CockpitClient, template_id: &str) -> Result<()> {
    let state = client.store().snapshot();
    let template = state
        .templates
        .iter()
        .find(|t| t.id == template_id)
        .ok_or_else(|| CockpitError::Config(format!("Template not found: {}", template_id)))?;

    create_session(
        client,
        template.project_id.clone(),
        Some(template.name.clone()),
        template.account_id.clone(),
    )
    .await
}

/// Stop a session
pub async fn stop_session(client: &CockpitClient, id: &str) -> Result<()> {
    let response = client.api().stop_session(id).await?;
    println!("Session {}: {}", id, response.status);
    Ok(())
}

/// Send a message to a session over REST
pub async fn send_message(client: &CockpitClient, id: &str, content: &str) -> Result<()> {
    let response = client.api().send_message(id, content).await?;
    println!("Message {}", response.status);
    Ok(())
}

/// Run a one-shot prompt and print the result
pub async fn send_oneshot(client: &CockpitClient, id: &str, content: &str) -> Result<()> {
    let response = client.api().send_oneshot(id, content).await?;
    println!("{}", response.result);
    Ok(())
}
