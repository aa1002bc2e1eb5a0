//! Local session template commands
//!
//! Templates live in the persisted client state only.

use colored::Colorize;

use crate::client::CockpitClient;
use crate::error::{CockpitError, Result};
use crate::render;
use crate::store::SessionTemplate;

pub fn list_templates(client: &CockpitClient) -> Result<()> {
    let templates = client.store().snapshot().templates;
    if templates.is_empty() {
        println!("No templates");
        return Ok(());
    }
    render::templates_table(&templates).printstd();
    Ok(())
}

/// Save a template for `project_id`
///
/// The project name is looked up on the backend so the template can be
/// shown without another request later.
pub async fn add_template(
    client: &CockpitClient,
    name: String,
    project_id: String,
    account_id: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let project = client.api().get_project(&project_id).await?;
    let template = SessionTemplate::new(name, project_id, project.name)
        .with_account(account_id)
        .with_description(description);
    let id = template.id.clone();
    client.store().add_template(template)?;
    println!("{} template {}", "Saved".green(), id);
    Ok(())
}

pub fn remove_template(client: &CockpitClient, id: &str) -> Result<()> {
    if !client.store().remove_template(id)? {
        return Err(CockpitError::Config(format!("Template not found: {}", id)).into());
    }
    println!("Removed template {}", id);
    Ok(())
}
