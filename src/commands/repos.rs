//! Repository commands

use crate::client::CockpitClient;
use crate::error::Result;
use crate::render;

pub async fn list_repos(client: &CockpitClient) -> Result<()> {
    let repos = client.api().list_repos().await?;
    if repos.is_empty() {
        println!("No repositories");
        return Ok(());
    }
    render::repos_table(&repos).printstd();
    Ok(())
}

/// List the directories under `path` on the backend host
pub async fn browse(client: &CockpitClient, path: Option<&str>) -> Result<()> {
    let result = client.api().browse_directories(path).await?;
    println!("{}{}", result.current, if result.is_git_repo { " (git)" } else { "" });
    if let Some(parent) = &result.parent {
        println!("parent: {}", parent);
    }
    render::browse_table(&result).printstd();
    Ok(())
}
