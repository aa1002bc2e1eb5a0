//! Account commands

use colored::Colorize;

use crate::api::AuthStatus;
use crate::client::CockpitClient;
use crate::commands::print_json;
use crate::error::Result;
use crate::render;

/// List all accounts
pub async fn list_accounts(client: &CockpitClient, json: bool) -> Result<()> {
    let accounts = client.api().list_accounts().await?;
    client.store().set_accounts(accounts.clone());

    if json {
        return print_json(&accounts);
    }
    if accounts.is_empty() {
        println!("No accounts");
        return Ok(());
    }
    render::accounts_table(&accounts).printstd();
    Ok(())
}

pub async fn reset_limit(client: &CockpitClient, id: &str) -> Result<()> {
    let response = client.api().reset_account_limit(id).await?;
    println!("Rate limit for {}: {}", id, response.status);
    Ok(())
}

pub async fn auth_status(client: &CockpitClient, id: &str) -> Result<()> {
    let status = client.api().auth_status(id).await?;
    let label = match status.status {
        AuthStatus::Authenticated => status.status.to_string().green(),
        _ => status.status.to_string().yellow(),
    };
    println!("{}: {}", status.account_id, label);
    if status.needs_reauth {
        println!("  re-authentication required");
    }
    if let Some(message) = &status.error_message {
        println!("  {}", message.red());
    }
    Ok(())
}

/// Ask the backend to start a login process for an account
///
/// The login itself runs over the auth stream; see `cockpit auth`.
pub async fn authenticate(client: &CockpitClient, id: &str) -> Result<()> {
    let response = client.api().start_authentication(id).await?;
    println!("{}: {}", response.account_id, response.status);
    if !response.message.is_empty() {
        println!("{}", response.message);
    }
    if let Some(instructions) = &response.instructions {
        println!("{}", instructions.dimmed());
    }
    Ok(())
}

pub async fn confirm(client: &CockpitClient, id: &str) -> Result<()> {
    let response = client.api().confirm_auth(id).await?;
    println!("{}: {}", response.account_id, response.status);
    Ok(())
}
