//! Cockpit - remote control for agent sessions
//!
#![doc = "Cockpit - remote control for agent sessions"]
#![doc = "Main entry point for the cockpit command-line client."]

use anyhow::Result;

use cockpit::api::{CreateProjectRequest, UpdateProjectRequest};
use cockpit::cli::{
    AccountCommand, Cli, Commands, ProjectCommand, RepoCommand, SessionCommand, TemplateCommand,
};
use cockpit::client::CockpitClient;
use cockpit::commands;
use cockpit::config::Config;
use cockpit::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!(base_url = %config.server.base_url, "Configuration loaded");

    let client = CockpitClient::from_config(config)?;
    client.purge_stale_cache().await;

    match cli.command {
        Commands::Sessions { command } => match command {
            SessionCommand::List { json } => commands::sessions::list_sessions(&client, json).await,
            SessionCommand::Show { id, json } => {
                commands::sessions::show_session(&client, &id, json).await
            }
            SessionCommand::Create {
                project,
                name,
                account,
            } => commands::sessions::create_session(&client, project, name, account).await,
            SessionCommand::FromTemplate { template_id } => {
                commands::sessions::create_from_template(&client, &template_id).await
            }
            SessionCommand::Stop { id } => commands::sessions::stop_session(&client, &id).await,
            SessionCommand::Send { id, content } => {
                commands::sessions::send_message(&client, &id, &content).await
            }
            SessionCommand::Oneshot { id, content } => {
                commands::sessions::send_oneshot(&client, &id, &content).await
            }
        },
        Commands::Attach { session_id } => {
            tracing::info!("Attaching to session {}", session_id);
            commands::attach::run_attach(&client, &session_id).await
        }
        Commands::Auth { account_id } => commands::auth::authenticate(&client, &account_id).await,
        Commands::Accounts { command } => match command {
            AccountCommand::List { json } => commands::accounts::list_accounts(&client, json).await,
            AccountCommand::ResetLimit { id } => commands::accounts::reset_limit(&client, &id).await,
            AccountCommand::AuthStatus { id } => commands::accounts::auth_status(&client, &id).await,
            AccountCommand::Authenticate { id } => {
                commands::accounts::authenticate(&client, &id).await
            }
            AccountCommand::Confirm { id } => commands::accounts::confirm(&client, &id).await,
        },
        Commands::Projects { command } => match command {
            ProjectCommand::List { json } => commands::projects::list_projects(&client, json).await,
            ProjectCommand::Show { id } => commands::projects::show_project(&client, &id).await,
            ProjectCommand::Create {
                name,
                repo_path,
                description,
                color,
                icon,
            } => {
                let request = CreateProjectRequest {
                    name,
                    repo_path,
                    description,
                    color,
                    icon,
                };
                commands::projects::create_project(&client, request).await
            }
            ProjectCommand::Update {
                id,
                name,
                repo_path,
                description,
                color,
                icon,
            } => {
                let request = UpdateProjectRequest {
                    name,
                    repo_path,
                    description,
                    color,
                    icon,
                };
                commands::projects::update_project(&client, &id, request).await
            }
            ProjectCommand::Delete { id } => commands::projects::delete_project(&client, &id).await,
            ProjectCommand::Sessions { id } => {
                commands::projects::project_sessions(&client, &id).await
            }
        },
        Commands::Repos { command } => match command {
            RepoCommand::List => commands::repos::list_repos(&client).await,
            RepoCommand::Browse { path } => commands::repos::browse(&client, path.as_deref()).await,
        },
        Commands::Templates { command } => match command {
            TemplateCommand::List => commands::templates::list_templates(&client),
            TemplateCommand::Add {
                name,
                project,
                account,
                description,
            } => {
                commands::templates::add_template(&client, name, project, account, description)
                    .await
            }
            TemplateCommand::Remove { id } => commands::templates::remove_template(&client, &id),
        },
        Commands::Health => commands::watch::health(&client).await,
        Commands::Watch { cycles } => {
            tracing::info!("Starting refresh loop");
            commands::watch::run_watch(&client, cycles).await
        }
    }
}
