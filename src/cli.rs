//! Command-line interface definition for Cockpit
//!
//! This module defines the CLI structure using clap's derive API: session,
//! project, repository and account management against the backend, live
//! session streaming, and local session templates.

use clap::{Parser, Subcommand};

/// Cockpit - remote control for agent sessions
///
/// Lists and manages sessions on a session backend, streams a session's
/// terminal output and sends it messages.
#[derive(Parser, Debug, Clone)]
#[command(name = "cockpit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Backend base URL (overrides config and COCKPIT_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Cockpit
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage backend sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Stream a session's output and send it messages from stdin
    Attach {
        /// Session to attach to
        session_id: String,
    },

    /// Run the interactive authentication flow for an account
    Auth {
        /// Account to authenticate
        account_id: String,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Inspect repositories on the backend host
    Repos {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Manage local session templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Show backend health
    Health,

    /// Refresh sessions, accounts and projects periodically
    Watch {
        /// Stop after this many refresh cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List all sessions
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one session
    Show {
        /// Session id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Start a new session in a project
    Create {
        /// Project to start the session in
        #[arg(short, long)]
        project: String,

        /// Session name
        #[arg(short, long)]
        name: Option<String>,

        /// Account to run the session under
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Start a session from a saved template
    FromTemplate {
        /// Template id
        template_id: String,
    },

    /// Stop a session
    Stop {
        /// Session id
        id: String,
    },

    /// Send a message to a session
    Send {
        /// Session id
        id: String,

        /// Message text
        content: String,
    },

    /// Run a one-shot prompt and print its result
    Oneshot {
        /// Session id
        id: String,

        /// Prompt text
        content: String,
    },
}

/// Account subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// List all accounts
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Clear an account's rate limit
    ResetLimit {
        /// Account id
        id: String,
    },

    /// Show an account's authentication status
    AuthStatus {
        /// Account id
        id: String,
    },

    /// Start authentication for an account
    Authenticate {
        /// Account id
        id: String,
    },

    /// Confirm a completed authentication
    Confirm {
        /// Account id
        id: String,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommand {
    /// List all projects
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one project
    Show {
        /// Project id
        id: String,
    },

    /// Create a project for a repository
    Create {
        /// Project name
        #[arg(short, long)]
        name: String,

        /// Repository path on the backend host
        #[arg(short, long)]
        repo_path: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Display color
        #[arg(long)]
        color: Option<String>,

        /// Display icon
        #[arg(long)]
        icon: Option<String>,
    },

    /// Update a project's fields
    Update {
        /// Project id
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        repo_path: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a project
    Delete {
        /// Project id
        id: String,
    },

    /// List a project's sessions
    Sessions {
        /// Project id
        id: String,
    },
}

/// Repository subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RepoCommand {
    /// List known repositories
    List,

    /// Browse directories on the backend host
    Browse {
        /// Directory to list; defaults to the backend's root
        #[arg(short, long)]
        path: Option<String>,
    },
}

/// Template subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TemplateCommand {
    /// List saved templates
    List,

    /// Save a new template
    Add {
        /// Template name
        #[arg(short, long)]
        name: String,

        /// Project the template starts sessions in
        #[arg(short, long)]
        project: String,

        /// Account to run sessions under
        #[arg(short, long)]
        account: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a template
    Remove {
        /// Template id
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            base_url: None,
            verbose: false,
            command: Commands::Health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(cli.base_url.is_none());
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn test_cli_parse_sessions_list() {
        let cli = Cli::try_parse_from(["cockpit", "sessions", "list", "--json"]).unwrap();
        match cli.command {
            Commands::Sessions {
                command: SessionCommand::List { json },
            } => assert!(json),
            other => panic!("Expected sessions list, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_session_create() {
        let cli = Cli::try_parse_from([
            "cockpit", "sessions", "create", "--project", "p1", "--name", "fix tests",
        ])
        .unwrap();
        if let Commands::Sessions {
            command:
                SessionCommand::Create {
                    project,
                    name,
                    account,
                },
        } = cli.command
        {
            assert_eq!(project, "p1");
            assert_eq!(name, Some("fix tests".to_string()));
            assert_eq!(account, None);
        } else {
            panic!("Expected Create command");
        }
    }

    #[test]
    fn test_cli_parse_attach_with_global_flags() {
        let cli = Cli::try_parse_from([
            "cockpit",
            "--base-url",
            "http://backend:9000",
            "-v",
            "attach",
            "s1",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://backend:9000"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Attach { session_id } if session_id == "s1"));
    }

    #[test]
    fn test_cli_parse_account_reset_limit() {
        let cli = Cli::try_parse_from(["cockpit", "accounts", "reset-limit", "acc-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Accounts {
                command: AccountCommand::ResetLimit { id }
            } if id == "acc-1"
        ));
    }

    #[test]
    fn test_cli_parse_repos_browse() {
        let cli = Cli::try_parse_from(["cockpit", "repos", "browse", "--path", "/srv"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Repos {
                command: RepoCommand::Browse { path: Some(p) }
            } if p == "/srv"
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["cockpit"]).is_err());
    }

    #[test]
    fn test_cli_send_requires_content() {
        assert!(Cli::try_parse_from(["cockpit", "sessions", "send", "s1"]).is_err());
    }
}
