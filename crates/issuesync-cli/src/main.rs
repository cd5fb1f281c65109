use clap::{Parser, Subcommand};
use issuesync_cli::cmd;
use issuesync_cli::input::{self, MissingInputs, RawInputs};
use issuesync_core::config::{SyncConfig, WarnLevel};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "issuesync",
    about = "Keep Jira tickets in step with the GitHub issues assigned to the team",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML file overriding the built-in repository and Jira settings
    #[arg(long, global = true, env = "ISSUESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// GitHub API token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Jira API token
    #[arg(long, global = true, env = "JIRA_TOKEN", hide_env_values = true)]
    jira_token: Option<String>,

    /// YAML list of people and their account names
    #[arg(long, global = true, env = "PEOPLE", hide_env_values = true)]
    people: Option<String>,

    /// YAML map of team members keyed by kerberos
    #[arg(long, global = true, env = "TEAM", hide_env_values = true)]
    team: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Reconcile Jira tickets with GitHub issues (default)
    Sync,

    /// Show the team members and their account mapping
    Roster,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Sync);

    let default_level = match command {
        Commands::Sync => tracing::Level::INFO,
        Commands::Roster => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let raw = RawInputs {
        github_token: cli.github_token,
        jira_token: cli.jira_token,
        people: cli.people,
        team: cli.team,
    };

    let result = load_config(cli.config).and_then(|config| match command {
        Commands::Sync => match raw.into_sync() {
            Ok(inputs) => cmd::sync::run(&config, inputs, cli.json),
            Err(missing) => exit_missing(missing),
        },
        Commands::Roster => match raw.into_roster() {
            Ok(inputs) => cmd::roster::run(&inputs, cli.json),
            Err(missing) => exit_missing(missing),
        },
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<SyncConfig> {
    let config = SyncConfig::load(path.as_deref()).map_err(|e| match &path {
        Some(p) => anyhow::anyhow!("loading {}: {e}", p.display()),
        None => anyhow::anyhow!(e),
    })?;

    let mut invalid = Vec::new();
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Warning => tracing::warn!("{}", warning.message),
            WarnLevel::Error => invalid.push(warning.message),
        }
    }
    if !invalid.is_empty() {
        anyhow::bail!("invalid configuration: {}", invalid.join("; "));
    }
    Ok(config)
}

fn exit_missing(missing: MissingInputs) -> ! {
    for name in &missing.0 {
        tracing::error!("Required environment variable not found: {name}");
    }
    tracing::error!("Exiting.");
    std::process::exit(input::EX_USAGE);
}
