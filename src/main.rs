//! vars-migrator - copy GitHub Actions variables between accounts.
//!
//! Migrates organization variables, repository variables (with their
//! deployment environments) or the variables of a single environment.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vars_migrator::credentials::{self, gh_cli_token, TokenInputs};
use vars_migrator::{
    api_base_url, CapabilitySet, ConfigError, Error, GitHubClient, MigrationConfig,
    MigrationMode, Migrator, RepoRef, VariableScope, Visibility,
};

/// Migrate GitHub Actions variables between organizations, repositories and environments
#[derive(Parser)]
#[command(name = "vars-migrator")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    migrate: MigrateArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate variables (default)
    Migrate(MigrateArgs),

    /// List the variables of an organization or repository
    List(ListArgs),

    /// Verify a credential and its access to organizations
    Auth(AuthArgs),
}

#[derive(Args, Debug, Clone)]
struct MigrateArgs {
    /// Source organization (owner of the source repository)
    #[arg(long, env = "SOURCE_ORG")]
    source_org: Option<String>,

    /// Source repository name
    #[arg(long, env = "SOURCE_REPO")]
    source_repo: Option<String>,

    /// Source environment name
    #[arg(long, env = "SOURCE_ENV")]
    source_env: Option<String>,

    /// Source personal access token
    #[arg(long, env = "SOURCE_PAT", hide_env_values = true)]
    source_pat: Option<String>,

    /// Source host (github.com, <name>.ghe.com or an enterprise server)
    #[arg(long, env = "SOURCE_HOSTNAME")]
    source_hostname: Option<String>,

    /// Target organization (owner of the target repository)
    #[arg(long, env = "TARGET_ORG")]
    target_org: Option<String>,

    /// Target repository name
    #[arg(long, env = "TARGET_REPO")]
    target_repo: Option<String>,

    /// Target environment name
    #[arg(long, env = "TARGET_ENV")]
    target_env: Option<String>,

    /// Target personal access token
    #[arg(long, env = "TARGET_PAT", hide_env_values = true)]
    target_pat: Option<String>,

    /// Target host (github.com, <name>.ghe.com or an enterprise server)
    #[arg(long, env = "TARGET_HOSTNAME")]
    target_hostname: Option<String>,

    /// Migrate organization variables
    #[arg(long, env = "ORG_TO_ORG")]
    org_to_org: bool,

    /// Skip environments during repository migration
    #[arg(long, env = "SKIP_ENVS")]
    skip_envs: bool,

    /// Visibility for every migrated organization variable (all or private)
    #[arg(long, env = "ORG_VISIBILITY")]
    org_visibility: Option<Visibility>,

    /// Preview changes without applying them
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Overwrite variables that already exist in the target
    #[arg(long, env = "FORCE")]
    force: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Organization (owner of the repository)
    #[arg(long)]
    org: String,

    /// Repository name; lists organization variables when omitted
    #[arg(long)]
    repo: Option<String>,

    /// Personal access token
    #[arg(long, hide_env_values = true)]
    pat: Option<String>,

    /// Host (github.com, <name>.ghe.com or an enterprise server)
    #[arg(long)]
    hostname: Option<String>,
}

#[derive(Args, Debug)]
struct AuthArgs {
    /// Organizations to check access to
    #[arg(long = "check-org")]
    check_org: Vec<String>,

    /// Personal access token
    #[arg(long, hide_env_values = true)]
    pat: Option<String>,

    /// Host (github.com, <name>.ghe.com or an enterprise server)
    #[arg(long)]
    hostname: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file; real variables win
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "vars_migrator=debug"
    } else {
        "vars_migrator=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let outcome = match cli.command {
        Some(Commands::Migrate(args)) => migrate(args).await,
        Some(Commands::List(args)) => list(args).await,
        Some(Commands::Auth(args)) => auth(args).await,
        None => migrate(cli.migrate).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn shared_token() -> Option<String> {
    env::var("GITHUB_TOKEN").ok()
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Detect the migration mode from the flags.
///
/// `--org-to-org` selects organization mode, both environment flags select
/// environment mode, anything else is repository mode.
fn detect_mode(args: &MigrateArgs) -> Result<MigrationMode, ConfigError> {
    let source_org = args.source_org.clone().unwrap_or_default();
    let target_org = args.target_org.clone().unwrap_or_default();
    let source_env = non_empty(args.source_env.as_ref());
    let target_env = non_empty(args.target_env.as_ref());

    if args.org_to_org {
        if source_env.is_some() || target_env.is_some() {
            return Err(ConfigError::InvalidFlags(
                "cannot use --org-to-org with environment flags (--source-env, --target-env)"
                    .to_string(),
            ));
        }
        return Ok(MigrationMode::OrgToOrg {
            source_org,
            target_org,
            visibility_override: args.org_visibility,
        });
    }

    if args.org_visibility.is_some() {
        return Err(ConfigError::InvalidFlags(
            "--org-visibility requires --org-to-org".to_string(),
        ));
    }

    let source_repo = args.source_repo.clone().unwrap_or_default();
    match (source_env, target_env) {
        (Some(source_env), Some(target_env)) => {
            // Target coordinates default to the source repository
            let target_org = non_empty(args.target_org.as_ref())
                .map_or_else(|| source_org.clone(), String::from);
            let target_repo = non_empty(args.target_repo.as_ref())
                .map_or_else(|| source_repo.clone(), String::from);
            Ok(MigrationMode::EnvToEnv {
                source: RepoRef::new(source_org, source_repo),
                source_env: source_env.to_string(),
                target: RepoRef::new(target_org, target_repo),
                target_env: target_env.to_string(),
            })
        }
        (None, None) => Ok(MigrationMode::RepoToRepo {
            source: RepoRef::new(source_org, source_repo),
            target: RepoRef::new(target_org, args.target_repo.clone().unwrap_or_default()),
            skip_environments: args.skip_envs,
        }),
        _ => Err(ConfigError::InvalidFlags(
            "--source-env and --target-env must be given together".to_string(),
        )),
    }
}

async fn migrate(args: MigrateArgs) -> Result<ExitCode, Error> {
    let config = MigrationConfig::new(detect_mode(&args)?, args.dry_run, args.force)?;

    let inputs = TokenInputs {
        source_pat: args.source_pat.clone(),
        target_pat: args.target_pat.clone(),
        shared: shared_token(),
    };
    let (source_credential, target_credential) = credentials::resolve_tokens(
        &inputs,
        args.source_hostname.as_deref(),
        args.target_hostname.as_deref(),
        gh_cli_token,
    )?;

    let source_url = api_base_url(args.source_hostname.as_deref());
    let target_url = api_base_url(args.target_hostname.as_deref());
    info!(side = "source", credential = %source_credential.label, host = %source_url, "Using credential");
    info!(side = "target", credential = %target_credential.label, host = %target_url, "Using credential");
    info!(dry_run = config.dry_run(), force = config.force(), "{}", config.description());

    let source = GitHubClient::new(&source_credential.token, Some(&source_url), None, None)?;
    let target = GitHubClient::new(&target_credential.token, Some(&target_url), None, None)?;

    let result = Migrator::new(config, Arc::new(source), Arc::new(target))
        .run()
        .await?;

    if result.has_failures() {
        error!(
            failed = result.failures.len(),
            "Migration completed with {} error(s)",
            result.failures.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    info!("Migration completed successfully!");
    Ok(ExitCode::SUCCESS)
}

fn single_client(pat: Option<&String>, hostname: Option<&str>) -> Result<GitHubClient, Error> {
    let shared = shared_token();
    let credential = credentials::resolve_single(pat, shared.as_ref(), hostname, gh_cli_token)?;
    let base_url = api_base_url(hostname);
    info!(credential = %credential.label, host = %base_url, "Using credential");
    GitHubClient::new(&credential.token, Some(&base_url), None, None)
}

async fn list(args: ListArgs) -> Result<ExitCode, Error> {
    let client = single_client(args.pat.as_ref(), args.hostname.as_deref())?;

    let scope = match &args.repo {
        Some(repo) => VariableScope::Repository(RepoRef::new(&args.org, repo)),
        None => VariableScope::organization(&args.org),
    };

    client.transport().wait_for_rate_limit().await;
    let variables = client.variables().list(&scope).await?;
    info!(count = variables.len(), "Variables in {scope}");

    for variable in &variables {
        let updated = variable
            .updated_at
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        match variable.visibility {
            Some(visibility) => println!("{}\t{visibility}\t{updated}", variable.name),
            None => println!("{}\t{updated}", variable.name),
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn auth(args: AuthArgs) -> Result<ExitCode, Error> {
    let client = single_client(args.pat.as_ref(), args.hostname.as_deref())?;

    let (user, scopes) = client.users().current().await?;
    info!(login = %user.login, "Authenticated as: {}", user.login);
    match &scopes {
        CapabilitySet::Known(granted) => info!(scopes = %granted.join(", "), "Token scopes"),
        CapabilitySet::Unknown => info!("Token does not expose scopes"),
    }

    let mut ok = true;
    for org in &args.check_org {
        match client.repos().check_org_access(org).await {
            Ok(()) => info!(org = %org, "Organization is accessible"),
            Err(e) => {
                warn!(org = %org, error = %e, "Cannot access organization");
                ok = false;
            }
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
