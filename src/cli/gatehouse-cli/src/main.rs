//! Gatehouse CLI - Mint and verify confirmation codes, inspect roles.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_confirm::{confirmation_url, ConfirmationCodec};
use gatehouse_crypto::{keys::GENERATED_SECRET_LEN, random::generate_token, SecretKey};
use gatehouse_roles::{has_perm, role_decision, CallbackFactory, RoleHolder, RoleRegistry};

use crate::config::AppConfig;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(about = "Gatehouse - Signed confirmation codes and role permissions")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GATEHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Signing secret (overrides the configuration file)
    #[arg(long, env = "GATEHOUSE_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random signing secret
    Keygen,
    /// Confirmation codes
    Code {
        #[command(subcommand)]
        command: CodeCommands,
    },
    /// Role registry
    Roles {
        #[command(subcommand)]
        command: RolesCommands,
    },
    /// Permission checks
    Perm {
        #[command(subcommand)]
        command: PermCommands,
    },
}

#[derive(Subcommand)]
enum CodeCommands {
    /// Mint a code for an email address
    Mint {
        /// Recipient email address
        #[arg(long)]
        email: String,
        /// Data carried by the code
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Verify a code and print its contents
    Verify {
        /// The code, as found in the link
        code: String,
        /// Maximum age in seconds (defaults to links.max_age)
        #[arg(long)]
        max_age: Option<u64>,
    },
}

#[derive(Subcommand)]
enum RolesCommands {
    /// List configured roles
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PermCommands {
    /// Check whether a user with a role holds a permission
    Check {
        /// Role key
        #[arg(long)]
        role: String,
        /// Permission name, e.g. `accounts.view_user`
        #[arg(long)]
        perm: String,
        /// Evaluate as an inactive user
        #[arg(long)]
        inactive: bool,
        /// Evaluate as a superuser
        #[arg(long)]
        superuser: bool,
    },
}

/// Stand-in user for permission checks.
struct CheckedUser {
    role: String,
    active: bool,
    superuser: bool,
}

impl RoleHolder for CheckedUser {
    fn authorization_role(&self) -> &str {
        &self.role
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_superuser(&self) -> bool {
        self.superuser
    }
}

#[derive(Serialize)]
struct RoleRow<'a> {
    key: &'a str,
    title: &'a str,
    callback: bool,
    default: bool,
}

// ============================================================================
// Command Handlers
// ============================================================================

fn secret_key(cli_secret: Option<&str>, config: &AppConfig) -> Result<SecretKey> {
    let raw = cli_secret
        .or(config.secret_key.as_deref())
        .context("No secret key. Use --secret-key, GATEHOUSE_SECRET_KEY or secret_key in the config file")?;
    SecretKey::from_string(raw).context("Invalid secret key")
}

fn codec(cli_secret: Option<&str>, config: &AppConfig) -> Result<ConfirmationCodec> {
    let secret = secret_key(cli_secret, config)?;
    ConfirmationCodec::with_salt(&secret, &config.links.salt).context("Failed to create codec")
}

fn registry(config: &AppConfig) -> Result<RoleRegistry> {
    RoleRegistry::from_config(&config.roles, &CallbackFactory::with_builtins())
        .context("Invalid role configuration")
}

fn cmd_keygen() -> Result<()> {
    println!("{}", generate_token(GENERATED_SECRET_LEN));
    Ok(())
}

fn cmd_code_mint(codec: &ConfirmationCodec, config: &AppConfig, email: &str, payload: &str) -> Result<()> {
    let code = codec.encode(email, payload);

    match config.links.base_url()? {
        Some(base) => println!("{}", confirmation_url(&base, &code)?),
        None => println!("{code}"),
    }

    Ok(())
}

fn cmd_code_verify(codec: &ConfirmationCodec, code: &str, max_age: u64) -> Result<()> {
    let decoded = codec
        .decode(code, max_age)
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.code()))?;

    println!("Email:   {}", decoded.email);
    println!("Payload: {}", decoded.payload);

    Ok(())
}

fn cmd_roles_list(registry: &RoleRegistry, json: bool) -> Result<()> {
    let rows: Vec<RoleRow<'_>> = registry
        .roles()
        .map(|role| RoleRow {
            key: role.key(),
            title: role.title(),
            callback: role.callback().is_some(),
            default: role.key() == registry.default_key(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Roles:");
    for row in &rows {
        let marker = if row.default { " (default)" } else { "" };
        let callback = if row.callback { "" } else { " [no callback]" };
        println!("  {} - {}{}{}", row.key, row.title, marker, callback);
    }

    Ok(())
}

fn cmd_perm_check(registry: &RoleRegistry, user: &CheckedUser, perm: &str) -> Result<()> {
    if perm.is_empty() {
        bail!("Permission name cannot be empty");
    }
    if registry.resolve(&user.role).is_none() {
        tracing::warn!(role = %user.role, "Role is not configured");
    }

    let decision = role_decision(registry, user, perm, None);
    let granted = has_perm(registry, user, perm, None);

    println!("Role decision: {decision:?}");
    println!("{perm}: {}", if granted { "granted" } else { "denied" });

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let secret = cli.secret_key.as_deref();

    match cli.command {
        Commands::Keygen => cmd_keygen(),
        Commands::Code { command } => {
            let codec = codec(secret, &config)?;
            match command {
                CodeCommands::Mint { email, payload } => {
                    cmd_code_mint(&codec, &config, &email, &payload)
                },
                CodeCommands::Verify { code, max_age } => {
                    cmd_code_verify(&codec, &code, max_age.unwrap_or(config.links.max_age))
                },
            }
        },
        Commands::Roles { command } => match command {
            RolesCommands::List { json } => cmd_roles_list(&registry(&config)?, json),
        },
        Commands::Perm { command } => match command {
            PermCommands::Check {
                role,
                perm,
                inactive,
                superuser,
            } => {
                let user = CheckedUser {
                    role,
                    active: !inactive,
                    superuser,
                };
                cmd_perm_check(&registry(&config)?, &user, &perm)
            },
        },
    }
}
