//! Command-line front-end for the admin console core.
//!
//! Provides subcommands for working with the remote user directory:
//! - `login` / `logout` / `whoami` - session lifecycle
//! - `users list` - filtered, sorted, paginated listing
//! - `users show <id>` - single record
//! - `users create` / `users update <id>` / `users delete <id>` - writes
//!
//! This is a thin call-through to the library; all listing and session
//! logic lives in the core modules.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::api::UserApi;
use crate::config::Config;
use crate::listing::{ListingView, RoleFilter, SortDirection, SortKey};
use crate::models::{Role, UserPayload};
use crate::Console;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "rosterr")]
#[command(author, version, about = "Admin console for a remote user directory", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rosterr.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and persist the session
    Login {
        /// Account email
        email: String,
        /// Account password (can also be set via ROSTERR_PASSWORD env var)
        #[arg(long, env = "ROSTERR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the persisted session
    Logout,

    /// Show the currently authenticated user
    Whoami,

    /// User management commands
    #[command(subcommand)]
    Users(UsersCommands),
}

/// User management subcommands
#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List users with search, role filter, sort and pagination
    List {
        /// Search text matched against name and email
        #[arg(long)]
        search: Option<String>,
        /// Role filter: all, customer or admin
        #[arg(long, default_value = "all")]
        role: String,
        /// Sort key: name, email or role
        #[arg(long, default_value = "name")]
        sort: String,
        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Show a single user
    Show {
        /// User id
        id: i64,
    },

    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        avatar: String,
        /// Role: customer or admin
        #[arg(long, default_value = "customer")]
        role: String,
    },

    /// Update a user (unset fields keep their current value)
    Update {
        /// User id
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password (omit to keep the existing one)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        /// Role: customer or admin
        #[arg(long)]
        role: Option<String>,
    },

    /// Delete a user (asks for confirmation unless --yes)
    Delete {
        /// User id
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    let mut console = Console::from_config(config)?;

    match &cli.command {
        Commands::Login { email, password } => cmd_login(&mut console, email, password).await,
        Commands::Logout => cmd_logout(&mut console),
        Commands::Whoami => cmd_whoami(&mut console).await,
        Commands::Users(command) => {
            // Every user operation runs against an established session.
            restore_or_bail(&mut console).await?;
            match command {
                UsersCommands::List {
                    search,
                    role,
                    sort,
                    desc,
                    page,
                } => cmd_users_list(&mut console, search.as_deref(), role, sort, *desc, *page).await,
                UsersCommands::Show { id } => cmd_users_show(&console, *id).await,
                UsersCommands::Create {
                    name,
                    email,
                    password,
                    avatar,
                    role,
                } => cmd_users_create(&mut console, name, email, password, avatar, role).await,
                UsersCommands::Update {
                    id,
                    name,
                    email,
                    password,
                    avatar,
                    role,
                } => {
                    cmd_users_update(
                        &mut console,
                        *id,
                        name.as_deref(),
                        email.as_deref(),
                        password.as_deref(),
                        avatar.as_deref(),
                        role.as_deref(),
                    )
                    .await
                }
                UsersCommands::Delete { id, yes } => cmd_users_delete(&mut console, *id, *yes).await,
            }
        }
    }
}

async fn restore_or_bail(console: &mut Console) -> Result<()> {
    if let Err(e) = console.session.restore(&console.client).await {
        bail!("Session expired ({}). Run `rosterr login` again.", e.message);
    }
    if !console.session.is_authenticated() {
        bail!("Not logged in. Run `rosterr login <email>` first.");
    }
    Ok(())
}

async fn cmd_login(console: &mut Console, email: &str, password: &str) -> Result<()> {
    match console.session.login(&console.client, email, password).await {
        Ok(user) => {
            println!("Logged in as {} <{}> ({})", user.name, user.email, user.role);
            Ok(())
        }
        Err(e) => bail!("Login failed: {}", e.message),
    }
}

fn cmd_logout(console: &mut Console) -> Result<()> {
    console.session.logout();
    println!("Logged out");
    Ok(())
}

async fn cmd_whoami(console: &mut Console) -> Result<()> {
    if let Err(e) = console.session.restore(&console.client).await {
        bail!("Session expired ({})", e.message);
    }

    match console.session.user() {
        Some(user) => {
            println!("{} <{}> ({})", user.name, user.email, user.role);
            Ok(())
        }
        None => {
            println!("Not logged in");
            Ok(())
        }
    }
}

async fn cmd_users_list(
    console: &mut Console,
    search: Option<&str>,
    role: &str,
    sort: &str,
    desc: bool,
    page: usize,
) -> Result<()> {
    let role_filter: RoleFilter = role.parse().map_err(anyhow::Error::msg)?;
    let sort_key: SortKey = sort.parse().map_err(anyhow::Error::msg)?;
    let direction = if desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };

    {
        let query = console.directory.query_mut();
        if let Some(search) = search {
            query.set_search(search);
        }
        query.set_role_filter(role_filter);
        query.set_sort(sort_key, direction);
        query.set_page(page);
    }

    console
        .directory
        .reload(&console.client)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load users: {}", e.message))?;

    print_listing(&console.directory.view());
    Ok(())
}

async fn cmd_users_show(console: &Console, id: i64) -> Result<()> {
    let user = console
        .client
        .fetch_user(id)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.message))?;

    println!("ID:     {}", user.id);
    println!("Name:   {}", user.name);
    println!("Email:  {}", user.email);
    println!("Role:   {}", user.role);
    println!("Avatar: {}", user.avatar_url);
    Ok(())
}

async fn cmd_users_create(
    console: &mut Console,
    name: &str,
    email: &str,
    password: &str,
    avatar: &str,
    role: &str,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let payload = UserPayload {
        name: name.to_string(),
        email: email.to_string(),
        password: None,
        avatar_url: avatar.to_string(),
        role,
    }
    .with_password(password);

    if payload.password.is_none() {
        bail!("A password is required when creating a user");
    }

    let user = console
        .directory
        .create(&console.client, &payload)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create user: {}", e.message))?;

    println!("Created user {} (id {})", user.name, user.id);
    Ok(())
}

async fn cmd_users_update(
    console: &mut Console,
    id: i64,
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    avatar: Option<&str>,
    role: Option<&str>,
) -> Result<()> {
    // Load the current record so unset flags keep their value; a blank
    // password keeps the existing one.
    let current = console
        .client
        .fetch_user(id)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.message))?;

    let mut payload = UserPayload::from_record(&current);
    if let Some(name) = name {
        payload.name = name.to_string();
    }
    if let Some(email) = email {
        payload.email = email.to_string();
    }
    if let Some(avatar) = avatar {
        payload.avatar_url = avatar.to_string();
    }
    if let Some(role) = role {
        payload.role = role.parse().map_err(anyhow::Error::msg)?;
    }
    if let Some(password) = password {
        payload = payload.with_password(password);
    }

    let user = console
        .directory
        .update(&console.client, id, &payload)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update user: {}", e.message))?;

    println!("Updated user {} (id {})", user.name, user.id);
    Ok(())
}

async fn cmd_users_delete(console: &mut Console, id: i64, yes: bool) -> Result<()> {
    console
        .directory
        .reload(&console.client)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load users: {}", e.message))?;

    if !console.directory.request_delete(id) {
        bail!("No user with id {}", id);
    }

    let target = console
        .directory
        .records()
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.name.clone())
        .unwrap_or_default();

    if !yes && !confirm(&format!("Delete user \"{}\" (id {})?", target, id))? {
        console.directory.cancel_delete();
        println!("Cancelled");
        return Ok(());
    }

    match console.directory.confirm_delete(&console.client).await {
        Ok(true) => {
            println!("Deleted user {} (id {})", target, id);
            Ok(())
        }
        Ok(false) => {
            println!("Nothing to delete");
            Ok(())
        }
        Err(e) => bail!("Failed to delete user: {}", e.message),
    }
}

/// Ask a yes/no question on stdin; defaults to no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_listing(view: &ListingView) {
    if view.total_matched == 0 {
        println!("No users found");
        return;
    }

    println!(
        "{:<6} {:<24} {:<32} {:<8}",
        "ID", "NAME", "EMAIL", "ROLE"
    );
    for user in &view.rows {
        println!(
            "{:<6} {:<24} {:<32} {:<8}",
            user.id, user.name, user.email, user.role
        );
    }

    println!();
    println!(
        "Page {}/{} ({} matching users)",
        view.current_page, view.total_pages, view.total_matched
    );
}
