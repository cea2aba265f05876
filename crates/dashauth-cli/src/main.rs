//! dashauth - command-line login for the admin dashboard.
//!
//! Logs in against the dashboard's OAuth2 token endpoint, keeps the session
//! in the local storage scope, and hands the access token to other tools.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashauth_core::{AuthConfig, FileStorage, RegistrationProfile, SessionManager, Storage};

// ============================================================================
// Constants
// ============================================================================

/// Storage key remembering the last username, wiped along with the session
const LAST_USERNAME_KEY: &str = "last_username";

const USAGE: &str = "\
Usage: dashauth <command>

Commands:
  login [username]          Log in with username and password
  register <codigo> <email> Create an account (does not log in)
  refresh                   Renew the access token with the refresh token
  logout                    Drop the session and all local state
  status                    Show whether a session is stored
  token                     Print the current access token
  help                      Show this message

Configuration comes from ~/.config/dashauth/config.json and DASHAUTH_*
environment variables (a .env file is read if present).";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("help");
    if matches!(command, "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = AuthConfig::load().context("Failed to load configuration")?;
    let storage_dir = config.storage_dir()?;
    debug!(?storage_dir, "Storage directory configured");

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(storage_dir)?);
    let manager = SessionManager::new(config, storage.clone())?;

    match (command, &args[1..]) {
        ("login", rest) => login(&manager, storage.as_ref(), rest.first().cloned()).await,
        ("register", [codigo, email]) => register(&manager, codigo, email).await,
        ("register", _) => bail!("Usage: dashauth register <codigo> <email>"),
        ("refresh", []) => {
            manager.login_with_refresh_token().await?;
            println!("Session refreshed.");
            Ok(())
        }
        ("logout", []) => {
            manager.logout();
            println!("Logged out.");
            Ok(())
        }
        ("status", []) => {
            if manager.is_authenticated() {
                println!("Authenticated.");
            } else {
                println!("Not logged in.");
            }
            Ok(())
        }
        ("token", []) => match manager.access_token() {
            Some(token) => {
                println!("{}", token);
                Ok(())
            }
            None => bail!("Not logged in"),
        },
        _ => bail!("Unknown command: {}\n\n{}", args.join(" "), USAGE),
    }
}

async fn login(
    manager: &SessionManager,
    storage: &dyn Storage,
    username: Option<String>,
) -> Result<()> {
    let remembered = storage
        .get_item(LAST_USERNAME_KEY)
        .and_then(|raw| serde_json::from_str::<String>(&raw).ok());

    let username = match username {
        Some(username) => username,
        None => prompt_username(remembered.as_deref())?,
    };
    if username.is_empty() {
        bail!("Username required");
    }

    let password = prompt_password()?;
    if password.is_empty() {
        bail!("Password required");
    }

    println!("Authenticating...");
    manager
        .login_with_user_credentials(&username, &password)
        .await?;

    storage.set_item(LAST_USERNAME_KEY, &serde_json::to_string(&username)?)?;
    info!("Login complete");
    println!("Login successful!");
    Ok(())
}

async fn register(manager: &SessionManager, codigo: &str, email: &str) -> Result<()> {
    let password = prompt_password()?;
    if password.is_empty() {
        bail!("Password required");
    }

    let profile = RegistrationProfile {
        codigo: codigo.to_string(),
        email: email.to_string(),
        password,
    };
    let response = manager.register(&profile).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("Registration submitted. Log in with `dashauth login {}`.", email);
    Ok(())
}

fn prompt_username(remembered: Option<&str>) -> Result<String> {
    match remembered {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), remembered) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
