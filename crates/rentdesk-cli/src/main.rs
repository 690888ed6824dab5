//! Rentdesk CLI - a command-line host for the rentdesk session client.
//!
//! Signs in against the rentdesk API, keeps the session in the configured
//! credential store and issues authenticated calls. Expired access tokens
//! are refreshed transparently; when the session cannot be saved the user
//! is told to log in again.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rentdesk_core::auth::FileStorage;
use rentdesk_core::models::RegisterRequest;
use rentdesk_core::{AuthService, Config, CredentialBackend, SessionClient, SessionEvent, TerminationReason};

/// Directory for a rolling log file, in addition to stderr
const ENV_LOG_DIR: &str = "RENTDESK_LOG_DIR";

/// Non-interactive password source
const ENV_PASSWORD: &str = "RENTDESK_PASSWORD";

const USAGE: &str = "\
Usage: rentdesk <command>

Commands:
  login [email]       Sign in and store the session
  register <email>    Create an account and sign in
  logout              Forget the stored session
  whoami              Show the signed-in user
  status              Show whether a session is stored
  get <path>          Authenticated GET, prints the JSON response";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "rentdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load configuration")?;
    debug!(api = %config.api_base_url, backend = ?config.credential_backend, "Config loaded");

    let store = config
        .credential_store()
        .context("Failed to open credential store")?;
    let session = SessionClient::from_config(&config, store).context("Failed to create API client")?;
    let mut events = session.subscribe();
    let auth = AuthService::new(session);

    let result = match command.as_str() {
        "login" => login(&auth, args.get(1).map(String::as_str)).await,
        "register" => register(&auth, args.get(1).map(String::as_str)).await,
        "logout" => logout(&auth),
        "whoami" => whoami(&auth).await,
        "status" => status(&auth, &config),
        "get" => get(&auth, args.get(1).map(String::as_str)).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    };

    report_session_events(&mut events, &config);
    result
}

/// Tell the user about session changes that happened while the command ran.
/// This is where a browser shell would navigate to the login route.
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>, config: &Config) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Terminated(TerminationReason::LoggedOut) | SessionEvent::LoggedIn => {}
            SessionEvent::Refreshed => info!("Session refreshed"),
            SessionEvent::Terminated(reason) => {
                debug!(?reason, route = %config.login_route, "Session terminated");
                eprintln!("Your session has ended. Run `rentdesk login` to sign in again.");
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

async fn login(auth: &AuthService, email: Option<&str>) -> Result<()> {
    let email = match email {
        Some(email) => email.to_string(),
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }
    let password = read_password()?;

    let user = auth.login(&email, &password).await.context("Login failed")?;
    println!("Signed in as {}", user.display_name());
    Ok(())
}

async fn register(auth: &AuthService, email: Option<&str>) -> Result<()> {
    let Some(email) = email else {
        bail!("Usage: rentdesk register <email>");
    };
    let name = prompt("Name (optional): ")?;
    let company = prompt("Company (optional): ")?;
    let password = read_password()?;

    let request = RegisterRequest {
        email: email.to_string(),
        password,
        name: Some(name).filter(|n| !n.is_empty()),
        company_name: Some(company).filter(|c| !c.is_empty()),
    };
    let user = auth.register(&request).await.context("Registration failed")?;
    println!("Account created, signed in as {}", user.display_name());
    Ok(())
}

fn logout(auth: &AuthService) -> Result<()> {
    auth.logout().context("Failed to clear session")?;
    println!("Signed out");
    Ok(())
}

async fn whoami(auth: &AuthService) -> Result<()> {
    if !auth.is_logged_in() {
        bail!("Not signed in. Run `rentdesk login` first.");
    }
    let user = auth.current_user().await.context("Failed to fetch current user")?;
    println!("{} <{}>", user.display_name(), user.email);
    if let Some(role) = &user.role {
        println!("Role:    {}", role);
    }
    if let Some(company) = &user.company_id {
        println!("Company: {}", company);
    }
    Ok(())
}

fn status(auth: &AuthService, config: &Config) -> Result<()> {
    println!("API:     {}", config.api_base_url);
    println!("Backend: {:?}", config.credential_backend);
    if !auth.is_logged_in() {
        println!("Session: none");
        return Ok(());
    }
    println!("Session: stored");
    if config.credential_backend == CredentialBackend::File {
        let storage = FileStorage::new(&Config::session_dir()?);
        if let Some(saved_at) = storage.saved_at()? {
            println!("Updated: {}", saved_at.to_rfc3339());
        }
    }
    Ok(())
}

async fn get(auth: &AuthService, path: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        bail!("Usage: rentdesk get <path>");
    };
    let body: serde_json::Value = auth
        .api()
        .get(path)
        .await
        .with_context(|| format!("GET {} failed", path))?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
