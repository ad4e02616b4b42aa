mod report;
mod store;

use std::cell::Cell;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use session_gate::api::{ApiClient, ApiError};
use session_gate::validator::HttpTokenValidator;
use session_gate::{
    ConfigError, Gate, GateConfig, Policy, Role, Session, SessionRecord, SessionStore, Ticket, TokenValidator,
    ValidationOutcome,
};

use crate::report::{CheckReport, IntrospectReport};
use crate::store::{FileSessionStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("session file error: {0}")]
    Store(#[from] StoreError),
    #[error("no complete session in {0}; run `gate-cli login` first")]
    NoSession(String),
    #[error("token must not be empty")]
    EmptyToken,
    #[error("role must not be empty")]
    EmptyRole,
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("gate evaluation was superseded")]
    Superseded,
    #[error("gate cleared the session but {0} still holds it")]
    SessionNotCleared(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Parser, Debug)]
#[command(name = "gate-cli", about = "Session gate checks against the dashboard API")]
struct Cli {
    #[arg(long, env = "GATE_SESSION_FILE", default_value = ".gate-session.json")]
    session_file: PathBuf,

    /// API base URL; overrides `GATE_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gate for a route path and print its decision.
    Check {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Validate the stored token once and print the outcome.
    Introspect {
        #[arg(long)]
        json: bool,
    },
    /// Fetch an API resource with the stored token. A 401 clears the session.
    Get { path: String },
    /// Store a session as the login page would.
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        role: String,
        #[arg(long, default_value = "{}")]
        user_data: String,
    },
    /// Remove the stored session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = apply_base_url(GateConfig::from_env()?, cli.base_url.as_deref());
    let store = FileSessionStore::new(cli.session_file);

    match cli.command {
        Command::Check { path, json } => {
            let validator = HttpTokenValidator::new(&config)?;
            let report = check_path(store.clone(), validator, &path).await?;
            print_report(&report, json, CheckReport::render_text)?;
            if report.session_cleared == Some(false) {
                return Err(CliError::SessionNotCleared(store.path().display().to_string()));
            }
            Ok(())
        }
        Command::Introspect { json } => {
            let validator = HttpTokenValidator::new(&config)?;
            let report = introspect(&store, &validator).await?;
            print_report(&report, json, IntrospectReport::render_text)
        }
        Command::Get { path } => {
            let revoker = Gate::new(store.clone(), HttpTokenValidator::new(&config)?);
            let client = ApiClient::new(&config, store)?;
            let value = fetch_resource(&client, &revoker, &path).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Login { token, role, user_data } => {
            let session = build_session(token, &role, user_data)?;
            store.save(&session)?;
            tracing::info!(path = %store.path().display(), role = %session.role, "session stored");
            Ok(())
        }
        Command::Logout => {
            store.remove()?;
            tracing::info!(path = %store.path().display(), "session removed");
            Ok(())
        }
    }
}

fn apply_base_url(config: GateConfig, base_url: Option<&str>) -> GateConfig {
    let Some(base_url) = base_url else {
        return config;
    };
    let rebased = GateConfig::for_base_url(base_url);
    GateConfig {
        api_base_url: rebased.api_base_url,
        introspection_url: rebased.introspection_url,
        ..config
    }
}

async fn check_path<S, V>(store: S, validator: V, path: &str) -> Result<CheckReport, CliError>
where
    S: SessionStore,
    V: TokenValidator,
{
    let Some(policy) = Policy::for_path(path) else {
        return Ok(CheckReport::public(path));
    };
    let gate =
        Gate::new(ClearWatch::new(store), validator).with_observer(|state| tracing::debug!(?state, "gate state"));
    let decision = gate
        .evaluate(policy, &Ticket::detached())
        .await
        .decision()
        .ok_or(CliError::Superseded)?;

    let mut report = CheckReport::decided(path, policy, &decision);
    let watch = gate.store();
    if watch.clear_requested.get() {
        report.session_cleared = Some(watch.inner.read().is_empty());
    }
    Ok(report)
}

/// Store adapter that remembers whether the gate asked for a clear, so the
/// result can be checked against what is actually left on disk.
struct ClearWatch<S> {
    inner: S,
    clear_requested: Cell<bool>,
}

impl<S> ClearWatch<S> {
    fn new(inner: S) -> Self {
        Self { inner, clear_requested: Cell::new(false) }
    }
}

impl<S: SessionStore> SessionStore for ClearWatch<S> {
    fn read(&self) -> SessionRecord {
        self.inner.read()
    }

    fn write(&self, session: &Session) {
        self.inner.write(session);
    }

    fn clear(&self) {
        self.clear_requested.set(true);
        self.inner.clear();
    }
}

async fn fetch_resource<S: SessionStore>(
    client: &ApiClient<S>,
    revoker: &dyn session_gate::RevocationHook,
    path: &str,
) -> Result<serde_json::Value, CliError> {
    Ok(client.get_json(path, revoker).await?)
}

async fn introspect<V: TokenValidator>(store: &FileSessionStore, validator: &V) -> Result<IntrospectReport, CliError> {
    let Some(session) = store.load()?.complete() else {
        return Err(CliError::NoSession(store.path().display().to_string()));
    };
    let outcome: ValidationOutcome = validator.validate(&session).await;
    Ok(IntrospectReport::from(&outcome))
}

fn build_session(token: String, role: &str, user_data: String) -> Result<Session, CliError> {
    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::EmptyToken);
    }
    let role = Role::new(role.trim()).ok_or(CliError::EmptyRole)?;
    serde_json::from_str::<serde_json::Value>(&user_data)?;
    Ok(Session { token, role, user_data })
}

fn print_report<T: serde::Serialize>(report: &T, json: bool, text: fn(&T) -> String) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", text(report));
    }
    Ok(())
}
