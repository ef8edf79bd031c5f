//! fitcard command-line client
//!
//! Talks to the fitcard backend with a persisted login:
//! 1. `login` / `register` store the issued token pair
//! 2. `get` sends authenticated requests, refreshing the token on a 401
//! 3. `logout` clears the stored tokens
//!
//! Logs go to stderr as JSON; command output goes to stdout.

mod config;
mod error;
mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_api::AuthApi;
use common::Secret;
use token_authenticator::{AuthenticatedClient, TokenAuthenticator, ensure_success};
use token_store::{FileTokenStore, TokenStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::USAGE;
use crate::session::Session;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        surname: String,
        email: String,
        password: String,
    },
    Logout,
    Status,
    Get {
        path: String,
    },
    Help,
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    config: Option<String>,
    command: Command,
}

/// Parse arguments (program name excluded).
fn parse_args(args: &[String]) -> error::Result<Cli> {
    let mut config = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or(error::Error::MissingConfigPath)?;
                config = Some(path.clone());
            }
            "-h" | "--help" => positional.insert(0, "help".to_string()),
            a if a.starts_with("--") => return Err(error::Error::UnknownOption(a.to_string())),
            _ => positional.push(arg.clone()),
        }
    }

    let Some((name, rest)) = positional.split_first() else {
        return Err(error::Error::MissingCommand);
    };

    let arity = |command: &'static str, expected: usize| {
        if rest.len() == expected {
            Ok(())
        } else {
            Err(error::Error::WrongArity {
                command,
                expected,
                got: rest.len(),
            })
        }
    };

    let command = match name.as_str() {
        "login" => {
            arity("login", 2)?;
            Command::Login {
                email: rest[0].clone(),
                password: rest[1].clone(),
            }
        }
        "register" => {
            arity("register", 4)?;
            Command::Register {
                name: rest[0].clone(),
                surname: rest[1].clone(),
                email: rest[2].clone(),
                password: rest[3].clone(),
            }
        }
        "logout" => {
            arity("logout", 0)?;
            Command::Logout
        }
        "status" => {
            arity("status", 0)?;
            Command::Status
        }
        "get" => {
            arity("get", 1)?;
            Command::Get {
                path: rest[0].clone(),
            }
        }
        "help" => Command::Help,
        other => return Err(error::Error::UnknownCommand(other.to_string())),
    };

    Ok(Cli { config, command })
}

/// Everything a command needs, built once per invocation.
///
/// The authenticator inside `client` is the only one in the process, so all
/// requests share its refresh lock.
struct App {
    session: Session,
    client: AuthenticatedClient,
}

impl App {
    async fn build(config: &Config) -> Result<Self> {
        let store: Arc<dyn TokenStore> = Arc::new(
            FileTokenStore::load(config.auth.token_file.clone())
                .await
                .with_context(|| {
                    format!(
                        "failed to open token file {}",
                        config.auth.token_file.display()
                    )
                })?,
        );

        let http = reqwest::Client::builder()
            .connect_timeout(config.api.connect_timeout())
            .timeout(config.api.timeout())
            .build()
            .context("failed to build HTTP client")?;

        // Refresh goes through a client with no authenticator attached
        let api = AuthApi::new(http.clone(), &config.api.base_url)?;
        let authenticator = Arc::new(
            TokenAuthenticator::new(store.clone(), Arc::new(api.clone()))
                .with_max_response_count(config.auth.max_attempts),
        );
        let client =
            AuthenticatedClient::new(http, &config.api.base_url, store.clone(), authenticator)?;

        Ok(Self {
            session: Session::new(api, store),
            client,
        })
    }

    /// Run one command, returning what to print on stdout.
    async fn run(&self, command: Command) -> Result<String> {
        match command {
            Command::Login { email, password } => {
                let user = self.session.login(&email, Secret::from(password)).await?;
                Ok(format!("logged in as {} <{}>", user.name, user.email))
            }
            Command::Register {
                name,
                surname,
                email,
                password,
            } => {
                let user = self
                    .session
                    .register(&name, &surname, &email, Secret::from(password))
                    .await?;
                Ok(format!("registered {} <{}>", user.name, user.email))
            }
            Command::Logout => {
                self.session.logout().await?;
                Ok("logged out".into())
            }
            Command::Status => Ok(if self.session.is_logged_in().await {
                "logged in".into()
            } else {
                "logged out".into()
            }),
            Command::Get { path } => {
                let response = ensure_success(self.client.get(&path).await?).await?;
                let body = response
                    .text()
                    .await
                    .map_err(|e| auth_api::Error::from_reqwest(&e))?;
                Ok(body)
            }
            Command::Help => Ok(USAGE.into()),
        }
    }
}

fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(default_log_level())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let (config, config_path) =
        Config::resolve(cli.config.as_deref()).context("failed to load config")?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no config file found, using defaults"),
    }
    debug!(
        base_url = %config.api.base_url,
        token_file = %config.auth.token_file.display(),
        max_attempts = config.auth.max_attempts,
        "effective configuration"
    );

    let app = App::build(&config).await?;
    let output = app.run(cli.command).await?;
    println!("{output}");
    Ok(())
}
