//! Trellis server binary.
//!
//! Reads `trellis.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the record API over HTTP behind Basic
//! authentication.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for a user's `password_hash`:
//!
//! ```
//! cargo run -p trellis-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use trellis_core::{catalog, schema::Registry, service::RecordService};
use trellis_server::{ServerConfig, auth::AuthState};
use trellis_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Trellis record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "trellis.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TRELLIS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Built-in catalog plus the configured entity types.
  let mut schemas = catalog::standard().context("catalog schemas")?;
  for entity in &server_cfg.entities {
    let schema = entity
      .to_schema()
      .with_context(|| format!("invalid entity {:?}", entity.name))?;
    schemas.push(schema);
  }
  let registry = Arc::new(Registry::new(schemas).context("schema registry")?);
  tracing::info!(entities = registry.len(), "registry built");

  // Open SQLite store; tables are created from the registry.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path, &registry)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let service = RecordService::new(
    Arc::clone(&store),
    registry,
    server_cfg.plan_limits(),
  );
  let auth_state = AuthState {
    users: Arc::new(server_cfg.users.clone()),
    store,
  };

  let app = trellis_server::app(service, auth_state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
