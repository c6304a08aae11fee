//! CLI command implementations
//!
//! `serve` boots the HTTP API; the other commands run offline against the
//! configured data file and print one JSON document.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::auth::{Identity, JwtManager, Role};
use crate::catalog::{CatalogLookup, GoogleBooksLookup};
use crate::config::Config;
use crate::http_server::{AppState, HttpServer};
use crate::ids::UserId;
use crate::library::Library;
use crate::observability::{init_logging, Event};
use crate::store::{InMemoryStore, StoreSnapshot};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::CheckConfig { config } => check_config(&config),
        Command::Report { config } => report(&config),
        Command::Reconcile { config } => reconcile(&config),
        Command::IssueToken {
            config,
            user,
            name,
            role,
        } => issue_token(&config, user.map(UserId::from), name, role),
    }
}

/// Load the configuration and install logging
fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    init_logging(config.log_format);
    tracing::info!(
        event = %Event::ConfigLoaded,
        path = %config_path.display(),
        "configuration loaded"
    );
    Ok(config)
}

/// Open the store, restoring the data file when one is configured
pub fn open_store(config: &Config) -> CliResult<Arc<InMemoryStore>> {
    let Some(path) = config.data_file.as_deref() else {
        return Ok(Arc::new(InMemoryStore::new()));
    };

    match StoreSnapshot::load(path)? {
        Some(snapshot) => {
            let books = snapshot.books.len();
            let borrowings = snapshot.borrowings.len();
            let store = InMemoryStore::from_snapshot(snapshot)?;
            tracing::info!(
                event = %Event::SnapshotLoaded,
                path = %path.display(),
                books,
                borrowings,
                "data file loaded"
            );
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(path = %path.display(), "no data file yet; starting empty");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Write the store back to the data file, if one is configured
pub fn save_store(store: &InMemoryStore, config: &Config) -> CliResult<()> {
    let Some(path) = config.data_file.as_deref() else {
        return Ok(());
    };

    store.snapshot()?.save(path)?;
    tracing::info!(event = %Event::SnapshotSaved, path = %path.display(), "data file saved");
    Ok(())
}

/// Start the HTTP API and block until Ctrl-C
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let library = Arc::new(Library::new(store.clone(), &config.library));
    let identity = Arc::new(JwtManager::new(config.auth.jwt_config()));

    let lookup: Option<Arc<dyn CatalogLookup>> = if config.lookup.enabled {
        let google = GoogleBooksLookup::new(config.lookup.base_url.clone(), config.lookup.timeout())
            .map_err(|e| CliError::boot_failed(e.to_string()))?;
        Some(Arc::new(google))
    } else {
        None
    };

    let state = Arc::new(AppState::new(library, identity, lookup));
    let server = HttpServer::with_config(config.server.clone(), state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let saver = config
            .snapshot_interval()
            .map(|every| tokio::spawn(autosave(store.clone(), config.clone(), every)));

        let served = server.start(shutdown_signal()).await;
        if let Some(saver) = saver {
            saver.abort();
        }
        served
    })
    .map_err(|e| CliError::boot_failed(format!("HTTP server error: {}", e)))?;

    save_store(&store, &config)
}

/// Rewrite the data file every `every` until the task is aborted
async fn autosave(store: Arc<InMemoryStore>, config: Config, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; the store was just loaded
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let store = store.clone();
        let config = config.clone();
        match tokio::task::spawn_blocking(move || save_store(&store, &config)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "periodic data file save failed"),
            Err(e) => tracing::warn!(error = %e, "periodic data file save panicked"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Validate the configuration file
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    write_json(&json!({
        "valid": true,
        "listen": config.server.socket_addr(),
        "data_file": config.data_file,
        "lookup_enabled": config.lookup.enabled,
    }))
}

/// Print the staff report for the data file
pub fn report(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let library = Library::new(store, &config.library);
    write_json(&library.report()?)
}

/// Repair availability counters in the data file
pub fn reconcile(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let library = Library::new(store.clone(), &config.library);

    let corrections = library.reconcile_all()?;
    if !corrections.is_empty() {
        save_store(&store, &config)?;
    }
    write_json(&corrections)
}

/// Sign a developer token
pub fn issue_token(
    config_path: &Path,
    user: Option<UserId>,
    name: String,
    role: Role,
) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let identity = Identity {
        user_id: user.unwrap_or_else(UserId::new_random),
        name,
        role,
    };
    let token = JwtManager::new(config.auth.jwt_config()).issue_token(&identity)?;
    write_json(&json!({
        "token": token,
        "user_id": identity.user_id,
        "role": identity.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BookMetadata;
    use crate::ledger::Availability;
    use crate::store::LibraryStore;
    use chrono::Utc;
    use tempfile::TempDir;

    fn config_with_data_file(dir: &TempDir) -> Config {
        let mut config = Config::with_secret("0123456789abcdef0123456789abcdef");
        config.data_file = Some(dir.path().join("library.json"));
        config
    }

    #[test]
    fn test_open_store_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = config_with_data_file(&dir);
        let store = open_store(&config).unwrap();
        assert!(store.list_books().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_open_round_trips() {
        let dir = TempDir::new().unwrap();
        let config = config_with_data_file(&dir);

        let store = open_store(&config).unwrap();
        store
            .insert_book(
                BookMetadata::new("9780132350884", "Clean Code"),
                Availability::new(2),
                Utc::now(),
            )
            .unwrap();
        save_store(&store, &config).unwrap();

        let reopened = open_store(&config).unwrap();
        assert_eq!(reopened.list_books().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_autosave_writes_while_running() {
        let dir = TempDir::new().unwrap();
        let config = config_with_data_file(&dir);
        let store = open_store(&config).unwrap();

        let saver = tokio::spawn(autosave(
            store.clone(),
            config.clone(),
            Duration::from_millis(20),
        ));
        store
            .insert_book(
                BookMetadata::new("9780132350884", "Clean Code"),
                Availability::new(2),
                Utc::now(),
            )
            .unwrap();

        let mut saved = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            saved = open_store(&config).unwrap().list_books().unwrap().len();
            if saved == 1 {
                break;
            }
        }
        saver.abort();
        assert_eq!(saved, 1);
    }
}
