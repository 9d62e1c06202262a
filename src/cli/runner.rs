//! CLI runner - executes commands

use crate::cli::commands::{parse_stream_list, Cli, Commands};
use crate::config::TapConfig;
use crate::connectors::{get_builtin, list_builtin};
use crate::engine::{SyncConfig, SyncEngine};
use crate::error::Result;
use crate::http::HttpClient;
use crate::loader::{load_catalog, load_catalog_from_str, Catalog};
use crate::output::{JsonLinesSink, Message};
use crate::state::StateManager;
use serde_json::{json, Value};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    ///
    /// Returns `ExitCode::FAILURE` when a sync finished with failed units.
    pub async fn run(&self) -> Result<ExitCode> {
        match &self.cli.command {
            Commands::Discover => self.discover().map(|()| ExitCode::SUCCESS),
            Commands::Sync { streams } => self.sync(streams.as_deref()).await,
            Commands::Validate => self.validate().map(|()| ExitCode::SUCCESS),
            Commands::List => self.list_catalogs().map(|()| ExitCode::SUCCESS),
        }
    }

    /// Load the catalog named by `--catalog`
    fn load_catalog(&self) -> Result<Catalog> {
        load_catalog(&self.cli.catalog)
    }

    /// Load configuration; inline JSON takes precedence over the file
    fn load_config(&self) -> Result<TapConfig> {
        TapConfig::load(self.cli.config.as_deref(), self.cli.config_json.as_deref())
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Discover streams
    fn discover(&self) -> Result<()> {
        let catalog = self.load_catalog()?;

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": {
                "name": catalog.name,
                "version": catalog.version,
                "streams": catalog.discover(),
            }
        }));

        Ok(())
    }

    /// Sync the selected streams
    async fn sync(&self, streams: Option<&str>) -> Result<ExitCode> {
        let config = self.load_config()?;
        let catalog = self.load_catalog()?;
        let state = self.load_state()?;
        let selection = streams.map(parse_stream_list).filter(|s| !s.is_empty());

        let client = HttpClient::with_auth(config.http_config(), config.auth_config())?;
        let sink = Arc::new(JsonLinesSink::stdout());
        let engine = SyncEngine::new(Arc::new(client), Arc::new(state.clone()), sink.clone())
            .with_config(SyncConfig::from(&config));

        info!(
            catalog = %catalog.name,
            streams = ?selection,
            state = ?self.cli.state,
            "Starting sync"
        );

        let summary = engine.sync(&catalog, selection.as_deref()).await?;

        if let Err(e) = state.save().await {
            warn!(error = %e, "Failed to save final state");
        }
        sink.write_message(&Message::state(state.to_value().await?))?;
        sink.write_message(&Message::summary(&summary)?)?;

        info!(
            status = summary.status,
            records = summary.stats.records_synced,
            failed = summary.failed,
            truncated = summary.truncated,
            duration_ms = summary.stats.duration_ms,
            "Sync finished"
        );

        Ok(if summary.has_failures() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }

    /// Validate the catalog, and the config when one was supplied
    fn validate(&self) -> Result<()> {
        let catalog = self.load_catalog()?;

        let config_checked = if self.cli.config.is_some() || self.cli.config_json.is_some() {
            self.load_config()?;
            true
        } else {
            false
        };

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Catalog '{}' v{} is valid with {} streams{}",
                    catalog.name,
                    catalog.version,
                    catalog.streams.len(),
                    if config_checked { "; config is valid" } else { "" }
                )
            }
        }));

        Ok(())
    }

    /// List built-in catalogs
    fn list_catalogs(&self) -> Result<()> {
        let mut catalogs = Vec::new();
        for name in list_builtin() {
            let Some(yaml) = get_builtin(name) else {
                continue;
            };
            let catalog = load_catalog_from_str(yaml)?;
            catalogs.push(json!({
                "name": name,
                "version": catalog.version,
                "description": catalog.description,
                "streams": catalog.names(),
            }));
        }

        self.output_message(&json!({
            "type": "CATALOGS",
            "catalogs": catalogs
        }));

        Ok(())
    }

    /// Print a protocol message to stdout
    fn output_message(&self, msg: &Value) {
        println!("{msg}");
    }
}
