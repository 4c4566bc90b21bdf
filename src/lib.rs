pub mod assets;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod engine;
pub mod providers;
pub mod selection;
pub mod store;

use crate::assets::{AssetResolver, HttpImageLoader};
use crate::core::cache::Store;
use crate::core::config::AppConfig;
use crate::engine::{EngineOptions, SyncEngine};
use crate::providers::{CbrProvider, DailyRates};
use crate::selection::SelectionStore;
use crate::store::KeyValueStore;
use crate::store::memory::MemoryCache;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Collection holding user settings such as the selection.
pub const SETTINGS_COLLECTION: &str = "settings";

pub enum AppCommand {
    /// Fetch once and print the dashboard.
    Show { amount: f64, flags: bool },
    /// Keep the dashboard on screen, refreshing periodically.
    Watch { amount: f64 },
    Add(Vec<String>),
    Remove(Vec<String>),
    List,
    Search(String),
    Reset,
}

/// Wires the provider and persisted selection into an engine.
pub fn build_engine(config: &AppConfig, store: &dyn Store) -> Result<SyncEngine> {
    let cache = Arc::new(MemoryCache::<String, DailyRates>::new());
    let provider = CbrProvider::new(&config.provider.base_url, cache, config.provider_cache_ttl())?;
    let selection = SelectionStore::load(store.get_collection(SETTINGS_COLLECTION));
    Ok(SyncEngine::new(
        Arc::new(provider),
        selection,
        EngineOptions::from_config(config),
    ))
}

pub fn build_assets(config: &AppConfig) -> Result<AssetResolver> {
    let loader = HttpImageLoader::new(&config.assets.cdn_url)?;
    Ok(AssetResolver::new(&config.assets.cdn_url, Arc::new(loader)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Ratewatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = KeyValueStore::open(&config.default_data_path()?);
    let engine = build_engine(&config, &store)?;

    let result = match command {
        AppCommand::Show { amount, flags } => {
            let assets = flags.then(|| build_assets(&config)).transpose()?;
            cli::dashboard::show(&engine, assets.as_ref(), &config, amount).await
        }
        AppCommand::Watch { amount } => cli::dashboard::watch(&engine, amount).await,
        AppCommand::Add(codes) => cli::selection::add(&engine, &codes).await,
        AppCommand::Remove(codes) => cli::selection::remove(&engine, &codes),
        AppCommand::List => cli::selection::list(&engine),
        AppCommand::Search(term) => cli::selection::search(&engine, &term),
        AppCommand::Reset => cli::selection::reset(&engine).await,
    };
    engine.shutdown();
    result
}
