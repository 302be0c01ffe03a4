pub mod args;
pub mod capture;
pub mod error;
pub mod keypoints;
pub mod model;
pub mod server;
pub mod session;
pub mod settings;
pub mod upload;
pub mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use args::Args;
use keypoints::{LandmarkExtractor, MediapipeBridge};
use model::{Recognizer, SequencePreprocessor};
use server::AppState;
use settings::SettingsStore;

pub async fn run() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("signcapture starting up...");

    let args = Args::parse();
    let store = SettingsStore::new(args.config.clone())?;
    store.update(|settings| args.apply(settings));
    let settings = store.snapshot();
    log::info!("Using settings from {}", store.path().display());
    if let Ok(effective) = serde_json::to_string(&settings) {
        log::debug!("Effective settings: {effective}");
    }

    let classifier = model::load_classifier(&settings.model).context("Failed to load classifier")?;
    let recognizer = Arc::new(Recognizer::new(
        SequencePreprocessor::new(settings.model.target_frames),
        classifier,
    ));
    let info = recognizer.info();
    log::info!("Model ready: {} classes", info.num_classes);

    let detector = {
        let detector_settings = settings.detector.clone();
        tokio::task::spawn_blocking(move || MediapipeBridge::spawn(&detector_settings))
            .await
            .context("detector startup task failed")?
            .context("Failed to start hand detector")?
    };
    let extractor = Arc::new(LandmarkExtractor::new(Arc::new(detector), &settings.extractor));

    server::serve(AppState::new(extractor, recognizer, settings)).await
}
