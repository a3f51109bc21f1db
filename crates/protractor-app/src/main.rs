mod events;
mod gui;
mod sys;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gui::app::AppModel;
use protractor::exchange;
use protractor::store::JsonFileStore;
use protractor::tool::Controller;
use relm4::prelude::*;
use std::path::{Path, PathBuf};
use sys::runtime;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file to use instead of the per-user default
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the protractor overlay (default)
    Run,
    /// Write every stored setting to a JSON file
    Export { path: PathBuf },
    /// Load settings from a JSON file exported earlier
    Import { path: PathBuf },
    /// Restore factory settings
    Reset,
    /// Print the settings file location
    Path,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let store = match args.settings {
        Some(path) => JsonFileStore::open(resolve_settings_path(&path)?),
        None => JsonFileStore::open_default(),
    }
    .context("Failed to open settings store")?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(store),
        Command::Export { path } => {
            let controller = Controller::new(store);
            exchange::export_json(&controller.export_record(), &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("Settings exported to {}", path.display());
            Ok(())
        }
        Command::Import { path } => {
            let record = exchange::read_import(&path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            let mut controller = Controller::new(store);
            controller.import(&record);
            println!("Imported {} setting(s)", record.len());
            Ok(())
        }
        Command::Reset => {
            Controller::new(store).reset_to_defaults();
            println!("Settings reset to defaults");
            Ok(())
        }
        Command::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

/// notify reports absolute paths, so the watcher needs one too.
fn resolve_settings_path(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Invalid settings path {}", path.display()))
}

fn run(store: JsonFileStore) -> anyhow::Result<()> {
    let settings_path = store.path().to_path_buf();
    let controller = Controller::new(store);

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx, settings_path);

    let app = RelmApp::new("org.dinzo.floating-protractor");
    app.run::<AppModel>((controller, rx));
    Ok(())
}
