mod backend_bridge;
mod controller;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use task_core::{config::read_settings_file, load_settings, StatusBar, ThreadManager};

use crate::{
    backend_bridge::{commands::JobOptions, runtime::WorkerRuntime},
    ui::{app::SETTINGS_STORAGE_KEY, DesktopGuiApp},
};

#[derive(Parser, Debug)]
#[command(name = "desktop_gui", about = "Background task demo with a status bar")]
struct Args {
    /// Settings file to use instead of task_manager.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => read_settings_file(path)?
            .with_context(|| format!("settings file '{}' does not exist", path.display()))?,
        None => load_settings(),
    };

    let runtime = WorkerRuntime::build(&settings)?;
    let manager = ThreadManager::with_pool(StatusBar::new(), settings, runtime.pool());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Task Status Demo")
            .with_inner_size([720.0, 480.0])
            .with_min_inner_size([520.0, 360.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Task Status Demo",
        options,
        Box::new(move |cc| {
            let persisted_options = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<JobOptions>(&text).ok())
            });
            Ok(Box::new(DesktopGuiApp::new(manager, runtime, persisted_options)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("desktop gui exited with error: {err}"))
}
