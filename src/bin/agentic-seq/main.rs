//! agentic-seq - terminal step sequencer
//!
//! Run with: cargo run -- [config.json] [project.json]

mod app;
mod logger;
mod ui;

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;

use agentic_sequencer::SequencerConfig;
use app::App;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    logger::init()?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SequencerConfig::load(Path::new(&path))
            .wrap_err_with(|| format!("failed to load config from {path}"))?,
        None => SequencerConfig::default(),
    };
    let project_path = args.next().map(PathBuf::from);

    let mut app = App::new(config, project_path)?;

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
