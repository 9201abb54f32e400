//! Routes `log` records into the status bar instead of stderr

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use color_eyre::eyre::{eyre, Result as EyreResult};
use log::{Level, LevelFilter, Log, Metadata, Record};

const KEEP: usize = 32;

struct StatusLogger {
    records: Mutex<VecDeque<(Level, String, Instant)>>,
}

static LOGGER: StatusLogger = StatusLogger {
    records: Mutex::new(VecDeque::new()),
};

impl Log for StatusLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut records) = self.records.lock() {
            if records.len() == KEEP {
                records.pop_front();
            }
            records.push_back((record.level(), record.args().to_string(), Instant::now()));
        }
    }

    fn flush(&self) {}
}

pub fn init() -> EyreResult<()> {
    log::set_logger(&LOGGER).map_err(|e| eyre!("logger already installed: {e}"))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

/// Most recent record, if any
pub fn latest() -> Option<(Level, String, Instant)> {
    LOGGER.records.lock().ok()?.back().cloned()
}
