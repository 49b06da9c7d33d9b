//! JSON-lines logger destination

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{Callback, CallbackAction, EventContext};

use super::LoggerDestination;

/// Logger destination that appends one JSON object per record to a file.
///
/// The file is opened lazily on the first record, so construction never
/// fails. Write errors are swallowed; logging is best-effort by design.
/// `close` flushes and drops the handle and may be called repeatedly.
pub struct FileLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), writer: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, record: serde_json::Value) {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            self.writer = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .ok()
                .map(BufWriter::new);
        }
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{record}").ok();
        }
    }
}

impl Callback for FileLogger {
    fn fit_start(&mut self, ctx: &EventContext) -> CallbackAction {
        self.write_record(serde_json::json!({
            "type": "fit_start",
            "run_id": ctx.run_id.clone(),
            "epoch": ctx.epoch,
        }));
        CallbackAction::Continue
    }

    fn fit_end(&mut self, ctx: &EventContext) -> CallbackAction {
        self.write_record(serde_json::json!({
            "type": "fit_end",
            "run_id": ctx.run_id.clone(),
            "epoch": ctx.epoch,
            "loss": ctx.loss,
        }));
        CallbackAction::Continue
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().ok();
        }
    }

    fn name(&self) -> &'static str {
        "FileLogger"
    }
}

impl LoggerDestination for FileLogger {
    fn log_metrics(&mut self, metrics: &HashMap<String, f64>, step: u64) {
        for (key, value) in metrics {
            self.write_record(serde_json::json!({
                "type": "metric",
                "key": key,
                "value": value,
                "step": step,
            }));
        }
    }

    fn log_hyperparameters(&mut self, params: &HashMap<String, String>) {
        self.write_record(serde_json::json!({
            "type": "hyperparameters",
            "params": params,
        }));
    }

    fn log_artifact(&mut self, path: &Path) {
        self.write_record(serde_json::json!({
            "type": "artifact",
            "path": path.display().to_string(),
        }));
    }
}
