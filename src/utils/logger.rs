use crate::utils::error::{CensusError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// 日誌生命週期：初始化後持有，結束時 `teardown` 刷新檔案
#[derive(Debug, Default)]
pub struct LoggerGuard {
    log_file: Option<(PathBuf, Arc<File>)>,
}

impl LoggerGuard {
    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn teardown(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if let Some((_, file)) = self.log_file.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// 產生預設日誌檔名，例如 `./logs/log_2024-05-01_12-00-00.txt`
pub fn default_log_file<P: AsRef<Path>>(log_dir: P) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    log_dir.as_ref().join(format!("log_{}.txt", timestamp))
}

pub fn init_cli_logger(verbose: bool, log_file: Option<&Path>) -> Result<LoggerGuard> {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("species_census=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("species_census=info"))
    };

    let mut guard = LoggerGuard::default();

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);
            guard.log_file = Some((path.to_path_buf(), file.clone()));

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| CensusError::ConfigError {
            message: format!("Logger already initialized: {}", e),
        })?;

    Ok(guard)
}
