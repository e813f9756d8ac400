//! File-backed logging. The terminal is owned by the UI, so log lines go to
//! a rotating file next to the snapshot files instead of stdout.

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};

const LOG_FILE_BASENAME: &str = "flowboard";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Starts the logger; the returned handle must stay alive for the
/// session so buffered lines are flushed on exit.
pub fn init() -> anyhow::Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str("info")
        .context("invalid log specification")?
        .log_to_file(FileSpec::default().basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .context("failed to start logger")?;
    Ok(handle)
}
