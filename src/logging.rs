use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Logger writing to `path`, appending. The terminal is in raw mode on the
/// alternate screen while the app runs, so stderr output would corrupt it.
fn file_logger(path: &Path, level: LevelFilter) -> io::Result<Builder> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis();
    Ok(builder)
}

/// Install the file logger. Without a path logging stays off.
pub fn init(path: Option<&Path>, level: LevelFilter) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    file_logger(path, level)?
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}
