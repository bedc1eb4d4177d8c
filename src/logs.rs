use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "trip.log";

// Rolling log file on the terminal's cache dir. The terminal is rebooted
// rarely, so we keep a few small files around instead of one big one.
pub fn init(cache_dir: &str) -> Result<()> {
    let log_dir = Path::new(cache_dir).join(LOG_DIR);
    fs::create_dir_all(&log_dir)?;
    let log = FileRotate::new(
        log_dir.join(LOG_FILE_NAME),
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(LevelFilter::Info, config, log)?;
    info!("logging initialized");
    Ok(())
}

// Zips the trip log and its rotated copies for a support ticket. Anything
// else that ended up in the log folder is left out. Returns how many files
// went into the archive.
pub fn export(cache_dir: &str, target_file_path: &str) -> Result<usize> {
    let log_dir = Path::new(cache_dir).join(LOG_DIR);
    let mut log_files: Vec<(PathBuf, String)> = fs::read_dir(&log_dir)
        .with_context(|| format!("cannot read log folder {}", log_dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            name.starts_with(LOG_FILE_NAME).then_some((path, name))
        })
        .collect();
    log_files.sort_by(|a, b| a.1.cmp(&b.1));

    let mut zip = zip::ZipWriter::new(File::create(target_file_path)?);
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (path, name) in &log_files {
        zip.start_file(format!("{LOG_DIR}/{name}"), options)?;
        io::copy(&mut File::open(path)?, &mut zip)?;
    }
    zip.finish()?;

    info!(
        "exported {} log files to {}",
        log_files.len(),
        target_file_path
    );
    Ok(log_files.len())
}
