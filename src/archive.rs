//! In-memory zip packaging of capture artifacts.

use std::fs::File;
use std::io::Cursor;
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

/// Bundle the given files into a zip archive held in memory.
///
/// Entries are stored under their base names, so an archive of screenshot
/// paths unpacks flat. Screenshot sets are small enough that building the
/// whole archive in memory is fine.
pub fn zip_files(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::Internal(format!("unusable archive entry name: {}", path.display()))
            })?;

        writer.start_file(name, options)?;
        let mut file = File::open(path)?;
        std::io::copy(&mut file, &mut writer)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
