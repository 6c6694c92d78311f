use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnatchError {
    #[error("Failed to create temp file in {dir:?}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write torrent file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn torrent_path(snatch_dir: &Path, release_id: u64) -> PathBuf {
    snatch_dir.join(format!("{}.torrent", release_id))
}

/// Write `<snatch_dir>/<release_id>.torrent` atomically.
///
/// The bytes go to a temp file in the same directory which is renamed into place.
/// On any failure the temp file is removed and no partial file is left behind.
pub fn write_torrent_file(
    snatch_dir: &Path,
    release_id: u64,
    bytes: &[u8],
) -> Result<PathBuf, SnatchError> {
    let path = torrent_path(snatch_dir, release_id);

    let mut temp = NamedTempFile::new_in(snatch_dir).map_err(|source| SnatchError::Create {
        dir: snatch_dir.to_path_buf(),
        source,
    })?;
    let write_err = |source| SnatchError::Write {
        path: path.clone(),
        source,
    };
    temp.write_all(bytes).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(&path).map_err(|e| write_err(e.error))?;

    Ok(path)
}
