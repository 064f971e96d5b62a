//! Atomic file replacement: write a sibling temp file, sync, rename over the target

use crate::traits::StorageResult;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temp file that is removed unless the write is committed
struct PendingFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Replace `path` with `data`, creating parent directories as needed.
///
/// Readers see either the old content or the new content, never a partial file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut pending = PendingFile {
        path: temp_path(path),
        committed: false,
    };

    let mut file = File::create(&pending.path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);

    fs::rename(&pending.path, path)?;
    pending.committed = true;

    Ok(())
}

fn temp_path(final_path: &Path) -> PathBuf {
    let mut temp = final_path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}
