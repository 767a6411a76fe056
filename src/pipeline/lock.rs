use std::fs::{File, TryLockError};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Exclusive claim on a scratch directory for one run: an OS advisory lock held on a
/// `<scratch>.lock` sibling file.
///
/// The OS drops the lock when the holder exits, so a run that was killed leaves only an inert
/// file behind and the next run proceeds.
#[derive(Debug)]
pub struct ScratchLock {
    file: File,
    scratch: PathBuf,
}

impl ScratchLock {
    pub fn acquire(scratch: &Path) -> ReelResult<Self> {
        let path = lock_path(scratch);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("open lock file '{}'", path.display()))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(ReelError::validation(format!(
                    "scratch directory '{}' is in use by another run",
                    scratch.display()
                )));
            }
            Err(TryLockError::Error(e)) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("lock '{}'", path.display()))
                    .into());
            }
        }

        // Owner pid, for humans only.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self {
            file,
            scratch: scratch.to_path_buf(),
        })
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// Delete everything in the scratch directory and recreate it empty.
    pub fn purge(&self) -> ReelResult<()> {
        if self.scratch.exists() {
            std::fs::remove_dir_all(&self.scratch)
                .with_context(|| format!("purge scratch '{}'", self.scratch.display()))?;
        }
        std::fs::create_dir_all(&self.scratch)
            .with_context(|| format!("create scratch '{}'", self.scratch.display()))?;
        Ok(())
    }
}

impl Drop for ScratchLock {
    fn drop(&mut self) {
        // Only the lock is released; the file stays in place.
        let _ = self.file.unlock();
    }
}

fn lock_path(scratch: &Path) -> PathBuf {
    let mut name = scratch
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "scratch".into());
    name.push(".lock");
    scratch.with_file_name(name)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/lock.rs"]
mod tests;
