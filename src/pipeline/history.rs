use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::ReelResult;

/// How many previous titles are offered to the content generator.
pub const RECENT_TITLES: usize = 20;

/// Append-only, newline-delimited list of theme titles already used.
#[derive(Clone, Debug)]
pub struct ThemeHistory {
    path: PathBuf,
}

impl ThemeHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last `n` titles, oldest first. A missing file is an empty history.
    pub fn recent(&self, n: usize) -> ReelResult<Vec<String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read history '{}'", self.path.display()))
                    .into());
            }
        };
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }

    pub fn append(&self, title: &str) -> ReelResult<()> {
        let line = title.replace(['\n', '\r'], " ");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open history '{}'", self.path.display()))?;
        writeln!(f, "{}", line.trim())
            .with_context(|| format!("append to history '{}'", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/history.rs"]
mod tests;
