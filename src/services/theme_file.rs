use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::model::ThemeData;
use crate::pipeline::collaborators::ContentGenerator;

/// Reads the theme and ranking from a JSON file prepared ahead of the run.
#[derive(Clone, Debug)]
pub struct ThemeFile {
    path: PathBuf,
}

impl ThemeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentGenerator for ThemeFile {
    fn generate(&self, recent_titles: &[String]) -> ReelResult<ThemeData> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read theme file '{}'", self.path.display()))
            .map_err(|e| ReelError::content(format!("{e:#}")))?;
        let theme = parse_theme_json(&text)?;
        if recent_titles
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(theme.title.trim()))
        {
            tracing::warn!(title = %theme.title, "theme was used recently");
        }
        Ok(theme)
    }
}

/// Parse a theme document, tolerating a surrounding Markdown code fence.
pub fn parse_theme_json(text: &str) -> ReelResult<ThemeData> {
    let body = strip_code_fence(text);
    serde_json::from_str(body).map_err(|e| ReelError::content(format!("invalid theme json: {e}")))
}

fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
#[path = "../../tests/unit/services/theme_file.rs"]
mod tests;
