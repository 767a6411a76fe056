use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::config::NarratorConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::collaborators::Narrator;

/// Speech synthesis through an external command such as `edge-tts`.
#[derive(Clone, Debug)]
pub struct CommandNarrator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandNarrator {
    pub fn new(cfg: &NarratorConfig) -> ReelResult<Self> {
        let program = which::which(&cfg.program).map_err(|e| {
            ReelError::validation(format!(
                "narrator '{}' was not found: {e}",
                cfg.program.display()
            ))
        })?;
        Ok(Self {
            program,
            args: cfg.args.clone(),
        })
    }

    /// `args` with `{text}` and `{out}` substituted. Placeholders must be whole arguments or
    /// parts of one; the text is never split by the shell.
    pub fn command_args(&self, text: &str, out: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|a| {
                if a == "{out}" {
                    out.as_os_str().to_owned()
                } else {
                    a.replace("{text}", text)
                        .replace("{out}", &out.to_string_lossy())
                        .into()
                }
            })
            .collect()
    }
}

impl Narrator for CommandNarrator {
    #[tracing::instrument(skip(self, text))]
    fn synthesize(&self, text: &str, out: &Path) -> ReelResult<PathBuf> {
        let output = Command::new(&self.program)
            .args(self.command_args(text, out))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ReelError::validation(format!("failed to run narrator: {e}")))?;
        if !output.status.success() {
            return Err(ReelError::validation(format!(
                "narrator exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !out.is_file() {
            return Err(ReelError::validation(format!(
                "narrator did not write '{}'",
                out.display()
            )));
        }
        Ok(out.to_path_buf())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/narration.rs"]
mod tests;
