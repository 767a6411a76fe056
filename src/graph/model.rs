//! Structured filter-graph description and its single text serializer.
//!
//! A [`FilterGraphSpec`] is a list of encoder inputs plus linear filter chains connected through
//! named labels. [`FilterGraphSpec::validate`] checks that every label is produced exactly once,
//! consumed exactly once, and produced before it is consumed, which keeps the graph acyclic.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// One encoder input (`-i ...`) together with its input-side options.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphInput {
    File {
        path: PathBuf,
        seek_s: Option<f64>,
        duration_s: Option<f64>,
        /// Repeat the input forever; something else must bound the output.
        looped: bool,
    },
    /// Numbered image files (`frame_%04d.png`) read as a video stream.
    ImageSequence {
        pattern: PathBuf,
        fps: Fps,
        start_number: u64,
    },
    /// A generated source such as `color=c=black:s=1080x1920:r=30`.
    Lavfi {
        source: String,
        duration_s: Option<f64>,
    },
}

impl GraphInput {
    /// Input-side ffmpeg arguments, ending with `-i <input>`.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Self::File {
                path,
                seek_s,
                duration_s,
                looped,
            } => {
                if *looped {
                    args.extend(["-stream_loop".into(), "-1".into()]);
                }
                if let Some(s) = seek_s
                    && *s > 0.0
                {
                    args.extend(["-ss".into(), format_secs(*s).into()]);
                }
                if let Some(d) = duration_s {
                    args.extend(["-t".into(), format_secs(*d).into()]);
                }
                args.push("-i".into());
                args.push(path.clone().into_os_string());
            }
            Self::ImageSequence {
                pattern,
                fps,
                start_number,
            } => {
                args.extend([
                    "-framerate".into(),
                    fps.to_ffmpeg().into(),
                    "-start_number".into(),
                    start_number.to_string().into(),
                    "-f".into(),
                    "image2".into(),
                    "-i".into(),
                ]);
                args.push(pattern.clone().into_os_string());
            }
            Self::Lavfi { source, duration_s } => {
                args.extend(["-f".into(), "lavfi".into()]);
                if let Some(d) = duration_s {
                    args.extend(["-t".into(), format_secs(*d).into()]);
                }
                args.extend(["-i".into(), source.into()]);
            }
        }
        args
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// A chain input: an encoder input stream or a label produced by an earlier chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pad {
    Stream { input: usize, kind: StreamKind },
    Label(String),
}

impl Pad {
    pub fn video(input: usize) -> Self {
        Self::Stream {
            input,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(input: usize) -> Self {
        Self::Stream {
            input,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }

    fn write(&self, out: &mut String) {
        match self {
            Self::Stream { input, kind } => {
                let k = match kind {
                    StreamKind::Video => 'v',
                    StreamKind::Audio => 'a',
                };
                let _ = write!(out, "[{input}:{k}]");
            }
            Self::Label(name) => {
                let _ = write!(out, "[{name}]");
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum FilterArg {
    Positional(String),
    Named(String, String),
    /// Value already escaped for the option grammar; emitted inside single quotes.
    Quoted(String, String),
}

/// One filter node (`name=arg:key=value`).
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    pub fn kv(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(FilterArg::Named(key.into(), value.to_string()));
        self
    }

    /// `key='value'`. The caller is responsible for escaping `value`.
    pub fn quoted(mut self, key: impl Into<String>, escaped: impl Into<String>) -> Self {
        self.args.push(FilterArg::Quoted(key.into(), escaped.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.name);
        for (i, a) in self.args.iter().enumerate() {
            out.push(if i == 0 { '=' } else { ':' });
            match a {
                FilterArg::Positional(v) => out.push_str(v),
                FilterArg::Named(k, v) => {
                    let _ = write!(out, "{k}={v}");
                }
                FilterArg::Quoted(k, v) => {
                    let _ = write!(out, "{k}='{v}'");
                }
            }
        }
    }
}

/// A linear run of filters from one or more input pads to one output label.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub output: String,
}

impl Chain {
    pub fn new(inputs: Vec<Pad>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            filters: Vec::new(),
            output: output.into(),
        }
    }

    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn then_all(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }
}

/// Complete description of one encode: inputs, filter chains and mapped outputs.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FilterGraphSpec {
    pub inputs: Vec<GraphInput>,
    pub chains: Vec<Chain>,
    /// Labels mapped to the output file, in stream order.
    pub maps: Vec<String>,
    /// Output duration cap (`-t`).
    pub duration_s: Option<f64>,
    /// End the output with its shortest stream (`-shortest`).
    pub shortest: bool,
}

impl FilterGraphSpec {
    pub fn validate(&self) -> ReelResult<()> {
        if self.chains.is_empty() {
            return Err(ReelError::validation("filter graph has no chains"));
        }
        if self.maps.is_empty() {
            return Err(ReelError::validation("filter graph maps no outputs"));
        }

        // label -> index of the producing chain
        let mut produced: BTreeMap<&str, usize> = BTreeMap::new();
        let mut consumed: BTreeSet<&str> = BTreeSet::new();

        for (ci, chain) in self.chains.iter().enumerate() {
            if chain.filters.is_empty() {
                return Err(ReelError::validation(format!(
                    "chain '{}' has no filters",
                    chain.output
                )));
            }
            if chain.inputs.is_empty() {
                return Err(ReelError::validation(format!(
                    "chain '{}' has no inputs",
                    chain.output
                )));
            }
            for pad in &chain.inputs {
                match pad {
                    Pad::Stream { input, .. } => {
                        if *input >= self.inputs.len() {
                            return Err(ReelError::validation(format!(
                                "chain '{}' reads input #{input}, but only {} inputs exist",
                                chain.output,
                                self.inputs.len()
                            )));
                        }
                    }
                    Pad::Label(name) => {
                        if !produced.contains_key(name.as_str()) {
                            return Err(ReelError::validation(format!(
                                "label '{name}' is consumed before it is produced"
                            )));
                        }
                        if !consumed.insert(name.as_str()) {
                            return Err(ReelError::validation(format!(
                                "label '{name}' is consumed more than once"
                            )));
                        }
                    }
                }
            }

            check_label_name(&chain.output)?;
            if produced.insert(chain.output.as_str(), ci).is_some() {
                return Err(ReelError::validation(format!(
                    "label '{}' is produced more than once",
                    chain.output
                )));
            }
        }

        for m in &self.maps {
            if !produced.contains_key(m.as_str()) {
                return Err(ReelError::validation(format!(
                    "mapped label '{m}' is never produced"
                )));
            }
            if !consumed.insert(m.as_str()) {
                return Err(ReelError::validation(format!(
                    "label '{m}' is consumed more than once"
                )));
            }
        }

        if let Some(unused) = produced.keys().find(|l| !consumed.contains(*l)) {
            return Err(ReelError::validation(format!(
                "label '{unused}' is produced but never consumed"
            )));
        }
        Ok(())
    }

    /// The `-filter_complex` text. This is the only place graph text is produced.
    pub fn to_filter_complex(&self) -> ReelResult<String> {
        self.validate()?;
        let mut out = String::new();
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            for pad in &chain.inputs {
                pad.write(&mut out);
            }
            out.push_str(&simple_chain(&chain.filters));
            Pad::Label(chain.output.clone()).write(&mut out);
        }
        Ok(out)
    }

    /// Input arguments, the filter graph and `-map` arguments (no codec settings or output).
    pub fn to_args(&self) -> ReelResult<Vec<OsString>> {
        let graph = self.to_filter_complex()?;
        let mut args: Vec<OsString> = Vec::new();
        for input in &self.inputs {
            args.extend(input.to_args());
        }
        args.extend(["-filter_complex".into(), graph.into()]);
        for m in &self.maps {
            args.extend(["-map".into(), format!("[{m}]").into()]);
        }
        if let Some(d) = self.duration_s {
            args.extend(["-t".into(), format_secs(d).into()]);
        }
        if self.shortest {
            args.push("-shortest".into());
        }
        Ok(args)
    }
}

/// A single unlabeled chain (`a,b,c`) for simple `-vf` invocations.
pub fn simple_chain(filters: &[Filter]) -> String {
    let mut out = String::new();
    for (i, f) in filters.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        f.write(&mut out);
    }
    out
}

fn check_label_name(label: &str) -> ReelResult<()> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ReelError::validation(format!(
            "invalid filter graph label '{label}'"
        )));
    }
    Ok(())
}

/// Seconds with millisecond precision and no trailing zeros (`4.5`, `0.533`, `5`).
pub fn format_secs(s: f64) -> String {
    let mut out = format!("{:.3}", s.max(0.0));
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
