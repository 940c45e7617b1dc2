//! Enrichment progress reporting.
//!
//! Reports observable progress during `qenrich enrich` and `qenrich emotions`
//! so users see how many quotes are done and how many groups are left.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// A group of concurrent annotation calls finished.
    Group {
        group: u64,
        groups: u64,
        n: u64,
        total: u64,
    },
    /// Periodic count of annotated quotes.
    Annotated { n: u64, total: u64 },
    /// Periodic count of quotes whose emotion has been derived.
    Deriving { n: u64, total: u64 },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipelines.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "enrich  group 3 / 12  30 / 115 quotes".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Group {
                group,
                groups,
                n,
                total,
            } => format!(
                "enrich  group {} / {}  {} / {} quotes\n",
                format_number(*group),
                format_number(*groups),
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Annotated { n, total } => format!(
                "enrich  annotated  {} / {} quotes\n",
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Deriving { n, total } => format!(
                "emotions  derived  {} / {} quotes\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Group {
                group,
                groups,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "phase": "group",
                "group": group,
                "groups": groups,
                "n": n,
                "total": total
            }),
            ProgressEvent::Annotated { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "annotating",
                "n": n,
                "total": total
            }),
            ProgressEvent::Deriving { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "deriving",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
