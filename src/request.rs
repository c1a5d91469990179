use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Apply request
// ---------------------------------------------------------------------------

/// One declarative unit of work. Empty fields mean "skip that stage", so a
/// partially-filled request degrades to fewer stages instead of erroring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyRequest {
    /// Primary config file, absolute or `~`-relative. Empty skips the write.
    pub path: String,
    pub content: String,
    /// Directory holding secondary config files (e.g. an nginx `conf.d/`).
    pub sub_dir: String,
    /// `direct` (default when empty) or `overwrite`.
    pub sub_mode: String,
    /// Relative filename -> desired content.
    pub subs: BTreeMap<String, String>,
    /// Shell command template, e.g. `nginx -s reload` or `kill -s HUP ${pid}`.
    pub reload_cmd: String,
    /// PID specifier: a literal integer, a pid file path, or a shell command
    /// whose first stdout line is the pid (e.g. `pgrep nginx`).
    pub pid: String,
}

// ---------------------------------------------------------------------------
// Sub-config reconciliation mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMode {
    /// Touch only the files named in `subs`.
    Direct,
    /// Back up every existing file in the directory, then write `subs` fresh.
    Overwrite,
}

impl SubMode {
    pub fn parse(s: &str) -> Option<SubMode> {
        match s {
            "" | "direct" => Some(SubMode::Direct),
            "overwrite" => Some(SubMode::Overwrite),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Existing bytes already matched; nothing touched on disk.
    Unchanged,
    Created,
    Replaced { backup: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutcome {
    Primary {
        path: String,
        outcome: WriteOutcome,
    },
    /// Overwrite-mode soft wipe: how many existing files were relocated.
    SubsCleared {
        dir: String,
        backed_up: usize,
    },
    Sub {
        file: String,
        outcome: WriteOutcome,
    },
    Reload {
        command: String,
        output: Vec<String>,
    },
}
