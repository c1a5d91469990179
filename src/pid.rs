use crate::paths;
use crate::shell::{self, CommandRunner};
use std::fs;
use tracing::{debug, warn};

/// Finds a pid using whichever strategy matches the specifier, in order:
/// a literal integer, a pid file, or a shell probe whose first stdout line is
/// the pid (`pgrep nginx`, `ps -ef | awk ...`). Resolution never fails
/// outward; exhausting every strategy yields an empty string.
pub async fn find_pid(spec: &str, runner: &impl CommandRunner) -> String {
    if spec.is_empty() {
        return String::new();
    }

    if spec.parse::<i64>().is_ok() {
        return spec.to_string();
    }

    let pid_file = paths::resolve(spec);
    if fs::metadata(&pid_file).is_ok_and(|meta| meta.is_file()) {
        match fs::read_to_string(&pid_file) {
            Ok(contents) => return contents,
            // Fall through to the probe strategy
            Err(e) => warn!("failed to read pid file {}: {e}", pid_file.display()),
        }
    }

    debug!("probing for pid with `{spec}`");
    let result = runner.run(spec, shell::command_timeout()).await;
    if let Some(error) = &result.error {
        warn!("pid probe `{spec}` failed: {error}");
    }
    result.stdout.into_iter().next().unwrap_or_default()
}
