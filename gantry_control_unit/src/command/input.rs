//! Newline-delimited JSON command input.
//!
//! Each line is one [`GantryCommand`]:
//!
//! ```text
//! {"velocity": [0.1, 0.0]}
//! {"position": [1.0, -0.5]}
//! ```
//!
//! Blank lines are skipped. Malformed lines, and commands the target handle
//! rejects, are logged and dropped; the reader keeps going until end of
//! input.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::target::{GantryCommand, TargetHandle};

/// Counters returned when the input ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub applied: u64,
    pub rejected: u64,
}

/// Parse one line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<GantryCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Read commands until end of input, applying each to `target`.
pub fn read_commands<R: BufRead>(reader: R, target: &TargetHandle) -> io::Result<InputSummary> {
    let mut summary = InputSummary::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_command(&line) {
            Ok(Some(command)) => match target.apply(&command) {
                Ok(Some(_)) => summary.applied += 1,
                Ok(None) => {}
                Err(e) => {
                    summary.rejected += 1;
                    warn!(line = lineno + 1, "rejected command: {e}");
                }
            },
            Ok(None) => {}
            Err(e) => {
                summary.rejected += 1;
                warn!(line = lineno + 1, "rejected command: {e}");
            }
        }
    }
    debug!(?summary, "command input closed");
    Ok(summary)
}

/// Read commands from stdin on a background thread.
///
/// The thread ends at end of input; it blocks in `read`, so callers detach it
/// rather than join it on shutdown.
pub fn spawn_stdin_reader(target: TargetHandle) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("gantry-cmd".into())
        .spawn(move || {
            info!("Reading JSON commands from stdin");
            let stdin = io::stdin();
            match read_commands(stdin.lock(), &target) {
                Ok(s) => info!(
                    "stdin closed ({} commands applied, {} rejected)",
                    s.applied, s.rejected
                ),
                Err(e) => warn!("stdin read failed: {e}"),
            }
        })
}
