//! # Operator script interpreter module
//!
//! This module provides an interpreter for timed operator scripts, allowing console commands to be
//! replayed without an operator at the keyboard. A script is a sequence of entries of the form
//!
//! ```text
//! <exec time in seconds>: <command>;
//! ```
//!
//! for example `1.5: click 320 240;`. Anything that doesn't match this form (such as `#` comment
//! lines) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The time the command is supposed to execute at
    pub exec_time_s: f64,

    /// The command line to run
    pub line: String,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_cmds` to
/// acquire a list of commands that need executing.
pub struct ScriptInterpreter {
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),
}

#[derive(Debug, PartialEq)]
pub enum PendingCmds {
    None,
    Some(Vec<String>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_script(&script)
    }

    /// Create a new interpreter from the text of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {
        // Empty queue of commands
        let mut cmds: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Both groups are non-optional in the regex so are always present on a match
            let time_str = &cap[1];
            let line = cap[3].trim();

            // Parse the exec time
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if line.is_empty() {
                continue;
            }

            cmds.push_back(Command {
                exec_time_s,
                line: line.to_string(),
            });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Scripts are allowed to be written out of order
        cmds.make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter { cmds })
    }

    /// Return the commands due at `current_time_s`.
    pub fn get_pending_cmds(&mut self, current_time_s: f64) -> PendingCmds {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut pending = vec![];

        // Pop items from the queue while the head's exec time has passed
        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break;
            }

            if let Some(cmd) = self.cmds.pop_front() {
                pending.push(cmd.line);
            }
        }

        if pending.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(pending)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = "\
# Draw a two point path then play it back
0.0: mode path;
0.5: click 100 200;
0.5: click 300 200;
2.0: play;
";

    #[test]
    fn test_script_pending() {
        let mut si = ScriptInterpreter::from_script(SCRIPT).unwrap();

        assert_eq!(si.get_num_cmds(), 4);
        assert_eq!(si.get_duration(), 2.0);

        assert_eq!(
            si.get_pending_cmds(0.1),
            PendingCmds::Some(vec!["mode path".to_string()])
        );
        assert_eq!(si.get_pending_cmds(0.2), PendingCmds::None);
        assert_eq!(
            si.get_pending_cmds(1.0),
            PendingCmds::Some(vec!["click 100 200".to_string(), "click 300 200".to_string()])
        );
        assert_eq!(
            si.get_pending_cmds(5.0),
            PendingCmds::Some(vec!["play".to_string()])
        );
        assert_eq!(si.get_pending_cmds(6.0), PendingCmds::EndOfScript);
    }

    #[test]
    fn test_empty_script() {
        match ScriptInterpreter::from_script("# nothing to see\n") {
            Err(ScriptError::ScriptEmpty) => (),
            _ => panic!("Expected an empty script error"),
        }
    }
}
