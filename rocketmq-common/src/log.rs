// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::str::FromStr;

/// Initializes the global `tracing` subscriber.
///
/// The level comes from the `RUST_LOG` environment variable and defaults to `INFO`
/// when the variable is unset or not a plain level name. Output includes thread
/// names, thread ids and line numbers. Calling it again is a no-op.
pub fn init_logger() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| tracing::Level::from_str(value.trim()).ok())
        .unwrap_or(tracing::Level::INFO);
    install(level);
}

pub fn init_logger_with_level(level: Level) {
    install(level.into());
}

fn install(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_level(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_max_level(level)
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Level(&'static str);

impl Level {
    pub const ERROR: Level = Level("ERROR");
    pub const WARN: Level = Level("WARN");
    pub const INFO: Level = Level("INFO");
    pub const DEBUG: Level = Level("DEBUG");
    pub const TRACE: Level = Level("TRACE");

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Case-insensitive parse of a level name.
    pub fn parse(level: &str) -> Option<Level> {
        match level.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        }
    }
}

impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level.0 {
            "ERROR" => tracing::Level::ERROR,
            "WARN" => tracing::Level::WARN,
            "DEBUG" => tracing::Level::DEBUG,
            "TRACE" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_as_str_returns_correct_value() {
        assert_eq!(Level::ERROR.as_str(), "ERROR");
        assert_eq!(Level::TRACE.as_str(), "TRACE");
    }

    #[test]
    fn level_parse_is_case_insensitive() {
        assert_eq!(Level::parse("debug"), Some(Level::DEBUG));
        assert_eq!(Level::parse("Warn"), Some(Level::WARN));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn level_converts_to_tracing_level() {
        assert_eq!(tracing::Level::from(Level::WARN), tracing::Level::WARN);
        assert_eq!(tracing::Level::from(Level::INFO), tracing::Level::INFO);
    }

    #[test]
    fn init_logger_twice_does_not_panic() {
        init_logger();
        init_logger_with_level(Level::DEBUG);
    }
}
