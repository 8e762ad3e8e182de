//! Normalizer configuration.
//!
//! ```
//! use std::time::Duration;
//!
//! use fm_compiler::config::Config;
//!
//! let config = Config {
//!     timeout: Duration::from_secs(2),
//!     ..Config::default()
//! };
//! let normalizer = config.normalizer().unwrap();
//! assert_eq!(normalizer.engine_name(), "builtin");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use log::debug;
use thiserror::Error;

use crate::cnf::DEFAULT_MAX_CLAUSES;
use crate::normalizer::{BuiltinEngine, CommandEngine, Normalizer, DEFAULT_TIMEOUT};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, ValueEnum)]
pub enum EngineKind {
    /// In-process CNF conversion
    #[default]
    Builtin,
    /// External program, see `CommandEngine`
    Command,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("the command engine needs a program to run")]
    MissingCommand,

    #[error("timeout must be positive")]
    ZeroTimeout,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Engine used for constraint normalization (default: builtin)
    pub engine: EngineKind,
    /// Program run by the command engine
    pub engine_command: Option<PathBuf>,
    /// Extra arguments for the command engine
    pub engine_args: Vec<String>,
    /// Per-call timeout (default: 10 seconds)
    pub timeout: Duration,
    /// Clause budget of the builtin engine (default: 10000)
    pub max_clauses: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineKind::Builtin,
            engine_command: None,
            engine_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_clauses: DEFAULT_MAX_CLAUSES,
        }
    }
}

impl Config {
    pub fn normalizer(&self) -> Result<Normalizer, ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let normalizer = match self.engine {
            EngineKind::Builtin => Normalizer::new(BuiltinEngine::new(self.max_clauses)),
            EngineKind::Command => {
                let program = self.engine_command.as_ref().ok_or(ConfigError::MissingCommand)?;
                Normalizer::new(CommandEngine::new(program).args(self.engine_args.iter().cloned()))
            }
        };
        debug!("using {} engine with timeout {:?}", normalizer.engine_name(), self.timeout);
        Ok(normalizer.with_timeout(self.timeout))
    }
}
