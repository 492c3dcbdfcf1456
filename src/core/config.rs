use std::env;

use crate::input::tokenizer::DEFAULT_SEPARATORS;

/// Settings read from the environment once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub separators: String,
    pub home: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            prompt: lookup("PS1").unwrap_or_default(),
            separators: lookup("IFS").unwrap_or_else(|| DEFAULT_SEPARATORS.to_string()),
            home: lookup("HOME").unwrap_or_default(),
        }
    }
}
