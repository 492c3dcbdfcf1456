pub mod commands;
pub mod config;
pub mod expander;
pub mod parser;
pub mod state;
