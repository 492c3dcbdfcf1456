use std::collections::BTreeMap;
use std::io;

mod cd;
mod exit;

pub use cd::CdCommand;
pub use exit::ExitCommand;

use super::state::ShellState;
use crate::error::os_code;

/// What the read-eval loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

#[derive(Debug)]
pub enum CommandError {
    TooManyArguments(&'static str),
    InvalidArgument { command: &'static str, arg: String },
    ChangeDirectory { path: String, source: io::Error },
}

impl CommandError {
    /// Value stored into `$?` when this error is reported.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::TooManyArguments(_) => 7,
            CommandError::InvalidArgument { .. } => 22,
            CommandError::ChangeDirectory { source, .. } => os_code(source),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::TooManyArguments(cmd) => write!(f, "{}: too many arguments", cmd),
            CommandError::InvalidArgument { command, arg } => {
                write!(f, "{}: invalid argument: {}", command, arg)
            }
            CommandError::ChangeDirectory { path, source } => {
                write!(f, "cd: {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for CommandError {}

pub trait Command {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Flow, CommandError>;
}

#[derive(Clone)]
enum CommandType {
    Cd(CdCommand),
    Exit(ExitCommand),
}

impl Command for CommandType {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Flow, CommandError> {
        match self {
            CommandType::Cd(cmd) => cmd.execute(args, state),
            CommandType::Exit(cmd) => cmd.execute(args, state),
        }
    }
}

/// Commands the shell runs itself instead of forking.
#[derive(Clone)]
pub struct Builtins {
    commands: BTreeMap<&'static str, CommandType>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert("cd", CommandType::Cd(CdCommand::new()));
        commands.insert("exit", CommandType::Exit(ExitCommand::new()));
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|cmd| cmd as &dyn Command)
    }

    #[cfg(test)]
    fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}
