use super::{Command, CommandError, Flow};
use crate::core::state::ShellState;

#[derive(Clone)]
pub struct ExitCommand;

impl Default for ExitCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitCommand {
    pub fn new() -> Self {
        Self
    }
}

/// Digits only; overflow wraps like a C `int`.
fn parse_status(arg: &str) -> Option<i32> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(arg.bytes().fold(0i32, |acc, b| {
        acc.wrapping_mul(10).wrapping_add(i32::from(b - b'0'))
    }))
}

impl Command for ExitCommand {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Flow, CommandError> {
        match args {
            [] => Ok(Flow::Exit(state.last_exit_status)),
            [code] => {
                let status = parse_status(code).ok_or_else(|| CommandError::InvalidArgument {
                    command: "exit",
                    arg: code.clone(),
                })?;
                state.last_exit_status = status;
                Ok(Flow::Exit(status))
            }
            _ => Err(CommandError::TooManyArguments("exit")),
        }
    }
}
