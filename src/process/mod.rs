use std::fmt;
use std::io;

use crate::error::os_code;

pub mod executor;
pub mod signal;

pub use executor::{ChildOutcome, Supervisor};
pub use signal::{Disposition, SignalPolicy};

#[derive(Debug)]
pub enum ProcessError {
    Fork(io::Error),
    Wait(io::Error),
    Signal(io::Error),
    Kill(io::Error),
    InvalidArgument(String),
    Redirect { path: String, source: io::Error },
    Exec { program: String, source: io::Error },
}

impl ProcessError {
    /// Errors that abort only the current command; everything else takes the
    /// shell down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProcessError::Fork(_) | ProcessError::InvalidArgument(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessError::Fork(e)
            | ProcessError::Wait(e)
            | ProcessError::Signal(e)
            | ProcessError::Kill(e) => os_code(e),
            ProcessError::InvalidArgument(_) => libc::EINVAL,
            ProcessError::Redirect { source, .. } | ProcessError::Exec { source, .. } => {
                os_code(source)
            }
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Fork(e) => write!(f, "fork() failed: {}", e),
            ProcessError::Wait(e) => write!(f, "waitpid() failed: {}", e),
            ProcessError::Signal(e) => write!(f, "sigaction() failed: {}", e),
            ProcessError::Kill(e) => write!(f, "kill() failed: {}", e),
            ProcessError::InvalidArgument(arg) => {
                write!(f, "argument contains a null byte: {:?}", arg)
            }
            ProcessError::Redirect { path, source } => write!(f, "{}: {}", path, source),
            ProcessError::Exec { program, source } => write!(f, "{}: {}", program, source),
        }
    }
}

impl std::error::Error for ProcessError {}
