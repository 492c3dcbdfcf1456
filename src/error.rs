use crate::core::commands::CommandError;
use crate::process::ProcessError;

#[derive(Debug)]
pub enum ShellError {
    Readline(rustyline::error::ReadlineError),
    Io(std::io::Error),
    Process(ProcessError),
    Command(CommandError),
    Flag(String),
}

impl ShellError {
    /// Status the shell terminates with when this error is fatal.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Readline(rustyline::error::ReadlineError::Io(e)) => os_code(e),
            ShellError::Readline(_) => 1,
            ShellError::Io(e) => os_code(e),
            ShellError::Process(e) => e.exit_code(),
            ShellError::Command(e) => e.exit_code(),
            ShellError::Flag(_) => 2,
        }
    }
}

/// OS error number carried by `err`, or 1 when there is none.
pub fn os_code(err: &std::io::Error) -> i32 {
    match err.raw_os_error() {
        Some(code) if code != 0 => code,
        _ => 1,
    }
}

impl From<rustyline::error::ReadlineError> for ShellError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        ShellError::Readline(err)
    }
}

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        ShellError::Io(err)
    }
}

impl From<ProcessError> for ShellError {
    fn from(err: ProcessError) -> Self {
        ShellError::Process(err)
    }
}

impl From<CommandError> for ShellError {
    fn from(err: CommandError) -> Self {
        ShellError::Command(err)
    }
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellError::Readline(e) => write!(f, "readline error: {}", e),
            ShellError::Io(e) => write!(f, "IO error: {}", e),
            ShellError::Process(e) => write!(f, "{}", e),
            ShellError::Command(e) => write!(f, "{}", e),
            ShellError::Flag(msg) => write!(f, "flag error: {}", msg),
        }
    }
}

impl std::error::Error for ShellError {}
