use super::{Command, CommandError, Flow};
use crate::core::state::ShellState;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Clone)]
pub struct CdCommand;

impl Default for CdCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CdCommand {
    pub fn new() -> Self {
        Self
    }

    /// `<cwd>/<dir>`, built from the live working directory.
    fn relative_to_cwd(dir: &str) -> Result<PathBuf, CommandError> {
        let cwd = env::current_dir().map_err(|source| CommandError::ChangeDirectory {
            path: dir.to_string(),
            source,
        })?;

        let mut path = OsString::from(cwd);
        path.push("/");
        path.push(dir);
        Ok(PathBuf::from(path))
    }
}

impl Command for CdCommand {
    fn execute(&self, args: &[String], state: &mut ShellState) -> Result<Flow, CommandError> {
        let target = match args {
            [] => PathBuf::from(&state.home_dir),
            [dir] if *dir == state.home_dir => PathBuf::from(&state.home_dir),
            [dir] => Self::relative_to_cwd(dir)?,
            _ => return Err(CommandError::TooManyArguments("cd")),
        };

        env::set_current_dir(&target).map_err(|source| CommandError::ChangeDirectory {
            path: target.display().to_string(),
            source,
        })?;
        Ok(Flow::Continue)
    }
}
