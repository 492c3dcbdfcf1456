use std::convert::Infallible;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::raw::c_char;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::null;

use libc::{c_int, pid_t};
use log::{debug, warn};
use signal_hook::low_level;

use super::signal::{self, Disposition, SignalPolicy};
use super::ProcessError;
use crate::core::parser::ParsedCommand;
use crate::core::state::ShellState;
use crate::highlight::Highlighter;

/// Mode for files created by `>`; the umask still applies.
const OUTPUT_MODE: u32 = 0o777;
/// Mode for a missing `<` target, which is created empty.
const INPUT_MODE: u32 = 0o666;

/// How a waited-for child changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Exited(i32),
    Signaled(i32),
    Stopped,
}

impl ChildOutcome {
    pub fn from_wait_status(status: c_int) -> Option<Self> {
        if libc::WIFEXITED(status) {
            Some(ChildOutcome::Exited(libc::WEXITSTATUS(status)))
        } else if libc::WIFSIGNALED(status) {
            Some(ChildOutcome::Signaled(libc::WTERMSIG(status)))
        } else if libc::WIFSTOPPED(status) {
            Some(ChildOutcome::Stopped)
        } else {
            None
        }
    }

    /// Value recorded in `$?` for a foreground child.
    pub fn status(&self) -> Option<i32> {
        match self {
            ChildOutcome::Exited(code) => Some(*code),
            ChildOutcome::Signaled(signum) => Some(128 + signum),
            ChildOutcome::Stopped => None,
        }
    }
}

/// Arguments converted before `fork` so the child only has to call exec.
struct ExecPlan {
    args: Vec<CString>,
    by_path: bool,
}

impl ExecPlan {
    fn new(argv: &[String]) -> Result<Self, ProcessError> {
        let args = argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str())
                    .map_err(|_| ProcessError::InvalidArgument(arg.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let by_path = argv.first().is_some_and(|name| name.contains('/'));

        Ok(ExecPlan { args, by_path })
    }

    fn exec(&self, program: &str) -> ProcessError {
        let mut ptrs: Vec<*const c_char> = self.args.iter().map(|a| a.as_ptr()).collect();
        ptrs.push(null());

        if let Some(name) = self.args.first() {
            unsafe {
                if self.by_path {
                    libc::execv(name.as_ptr(), ptrs.as_ptr());
                } else {
                    libc::execvp(name.as_ptr(), ptrs.as_ptr());
                }
            }
        }
        ProcessError::Exec {
            program: program.to_string(),
            source: io::Error::last_os_error(),
        }
    }
}

/// Forks, execs and waits for commands, and reaps background children.
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    highlighter: Highlighter,
}

impl Supervisor {
    pub fn new(highlighter: Highlighter) -> Self {
        Self { highlighter }
    }

    /// Run `command`, blocking unless it is a background job.
    pub fn launch(
        &self,
        command: &ParsedCommand,
        signals: &SignalPolicy,
        state: &mut ShellState,
    ) -> Result<(), ProcessError> {
        let plan = ExecPlan::new(&command.argv)?;
        io::stdout().flush().ok();
        io::stderr().flush().ok();

        match unsafe { libc::fork() } {
            -1 => Err(ProcessError::Fork(io::Error::last_os_error())),
            0 => self.run_child(command, &plan, signals),
            pid => {
                debug!("forked {} for {:?}", pid, command.argv);
                if command.is_background {
                    state.track_background(pid);
                    self.poll_once(pid)
                } else {
                    self.wait_foreground(pid, state)
                }
            }
        }
    }

    fn run_child(&self, command: &ParsedCommand, plan: &ExecPlan, signals: &SignalPolicy) -> ! {
        let err = match exec_child(command, plan, signals) {
            Ok(never) => match never {},
            Err(e) => e,
        };
        eprintln!("{}", self.highlighter.error(&err.to_string()));
        low_level::exit(err.exit_code())
    }

    fn wait_foreground(&self, pid: pid_t, state: &mut ShellState) -> Result<(), ProcessError> {
        let status = wait_blocking(pid)?;
        match ChildOutcome::from_wait_status(status) {
            Some(ChildOutcome::Stopped) => {
                signal::resume(pid)?;
                self.notice(&format!("Child process {} stopped. Continuing.", pid));
                state.track_background(pid);
                self.poll_once(pid)
            }
            Some(outcome) => {
                debug!("foreground {} finished: {:?}", pid, outcome);
                if let Some(code) = outcome.status() {
                    state.last_exit_status = code;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// One non-blocking look at `pid` right after it went to the background.
    fn poll_once(&self, pid: pid_t) -> Result<(), ProcessError> {
        if let Some((pid, status)) = wait_nohang(pid)? {
            self.report(pid, status)?;
        }
        Ok(())
    }

    /// Report every child that finished or stopped since the last prompt.
    pub fn reap(&self, state: &mut ShellState) -> Result<(), ProcessError> {
        if !state.background_pending_reap {
            return Ok(());
        }
        while let Some((pid, status)) = wait_nohang(0)? {
            self.report(pid, status)?;
        }
        state.background_pending_reap = false;
        Ok(())
    }

    fn report(&self, pid: pid_t, status: c_int) -> Result<(), ProcessError> {
        match ChildOutcome::from_wait_status(status) {
            Some(ChildOutcome::Exited(code)) => {
                self.notice(&format!("Child process {} done. Exit status {}", pid, code));
            }
            Some(ChildOutcome::Signaled(signum)) => {
                debug!(
                    "{} killed by {}",
                    pid,
                    low_level::signal_name(signum).unwrap_or("unknown signal")
                );
                self.notice(&format!("Child process {} done. Signaled {}", pid, signum));
            }
            Some(ChildOutcome::Stopped) => {
                signal::resume(pid)?;
                self.notice(&format!("Child process {} stopped. Continuing.", pid));
            }
            None => warn!("unexpected wait status {:#x} for {}", status, pid),
        }
        Ok(())
    }

    fn notice(&self, message: &str) {
        eprintln!("{}", self.highlighter.notice(message));
    }
}

/// Everything the child does between `fork` and `exec`.
fn exec_child(
    command: &ParsedCommand,
    plan: &ExecPlan,
    signals: &SignalPolicy,
) -> Result<Infallible, ProcessError> {
    signals.apply(Disposition::ChildDefault)?;

    if let Some(path) = &command.input_redirect {
        redirect(path, open_input(path), libc::STDIN_FILENO)?;
    }
    if let Some(path) = &command.output_redirect {
        redirect(path, open_output(path), libc::STDOUT_FILENO)?;
    }

    Err(plan.exec(command.program()))
}

/// Input targets are opened with `O_CREAT`, so a missing file reads as empty.
fn open_input(path: &str) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_CREAT)
        .mode(INPUT_MODE)
        .open(path)
}

fn open_output(path: &str) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
}

fn redirect(path: &str, file: io::Result<File>, target: c_int) -> Result<(), ProcessError> {
    let to_error = |source| ProcessError::Redirect {
        path: path.to_string(),
        source,
    };
    let file = file.map_err(to_error)?;
    if unsafe { libc::dup2(file.as_raw_fd(), target) } == -1 {
        return Err(to_error(io::Error::last_os_error()));
    }
    Ok(())
}

fn wait_blocking(pid: pid_t) -> Result<c_int, ProcessError> {
    let mut status: c_int = 0;
    loop {
        match unsafe { libc::waitpid(pid, &mut status, libc::WUNTRACED) } {
            -1 => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(ProcessError::Wait(err));
                }
            }
            _ => return Ok(status),
        }
    }
}

/// `waitpid(target, WNOHANG | WUNTRACED)`; `None` once nothing is ready.
fn wait_nohang(target: pid_t) -> Result<Option<(pid_t, c_int)>, ProcessError> {
    let mut status: c_int = 0;
    loop {
        match unsafe { libc::waitpid(target, &mut status, libc::WNOHANG | libc::WUNTRACED) } {
            -1 => {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR) => continue,
                    Some(libc::ECHILD) => return Ok(None),
                    _ => return Err(ProcessError::Wait(err)),
                }
            }
            0 => return Ok(None),
            pid => return Ok(Some((pid, status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::thread;
    use std::time::{Duration, Instant};

    fn launch(command: &ParsedCommand, state: &mut ShellState) -> Result<(), ProcessError> {
        let signals = SignalPolicy::install()?;
        let result = Supervisor::new(Highlighter::plain()).launch(command, &signals, state);
        signals.apply(Disposition::ChildDefault)?;
        result
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(
            ChildOutcome::from_wait_status(3 << 8),
            Some(ChildOutcome::Exited(3))
        );
        assert_eq!(
            ChildOutcome::from_wait_status(libc::SIGKILL),
            Some(ChildOutcome::Signaled(libc::SIGKILL))
        );
        assert_eq!(
            ChildOutcome::from_wait_status((libc::SIGTSTP << 8) | 0x7f),
            Some(ChildOutcome::Stopped)
        );
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(ChildOutcome::Exited(3).status(), Some(3));
        assert_eq!(ChildOutcome::Signaled(9).status(), Some(137));
        assert_eq!(ChildOutcome::Stopped.status(), None);
    }

    #[test]
    fn test_exec_plan_rejects_nul() {
        let result = ExecPlan::new(&["echo".to_string(), "a\0b".to_string()]);
        assert!(matches!(result, Err(ProcessError::InvalidArgument(_))));
    }

    #[test]
    fn test_exec_plan_path_detection() -> Result<(), ProcessError> {
        assert!(ExecPlan::new(&["/bin/echo".to_string()])?.by_path);
        assert!(ExecPlan::new(&["./run".to_string()])?.by_path);
        assert!(!ExecPlan::new(&["echo".to_string()])?.by_path);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_foreground_exit_status() -> Result<(), ProcessError> {
        let mut state = ShellState::with_pid(1, "");
        launch(&ParsedCommand::new(["sh", "-c", "exit 3"]), &mut state)?;
        assert_eq!(state.last_exit_status, 3);

        launch(&ParsedCommand::new(["true"]), &mut state)?;
        assert_eq!(state.last_exit_status, 0);
        assert_eq!(state.last_background_pid, None);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_foreground_signal_status() -> Result<(), ProcessError> {
        let mut state = ShellState::with_pid(1, "");
        launch(&ParsedCommand::new(["sh", "-c", "kill -9 $$"]), &mut state)?;
        assert_eq!(state.last_exit_status, 128 + libc::SIGKILL);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_exec_failure_exits_child() -> Result<(), ProcessError> {
        let mut state = ShellState::with_pid(1, "");
        launch(
            &ParsedCommand::new(["definitely-not-a-command-vena"]),
            &mut state,
        )?;
        assert_eq!(state.last_exit_status, libc::ENOENT);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_output_redirect_truncates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");
        fs::write(&out, "old contents that are longer\n")?;

        let mut command = ParsedCommand::new(["echo", "hello"]);
        command.output_redirect = Some(out.to_string_lossy().into_owned());
        let mut state = ShellState::with_pid(1, "");
        launch(&command, &mut state)?;

        assert_eq!(state.last_exit_status, 0);
        assert_eq!(fs::read_to_string(&out)?, "hello\n");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_input_redirect_creates_missing_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("missing.txt");
        let out = dir.path().join("copy.txt");

        let mut command = ParsedCommand::new(["cat"]);
        command.input_redirect = Some(input.to_string_lossy().into_owned());
        command.output_redirect = Some(out.to_string_lossy().into_owned());
        let mut state = ShellState::with_pid(1, "");
        launch(&command, &mut state)?;

        assert_eq!(state.last_exit_status, 0);
        assert!(input.exists());
        assert_eq!(fs::read_to_string(&out)?, "");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_input_redirect_reads_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "b\na\n")?;

        let mut command = ParsedCommand::new(["sort"]);
        command.input_redirect = Some(input.to_string_lossy().into_owned());
        command.output_redirect = Some(out.to_string_lossy().into_owned());
        let mut state = ShellState::with_pid(1, "");
        launch(&command, &mut state)?;

        assert_eq!(fs::read_to_string(&out)?, "a\nb\n");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_redirect_failure_exits_child() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut command = ParsedCommand::new(["echo", "hi"]);
        command.output_redirect = Some(
            dir.path()
                .join("no/such/dir/out")
                .to_string_lossy()
                .into_owned(),
        );
        let mut state = ShellState::with_pid(1, "");
        launch(&command, &mut state)?;

        assert_eq!(state.last_exit_status, libc::ENOENT);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_background_then_reap() -> Result<(), ProcessError> {
        let mut state = ShellState::with_pid(1, "");
        state.last_exit_status = 9;
        let mut command = ParsedCommand::new(["true"]);
        command.is_background = true;
        launch(&command, &mut state)?;

        let pid = state.last_background_pid.expect("background pid recorded");
        assert!(pid > 0);
        assert!(state.background_pending_reap);
        assert_eq!(state.last_exit_status, 9);

        // The child may already have been collected by the immediate poll.
        let deadline = Instant::now() + Duration::from_secs(5);
        while unsafe { libc::kill(pid, 0) } == 0 && Instant::now() < deadline {
            let _ = wait_nohang(pid)?;
            thread::sleep(Duration::from_millis(10));
        }

        Supervisor::new(Highlighter::plain()).reap(&mut state)?;
        assert!(!state.background_pending_reap);
        assert_eq!(state.last_background_pid, Some(pid));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_reap_without_pending_is_noop() -> Result<(), ProcessError> {
        let mut state = ShellState::with_pid(1, "");
        Supervisor::new(Highlighter::plain()).reap(&mut state)?;
        assert!(!state.background_pending_reap);
        Ok(())
    }
}
