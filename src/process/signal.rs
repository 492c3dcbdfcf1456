use std::io;
use std::mem::MaybeUninit;

use libc::{c_int, sighandler_t};
use log::trace;
use signal_hook::low_level::signal_name;

use super::ProcessError;

/// The three ways the shell arranges SIGINT and SIGTSTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Both signals ignored. The shell sits in this state except while reading.
    Ignore,
    /// SIGINT runs a no-op handler without `SA_RESTART`, so a blocked `read`
    /// returns `EINTR`.
    InterruptibleRead,
    /// Whatever the process inherited at start-up. Applied in forked children.
    ChildDefault,
}

pub extern "C" fn interrupt_read(_: c_int) {
    // Do nothing, the interrupted read does the work
}

/// Owns the dispositions that were in place before the shell took over.
pub struct SignalPolicy {
    saved_int: libc::sigaction,
    saved_tstp: libc::sigaction,
}

impl SignalPolicy {
    /// Ignore SIGINT and SIGTSTP for the shell, remembering what was there.
    pub fn install() -> Result<Self, ProcessError> {
        let ignore = action(libc::SIG_IGN, false);
        let saved_int = swap(libc::SIGINT, &ignore)?;
        let saved_tstp = swap(libc::SIGTSTP, &ignore)?;

        Ok(SignalPolicy {
            saved_int,
            saved_tstp,
        })
    }

    pub fn apply(&self, disposition: Disposition) -> Result<(), ProcessError> {
        trace!(
            "{}/{} -> {:?}",
            signal_name(libc::SIGINT).unwrap_or("SIGINT"),
            signal_name(libc::SIGTSTP).unwrap_or("SIGTSTP"),
            disposition
        );

        match disposition {
            Disposition::Ignore => {
                let ignore = action(libc::SIG_IGN, false);
                swap(libc::SIGINT, &ignore)?;
                swap(libc::SIGTSTP, &ignore)?;
            }
            Disposition::InterruptibleRead => {
                let handler = interrupt_read as *const () as sighandler_t;
                swap(libc::SIGINT, &action(handler, true))?;
            }
            Disposition::ChildDefault => {
                swap(libc::SIGINT, &self.saved_int)?;
                swap(libc::SIGTSTP, &self.saved_tstp)?;
            }
        }
        Ok(())
    }
}

fn action(handler: sighandler_t, block_all: bool) -> libc::sigaction {
    let mut sa = unsafe { MaybeUninit::<libc::sigaction>::zeroed().assume_init() };
    sa.sa_sigaction = handler;
    sa.sa_flags = 0;
    unsafe {
        if block_all {
            libc::sigfillset(&mut sa.sa_mask);
        } else {
            libc::sigemptyset(&mut sa.sa_mask);
        }
    }
    sa
}

fn swap(signum: c_int, new: &libc::sigaction) -> Result<libc::sigaction, ProcessError> {
    let mut old = MaybeUninit::<libc::sigaction>::zeroed();
    match unsafe { libc::sigaction(signum, new, old.as_mut_ptr()) } {
        -1 => Err(ProcessError::Signal(io::Error::last_os_error())),
        _ => Ok(unsafe { old.assume_init() }),
    }
}

/// Query the current disposition of `signum` without changing it.
#[cfg(test)]
fn current(signum: c_int) -> Result<libc::sigaction, ProcessError> {
    let mut old = MaybeUninit::<libc::sigaction>::zeroed();
    match unsafe { libc::sigaction(signum, std::ptr::null(), old.as_mut_ptr()) } {
        -1 => Err(ProcessError::Signal(io::Error::last_os_error())),
        _ => Ok(unsafe { old.assume_init() }),
    }
}

/// Send SIGCONT to a stopped child.
pub fn resume(pid: libc::pid_t) -> Result<(), ProcessError> {
    send(pid, libc::SIGCONT)
}

pub fn send(pid: libc::pid_t, signum: c_int) -> Result<(), ProcessError> {
    match unsafe { libc::kill(pid, signum) } {
        -1 => Err(ProcessError::Kill(io::Error::last_os_error())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_install_ignores_and_restores() -> Result<(), ProcessError> {
        let before = current(libc::SIGINT)?.sa_sigaction;
        let policy = SignalPolicy::install()?;

        assert_eq!(current(libc::SIGINT)?.sa_sigaction, libc::SIG_IGN);
        assert_eq!(current(libc::SIGTSTP)?.sa_sigaction, libc::SIG_IGN);

        policy.apply(Disposition::ChildDefault)?;
        assert_eq!(current(libc::SIGINT)?.sa_sigaction, before);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_interruptible_read_does_not_restart() -> Result<(), ProcessError> {
        let policy = SignalPolicy::install()?;
        policy.apply(Disposition::InterruptibleRead)?;

        let installed = current(libc::SIGINT)?;
        assert_eq!(installed.sa_sigaction, interrupt_read as *const () as sighandler_t);
        assert_eq!(installed.sa_flags & libc::SA_RESTART, 0);
        assert_eq!(current(libc::SIGTSTP)?.sa_sigaction, libc::SIG_IGN);

        policy.apply(Disposition::Ignore)?;
        assert_eq!(current(libc::SIGINT)?.sa_sigaction, libc::SIG_IGN);

        policy.apply(Disposition::ChildDefault)?;
        Ok(())
    }

    #[test]
    #[serial]
    fn test_send_to_missing_process() {
        // pid_t max is never a live process
        let result = send(libc::pid_t::MAX, 0);
        assert!(matches!(result, Err(ProcessError::Kill(_))));
    }
}
