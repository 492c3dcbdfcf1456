use libc::pid_t;

/// Run-time values the expander reads and the supervisor updates.
#[derive(Debug, Clone)]
pub struct ShellState {
    current_pid: u32,
    pub last_exit_status: i32,
    pub last_background_pid: Option<pid_t>,
    pub home_dir: String,
    /// Set when a child went to the background; the next prompt polls for it.
    pub background_pending_reap: bool,
}

impl ShellState {
    pub fn new(home_dir: impl Into<String>) -> Self {
        Self::with_pid(std::process::id(), home_dir)
    }

    pub fn with_pid(current_pid: u32, home_dir: impl Into<String>) -> Self {
        ShellState {
            current_pid,
            last_exit_status: 0,
            last_background_pid: None,
            home_dir: home_dir.into(),
            background_pending_reap: false,
        }
    }

    pub fn current_pid(&self) -> u32 {
        self.current_pid
    }

    pub fn track_background(&mut self, pid: pid_t) {
        self.last_background_pid = Some(pid);
        self.background_pending_reap = true;
    }
}
