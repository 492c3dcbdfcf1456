use std::io::{self, IsTerminal};

use log::debug;

mod executor;

use crate::{
    core::{commands::Builtins, commands::Flow, config::Config, state::ShellState},
    error::ShellError,
    flags::Flags,
    highlight::Highlighter,
    input::{EditorReader, LineSource, ReadOutcome, StdinReader},
    process::{signal, Disposition, SignalPolicy, Supervisor},
};

pub(crate) use executor::CommandHandler;

pub struct Shell {
    pub(crate) config: Config,
    pub(crate) state: ShellState,
    pub(crate) signals: SignalPolicy,
    pub(crate) builtins: Builtins,
    pub(crate) supervisor: Supervisor,
    pub(crate) highlighter: Highlighter,
    input: Box<dyn LineSource>,
}

impl Shell {
    pub fn new(flags: &Flags) -> Result<Self, ShellError> {
        let config = Config::from_env();
        let signals = SignalPolicy::install()?;

        let input: Box<dyn LineSource> = if flags.is_set("edit") && io::stdin().is_terminal() {
            Box::new(EditorReader::new()?)
        } else {
            Box::new(StdinReader::new())
        };

        Ok(Self::with_parts(config, signals, input))
    }

    pub fn with_parts(config: Config, signals: SignalPolicy, input: Box<dyn LineSource>) -> Self {
        let highlighter = Highlighter::new();
        Shell {
            state: ShellState::new(config.home.clone()),
            config,
            signals,
            builtins: Builtins::new(),
            supervisor: Supervisor::new(highlighter),
            highlighter,
            input,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Run until `exit` or end of input; returns the status to exit with.
    pub fn run(&mut self) -> Result<i32, ShellError> {
        debug!("shell {} started", self.state.current_pid());
        loop {
            if let Flow::Exit(code) = self.step()? {
                return self.shutdown(code);
            }
        }
    }

    /// One prompt: reap, read, and handle a single line.
    pub fn step(&mut self) -> Result<Flow, ShellError> {
        self.supervisor.reap(&mut self.state)?;

        match self.read_line()? {
            ReadOutcome::Line(line) => self.execute_line(&line),
            ReadOutcome::Interrupted => {
                eprintln!();
                Ok(Flow::Continue)
            }
            ReadOutcome::Eof => Ok(Flow::Exit(self.state.last_exit_status)),
        }
    }

    fn read_line(&mut self) -> Result<ReadOutcome, ShellError> {
        self.signals.apply(Disposition::InterruptibleRead)?;
        let outcome = self.input.read_line(&self.config.prompt);
        self.signals.apply(Disposition::Ignore)?;
        outcome
    }

    /// Announce the exit and interrupt the rest of our process group.
    pub fn shutdown(&mut self, code: i32) -> Result<i32, ShellError> {
        self.signals.apply(Disposition::Ignore)?;
        eprint!("\nexit\n");
        signal::send(0, libc::SIGINT)?;
        debug!("exiting with {}", code);
        Ok(code)
    }

    pub(crate) fn report_error(&self, message: &str) {
        eprintln!("{}", self.highlighter.error(message));
    }
}
