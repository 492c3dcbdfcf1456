use crate::core::commands::Flow;
use crate::core::expander::Expander;
use crate::core::parser;
use crate::error::ShellError;
use crate::input::split_words;

pub(crate) trait CommandHandler {
    fn execute_line(&mut self, line: &str) -> Result<Flow, ShellError>;
}

impl CommandHandler for super::Shell {
    fn execute_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let mut words = split_words(line, &self.config.separators);
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        Expander::new(&self.state).expand_all(&mut words);

        if let Some(builtin) = words.first().and_then(|name| self.builtins.get(name)) {
            return match builtin.execute(&words[1..], &mut self.state) {
                Ok(flow) => Ok(flow),
                Err(e) => {
                    self.state.last_exit_status = e.exit_code();
                    self.report_error(&e.to_string());
                    Ok(Flow::Continue)
                }
            };
        }

        let Some(command) = parser::parse(words) else {
            return Ok(Flow::Continue);
        };

        match self.supervisor.launch(&command, &self.signals, &mut self.state) {
            Ok(()) => Ok(Flow::Continue),
            Err(e) if e.is_recoverable() => {
                self.state.last_exit_status = e.exit_code();
                self.report_error(&e.to_string());
                Ok(Flow::Continue)
            }
            Err(e) => Err(e.into()),
        }
    }
}
