use std::io::{self, Write};
use std::os::unix::io::RawFd;

use log::debug;
use rustyline::config::Behavior;
use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};

use crate::error::ShellError;

const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line, including its newline when the input had one.
    Line(String),
    /// SIGINT arrived before a full line was read.
    Interrupted,
    Eof,
}

pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError>;
}

/// Reads lines with raw `read(2)` calls so an interrupted read is visible.
pub struct StdinReader {
    fd: RawFd,
    pending: Vec<u8>,
    eof: bool,
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinReader {
    pub fn new() -> Self {
        Self::from_fd(libc::STDIN_FILENO)
    }

    /// The descriptor stays owned by the caller.
    pub fn from_fd(fd: RawFd) -> Self {
        Self {
            fd,
            pending: Vec::with_capacity(CHUNK_SIZE),
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = unsafe { libc::read(self.fd, chunk.as_mut_ptr().cast(), chunk.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        let n = n as usize;
        self.pending.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn take_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None if self.eof && !self.pending.is_empty() => self.pending.len(),
            None => return None,
        };
        let line: Vec<u8> = self.pending.drain(..end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl LineSource for StdinReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError> {
        io::stdout().flush()?;
        let mut stderr = io::stderr().lock();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;
        drop(stderr);

        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadOutcome::Line(line));
            }
            if self.eof {
                return Ok(ReadOutcome::Eof);
            }

            match self.fill() {
                Ok(0) => self.eof = true,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    debug!("read interrupted, dropping {} bytes", self.pending.len());
                    self.pending.clear();
                    return Ok(ReadOutcome::Interrupted);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Line editing through rustyline for interactive terminals.
pub struct EditorReader {
    editor: DefaultEditor,
}

impl EditorReader {
    pub fn new() -> Result<Self, ShellError> {
        let config = EditorConfig::builder()
            .behavior(Behavior::PreferTerm)
            .auto_add_history(false)
            .build();
        Ok(Self {
            editor: DefaultEditor::with_config(config)?,
        })
    }
}

impl LineSource for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError> {
        io::stdout().flush()?;
        match self.editor.readline(prompt) {
            Ok(mut line) => {
                line.push('\n');
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Disposition, SignalPolicy};
    use serial_test::serial;
    use std::thread;
    use std::time::Duration;

    struct Pipe {
        read: RawFd,
        write: RawFd,
    }

    impl Pipe {
        fn new() -> io::Result<Self> {
            let mut fds = [0; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(Pipe {
                read: fds[0],
                write: fds[1],
            })
        }

        fn write(&self, data: &[u8]) {
            let n = unsafe { libc::write(self.write, data.as_ptr().cast(), data.len()) };
            assert_eq!(n, data.len() as isize);
        }

        fn close_write(&mut self) {
            unsafe { libc::close(self.write) };
            self.write = -1;
        }
    }

    impl Drop for Pipe {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.read);
                if self.write != -1 {
                    libc::close(self.write);
                }
            }
        }
    }

    #[test]
    fn test_reads_lines_then_eof() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipe = Pipe::new()?;
        pipe.write(b"echo a\n\nls -l");
        pipe.close_write();

        let mut reader = StdinReader::from_fd(pipe.read);
        assert_eq!(reader.read_line("")?, ReadOutcome::Line("echo a\n".into()));
        assert_eq!(reader.read_line("")?, ReadOutcome::Line("\n".into()));
        assert_eq!(reader.read_line("")?, ReadOutcome::Line("ls -l".into()));
        assert_eq!(reader.read_line("")?, ReadOutcome::Eof);
        assert_eq!(reader.read_line("")?, ReadOutcome::Eof);
        Ok(())
    }

    #[test]
    fn test_non_utf8_is_lossy() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipe = Pipe::new()?;
        pipe.write(b"echo \xff\n");
        pipe.close_write();

        let mut reader = StdinReader::from_fd(pipe.read);
        assert_eq!(
            reader.read_line("")?,
            ReadOutcome::Line("echo \u{fffd}\n".into())
        );
        Ok(())
    }

    #[test]
    #[serial]
    fn test_interrupt_aborts_read() -> Result<(), Box<dyn std::error::Error>> {
        let pipe = Pipe::new()?;
        pipe.write(b"partial");

        let policy = SignalPolicy::install()?;
        policy.apply(Disposition::InterruptibleRead)?;

        let reader_thread = unsafe { libc::pthread_self() };
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            unsafe { libc::pthread_kill(reader_thread, libc::SIGINT) };
        });

        let mut reader = StdinReader::from_fd(pipe.read);
        let outcome = reader.read_line("");
        interrupter.join().expect("interrupter thread");
        policy.apply(Disposition::ChildDefault)?;

        assert_eq!(outcome?, ReadOutcome::Interrupted);

        pipe.write(b" line\n");
        assert_eq!(reader.read_line("")?, ReadOutcome::Line(" line\n".into()));
        Ok(())
    }
}
