//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use super::error::FetchError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An external command along with the directory it runs inside.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
}

impl Command {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            dir: PathBuf::new(),
        }
    }

    /// Wraps `line` to be interpreted by the platform's shell.
    pub fn shell(line: &str) -> Self {
        match cfg!(windows) {
            true => Self::new("cmd").args(&["/C", line]),
            false => Self::new("sh").args(&["-c", line]),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    /// Sets the directory from where to run the command.
    pub fn dir(mut self, p: &Path) -> Self {
        self.dir = p.to_path_buf();
        self
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &Vec<String> {
        &self.args
    }

    pub fn get_dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

/// Runs external commands for the fetch backends.
pub trait Runner: Send + Sync {
    /// Runs `cmd` to completion and returns its standard output.
    ///
    /// Implementations must stop the command once `cancel` is raised.
    fn run(&self, cmd: &Command, cancel: &AtomicBool) -> Result<String, FetchError>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout: timeout }
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads a child's pipe to the end on a separate thread so a full pipe
    /// never blocks the child.
    fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut p) = pipe {
                let _ = p.read_to_string(&mut buf);
            }
            buf
        })
    }

    fn stop(child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Runner for ProcessRunner {
    fn run(&self, cmd: &Command, cancel: &AtomicBool) -> Result<String, FetchError> {
        let line = cmd.to_string();
        tracing::debug!("running `{}` in {:?}", line, cmd.get_dir());
        let mut child = std::process::Command::new(cmd.get_program())
            .args(cmd.get_args())
            .current_dir(cmd.get_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::SpawnFailed(line.clone(), cmd.get_dir().clone(), e.to_string()))?;

        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => (),
                Err(e) => {
                    Self::stop(&mut child);
                    return Err(FetchError::SpawnFailed(line, cmd.get_dir().clone(), e.to_string()));
                }
            }
            if cancel.load(Ordering::SeqCst) == true {
                Self::stop(&mut child);
                return Err(FetchError::Cancelled(line, cmd.get_dir().clone()));
            }
            if start.elapsed() >= self.timeout {
                Self::stop(&mut child);
                return Err(FetchError::TimedOut(
                    line,
                    cmd.get_dir().clone(),
                    self.timeout.as_secs(),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = stdout.join().unwrap_or_default();
        let err = stderr.join().unwrap_or_default();
        match status.code() {
            Some(0) => Ok(out),
            Some(num) => Err(FetchError::CommandFailed(line, cmd.get_dir().clone(), num, err)),
            None => Err(FetchError::Terminated(line, cmd.get_dir().clone())),
        }
    }
}
