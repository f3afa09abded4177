use std::io::{BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command as OsCommand, Stdio};

use log::{debug, info, warn};

use super::command::{Command, DexRequest, Response};
use super::config::BridgeConfig;
use super::error::BridgeError;
use super::framing::read_frame;

/// The running worker and its pipes. Never repaired, only replaced.
struct ProcessHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessHandle {
    fn spawn(config: &BridgeConfig) -> Result<ProcessHandle, BridgeError> {
        let spawn_error = |source| BridgeError::Spawn {
            program: config.program.clone(),
            source,
        };
        let mut child = OsCommand::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => {
                info!("Started worker {} (pid {})", config.program, child.id());
                Ok(ProcessHandle {
                    child,
                    stdin,
                    stdout: BufReader::new(stdout),
                })
            }
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                Err(spawn_error(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "worker pipes unavailable",
                )))
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn exchange(&mut self, frame: &str) -> Result<String, BridgeError> {
        self.stdin.write_all(frame.as_bytes())?;
        self.stdin.flush()?;
        read_frame(&mut self.stdout)
    }
}

/// Owns one long lived worker process and runs one request/response exchange at a time.
///
/// `send` takes `&mut self`, so exchanges on one bridge cannot interleave; share a bridge
/// between threads through [`crate::editor::DexEditor`], which serialises access. There is no
/// read timeout: a worker that stops answering blocks the caller.
pub struct ProcessBridge {
    config: BridgeConfig,
    handle: Option<ProcessHandle>,
}

impl ProcessBridge {
    pub fn new(config: BridgeConfig) -> Self {
        ProcessBridge { config, handle: None }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// True if a worker has been started and has not exited
    pub fn is_running(&mut self) -> bool {
        self.handle.as_mut().map_or(false, |h| h.is_alive())
    }

    /// OS pid of the current worker, if one is running
    pub fn worker_id(&mut self) -> Option<u32> {
        let h = self.handle.as_mut()?;
        if h.is_alive() {
            Some(h.child.id())
        } else {
            None
        }
    }

    fn ensure_process(&mut self) -> Result<&mut ProcessHandle, BridgeError> {
        if let Some(mut h) = self.handle.take() {
            if h.is_alive() {
                return Ok(self.handle.insert(h));
            }
            warn!("Worker (pid {}) has exited, starting a new one", h.child.id());
            let _ = h.child.wait();
        }
        Ok(self.handle.insert(ProcessHandle::spawn(&self.config)?))
    }

    /// Writes one request frame and reads back one response frame.
    ///
    /// A worker side failure comes back as `Ok` with `success == false`. Transport, framing
    /// and decode problems come back as `Err`; a worker that died is replaced on the next call.
    pub fn send(&mut self, command: &Command) -> Result<Response, BridgeError> {
        let frame = command.to_frame()?;
        debug!("Sending {} with {} args", command.name, command.args.len());
        let handle = self.ensure_process()?;
        let text = match handle.exchange(&frame) {
            Ok(text) => text,
            Err(e) => {
                // the stream position is unknown now, so the worker is not reused
                self.discard();
                return Err(e);
            }
        };
        serde_json::from_str(&text).map_err(|source| BridgeError::Decode { text, source })
    }

    fn discard(&mut self) {
        if let Some(mut h) = self.handle.take() {
            warn!("Dropping worker (pid {}) after a failed exchange", h.child.id());
            let _ = h.child.kill();
            let _ = h.child.wait();
        }
    }

    /// Asks the worker to shut down, then kills it. Failures are ignored and the handle is
    /// always cleared, so the next `send` starts a fresh worker.
    pub fn close(&mut self) {
        if let Some(mut h) = self.handle.take() {
            if let Ok(frame) = DexRequest::Close.to_command().to_frame() {
                let _ = h.stdin.write_all(frame.as_bytes());
                let _ = h.stdin.flush();
            }
            let _ = h.child.kill();
            let _ = h.child.wait();
            info!("Stopped worker {}", self.config.program);
        }
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        self.close();
    }
}
