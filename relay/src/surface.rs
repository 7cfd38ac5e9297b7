//! Surface handle — owns one sandbox child process and its IO tasks.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{HostMessage, SurfaceMessage};
use crate::types::{RelayError, StopReason, SurfaceConfig, SurfaceEvent, SurfaceRole};

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Environment kept when spawning a sandbox. Everything else is scrubbed —
/// user code runs on the other side of this pipe.
const SANDBOX_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "TERM"];

pub(crate) enum WriterCommand {
    Send(HostMessage),
    Shutdown,
}

/// A running rendering surface.
///
/// Dropping the handle kills the child (`kill_on_drop`); prefer
/// [`Surface::shutdown`] for a bounded, graceful exit.
#[derive(Debug)]
pub(crate) struct Surface {
    role: SurfaceRole,
    /// `None` only for handles created without a process (tests).
    child: Option<Child>,
    writer_tx: mpsc::Sender<WriterCommand>,
    #[allow(dead_code)]
    reader_handle: tokio::task::JoinHandle<()>,
    #[allow(dead_code)]
    writer_handle: tokio::task::JoinHandle<()>,
}

impl Surface {
    /// Spawn the configured sandbox and wire up its IO tasks.
    pub fn spawn(
        role: SurfaceRole,
        config: &SurfaceConfig,
        event_tx: mpsc::Sender<SurfaceEvent>,
    ) -> Result<Self, RelayError> {
        let resolved = which::which(&config.command).map_err(|source| {
            RelayError::CommandNotFound {
                command: config.command.clone(),
                source,
            }
        })?;

        let mut cmd = Command::new(&resolved);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .env_clear();
        for key in SANDBOX_ENV_ALLOWLIST {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }

        let mut child = cmd.spawn().map_err(|source| RelayError::Spawn {
            command: config.command.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or(RelayError::MissingPipe {
            command: config.command.clone(),
            stream: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or(RelayError::MissingPipe {
            command: config.command.clone(),
            stream: "stdout",
        })?;

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(message) => {
                        if let Err(e) = writer.write_frame(&message).await {
                            tracing::warn!(surface = role.label(), "surface write error: {e}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
            // Ending the task drops the writer and closes the sandbox's stdin.
        });

        let reader_handle = tokio::spawn(async move {
            let mut reader = FrameReader::new(stdout);
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        let Ok(message) = serde_json::from_value::<SurfaceMessage>(frame) else {
                            tracing::trace!(
                                surface = role.label(),
                                "ignoring unrecognized frame from sandbox"
                            );
                            continue;
                        };
                        if event_tx
                            .send(SurfaceEvent::Reply { role, message })
                            .await
                            .is_err()
                        {
                            // Relay unmounted; nobody is listening.
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(surface = role.label(), "sandbox closed its stdout");
                        let _ = event_tx
                            .send(SurfaceEvent::Stopped {
                                role,
                                reason: StopReason::Exited,
                            })
                            .await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(surface = role.label(), "surface read error: {e}");
                        let _ = event_tx
                            .send(SurfaceEvent::Stopped {
                                role,
                                reason: StopReason::Failed(e.to_string()),
                            })
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(Self {
            role,
            child: Some(child),
            writer_tx,
            reader_handle,
            writer_handle,
        })
    }

    /// Enqueue one protocol message for the sandbox.
    pub async fn send(&self, message: HostMessage) -> Result<(), RelayError> {
        self.writer_tx
            .send(WriterCommand::Send(message))
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    /// Stop the sandbox: close its stdin, wait briefly, then kill.
    /// Consumes self.
    pub async fn shutdown(mut self) {
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        if let Some(mut child) = self.child.take() {
            let waited = tokio::time::timeout(
                std::time::Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
                child.wait(),
            )
            .await;
            if waited.is_err() {
                tracing::debug!(
                    surface = self.role.label(),
                    "sandbox didn't exit in time, killing"
                );
                let _ = child.kill().await;
            }
        }
    }

    /// A handle with no process behind it; messages land in the returned
    /// receiver. Must be called from a runtime.
    #[cfg(test)]
    pub fn test_handle(role: SurfaceRole) -> (Self, mpsc::Receiver<WriterCommand>) {
        let (writer_tx, writer_rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        let surface = Self {
            role,
            child: None,
            writer_tx,
            reader_handle: tokio::spawn(async {}),
            writer_handle: tokio::spawn(async {}),
        };
        (surface, writer_rx)
    }
}
