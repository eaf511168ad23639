//! Simulated analyzer actor task
//!
//! Drives a [`SimAnalyzer`] over an async duplex stream with a select
//! loop: command lines are read and processed, queued responses are
//! written back, and a timer emits sweep frames while the device is in
//! continuous sweep mode.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::device::SimAnalyzer;

/// Commands for a running simulator task
#[derive(Debug)]
pub enum SimCommand {
    /// Replace the amplitude profile used for subsequent sweeps
    SetProfile(Vec<u8>),
    /// Shut the simulator down
    Shutdown,
}

/// Run the simulator until the stream closes or shutdown is requested
pub async fn run_sim_analyzer<S>(
    mut stream: S,
    mut device: SimAnalyzer,
    mut cmd_rx: mpsc::Receiver<SimCommand>,
    sweep_interval: Duration,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];
    let mut line_buf: Vec<u8> = Vec::new();
    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("simulated analyzer started");

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("sim stream closed");
                    break;
                }
                Ok(n) => {
                    line_buf.extend_from_slice(&buf[..n]);
                    while let Some(eol) = line_buf.iter().position(|&b| b == b'\r' || b == b'\n') {
                        let line: Vec<u8> = line_buf.drain(..=eol).collect();
                        let line = String::from_utf8_lossy(&line[..line.len() - 1]);
                        let line = line.trim();
                        if !line.is_empty() {
                            device.handle_line(line);
                        }
                    }
                    while let Some(frame) = device.take_output() {
                        stream.write_all(&frame).await?;
                    }
                    stream.flush().await?;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    warn!("sim stream error: {}", e);
                    return Err(e);
                }
            },

            cmd = cmd_rx.recv() => match cmd {
                Some(SimCommand::SetProfile(profile)) => device.set_profile(profile),
                Some(SimCommand::Shutdown) | None => {
                    debug!("sim shutdown requested");
                    break;
                }
            },

            _ = ticker.tick(), if device.is_sweeping() => {
                stream.write_all(&device.sweep_frame()).await?;
                stream.flush().await?;
            }
        }
    }

    info!("simulated analyzer ended");
    Ok(())
}

/// Spawn a simulator on one end of an in-memory duplex stream.
///
/// Returns the host end (connect a session to it), the command sender,
/// and the task handle.
pub fn spawn_sim(
    device: SimAnalyzer,
    sweep_interval: Duration,
) -> (DuplexStream, mpsc::Sender<SimCommand>, JoinHandle<io::Result<()>>) {
    let (host, sim) = tokio::io::duplex(4096);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let handle = tokio::spawn(run_sim_analyzer(sim, device, cmd_rx, sweep_interval));
    (host, cmd_tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_protocol::SweepConfig;
    use tokio::io::AsyncWriteExt;

    fn test_device() -> SimAnalyzer {
        SimAnalyzer::new(SweepConfig {
            start_freq_mhz: 1000.0,
            end_freq_mhz: 1002.0,
            step_count: 3,
            rbw_khz: 600.0,
        })
    }

    #[tokio::test]
    async fn test_config_request_round_trip() {
        let (mut host, _cmd_tx, task) = spawn_sim(test_device(), Duration::from_millis(10));

        host.write_all(b"#0C0\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = host.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"$C10000000002000\r\n");

        drop(host);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sweep_frames_flow_after_start() {
        let (mut host, _cmd_tx, task) = spawn_sim(test_device(), Duration::from_millis(5));

        host.write_all(b"#0C3\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(Duration::from_millis(500), host.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(n >= 7);
        assert_eq!(&buf[..2], b"$S");
        assert_eq!(buf[2], 3);

        // The sim may be mid-write when the host end drops; either exit is fine
        drop(host);
        let _ = task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_command_ends_task() {
        let (_host, cmd_tx, task) = spawn_sim(test_device(), Duration::from_millis(10));

        cmd_tx.send(SimCommand::Shutdown).await.unwrap();
        tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
