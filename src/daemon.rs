//! Daemon supervisor — PID file management for the HTTP server.
//!
//! `start` spawns a detached `engram serve` process and records its PID;
//! `stop` sends SIGTERM and removes the PID file. Liveness probes use
//! `kill(pid, 0)`, so a PID file left behind by a crashed process is detected
//! as stale and cleaned up.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::EngramConfig;

#[derive(Debug, PartialEq, Eq)]
pub enum DaemonStatus {
    Running(i32),
    /// PID file exists but the process is gone.
    Stale(i32),
    Stopped,
}

/// Probe the daemon via its PID file.
pub fn status(config: &EngramConfig) -> DaemonStatus {
    match read_pid(&config.pid_file_path()) {
        Some(pid) if process_alive(pid) => DaemonStatus::Running(pid),
        Some(pid) => DaemonStatus::Stale(pid),
        None => DaemonStatus::Stopped,
    }
}

/// Spawn a detached `engram serve` process and write its PID file.
pub fn start(config: &EngramConfig) -> Result<i32> {
    match status(config) {
        DaemonStatus::Running(pid) => {
            anyhow::bail!("daemon already running (pid {pid})");
        }
        DaemonStatus::Stale(pid) => {
            tracing::warn!(pid, "removing stale PID file");
            let _ = fs::remove_file(config.pid_file_path());
        }
        DaemonStatus::Stopped => {}
    }

    let data_dir = config.resolved_data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let log_path = config.log_file_path();
    let log = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;
    let log_err = log.try_clone()?;

    let exe = std::env::current_exe().context("failed to resolve current executable")?;
    let child = Command::new(exe)
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .context("failed to spawn server process")?;

    let pid = child.id() as i32;
    fs::write(config.pid_file_path(), pid.to_string())
        .context("failed to write PID file")?;

    tracing::info!(pid, log = %log_path.display(), "daemon started");
    Ok(pid)
}

/// SIGTERM the daemon and remove its PID file. Returns `true` when a running
/// process was signalled.
pub fn stop(config: &EngramConfig) -> Result<bool> {
    let pid_path = config.pid_file_path();
    let Some(pid) = read_pid(&pid_path) else {
        return Ok(false);
    };

    let was_running = process_alive(pid);
    if was_running {
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            anyhow::bail!("failed to signal pid {pid}: {}", std::io::Error::last_os_error());
        }
        tracing::info!(pid, "sent SIGTERM");
    } else {
        tracing::warn!(pid, "process already gone, cleaning up PID file");
    }

    fs::remove_file(&pid_path)
        .with_context(|| format!("failed to remove PID file {}", pid_path.display()))?;
    Ok(was_running)
}

/// Stop (if running) then start.
pub fn restart(config: &EngramConfig) -> Result<i32> {
    stop(config)?;
    start(config)
}

fn read_pid(path: &Path) -> Option<i32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.trim().parse::<i32>().ok()
}

/// Signal 0 probes for existence without delivering anything.
fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    unsafe { libc::kill(pid, 0) == 0 }
}
