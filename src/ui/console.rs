// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Interactive line console driving a [`SessionController`]

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

use super::history_view::{render_history, verdict_title};
use crate::capture::{PermissionState, SimulatedDevice};
use crate::core::{ControllerError, PrimaryAction, SessionController};
use crate::scan::{ScanOutcome, ScanStatus};

const HELP: &str = "\
commands:
  scan      primary action: enable camera, scan, or scan again
  allow     request camera and microphone access
  reset     dismiss the last result
  status    show session state
  history   list past verdicts, newest first
  revoke    simulate the capture device disappearing
  close     close the scanner view and release the camera
  help      show this help
  quit      exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan,
    Allow,
    Reset,
    Status,
    History,
    Revoke,
    Close,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" | "s" => Ok(Command::Scan),
            "allow" | "enable" => Ok(Command::Allow),
            "reset" | "again" => Ok(Command::Reset),
            "status" => Ok(Command::Status),
            "history" | "h" => Ok(Command::History),
            "revoke" => Ok(Command::Revoke),
            "close" => Ok(Command::Close),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(anyhow!("unknown command '{}', try 'help'", other)),
        }
    }
}

/// Console front end. Notifications are printed separately by the notifier;
/// this only answers commands.
pub struct Console<'a, W: Write> {
    controller: &'a mut SessionController,
    device: Option<Arc<SimulatedDevice>>,
    out: W,
}

impl<'a, W: Write> Console<'a, W> {
    pub fn new(controller: &'a mut SessionController, out: W) -> Self {
        Self {
            controller,
            device: None,
            out,
        }
    }

    /// Enables `revoke` against a simulated device
    pub fn with_simulated_device(mut self, device: Arc<SimulatedDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Read commands until `quit` or end of input, then close the scanner
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        writeln!(self.out, "Type 'help' for commands.")?;

        while let Some(line) = lines.next_line().await? {
            let command = match parse_line(&line, &mut self.out)? {
                Some(c) => c,
                None => continue,
            };

            debug!("console command {:?}", command);
            let keep_going = match command {
                Command::Quit => false,
                Command::Scan | Command::Allow => self.run_pending(command, &mut lines).await?,
                other => {
                    self.execute(other).await?;
                    true
                }
            };
            if !keep_going {
                break;
            }
            // Give the notifier a turn so toasts show up next to their command
            tokio::task::yield_now().await;
        }

        self.controller.close_scanner();
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Scan => {
                let result = self.controller.primary_action().await;
                report(&mut self.out, result)?;
            }
            Command::Allow => {
                let result = self
                    .controller
                    .request_access()
                    .await
                    .map(|_| PrimaryAction::AccessRequested);
                report(&mut self.out, result)?;
            }
            Command::Reset => {
                if !self.controller.reset_scan() {
                    writeln!(self.out, "Nothing to reset")?;
                }
            }
            Command::Status => {
                let snapshot = self.controller.snapshot();
                writeln!(
                    self.out,
                    "permission: {:?}, scan: {:?}, result: {}, history: {}",
                    snapshot.permission,
                    snapshot.scan_status,
                    snapshot.result.map(verdict_title).unwrap_or("-"),
                    snapshot.history_len,
                )?;
            }
            Command::History => {
                write!(self.out, "{}", render_history(self.controller.history(), Utc::now()))?;
            }
            Command::Revoke => revoke(self.device.as_ref(), &mut self.out)?,
            Command::Close => {
                if self.controller.close_scanner() {
                    writeln!(self.out, "Camera released")?;
                }
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Drive `scan` or `allow` while still answering input.
    ///
    /// `revoke` and `help` run immediately; anything touching the controller
    /// is refused until the operation settles. Ctrl-C drops an in-flight scan,
    /// which cancels it cleanly. Returns false if the user asked to quit.
    async fn run_pending<R: AsyncBufRead + Unpin>(
        &mut self,
        command: Command,
        lines: &mut Lines<R>,
    ) -> Result<bool> {
        let cancellable = command == Command::Scan
            && self.controller.permission_state() == PermissionState::Granted
            && self.controller.scan_status() != ScanStatus::Complete;

        let controller = &mut *self.controller;
        let operation = async move {
            match command {
                Command::Allow => controller
                    .request_access()
                    .await
                    .map(|_| PrimaryAction::AccessRequested),
                _ => controller.primary_action().await,
            }
        };
        tokio::pin!(operation);

        let mut input_open = true;
        let mut quit = false;

        let result = loop {
            tokio::select! {
                biased;
                result = &mut operation => break result,
                _ = tokio::signal::ctrl_c(), if cancellable => {
                    writeln!(self.out, "Interrupted")?;
                    return Ok(!quit);
                }
                line = lines.next_line(), if input_open => {
                    let line = match line? {
                        Some(line) => line,
                        None => {
                            input_open = false;
                            continue;
                        }
                    };
                    match parse_line(&line, &mut self.out)? {
                        Some(Command::Revoke) => revoke(self.device.as_ref(), &mut self.out)?,
                        Some(Command::Help) => writeln!(self.out, "{}", HELP)?,
                        Some(Command::Quit) => {
                            quit = true;
                            writeln!(self.out, "Exiting once the current operation finishes")?;
                        }
                        Some(_) => writeln!(self.out, "Busy, wait for the current operation to finish")?,
                        None => {}
                    }
                }
            }
        };

        report(&mut self.out, result)?;
        Ok(!quit)
    }
}

/// Blank lines and typos yield `None`; typos are answered on `out`
fn parse_line<W: Write>(line: &str, out: &mut W) -> std::io::Result<Option<Command>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    match line.parse::<Command>() {
        Ok(c) => Ok(Some(c)),
        Err(e) => {
            writeln!(out, "{}", e)?;
            Ok(None)
        }
    }
}

fn revoke<W: Write>(device: Option<&Arc<SimulatedDevice>>, out: &mut W) -> std::io::Result<()> {
    match device {
        Some(device) => {
            let ended = device.revoke();
            writeln!(out, "Ended {} stream(s)", ended)
        }
        None => writeln!(out, "revoke needs the simulated device"),
    }
}

fn report<W: Write>(out: &mut W, result: Result<PrimaryAction, ControllerError>) -> std::io::Result<()> {
    match result {
        Ok(PrimaryAction::Scanned(ScanOutcome::Rejected)) => {
            writeln!(out, "A scan is already running")
        }
        Ok(_) => Ok(()),
        Err(ControllerError::NotGranted) => writeln!(out, "Enable the camera first ('allow')"),
        Err(e) => writeln!(out, "{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::config::Config;
    use crate::core::SessionEvent;
    use crate::detection::{ScriptedDetector, Verdict};
    use crate::scan::ScanFailure;

    fn controller(device: &Arc<SimulatedDevice>) -> SessionController {
        let detector = ScriptedDetector::new(vec![Verdict::Authentic, Verdict::Fake]).unwrap();
        SessionController::new(Config::default(), device.clone(), Arc::new(detector)).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("SCAN".parse::<Command>().unwrap(), Command::Scan);
        assert_eq!(" q ".parse::<Command>().unwrap(), Command::Quit);
        assert!("dance".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn test_scripted_session() {
        let device = Arc::new(SimulatedDevice::new("test"));
        let mut session = controller(&device);

        let script: &[u8] = b"scan\nscan\nscan\nscan\nhistory\nstatus\nbogus\nquit\n";
        let mut console = Console::new(&mut session, Vec::new());
        console.run(script).await.unwrap();
        let output = String::from_utf8(console.into_inner()).unwrap();

        // enable, scan (authentic), reset, scan (fake)
        assert!(output.contains("Scan History (2 scans)"));
        assert!(output.contains("result: Deepfake Detected, history: 2"));
        assert!(output.contains("unknown command 'bogus'"));

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().latest().unwrap().status(), Verdict::Fake);
        // quit closes the scanner view
        assert_eq!(device.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_revoke_then_scan_reacquires() {
        let device = Arc::new(SimulatedDevice::new("test"));
        let mut session = controller(&device);

        let script: &[u8] = b"allow\nrevoke\nscan\nstatus\n";
        let mut console = Console::new(&mut session, Vec::new()).with_simulated_device(device.clone());
        console.run(script).await.unwrap();
        let output = String::from_utf8(console.into_inner()).unwrap();

        assert!(output.contains("Ended 1 stream(s)"));
        assert!(output.contains("permission: Granted, scan: Idle"));
        assert_eq!(device.acquire_count(), 2);
        assert!(session.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_during_scan_fails_it() {
        let device = Arc::new(SimulatedDevice::new("test"));
        let detector = ScriptedDetector::always(Verdict::Authentic)
            .with_latency(Duration::from_millis(2500));
        let mut session =
            SessionController::new(Config::default(), device.clone(), Arc::new(detector)).unwrap();
        let mut events = session.event_bus().subscribe_events();

        let script: &[u8] = b"allow\nscan\nrevoke\nstatus\n";
        let mut console = Console::new(&mut session, Vec::new()).with_simulated_device(device.clone());
        console.run(script).await.unwrap();
        let output = String::from_utf8(console.into_inner()).unwrap();

        assert!(output.contains("Ended 1 stream(s)"));
        assert!(output.contains("permission: Unrequested, scan: Idle, result: -, history: 0"));
        assert!(session.history().is_empty());

        let failed: Vec<SessionEvent> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.payload)
            .filter(|p| matches!(p, SessionEvent::ScanFailed { .. }))
            .collect();
        assert_eq!(
            failed,
            vec![SessionEvent::ScanFailed { scan_id: 1, reason: ScanFailure::StreamLost }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller_commands_refused_while_scanning() {
        let device = Arc::new(SimulatedDevice::new("test"));
        let detector = ScriptedDetector::always(Verdict::Fake)
            .with_latency(Duration::from_millis(2500));
        let mut session =
            SessionController::new(Config::default(), device.clone(), Arc::new(detector)).unwrap();

        let script: &[u8] = b"allow\nscan\nhistory\nhelp\n";
        let mut console = Console::new(&mut session, Vec::new());
        console.run(script).await.unwrap();
        let output = String::from_utf8(console.into_inner()).unwrap();

        assert!(output.contains("Busy, wait for the current operation to finish"));
        assert!(output.contains("commands:"));
        // Input ran out mid-scan; the scan still finished
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().latest().unwrap().status(), Verdict::Fake);
    }
}
