//! Alarm actor.
//!
//! Serializes every event that can move the alarm: risk updates from the
//! poller, forwarded key presses, unlock and acknowledge commands, the
//! double-press deadline and completion of decrease-speed requests. The
//! siren player is owned here, so starting and stopping it never races
//! with a transition.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::machine::{AlarmMachine, Transition};
use crate::api::commands::AlarmCommand;
use crate::api_client::types::{AlarmSnapshot, AudioStatus, PressKind, RiskState};
use crate::backend::Backend;
use crate::siren::SirenPlayer;
use crate::tracing::prelude::*;
use crate::types::DoublePressDetector;

pub struct AlarmController {
    machine: AlarmMachine,
    detector: DoublePressDetector,
    test_key: String,
    siren: SirenPlayer,
    backend: Arc<dyn Backend>,
    risk_rx: watch::Receiver<RiskState>,
    command_rx: mpsc::Receiver<AlarmCommand>,
    snapshot_tx: watch::Sender<AlarmSnapshot>,
    /// Last decrease-speed failure, shown until the next attempt.
    notice: Option<String>,
    speed_requests: JoinSet<Result<(), String>>,
}

impl AlarmController {
    pub fn new(
        siren: SirenPlayer,
        backend: Arc<dyn Backend>,
        test_key: impl Into<String>,
        risk_rx: watch::Receiver<RiskState>,
        command_rx: mpsc::Receiver<AlarmCommand>,
        snapshot_tx: watch::Sender<AlarmSnapshot>,
    ) -> Self {
        Self {
            machine: AlarmMachine::new(),
            detector: DoublePressDetector::default(),
            test_key: test_key.into(),
            siren,
            backend,
            risk_rx,
            command_rx,
            snapshot_tx,
            notice: None,
            speed_requests: JoinSet::new(),
        }
    }

    pub async fn run(mut self, cancellation: CancellationToken) {
        let mut mode_rx = self.siren.subscribe_mode();
        let mut risk_open = true;

        // Vibration may already be high at startup.
        let vibration_alarm = self.risk_rx.borrow_and_update().vibration_alarm;
        self.observe(vibration_alarm, &cancellation);
        self.publish();

        loop {
            let deadline = self.detector.deadline();

            tokio::select! {
                _ = cancellation.cancelled() => break,
                changed = self.risk_rx.changed(), if risk_open => {
                    if changed.is_err() {
                        warn!("Risk channel closed, alarm no longer follows telemetry");
                        risk_open = false;
                        continue;
                    }
                    let vibration_alarm = self.risk_rx.borrow_and_update().vibration_alarm;
                    self.observe(vibration_alarm, &cancellation);
                }
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command, &cancellation);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.detector.expire(Instant::now());
                    continue;
                }
                Some(joined) = self.speed_requests.join_next() => {
                    self.speed_request_done(joined);
                }
                Ok(()) = mode_rx.changed() => {}
            }

            self.publish();
        }

        self.siren.stop();
        self.publish();
        debug!("Alarm controller stopped");
    }

    fn handle_command(&mut self, command: AlarmCommand, cancellation: &CancellationToken) {
        match command {
            AlarmCommand::KeyPress { key, reply } => {
                let kind = self.key_press(&key, cancellation);
                let _ = reply.send(kind);
            }
            AlarmCommand::UnlockAudio { reply } => {
                let result = self.siren.unlock().map_err(anyhow::Error::new);
                if result.is_ok() {
                    info!("Audio unlocked by user interaction");
                }
                let _ = reply.send(result);
            }
            AlarmCommand::ClipFailed { reason, reply } => {
                warn!(reason = %reason, "Render surface failed to play siren clip");
                self.siren.report_clip_failure(&reason);
                let _ = reply.send(());
            }
            AlarmCommand::Acknowledge { reply } => {
                // Silence before the remote call.
                match self.machine.acknowledge() {
                    Some(transition) => self.apply(transition, cancellation),
                    None => self.siren.stop(),
                }
                self.detector.reset();
                self.notice = None;

                let backend = self.backend.clone();
                self.speed_requests.spawn(async move {
                    let result = backend.decrease_speed().await;
                    let outcome = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
                    let _ = reply.send(
                        result.map_err(|e| anyhow::Error::new(e).context("decrease-speed failed")),
                    );
                    outcome
                });
            }
        }
    }

    fn key_press(&mut self, key: &str, cancellation: &CancellationToken) -> PressKind {
        if let Err(e) = self.siren.unlock() {
            debug!(error = %e, "Key press did not unlock audio");
        }

        if !key.eq_ignore_ascii_case(&self.test_key) {
            return PressKind::Ignored;
        }

        let kind = self.detector.press(Instant::now());
        match kind {
            PressKind::Double => match self.machine.manual_trigger() {
                Some(transition) => self.apply(transition, cancellation),
                None => debug!("Alarm already active, test trigger ignored"),
            },
            PressKind::Bounce => trace!("Test key bounce ignored"),
            PressKind::Single | PressKind::Ignored => {}
        }
        kind
    }

    fn observe(&mut self, vibration_alarm: bool, cancellation: &CancellationToken) {
        if let Some(transition) = self.machine.observe(vibration_alarm) {
            self.apply(transition, cancellation);
        }
    }

    fn apply(&mut self, transition: Transition, cancellation: &CancellationToken) {
        match transition {
            Transition::Activated(cause) => {
                warn!(?cause, "Alarm activated");
                self.siren.start(cancellation);
            }
            Transition::Cleared(cause) => {
                info!(?cause, "Alarm cleared");
                self.siren.stop();
            }
        }
    }

    fn speed_request_done(&mut self, joined: Result<Result<(), String>, JoinError>) {
        match joined {
            Ok(Ok(())) => {
                info!("Decrease-speed command accepted");
                self.notice = None;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Decrease-speed command failed");
                self.notice = Some(format!("Decrease-speed command failed: {e}"));
            }
            Err(e) => {
                error!(error = %e, "Decrease-speed task ended abnormally");
            }
        }
    }

    fn publish(&self) {
        let state = self.machine.state();
        let snapshot = AlarmSnapshot {
            triggered: state.triggered,
            active: state.active,
            flashing: state.flashing,
            phase: state.phase(),
            audio: AudioStatus {
                unlocked: self.siren.is_unlocked(),
                mode: self.siren.mode(),
                loop_running: self.siren.is_running(),
            },
            notice: self.notice.clone(),
        };

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
