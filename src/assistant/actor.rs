//! The assistant actor
//!
//! One task owns the mode, the current result, the pending transcript, the
//! analysis slot and the wake-up timer, and handles every input in order:
//! user intents, recognized utterances, timer wake-ups and backend
//! completions. Backend calls run in their own tasks and report back here,
//! so nothing in this loop waits on the network.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handle::{AssistantHandle, AssistantSnapshot, Command, Intent};
use super::phrases;
use super::slot::{AnalysisSlot, SlotPermit};
use super::wakeup::WakeUp;
use crate::analysis::{AnalysisKind, AnalysisResult, LiveReply};
use crate::events::AssistantEvent;
use crate::ports::{BackendError, FrameSource, SpeechInput, SpeechOutput, VisionBackend};
use crate::state::{Mode, ModeEvent, ModeMachine};

/// Live loop pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimings {
    /// Delay between live-frame analyses
    pub cadence: Duration,
    /// Delay before retrying a tick that found the slot taken
    pub busy_retry: Duration,
    /// Delay after a voice reply before the live loop resumes
    pub voice_cooldown: Duration,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(2500),
            busy_retry: Duration::from_millis(500),
            voice_cooldown: Duration::from_millis(4000),
        }
    }
}

/// External resources the assistant drives
#[derive(Clone)]
pub struct Ports {
    pub camera: Arc<dyn FrameSource>,
    pub speaker: Arc<dyn SpeechOutput>,
    pub listener: Arc<dyn SpeechInput>,
    pub backend: Arc<dyn VisionBackend>,
}

enum Internal {
    Heard(String),
    Wake(u64),
    LiveDone {
        session: u64,
        permit: SlotPermit,
        outcome: Result<LiveReply, BackendError>,
    },
    VoiceDone {
        session: u64,
        permit: SlotPermit,
        outcome: Result<LiveReply, BackendError>,
    },
    SingleDone {
        session: u64,
        kind: AnalysisKind,
        outcome: Result<String, BackendError>,
    },
    /// A live or voice request was dropped by its session's token
    Released(SlotPermit),
}

/// One run of live mode. Cancelling the token drops in-flight requests.
struct LiveSession {
    id: u64,
    token: CancellationToken,
}

pub struct Assistant {
    ports: Ports,
    timings: LoopTimings,
    machine: ModeMachine,
    event_tx: broadcast::Sender<AssistantEvent>,
    snapshot_tx: watch::Sender<AssistantSnapshot>,
    result: Option<AnalysisResult>,
    transcript: String,
    slot: AnalysisSlot,
    wakeup: WakeUp<Internal>,
    live: Option<LiveSession>,
    live_sessions: u64,
    /// Voice command waiting for the slot; a newer one replaces it
    queued_voice: Option<String>,
    camera_session: u64,
    camera_token: CancellationToken,
    cmd_rx: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl Assistant {
    pub fn new(
        ports: Ports,
        timings: LoopTimings,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> (Self, AssistantHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(AssistantSnapshot::default());

        let assistant = Self {
            ports,
            timings,
            machine: ModeMachine::new(event_tx.clone()),
            event_tx: event_tx.clone(),
            snapshot_tx,
            result: None,
            transcript: String::new(),
            slot: AnalysisSlot::new(),
            wakeup: WakeUp::new(internal_tx.clone(), Internal::Wake),
            live: None,
            live_sessions: 0,
            queued_voice: None,
            camera_session: 0,
            camera_token: CancellationToken::new(),
            cmd_rx,
            internal_tx,
            internal_rx,
        };
        let handle = AssistantHandle::new(cmd_tx, snapshot_rx, event_tx);

        (assistant, handle)
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!("assistant started in Idle mode");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Intent(intent, reply)) => {
                        self.handle_intent(intent);
                        self.publish();
                        let _ = reply.send(self.machine.mode());
                    }
                    Some(Command::Status(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Command::Shutdown(reply)) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some(msg) = self.internal_rx.recv() => self.handle_internal(msg),
            }

            self.publish();
        }

        info!("assistant stopped");
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::ToggleCamera => self.toggle_camera(),
            Intent::Analyze(kind) => self.start_single_shot(kind),
            Intent::ToggleLive => self.toggle_live(),
            Intent::Transcript(text) => self.on_transcript(text),
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::Heard(text) => self.on_transcript(text),
            Internal::Wake(generation) => {
                if self.wakeup.claim(generation) {
                    self.live_tick();
                } else {
                    debug!(generation, "superseded wake-up ignored");
                }
            }
            Internal::LiveDone {
                session,
                permit,
                outcome,
            } => {
                drop(permit);
                self.on_live_done(session, outcome);
            }
            Internal::VoiceDone {
                session,
                permit,
                outcome,
            } => {
                drop(permit);
                self.on_voice_done(session, outcome);
            }
            Internal::SingleDone {
                session,
                kind,
                outcome,
            } => self.on_single_done(session, kind, outcome),
            Internal::Released(permit) => {
                drop(permit);
                debug!("slot released by a cancelled request");
                self.resume_after_stale();
            }
        }
    }

    // ----- camera -----

    fn toggle_camera(&mut self) {
        if self.machine.mode().camera_on() {
            self.camera_off();
        } else {
            self.camera_on();
        }
    }

    fn camera_on(&mut self) {
        if let Err(e) = self.ports.camera.acquire() {
            error!(%e, "failed to start camera");
            self.say(phrases::CAMERA_UNAVAILABLE, false);
            return;
        }

        self.camera_session += 1;
        self.camera_token = CancellationToken::new();
        self.machine.apply(ModeEvent::CameraOn);
        self.say(phrases::CAMERA_STARTED, false);
    }

    fn camera_off(&mut self) {
        self.end_live_session();
        self.camera_token.cancel();
        self.wakeup.cancel();
        self.ports.speaker.stop();
        self.ports.listener.stop_listening();
        self.ports.camera.release();
        self.machine.apply(ModeEvent::CameraOff);
    }

    // ----- single-shot analysis -----

    fn start_single_shot(&mut self, kind: AnalysisKind) {
        let mode = self.machine.mode();
        if !kind.is_single_shot() {
            warn!(%kind, "not a single-shot analysis kind");
            return;
        }
        if mode.next(ModeEvent::AnalysisStarted).is_none() || !self.ports.camera.is_active() {
            debug!(%mode, %kind, "single-shot analysis ignored");
            return;
        }

        self.ports.speaker.stop();
        let Some(frame) = self.ports.camera.capture_frame() else {
            warn!(%kind, "no frame for single-shot analysis");
            self.say(phrases::CAPTURE_FAILED, false);
            return;
        };

        self.machine.apply(ModeEvent::AnalysisStarted);
        self.say(phrases::ANALYZING, false);
        info!(%kind, "single-shot analysis started");

        let backend = Arc::clone(&self.ports.backend);
        let tx = self.internal_tx.clone();
        let token = self.camera_token.clone();
        let session = self.camera_session;

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = backend.analyze(&frame, kind) => outcome,
            };
            let _ = tx.send(Internal::SingleDone {
                session,
                kind,
                outcome,
            });
        });
    }

    fn on_single_done(&mut self, session: u64, kind: AnalysisKind, outcome: Result<String, BackendError>) {
        if session != self.camera_session || self.machine.mode() != Mode::Processing {
            info!(%kind, "discarding single-shot result, camera was switched off");
            return;
        }

        match outcome {
            Ok(text) => {
                info!(%kind, chars = text.len(), "single-shot analysis complete");
                self.set_result(AnalysisResult::new(text.clone(), kind));
                self.machine.apply(ModeEvent::AnalysisSucceeded);
                self.say(&text, false);
            }
            Err(e) => {
                error!(%e, %kind, "single-shot analysis failed");
                self.set_result(AnalysisResult::new(phrases::ERROR_RESULT, kind));
                self.machine.apply(ModeEvent::AnalysisFailed);
                self.say(phrases::ERROR_SPOKEN, false);
            }
        }
    }

    // ----- live mode -----

    fn toggle_live(&mut self) {
        let mode = self.machine.mode();
        if mode == Mode::LiveAssistant {
            self.stop_live();
        } else if mode.next(ModeEvent::LiveOn).is_some() && self.ports.camera.is_active() {
            self.start_live();
        } else {
            debug!(%mode, "live mode toggle ignored");
        }
    }

    fn start_live(&mut self) {
        self.machine.apply(ModeEvent::LiveOn);
        self.live_sessions += 1;
        self.live = Some(LiveSession {
            id: self.live_sessions,
            token: CancellationToken::new(),
        });
        self.say(phrases::LIVE_STARTED, false);

        let tx = self.internal_tx.clone();
        self.ports.listener.start_listening(Arc::new(move |text| {
            let _ = tx.send(Internal::Heard(text));
        }));

        // First tick runs right away
        self.live_tick();
    }

    fn stop_live(&mut self) {
        self.machine.apply(ModeEvent::LiveOff);
        self.end_live_session();
        self.wakeup.cancel();
        self.ports.speaker.stop();
        self.ports.listener.stop_listening();
        self.say(phrases::LIVE_STOPPED, false);
    }

    fn end_live_session(&mut self) {
        if let Some(session) = self.live.take() {
            session.token.cancel();
            debug!(session = session.id, "live session ended");
        }
        self.queued_voice = None;
        self.set_transcript("");
    }

    /// Id and token of the live session, if live mode is running
    fn live_session(&self) -> Option<(u64, CancellationToken)> {
        if self.machine.mode() != Mode::LiveAssistant {
            return None;
        }
        self.live
            .as_ref()
            .filter(|s| !s.token.is_cancelled())
            .map(|s| (s.id, s.token.clone()))
    }

    fn is_current_live(&self, session: u64) -> bool {
        self.live_session().is_some_and(|(id, _)| id == session)
    }

    fn schedule_next_tick(&mut self) {
        if self.live_session().is_some() {
            self.wakeup.schedule(self.timings.cadence);
        }
    }

    fn live_tick(&mut self) {
        let Some((session, token)) = self.live_session() else {
            debug!("live loop stopped");
            return;
        };

        let Some(permit) = self.slot.try_acquire() else {
            debug!("analysis in flight, live tick deferred");
            self.wakeup.schedule(self.timings.busy_retry);
            return;
        };

        let Some(frame) = self.ports.camera.capture_frame() else {
            debug!("no frame, live tick skipped");
            drop(permit);
            self.schedule_next_tick();
            return;
        };

        let backend = Arc::clone(&self.ports.backend);
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    let _ = tx.send(Internal::Released(permit));
                    return;
                }
                outcome = backend.analyze_live_frame(&frame) => outcome,
            };
            let _ = tx.send(Internal::LiveDone {
                session,
                permit,
                outcome,
            });
        });
    }

    fn on_live_done(&mut self, session: u64, outcome: Result<LiveReply, BackendError>) {
        if !self.is_current_live(session) {
            debug!(session, "discarding live result from an ended session");
            self.resume_after_stale();
            return;
        }

        match outcome {
            Ok(reply) if reply.has_speech() => {
                self.set_result(AnalysisResult::navigator(&reply));
                self.say(&reply.speech, reply.is_urgent);
            }
            Ok(_) => debug!("live frame had nothing to report"),
            Err(e) => warn!(%e, "live frame analysis failed"),
        }

        match self.queued_voice.take() {
            Some(text) => self.run_voice(text),
            None => self.schedule_next_tick(),
        }
    }

    /// The slot came back from an ended session. A newer session may have
    /// queued a voice command or lost its wake-up behind it.
    fn resume_after_stale(&mut self) {
        if self.live_session().is_none() {
            return;
        }
        match self.queued_voice.take() {
            Some(text) => self.run_voice(text),
            None if !self.wakeup.is_pending() => self.schedule_next_tick(),
            None => {}
        }
    }

    // ----- voice commands -----

    fn on_transcript(&mut self, text: String) {
        if self.live_session().is_none() {
            debug!("transcript ignored outside live mode");
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        info!(chars = text.len(), "voice command received");
        self.set_transcript(text);
        self.wakeup.cancel();
        self.run_voice(text.to_string());
    }

    fn run_voice(&mut self, text: String) {
        let Some((session, token)) = self.live_session() else {
            return;
        };

        let Some(permit) = self.slot.try_acquire() else {
            if self.queued_voice.replace(text).is_some() {
                debug!("queued voice command replaced by a newer one");
            }
            debug!("analysis in flight, voice command queued");
            return;
        };

        self.set_transcript(&text);

        let Some(frame) = self.ports.camera.capture_frame() else {
            debug!("no frame for voice command");
            drop(permit);
            self.finish_voice();
            return;
        };

        let backend = Arc::clone(&self.ports.backend);
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    let _ = tx.send(Internal::Released(permit));
                    return;
                }
                outcome = backend.analyze_voice_command(&frame, &text) => outcome,
            };
            let _ = tx.send(Internal::VoiceDone {
                session,
                permit,
                outcome,
            });
        });
    }

    fn on_voice_done(&mut self, session: u64, outcome: Result<LiveReply, BackendError>) {
        if !self.is_current_live(session) {
            debug!(session, "discarding voice reply from an ended session");
            self.resume_after_stale();
            return;
        }

        match outcome {
            // A direct answer always cuts off whatever is playing
            Ok(reply) if reply.has_speech() => {
                self.set_result(AnalysisResult::navigator(&reply));
                self.say(&reply.speech, true);
            }
            Ok(_) => debug!("voice command produced no reply"),
            Err(e) => warn!(%e, "voice command analysis failed"),
        }

        self.finish_voice();
    }

    fn finish_voice(&mut self) {
        match self.queued_voice.take() {
            Some(next) => self.run_voice(next),
            None => {
                self.set_transcript("");
                self.wakeup.schedule(self.timings.voice_cooldown);
            }
        }
    }

    // ----- output -----

    fn say(&self, text: &str, urgent: bool) {
        if urgent {
            self.ports.speaker.stop();
        }
        self.ports.speaker.speak(text);

        let _ = self.event_tx.send(AssistantEvent::Spoke {
            text: text.to_string(),
            urgent,
        });
    }

    fn set_result(&mut self, result: AnalysisResult) {
        let _ = self.event_tx.send(AssistantEvent::ResultUpdated {
            result: result.clone(),
        });
        self.result = Some(result);
    }

    fn set_transcript(&mut self, text: &str) {
        if self.transcript == text {
            return;
        }
        self.transcript = text.to_string();
        let _ = self.event_tx.send(AssistantEvent::TranscriptChanged {
            text: self.transcript.clone(),
        });
    }

    fn snapshot(&self) -> AssistantSnapshot {
        AssistantSnapshot {
            mode: self.machine.mode(),
            result: self.result.clone(),
            transcript: self.transcript.clone(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    /// Release camera, speech output and speech input
    fn teardown(&mut self) {
        info!("releasing assistant resources");
        self.end_live_session();
        self.camera_token.cancel();
        self.wakeup.cancel();
        self.ports.speaker.stop();
        self.ports.listener.stop_listening();
        self.ports.camera.release();
        if self.machine.mode().camera_on() {
            self.machine.apply(ModeEvent::CameraOff);
        }
        self.publish();
    }
}
