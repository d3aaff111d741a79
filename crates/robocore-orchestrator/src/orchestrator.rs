//! [`Orchestrator`] – the single-threaded event loop driving the phase FSM
//! (spec §4.2).
//!
//! Observe(bus) → Decide(transition table) → Act(publish) on every tick,
//! generalizing the teacher's `AgentLoop` OODA cycle to the spec's closed
//! `(Phase, OrchestratorEvent) -> Phase` table.

use std::time::{Duration, Instant};

use tokio::sync::watch;

use robocore_bus::Channel;
use robocore_memory::{ConversationMemory, WorldContextAggregator};
use robocore_safety::{OrchestratorForwardVetoRule, SafetyGate, Watchdog};
use robocore_types::payload::{
    parse_direction, DisplayState, DisplayText, Esp32Raw, LlmResponse, PauseVision, RemoteIntent,
    SttTranscription, SystemHealth, TtsSpeakDone, TtsSpeakRequest, VisionMode,
};
use robocore_types::{Direction, Envelope, NavCommand, OrchestratorEvent, Phase, RobocoreError, Topic};

use crate::config::OrchestratorConfig;
use crate::llm_request::build_llm_request;

/// The spoken notice substituted for any speech when a forward command is
/// vetoed by the safety layer (spec §7 "user-visible behavior").
const OBSTACLE_NOTICE: &str = "I can't move forward, something is close";

#[derive(Debug, Default, Clone, Copy)]
struct Deadlines {
    stt: Option<Instant>,
    llm: Option<Instant>,
    tts: Option<Instant>,
    error: Option<Instant>,
}

impl Deadlines {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Owns all orchestrator state: the current [`Phase`], the conversation and
/// world-context memory, the safety pre-check, and the component watchdog.
/// Mutated only from [`Orchestrator::run`]'s single-threaded loop.
pub struct Orchestrator {
    upstream: Channel,
    downstream: Channel,
    config: OrchestratorConfig,
    phase: Phase,
    last_direction: Direction,
    safety: SafetyGate,
    watchdog: Watchdog,
    conversation: ConversationMemory,
    world: WorldContextAggregator,
    deadlines: Deadlines,
}

impl Orchestrator {
    pub fn new(upstream: Channel, downstream: Channel, config: OrchestratorConfig) -> Self {
        let mut safety = SafetyGate::new();
        safety.add_rule(Box::new(OrchestratorForwardVetoRule {
            freshness: config.sensor_freshness,
        }));

        let conversation =
            ConversationMemory::new(config.conversation_capacity, config.conversation_turn_timeout);
        let world = WorldContextAggregator::new(config.sensor_freshness);

        Self {
            upstream,
            downstream,
            config,
            phase: Phase::Idle,
            last_direction: Direction::Stop,
            safety,
            watchdog: Watchdog::new(),
            conversation,
            world,
            deadlines: Deadlines::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the event loop until `shutdown` reports `true`. Never panics: a
    /// malformed envelope is logged and discarded (spec §4.2 "failure
    /// semantics"); no error propagates out of this loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ww = self.upstream.subscribe_topic(Topic::WwDetected);
        let mut stt = self.upstream.subscribe_topic(Topic::SttTranscription);
        let mut llm = self.upstream.subscribe_topic(Topic::LlmResponse);
        let mut tts_done = self.upstream.subscribe_topic(Topic::TtsSpeakUpstream);
        let mut esp32_raw = self.upstream.subscribe_topic(Topic::Esp32Raw);
        let mut vision_object = self.upstream.subscribe_topic(Topic::VisnObject);
        let mut remote_intent = self.upstream.subscribe_topic(Topic::RemoteIntent);
        let mut health = self.upstream.subscribe_topic(Topic::SystemHealth);

        tracing::info!("orchestrator event loop starting");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                Some(env) = ww.recv() => self.handle_ww(env),
                Some(env) = stt.recv() => self.handle_stt(env),
                Some(env) = llm.recv() => self.handle_llm(env),
                Some(env) = tts_done.recv() => self.handle_tts_done(env),
                Some(env) = esp32_raw.recv() => self.handle_esp32_raw(env),
                Some(env) = vision_object.recv() => self.handle_vision_object(env),
                Some(env) = remote_intent.recv() => self.handle_remote_intent(env),
                Some(env) = health.recv() => self.handle_health(env),
                // Bounds timeout enforcement to ~100 ms even with no bus
                // traffic (spec §4.2 "soft-deadline guarantee").
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            self.check_timeouts();
        }
        tracing::info!("orchestrator event loop stopped");
    }

    // ── FSM core ─────────────────────────────────────────────────────────

    /// Looks up `event` in the transition table and, if present, applies the
    /// phase change and its entry/exit side effects. Not in the table is a
    /// logged no-op (I3).
    fn apply(&mut self, event: OrchestratorEvent) {
        let Some(next) = self.phase.transition(event) else {
            tracing::debug!(phase = ?self.phase, ?event, "event not in transition table, ignored");
            return;
        };
        let prev = self.phase;
        if next != prev {
            self.exit_phase(prev);
        }
        self.phase = next;
        self.enter_phase(next);
        tracing::info!(?prev, phase = ?next, ?event, "phase transition");
    }

    fn enter_phase(&mut self, phase: Phase) {
        let now = Instant::now();
        match phase {
            Phase::Listening => {
                self.publish_downstream(Topic::CmdPauseVision, &PauseVision { paused: true });
                self.publish_downstream(Topic::CmdListenStart, &serde_json::json!({}));
                self.deadlines.stt = Some(now + self.config.stt_timeout);
            }
            Phase::Idle => {
                self.deadlines.clear();
            }
            Phase::Thinking => {
                self.deadlines.llm = Some(now + self.config.llm_timeout);
            }
            Phase::Speaking => {
                self.deadlines.tts = Some(now + self.config.speaking_timeout);
            }
            Phase::Error => {
                self.deadlines.error = Some(now + self.config.error_timeout);
            }
        }
        self.world.update_display_phase(phase.as_str(), now);
        self.publish_downstream(
            Topic::DisplayState,
            &DisplayState {
                state: phase.as_str().to_string(),
                phase: phase.as_str().to_string(),
                timestamp: now_ts(),
            },
        );
    }

    fn exit_phase(&mut self, phase: Phase) {
        if phase == Phase::Listening {
            self.publish_downstream(Topic::CmdListenStop, &serde_json::json!({}));
        }
    }

    fn check_timeouts(&mut self) {
        let now = Instant::now();
        match self.phase {
            Phase::Listening if expired(self.deadlines.stt, now) => {
                self.apply(OrchestratorEvent::SttTimeout);
            }
            Phase::Thinking if expired(self.deadlines.llm, now) => {
                self.apply(OrchestratorEvent::LlmTimeout);
            }
            Phase::Speaking if expired(self.deadlines.tts, now) => {
                self.apply(OrchestratorEvent::TtsTimeout);
            }
            Phase::Error if expired(self.deadlines.error, now) => {
                self.apply(OrchestratorEvent::ErrorTimeout);
            }
            _ => {}
        }
        if self.phase != Phase::Error && !self.watchdog.check_all().is_empty() {
            self.apply(OrchestratorEvent::HealthError);
        }
    }

    // ── Upstream handlers ────────────────────────────────────────────────

    fn handle_ww(&mut self, _env: Envelope) {
        // A wakeword while already LISTENING re-arms the STT timer without
        // transitioning phase (spec §8 boundary behavior); `apply` alone
        // would no-op on the unmatched (Listening, Wakeword) pair and leave
        // the original deadline ticking.
        if self.phase == Phase::Listening {
            self.deadlines.stt = Some(Instant::now() + self.config.stt_timeout);
            return;
        }
        self.apply(OrchestratorEvent::Wakeword);
    }

    fn handle_stt(&mut self, env: Envelope) {
        if self.phase != Phase::Listening {
            tracing::debug!(phase = ?self.phase, "stt.transcription outside LISTENING, ignored");
            return;
        }
        let transcription: SttTranscription = match env.parse() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "malformed stt.transcription, discarded");
                return;
            }
        };
        if transcription.confidence < self.config.stt_min_confidence
            || transcription.text.trim().is_empty()
        {
            self.apply(OrchestratorEvent::SttInvalid);
            return;
        }

        let now = Instant::now();
        let snapshot = self.world.snapshot(now);
        let request = build_llm_request(&transcription.text, self.last_direction, &snapshot);
        self.conversation.add_user_turn(transcription.text.clone(), now);
        self.publish_downstream(Topic::LlmRequest, &request);
        self.apply(OrchestratorEvent::SttValid);
    }

    fn handle_llm(&mut self, env: Envelope) {
        if self.phase != Phase::Thinking {
            tracing::debug!(phase = ?self.phase, "llm.response outside THINKING, ignored");
            return;
        }
        let response: LlmResponse = match env.parse() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "malformed llm.response, discarded");
                return;
            }
        };

        let direction = response.json.direction.as_deref().and_then(parse_direction);
        let mut speak = response.json.speak.filter(|s| !s.is_empty());

        if let Some(mut direction) = direction {
            // spec §4.2 "LLM response handling": a forward direction is
            // coerced to stop, and any speech replaced with the obstacle
            // notice, whenever the latest frame reports obstacle OR
            // warning — independent of the gate's obstacle-only veto below.
            if direction == Direction::Forward {
                let (frame, _age) = self.current_frame_and_age();
                if frame.is_some_and(|f| f.obstacle || f.warning) {
                    direction = Direction::Stop;
                    speak = Some(OBSTACLE_NOTICE.to_string());
                }
            }
            if let Err(RobocoreError::SafetyRefusal { reason }) = self.dispatch_nav_command(direction)
            {
                tracing::warn!(%reason, "safety veto refused forward nav command from llm.response");
                self.publish_downstream(
                    Topic::DisplayText,
                    &DisplayText {
                        text: OBSTACLE_NOTICE.to_string(),
                    },
                );
                speak = Some(OBSTACLE_NOTICE.to_string());
                let _ = self.dispatch_nav_command(Direction::Stop);
            }
        }

        if let Some(text) = speak {
            self.conversation.add_assistant_turn(text.clone(), Instant::now());
            self.publish_downstream(Topic::TtsSpeakDownstream, &TtsSpeakRequest { text });
            self.apply(OrchestratorEvent::LlmWithSpeech);
        } else {
            self.apply(OrchestratorEvent::LlmNoSpeech);
        }
    }

    fn handle_tts_done(&mut self, env: Envelope) {
        if self.phase != Phase::Speaking {
            tracing::debug!(phase = ?self.phase, "tts.speak completion outside SPEAKING, ignored");
            return;
        }
        match env.parse::<TtsSpeakDone>() {
            Ok(marker) if marker.done => {
                self.publish_downstream(Topic::CmdPauseVision, &PauseVision { paused: false });
                self.apply(OrchestratorEvent::TtsDone);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "malformed tts.speak completion marker, discarded"),
        }
    }

    fn handle_esp32_raw(&mut self, env: Envelope) {
        match env.parse::<Esp32Raw>() {
            Ok(raw) => self.world.update_sensor_frame(raw.data, Instant::now()),
            Err(e) => tracing::warn!(error = %e, "malformed esp32.raw, discarded"),
        }
    }

    fn handle_vision_object(&mut self, env: Envelope) {
        match env.parse::<serde_json::Value>() {
            Ok(value) => self.world.update_vision_object(value, Instant::now()),
            Err(e) => tracing::warn!(error = %e, "malformed visn.object, discarded"),
        }
    }

    fn handle_remote_intent(&mut self, env: Envelope) {
        let intent: RemoteIntent = match env.parse() {
            Ok(i) => i,
            Err(e) => {
                tracing::warn!(error = %e, "malformed remote.intent, discarded");
                return;
            }
        };
        match intent.intent.as_str() {
            "start" => {
                if let Err(RobocoreError::SafetyRefusal { reason }) =
                    self.dispatch_nav_command(Direction::Forward)
                {
                    tracing::warn!(%reason, "safety veto refused forward nav command from remote.intent");
                    self.publish_downstream(
                        Topic::DisplayText,
                        &DisplayText {
                            text: OBSTACLE_NOTICE.to_string(),
                        },
                    );
                    let _ = self.dispatch_nav_command(Direction::Stop);
                    self.apply(OrchestratorEvent::SafetyVeto);
                }
            }
            "stop" => {
                let _ = self.dispatch_nav_command(Direction::Stop);
            }
            "left" => {
                let _ = self.dispatch_nav_command(Direction::Left);
            }
            "right" => {
                let _ = self.dispatch_nav_command(Direction::Right);
            }
            "listen" => self.apply(OrchestratorEvent::ManualTrigger),
            "text" => self.handle_manual_text(intent.extras.as_ref()),
            "capture" => self.publish_downstream(Topic::CmdVisnCapture, &serde_json::json!({})),
            "vision_mode" => {
                let mode = extra_str(intent.extras.as_ref(), "mode").unwrap_or_default();
                self.world.update_vision_mode(mode.clone(), Instant::now());
                self.publish_downstream(Topic::CmdVisionMode, &VisionMode { mode });
            }
            "pause_vision" => {
                let paused = intent
                    .extras
                    .as_ref()
                    .and_then(|v| v.get("paused"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                self.publish_downstream(Topic::CmdPauseVision, &PauseVision { paused });
            }
            other => tracing::debug!(intent = other, "unrecognized remote intent, ignored"),
        }
    }

    fn handle_manual_text(&mut self, extras: Option<&serde_json::Value>) {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = ?self.phase, "manual text intent outside IDLE, ignored");
            return;
        }
        let text = extra_str(extras, "text").unwrap_or_default();
        let now = Instant::now();
        let snapshot = self.world.snapshot(now);
        let request = build_llm_request(&text, self.last_direction, &snapshot);
        if !text.is_empty() {
            self.conversation.add_user_turn(text.clone(), now);
        }
        self.publish_downstream(Topic::LlmRequest, &request);
        self.apply(OrchestratorEvent::ManualText);
    }

    fn handle_health(&mut self, env: Envelope) {
        let health: SystemHealth = match env.parse() {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "malformed system.health, discarded");
                return;
            }
        };
        if health.healthy {
            self.watchdog
                .register(&health.component, self.config.component_health_timeout);
            if self.phase == Phase::Error && self.watchdog.check_all().is_empty() {
                self.apply(OrchestratorEvent::HealthOk);
            }
        } else {
            self.apply(OrchestratorEvent::HealthError);
        }
    }

    // ── Shared helpers ───────────────────────────────────────────────────

    /// Runs the candidate direction through the fail-open safety pre-check
    /// and, if it passes, publishes `nav.command` and records it as the
    /// last-known direction (spec §4.2 "safety veto (mandatory)").
    fn dispatch_nav_command(&mut self, direction: Direction) -> Result<(), RobocoreError> {
        if direction == Direction::Forward {
            let (frame, age) = self.current_frame_and_age();
            self.safety
                .check(NavCommand::new(direction), frame.as_ref(), age)?;
        }
        self.last_direction = direction;
        self.world
            .update_nav_direction(direction.uart_token().to_lowercase(), Instant::now());
        self.publish_downstream(Topic::NavCommand, &NavCommand::new(direction));
        Ok(())
    }

    fn current_frame_and_age(&self) -> (Option<robocore_types::SensorFrame>, Option<Duration>) {
        let snapshot = self.world.snapshot(Instant::now());
        match snapshot.sensor_frame {
            Some(aged) => (Some(aged.value), Some(Duration::from_millis(aged.age_ms))),
            None => (None, None),
        }
    }

    fn publish_downstream(&self, topic: Topic, payload: &impl serde::Serialize) {
        match Envelope::json(topic, payload) {
            Ok(env) => {
                if let Err(e) = self.downstream.publish(env) {
                    tracing::debug!(?topic, error = %e, "publish had no subscribers");
                }
            }
            Err(e) => tracing::warn!(?topic, error = %e, "failed to serialize payload"),
        }
    }
}

fn expired(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}

fn extra_str(extras: Option<&serde_json::Value>, key: &str) -> Option<String> {
    extras
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocore_types::payload::{Esp32Raw, LlmAction, WakewordDetected};
    use robocore_types::SensorFrame;
    use tokio::time::{timeout, Duration as TokioDuration};

    fn orchestrator_with_subscribed_downstream() -> (Orchestrator, Channel) {
        let upstream = Channel::default();
        let downstream = Channel::default();
        let orch = Orchestrator::new(upstream, downstream.clone(), OrchestratorConfig::default());
        (orch, downstream)
    }

    #[tokio::test]
    async fn wakeword_from_idle_enters_listening_and_publishes_listen_start() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut listen_start = downstream.subscribe_topic(Topic::CmdListenStart);

        orch.apply(OrchestratorEvent::Wakeword);

        assert_eq!(orch.phase(), Phase::Listening);
        assert!(orch.deadlines.stt.is_some());
        let _ = timeout(TokioDuration::from_millis(100), listen_start.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stt_below_confidence_threshold_returns_to_idle_without_llm_request() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut llm_request = downstream.subscribe_topic(Topic::LlmRequest);
        orch.apply(OrchestratorEvent::Wakeword);

        let low_confidence = Envelope::json(
            Topic::SttTranscription,
            &SttTranscription {
                text: "go forward".to_string(),
                confidence: 0.1,
                language: "en".to_string(),
                timestamp: 0,
            },
        )
        .unwrap();
        orch.handle_stt(low_confidence);

        assert_eq!(orch.phase(), Phase::Idle);
        assert!(
            timeout(TokioDuration::from_millis(50), llm_request.recv())
                .await
                .is_err(),
            "no llm.request should have been published"
        );
    }

    #[tokio::test]
    async fn stt_valid_publishes_llm_request_and_enters_thinking() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut llm_request = downstream.subscribe_topic(Topic::LlmRequest);
        orch.apply(OrchestratorEvent::Wakeword);

        let transcription = Envelope::json(
            Topic::SttTranscription,
            &SttTranscription {
                text: "what do you see".to_string(),
                confidence: 0.9,
                language: "en".to_string(),
                timestamp: 0,
            },
        )
        .unwrap();
        orch.handle_stt(transcription);

        assert_eq!(orch.phase(), Phase::Thinking);
        let env = timeout(TokioDuration::from_millis(100), llm_request.recv())
            .await
            .unwrap()
            .unwrap();
        let request: robocore_types::payload::LlmRequest = env.parse().unwrap();
        assert_eq!(request.text, "what do you see");
        assert_eq!(orch.conversation.len(), 1);
    }

    #[tokio::test]
    async fn llm_response_with_speech_enters_speaking_and_publishes_tts() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut tts = downstream.subscribe_topic(Topic::TtsSpeakDownstream);
        orch.apply(OrchestratorEvent::Wakeword);
        orch.apply(OrchestratorEvent::SttValid);

        let response = Envelope::json(
            Topic::LlmResponse,
            &LlmResponse {
                json: LlmAction {
                    speak: Some("Hello there".to_string()),
                    direction: None,
                    track: None,
                },
                raw: None,
            },
        )
        .unwrap();
        orch.handle_llm(response);

        assert_eq!(orch.phase(), Phase::Speaking);
        let env = timeout(TokioDuration::from_millis(100), tts.recv())
            .await
            .unwrap()
            .unwrap();
        let speak: TtsSpeakRequest = env.parse().unwrap();
        assert_eq!(speak.text, "Hello there");
    }

    #[tokio::test]
    async fn llm_response_forward_with_fresh_obstacle_is_vetoed_and_speaks_notice() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut nav = downstream.subscribe_topic(Topic::NavCommand);
        let mut tts = downstream.subscribe_topic(Topic::TtsSpeakDownstream);
        orch.apply(OrchestratorEvent::Wakeword);
        orch.apply(OrchestratorEvent::SttValid);

        let blocked_frame = Envelope::json(
            Topic::Esp32Raw,
            &Esp32Raw {
                data: SensorFrame {
                    s1: 5,
                    s2: 50,
                    s3: 50,
                    mq2: 0,
                    lmotor: 0,
                    rmotor: 0,
                    obstacle: true,
                    warning: true,
                    min_distance: 5,
                    is_safe: false,
                },
                ts: 0,
            },
        )
        .unwrap();
        orch.handle_esp32_raw(blocked_frame);

        let response = Envelope::json(
            Topic::LlmResponse,
            &LlmResponse {
                json: LlmAction {
                    speak: Some("Moving ahead".to_string()),
                    direction: Some("forward".to_string()),
                    track: None,
                },
                raw: None,
            },
        )
        .unwrap();
        orch.handle_llm(response);

        let env = timeout(TokioDuration::from_millis(100), nav.recv())
            .await
            .unwrap()
            .unwrap();
        let command: NavCommand = env.parse().unwrap();
        assert_eq!(command.direction, Direction::Stop);

        let env = timeout(TokioDuration::from_millis(100), tts.recv())
            .await
            .unwrap()
            .unwrap();
        let speak: TtsSpeakRequest = env.parse().unwrap();
        assert_eq!(speak.text, OBSTACLE_NOTICE);
    }

    #[tokio::test]
    async fn tts_completion_outside_speaking_is_ignored() {
        let (mut orch, _downstream) = orchestrator_with_subscribed_downstream();
        let done = Envelope::json(Topic::TtsSpeakUpstream, &TtsSpeakDone { done: true }).unwrap();
        orch.handle_tts_done(done);
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn llm_response_forward_with_warning_only_is_coerced_to_stop() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut nav = downstream.subscribe_topic(Topic::NavCommand);
        let mut tts = downstream.subscribe_topic(Topic::TtsSpeakDownstream);
        orch.apply(OrchestratorEvent::Wakeword);
        orch.apply(OrchestratorEvent::SttValid);

        let warning_frame = Envelope::json(
            Topic::Esp32Raw,
            &Esp32Raw {
                data: SensorFrame {
                    s1: 50,
                    s2: 50,
                    s3: 50,
                    mq2: 0,
                    lmotor: 0,
                    rmotor: 0,
                    obstacle: false,
                    warning: true,
                    min_distance: 25,
                    is_safe: true,
                },
                ts: 0,
            },
        )
        .unwrap();
        orch.handle_esp32_raw(warning_frame);

        let response = Envelope::json(
            Topic::LlmResponse,
            &LlmResponse {
                json: LlmAction {
                    speak: None,
                    direction: Some("forward".to_string()),
                    track: None,
                },
                raw: None,
            },
        )
        .unwrap();
        orch.handle_llm(response);

        let env = timeout(TokioDuration::from_millis(100), nav.recv())
            .await
            .unwrap()
            .unwrap();
        let command: NavCommand = env.parse().unwrap();
        assert_eq!(
            command.direction,
            Direction::Stop,
            "a warning-only frame must coerce forward to stop even though obstacle=false"
        );

        let env = timeout(TokioDuration::from_millis(100), tts.recv())
            .await
            .unwrap()
            .unwrap();
        let speak: TtsSpeakRequest = env.parse().unwrap();
        assert_eq!(speak.text, OBSTACLE_NOTICE);
    }

    #[tokio::test]
    async fn remote_start_intent_with_fresh_obstacle_is_vetoed_and_returns_to_idle() {
        let (mut orch, downstream) = orchestrator_with_subscribed_downstream();
        let mut nav = downstream.subscribe_topic(Topic::NavCommand);
        let mut display_text = downstream.subscribe_topic(Topic::DisplayText);
        orch.apply(OrchestratorEvent::Wakeword);
        orch.apply(OrchestratorEvent::SttValid);
        orch.apply(OrchestratorEvent::LlmNoSpeech);
        assert_eq!(orch.phase(), Phase::Idle);

        let blocked_frame = Envelope::json(
            Topic::Esp32Raw,
            &Esp32Raw {
                data: SensorFrame {
                    s1: 5,
                    s2: 50,
                    s3: 50,
                    mq2: 0,
                    lmotor: 0,
                    rmotor: 0,
                    obstacle: true,
                    warning: true,
                    min_distance: 5,
                    is_safe: false,
                },
                ts: 0,
            },
        )
        .unwrap();
        orch.handle_esp32_raw(blocked_frame);

        let intent = Envelope::json(
            Topic::RemoteIntent,
            &RemoteIntent {
                intent: "start".to_string(),
                extras: None,
                source: "operator".to_string(),
                timestamp: 0,
            },
        )
        .unwrap();
        orch.handle_remote_intent(intent);

        assert_eq!(orch.phase(), Phase::Idle);
        let env = timeout(TokioDuration::from_millis(100), nav.recv())
            .await
            .unwrap()
            .unwrap();
        let command: NavCommand = env.parse().unwrap();
        assert_eq!(command.direction, Direction::Stop);
        let env = timeout(TokioDuration::from_millis(100), display_text.recv())
            .await
            .unwrap()
            .unwrap();
        let text: DisplayText = env.parse().unwrap();
        assert_eq!(text.text, OBSTACLE_NOTICE);
    }

    #[tokio::test]
    async fn remote_listen_intent_drives_manual_trigger() {
        let (mut orch, _downstream) = orchestrator_with_subscribed_downstream();
        let intent = Envelope::json(
            Topic::RemoteIntent,
            &RemoteIntent {
                intent: "listen".to_string(),
                extras: None,
                source: "operator".to_string(),
                timestamp: 0,
            },
        )
        .unwrap();
        orch.handle_remote_intent(intent);
        assert_eq!(orch.phase(), Phase::Listening);
    }

    #[tokio::test]
    async fn health_error_enters_error_from_any_phase() {
        let (mut orch, _downstream) = orchestrator_with_subscribed_downstream();
        let unhealthy = Envelope::json(
            Topic::SystemHealth,
            &SystemHealth {
                component: "stt".to_string(),
                healthy: false,
                timestamp: 0,
            },
        )
        .unwrap();
        orch.handle_health(unhealthy);
        assert_eq!(orch.phase(), Phase::Error);
    }

    #[tokio::test]
    async fn unrecognized_upstream_event_is_a_logged_no_op() {
        let (mut orch, _downstream) = orchestrator_with_subscribed_downstream();
        let ww = Envelope::json(
            Topic::WwDetected,
            &WakewordDetected {
                keyword: "hey robo".to_string(),
                timestamp: 0,
                source: "porcupine".to_string(),
            },
        )
        .unwrap();
        // Wakeword only fires from IDLE -> LISTENING; firing it twice in a
        // row leaves the second one unmatched in the table (I3).
        orch.handle_ww(ww.clone());
        assert_eq!(orch.phase(), Phase::Listening);
        orch.handle_ww(ww);
        assert_eq!(orch.phase(), Phase::Listening);
    }
}
