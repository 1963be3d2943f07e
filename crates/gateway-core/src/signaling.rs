//! Call-signaling engine (C7): per-call state machine with ICE-candidate
//! buffering (spec.md §4.5).
//!
//! The state table is implemented as a pure `transition` function returning
//! a list of [`Effect`]s, kept separate from the async forwarding/cleanup
//! side effects so the table itself is unit-testable without a live socket
//! (SPEC_FULL.md §4.5).

use crate::sink::{Deliverable, OutboundSink};
use gateway_protocol::{CallType, SignalForward, SignalKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

/// Terminal states schedule the call session for removal 5s after the
/// transition (spec.md §3).
pub const CLEANUP_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Offered,
    Ringing,
    Answered,
    Connected,
    Renegotiating,
    Rejected,
    Ended,
    Busy,
    Timeout,
}

impl CallState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallState::Rejected | CallState::Ended | CallState::Busy | CallState::Timeout
        )
    }
}

/// Ordered holding area for ICE candidates until both offer and answer of a
/// call have been delivered.
#[derive(Debug, Clone, Default)]
pub struct IceBuffer {
    pub offer_delivered: bool,
    pub answer_delivered: bool,
    pending: Vec<serde_json::Value>,
}

impl IceBuffer {
    fn both_delivered(&self) -> bool {
        self.offer_delivered && self.answer_delivered
    }
}

#[derive(Debug, Clone)]
pub struct CallSession {
    pub session_id: String,
    pub call_type: Option<CallType>,
    pub initiator: String,
    pub participants: HashSet<String>,
    pub state: CallState,
    pub ice: IceBuffer,
}

/// The incoming frame, reduced to what the pure transition table needs.
#[derive(Debug, Clone)]
pub struct IncomingSignal {
    pub signal: SignalKind,
    pub from: String,
    pub to: String,
    pub session_id: String,
    pub call_type: Option<CallType>,
    pub payload: serde_json::Value,
    pub new_participant: Option<String>,
    pub remove_participant: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Effect {
    Forward(SignalForward),
    ScheduleRemoval(String),
}

/// Applies one incoming signal to `sessions`, returning the effects the
/// caller must carry out. Mutates `sessions` in place; never performs I/O.
pub fn transition(
    sessions: &mut HashMap<String, CallSession>,
    signal: &IncomingSignal,
) -> Vec<Effect> {
    if signal.signal == SignalKind::CallOffer && !sessions.contains_key(&signal.session_id) {
        let mut ice = IceBuffer::default();
        ice.offer_delivered = true;
        let mut participants = HashSet::new();
        participants.insert(signal.from.clone());
        participants.insert(signal.to.clone());
        sessions.insert(
            signal.session_id.clone(),
            CallSession {
                session_id: signal.session_id.clone(),
                call_type: signal.call_type,
                initiator: signal.from.clone(),
                participants,
                state: CallState::Offered,
                ice,
            },
        );
        return vec![Effect::Forward(forward(signal, None, None))];
    }

    let Some(session) = sessions.get_mut(&signal.session_id) else {
        warn!(
            signal = ?signal.signal,
            session_id = %signal.session_id,
            "call signal for unknown session, dropping"
        );
        return Vec::new();
    };

    match signal.signal {
        SignalKind::CallOffer => {
            warn!(session_id = %signal.session_id, "CALL_OFFER for an already-open session, dropping");
            Vec::new()
        }
        SignalKind::CallRinging => {
            session.state = CallState::Ringing;
            vec![Effect::Forward(forward(signal, None, None))]
        }
        SignalKind::CallAnswer => {
            session.ice.answer_delivered = true;
            session.state = CallState::Answered;
            let mut effects = vec![Effect::Forward(forward(signal, None, None))];
            for candidate in session.ice.pending.drain(..) {
                effects.push(Effect::Forward(SignalForward {
                    signal: SignalKind::IceCandidate,
                    from: signal.from.clone(),
                    to: signal.to.clone(),
                    session_id: signal.session_id.clone(),
                    call_type: session.call_type,
                    payload: candidate,
                    participants: None,
                    renegotiate: None,
                }));
            }
            effects
        }
        SignalKind::CallConnected => {
            session.state = CallState::Connected;
            let roster: Vec<String> = session.participants.iter().cloned().collect();
            vec![Effect::Forward(forward(signal, Some(roster), None))]
        }
        SignalKind::CallRenegotiate => {
            session.state = CallState::Renegotiating;
            let roster: Vec<String> = session.participants.iter().cloned().collect();
            vec![Effect::Forward(forward(signal, Some(roster), Some(true)))]
        }
        SignalKind::CallReject | SignalKind::CallEnd | SignalKind::CallBusy | SignalKind::CallTimeout => {
            session.state = terminal_state(signal.signal);
            vec![
                Effect::Forward(forward(signal, None, None)),
                Effect::ScheduleRemoval(signal.session_id.clone()),
            ]
        }
        SignalKind::CallParticipantAdd => {
            if let Some(new_participant) = &signal.new_participant {
                session.participants.insert(new_participant.clone());
            }
            let roster: Vec<String> = session.participants.iter().cloned().collect();
            vec![Effect::Forward(forward(signal, Some(roster), None))]
        }
        SignalKind::CallParticipantRemove => {
            if let Some(user_id) = &signal.remove_participant {
                session.participants.remove(user_id);
            }
            let roster: Vec<String> = session.participants.iter().cloned().collect();
            vec![Effect::Forward(forward(signal, Some(roster), None))]
        }
        SignalKind::IceCandidate => {
            if session.ice.both_delivered() {
                vec![Effect::Forward(forward(signal, None, None))]
            } else {
                session.ice.pending.push(signal.payload.clone());
                Vec::new()
            }
        }
    }
}

fn terminal_state(signal: SignalKind) -> CallState {
    match signal {
        SignalKind::CallReject => CallState::Rejected,
        SignalKind::CallEnd => CallState::Ended,
        SignalKind::CallBusy => CallState::Busy,
        SignalKind::CallTimeout => CallState::Timeout,
        _ => unreachable!("terminal_state called with a non-terminal signal"),
    }
}

fn forward(
    signal: &IncomingSignal,
    participants: Option<Vec<String>>,
    renegotiate: Option<bool>,
) -> SignalForward {
    SignalForward {
        signal: signal.signal,
        from: signal.from.clone(),
        to: signal.to.clone(),
        session_id: signal.session_id.clone(),
        call_type: signal.call_type,
        payload: signal.payload.clone(),
        participants,
        renegotiate,
    }
}

/// Owns the call-session map and drives the async side of the state
/// machine: forwarding effects through the injected [`OutboundSink`] and
/// spawning the delayed-removal timer for terminal transitions.
#[derive(Clone)]
pub struct CallRegistry {
    sessions: Arc<RwLock<HashMap<String, CallSession>>>,
    sink: Arc<dyn OutboundSink>,
}

impl CallRegistry {
    #[must_use]
    pub fn new(sink: Arc<dyn OutboundSink>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            sink,
        }
    }

    pub async fn handle(&self, signal: IncomingSignal) {
        let effects = {
            let mut sessions = self.sessions.write().await;
            transition(&mut sessions, &signal)
        };

        for effect in effects {
            match effect {
                Effect::Forward(forward) => {
                    let _ = self.sink.send(Deliverable::Signal(forward)).await;
                }
                Effect::ScheduleRemoval(session_id) => {
                    let sessions = self.sessions.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(CLEANUP_DELAY).await;
                        // A missing session at this point is a no-op — a
                        // later signal may have extended or replaced it;
                        // the removal still fires on the original schedule
                        // regardless (spec.md §4.5).
                        sessions.write().await.remove(&session_id);
                    });
                }
            }
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<CallSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(kind: SignalKind, session_id: &str) -> IncomingSignal {
        IncomingSignal {
            signal: kind,
            from: "caller".to_owned(),
            to: "callee".to_owned(),
            session_id: session_id.to_owned(),
            call_type: Some(CallType::Audio),
            payload: serde_json::json!({}),
            new_participant: None,
            remove_participant: None,
        }
    }

    #[test]
    fn call_offer_creates_a_session_in_offered_state() {
        let mut sessions = HashMap::new();
        let effects = transition(&mut sessions, &signal(SignalKind::CallOffer, "s1"));
        assert_eq!(sessions.get("s1").unwrap().state, CallState::Offered);
        assert!(sessions.get("s1").unwrap().ice.offer_delivered);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn unknown_session_signals_are_dropped_except_call_offer() {
        let mut sessions = HashMap::new();
        let effects = transition(&mut sessions, &signal(SignalKind::CallRinging, "ghost"));
        assert!(effects.is_empty());
        assert!(sessions.is_empty());
    }

    #[test]
    fn ice_candidates_buffer_until_offer_and_answer_then_flush_in_order() {
        let mut sessions = HashMap::new();
        transition(&mut sessions, &signal(SignalKind::CallOffer, "s1"));

        let mut c1 = signal(SignalKind::IceCandidate, "s1");
        c1.payload = serde_json::json!({"candidate": "c1"});
        let effects = transition(&mut sessions, &c1);
        assert!(effects.is_empty(), "buffered before answer");

        let mut c2 = signal(SignalKind::IceCandidate, "s1");
        c2.payload = serde_json::json!({"candidate": "c2"});
        transition(&mut sessions, &c2);

        let answer_effects = transition(&mut sessions, &signal(SignalKind::CallAnswer, "s1"));
        // [0] = the CALL_ANSWER forward itself, [1] and [2] = flushed candidates in order.
        assert_eq!(answer_effects.len(), 3);
        let Effect::Forward(f1) = &answer_effects[1] else { panic!("expected forward") };
        let Effect::Forward(f2) = &answer_effects[2] else { panic!("expected forward") };
        assert_eq!(f1.payload, serde_json::json!({"candidate": "c1"}));
        assert_eq!(f2.payload, serde_json::json!({"candidate": "c2"}));

        let mut c3 = signal(SignalKind::IceCandidate, "s1");
        c3.payload = serde_json::json!({"candidate": "c3"});
        let late_effects = transition(&mut sessions, &c3);
        assert_eq!(late_effects.len(), 1, "delivered immediately once both flags are set");
    }

    #[test]
    fn terminal_signal_schedules_removal_and_forwards_transition() {
        let mut sessions = HashMap::new();
        transition(&mut sessions, &signal(SignalKind::CallOffer, "s1"));
        let effects = transition(&mut sessions, &signal(SignalKind::CallEnd, "s1"));
        assert_eq!(sessions.get("s1").unwrap().state, CallState::Ended);
        assert!(matches!(effects[0], Effect::Forward(_)));
        assert!(matches!(effects[1], Effect::ScheduleRemoval(ref id) if id == "s1"));
    }

    #[test]
    fn participant_add_and_remove_update_roster_without_changing_state() {
        let mut sessions = HashMap::new();
        transition(&mut sessions, &signal(SignalKind::CallOffer, "s1"));

        let mut add = signal(SignalKind::CallParticipantAdd, "s1");
        add.new_participant = Some("third".to_owned());
        transition(&mut sessions, &add);
        assert!(sessions.get("s1").unwrap().participants.contains("third"));
        assert_eq!(sessions.get("s1").unwrap().state, CallState::Offered);

        let mut remove = signal(SignalKind::CallParticipantRemove, "s1");
        remove.remove_participant = Some("third".to_owned());
        transition(&mut sessions, &remove);
        assert!(!sessions.get("s1").unwrap().participants.contains("third"));
    }

    #[tokio::test]
    async fn registry_removes_terminal_session_after_cleanup_delay() {
        use crate::sink::DeliveryOutcome;
        use async_trait::async_trait;

        struct NullSink;
        #[async_trait]
        impl OutboundSink for NullSink {
            async fn send(&self, _deliverable: Deliverable) -> DeliveryOutcome {
                DeliveryOutcome::Delivered
            }
        }

        let registry = CallRegistry::new(Arc::new(NullSink));
        registry.handle(signal(SignalKind::CallOffer, "s1")).await;
        registry.handle(signal(SignalKind::CallEnd, "s1")).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.get("s1").await.is_some(), "still retrievable well before 5s");

        tokio::time::sleep(CLEANUP_DELAY).await;
        assert!(registry.get("s1").await.is_none(), "removed after the cleanup delay");
    }
}
