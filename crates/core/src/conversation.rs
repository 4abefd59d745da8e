//! Outreach conversation flow.
//!
//! A conversation starts with an initial outreach message, waits for a
//! reply, and escalates through follow-ups on timeouts until it either
//! receives a response or is closed as unresponsive:
//!
//! ```text
//! initial_outreach -> awaiting_response --3d--> follow_up_1
//!   -> awaiting_response_2 --7d--> follow_up_2 -> final_attempt
//!   --14d--> closed_unresponsive
//! any open state --reply--> positive / negative / neutral_response
//! ```
//!
//! [`ConversationFlowManager`] is plain in-memory bookkeeping; callers
//! supply the clock so timeouts are deterministic in tests.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::responses::{classify_reply, ReplyOutcome};
use crate::types::{DbId, Timestamp};

/// Default text appended when a follow-up is triggered.
pub const DEFAULT_FOLLOW_UP_TEXT: &str =
    "Just following up on my previous message in case it got buried.";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    InitialOutreach,
    AwaitingResponse,
    #[serde(rename = "follow_up_1")]
    FollowUp1,
    #[serde(rename = "awaiting_response_2")]
    AwaitingResponse2,
    #[serde(rename = "follow_up_2")]
    FollowUp2,
    FinalAttempt,
    PositiveResponse,
    NegativeResponse,
    NeutralResponse,
    NurturingSequence,
    InformationSharing,
    ClosedUnresponsive,
    RespectfulClosure,
    Onboarding,
}

use ConversationState::*;

impl ConversationState {
    pub fn as_str(self) -> &'static str {
        match self {
            InitialOutreach => "initial_outreach",
            AwaitingResponse => "awaiting_response",
            FollowUp1 => "follow_up_1",
            AwaitingResponse2 => "awaiting_response_2",
            FollowUp2 => "follow_up_2",
            FinalAttempt => "final_attempt",
            PositiveResponse => "positive_response",
            NegativeResponse => "negative_response",
            NeutralResponse => "neutral_response",
            NurturingSequence => "nurturing_sequence",
            InformationSharing => "information_sharing",
            ClosedUnresponsive => "closed_unresponsive",
            RespectfulClosure => "respectful_closure",
            Onboarding => "onboarding",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ClosedUnresponsive | RespectfulClosure | Onboarding)
    }

    fn is_follow_up(self) -> bool {
        matches!(self, FollowUp1 | FollowUp2)
    }

    /// How long the state may sit without a reply, and where it goes next.
    pub fn timeout(self) -> Option<(Duration, ConversationState)> {
        match self {
            AwaitingResponse => Some((Duration::days(3), FollowUp1)),
            AwaitingResponse2 => Some((Duration::days(7), FollowUp2)),
            FinalAttempt => Some((Duration::days(14), ClosedUnresponsive)),
            _ => None,
        }
    }

    /// State entered when a reply with the given outcome arrives.
    pub fn for_reply(outcome: ReplyOutcome) -> Self {
        match outcome {
            ReplyOutcome::Positive => PositiveResponse,
            ReplyOutcome::Negative => NegativeResponse,
            ReplyOutcome::Neutral => NeutralResponse,
        }
    }

    const ALL: [ConversationState; 14] = [
        InitialOutreach,
        AwaitingResponse,
        FollowUp1,
        AwaitingResponse2,
        FollowUp2,
        FinalAttempt,
        PositiveResponse,
        NegativeResponse,
        NeutralResponse,
        NurturingSequence,
        InformationSharing,
        ClosedUnresponsive,
        RespectfulClosure,
        Onboarding,
    ];
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversationState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::validation(format!("Unknown conversation state '{s}'")))
    }
}

/// Conversation state machine.
pub mod state_machine {
    use super::ConversationState::{self, *};

    const REPLIES: [ConversationState; 3] = [PositiveResponse, NegativeResponse, NeutralResponse];

    /// States reachable from `from` outside of replies.
    fn flow_targets(from: ConversationState) -> &'static [ConversationState] {
        match from {
            InitialOutreach => &[AwaitingResponse, RespectfulClosure],
            AwaitingResponse => &[FollowUp1, RespectfulClosure],
            FollowUp1 => &[AwaitingResponse2, RespectfulClosure],
            AwaitingResponse2 => &[FollowUp2, RespectfulClosure],
            FollowUp2 => &[FinalAttempt, RespectfulClosure],
            FinalAttempt => &[ClosedUnresponsive, RespectfulClosure],
            PositiveResponse => {
                &[Onboarding, InformationSharing, NurturingSequence, RespectfulClosure]
            }
            NeutralResponse => &[NurturingSequence, InformationSharing, RespectfulClosure],
            NegativeResponse => &[RespectfulClosure],
            NurturingSequence => &[InformationSharing, Onboarding, RespectfulClosure],
            InformationSharing => &[NurturingSequence, Onboarding, RespectfulClosure],
            ClosedUnresponsive | RespectfulClosure | Onboarding => &[],
        }
    }

    /// Every open state accepts a reply; terminal states accept nothing.
    pub fn can_transition(from: ConversationState, to: ConversationState) -> bool {
        if from.is_terminal() {
            return false;
        }
        REPLIES.contains(&to) || flow_targets(from).contains(&to)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Outreach,
    FollowUp,
    Response,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub kind: MessageKind,
    pub content: String,
    pub sent_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

/// Reply details attached to a state update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub content: String,
    pub sentiment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub prospect_id: DbId,
    pub campaign_id: Option<DbId>,
    pub channel: String,
    pub state: ConversationState,
    pub started_at: Timestamp,
    pub last_updated: Timestamp,
    pub messages: Vec<ConversationMessage>,
    pub follow_up_count: u32,
    pub response_received: bool,
}

/// Summary returned by status lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationStatus {
    pub id: Uuid,
    pub prospect_id: DbId,
    pub state: ConversationState,
    pub started_at: Timestamp,
    pub last_updated: Timestamp,
    pub message_count: usize,
    pub follow_up_count: u32,
    pub response_received: bool,
}

impl Conversation {
    pub fn status(&self) -> ConversationStatus {
        ConversationStatus {
            id: self.id,
            prospect_id: self.prospect_id,
            state: self.state,
            started_at: self.started_at,
            last_updated: self.last_updated,
            message_count: self.messages.len(),
            follow_up_count: self.follow_up_count,
            response_received: self.response_received,
        }
    }
}

/// A timeout-driven state change reported by [`ConversationFlowManager::check_timeouts`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeoutTransition {
    pub conversation_id: Uuid,
    pub from: ConversationState,
    pub to: ConversationState,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Tracks open conversations and moves them through the flow.
///
/// Conversations that reach a terminal state leave the active set but stay
/// queryable through [`status`](Self::status) until
/// [`prune_closed`](Self::prune_closed) drops them.
#[derive(Debug)]
pub struct ConversationFlowManager {
    active: HashMap<Uuid, Conversation>,
    closed: HashMap<Uuid, Conversation>,
    follow_up_text: String,
}

impl Default for ConversationFlowManager {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_UP_TEXT)
    }
}

impl ConversationFlowManager {
    pub fn new(follow_up_text: impl Into<String>) -> Self {
        Self {
            active: HashMap::new(),
            closed: HashMap::new(),
            follow_up_text: follow_up_text.into(),
        }
    }

    /// Open a conversation with its initial outreach message.
    pub fn start(
        &mut self,
        prospect_id: DbId,
        campaign_id: Option<DbId>,
        channel: impl Into<String>,
        initial_message: impl Into<String>,
        now: Timestamp,
    ) -> &Conversation {
        let id = Uuid::new_v4();
        let conversation = Conversation {
            id,
            prospect_id,
            campaign_id,
            channel: channel.into(),
            state: InitialOutreach,
            started_at: now,
            last_updated: now,
            messages: vec![ConversationMessage {
                kind: MessageKind::Outreach,
                content: initial_message.into(),
                sent_at: now,
                sentiment: None,
            }],
            follow_up_count: 0,
            response_received: false,
        };
        self.active.entry(id).or_insert(conversation)
    }

    /// Move a conversation to `new_state`, optionally recording a reply.
    pub fn update_state(
        &mut self,
        id: Uuid,
        new_state: ConversationState,
        response: Option<ResponseData>,
        now: Timestamp,
    ) -> Result<ConversationStatus, CoreError> {
        let conversation = self.active.get_mut(&id).ok_or_else(|| {
            if self.closed.contains_key(&id) {
                CoreError::Conflict(format!("Conversation {id} is already closed"))
            } else {
                CoreError::NotFoundByKey {
                    entity: "Conversation",
                    key: id.to_string(),
                }
            }
        })?;

        if !state_machine::can_transition(conversation.state, new_state) {
            return Err(CoreError::InvalidTransition {
                from: conversation.state.to_string(),
                to: new_state.to_string(),
            });
        }

        if let Some(response) = response {
            conversation.messages.push(ConversationMessage {
                kind: MessageKind::Response,
                content: response.content,
                sent_at: now,
                sentiment: response.sentiment,
            });
            conversation.response_received = true;
        }

        Self::enter(conversation, new_state, &self.follow_up_text, now);
        let status = conversation.status();
        if new_state.is_terminal() {
            self.retire(id);
        }
        Ok(status)
    }

    /// Record a reply and route the conversation by its sentiment.
    pub fn record_reply(
        &mut self,
        id: Uuid,
        content: impl Into<String>,
        sentiment: Option<f64>,
        now: Timestamp,
    ) -> Result<ConversationStatus, CoreError> {
        let target = ConversationState::for_reply(classify_reply(sentiment));
        self.update_state(
            id,
            target,
            Some(ResponseData {
                content: content.into(),
                sentiment,
            }),
            now,
        )
    }

    /// Advance every conversation whose wait state has expired.
    ///
    /// Conversations that already received a response are left alone.
    pub fn check_timeouts(&mut self, now: Timestamp) -> Vec<TimeoutTransition> {
        let mut transitions = Vec::new();
        for conversation in self.active.values_mut() {
            if conversation.response_received {
                continue;
            }
            let Some((after, next)) = conversation.state.timeout() else {
                continue;
            };
            if now - conversation.last_updated >= after {
                transitions.push(TimeoutTransition {
                    conversation_id: conversation.id,
                    from: conversation.state,
                    to: next,
                });
                Self::enter(conversation, next, &self.follow_up_text, now);
            }
        }
        for t in &transitions {
            if t.to.is_terminal() {
                self.retire(t.conversation_id);
            }
        }
        transitions
    }

    pub fn status(&self, id: Uuid) -> Option<ConversationStatus> {
        self.active
            .get(&id)
            .or_else(|| self.closed.get(&id))
            .map(Conversation::status)
    }

    pub fn get(&self, id: Uuid) -> Option<&Conversation> {
        self.active.get(&id).or_else(|| self.closed.get(&id))
    }

    /// The open conversation for a prospect, most recently updated first.
    pub fn active_for_prospect(&self, prospect_id: DbId) -> Option<Uuid> {
        self.active
            .values()
            .filter(|c| c.prospect_id == prospect_id)
            .max_by_key(|c| c.last_updated)
            .map(|c| c.id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Close every open conversation as unresponsive.
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let ids: Vec<Uuid> = self.active.keys().copied().collect();
        for id in &ids {
            if let Some(conversation) = self.active.get_mut(id) {
                conversation.state = ClosedUnresponsive;
                conversation.last_updated = now;
            }
            self.retire(*id);
        }
        ids.len()
    }

    /// Forget closed conversations last updated before `cutoff`. Returns how
    /// many were dropped.
    pub fn prune_closed(&mut self, cutoff: Timestamp) -> usize {
        let before = self.closed.len();
        self.closed.retain(|_, c| c.last_updated >= cutoff);
        before - self.closed.len()
    }

    fn enter(
        conversation: &mut Conversation,
        state: ConversationState,
        text: &str,
        now: Timestamp,
    ) {
        conversation.state = state;
        conversation.last_updated = now;
        if state.is_follow_up() {
            conversation.messages.push(ConversationMessage {
                kind: MessageKind::FollowUp,
                content: text.to_string(),
                sent_at: now,
                sentiment: None,
            });
            conversation.follow_up_count += 1;
        }
    }

    fn retire(&mut self, id: Uuid) {
        if let Some(conversation) = self.active.remove(&id) {
            self.closed.insert(id, conversation);
        }
    }
}
