use uuid::Uuid;

use super::history::{ConversationHistory, Turn};
use super::report::{Field, Report};

/// Where a session currently is in the conversation.
///
/// `Idle` is terminal: the reactor drops a session as soon as it lands there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    ChoosingMode,
    Location,
    Participants,
    Damage,
    Injuries,
    Contact,
    AiChat,
    Confirm,
    AdminMenu,
    AdminAdd,
    AdminRemove,
    Idle,
}

impl SessionState {
    /// The report field a step-mode state writes, if any.
    pub fn step_field(&self) -> Option<Field> {
        match self {
            SessionState::Location => Some(Field::Location),
            SessionState::Participants => Some(Field::Participants),
            SessionState::Damage => Some(Field::Damage),
            SessionState::Injuries => Some(Field::Injuries),
            SessionState::Contact => Some(Field::Contact),
            _ => None,
        }
    }

    /// The step that follows a step-mode state.
    pub fn next_step(&self) -> Option<SessionState> {
        match self {
            SessionState::Location => Some(SessionState::Participants),
            SessionState::Participants => Some(SessionState::Damage),
            SessionState::Damage => Some(SessionState::Injuries),
            SessionState::Injuries => Some(SessionState::Contact),
            SessionState::Contact => Some(SessionState::Confirm),
            _ => None,
        }
    }
}

/// Strict state delta. This is the ONLY way a session mutates outside of extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    Goto(SessionState),
    Write { field: Field, value: String },
    Record(Turn),
}

/// Per-user conversation context: state, report and assistant history.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub report: Report,
    pub history: ConversationHistory,
    // Monotonic, bumped on every reduction
    pub version: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::with_report(Report::new())
    }

    pub fn with_report(report: Report) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::ChoosingMode,
            report,
            history: ConversationHistory::new(),
            version: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;
        match delta {
            StateDelta::Goto(state) => self.state = state,
            StateDelta::Write { field, value } => self.report.set(field, value),
            StateDelta::Record(turn) => self.history.push(turn),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
