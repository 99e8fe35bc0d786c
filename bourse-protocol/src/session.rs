use derive_more::{Constructor, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Identifier of an external FIX session.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct FixSession {
    pub begin_string: SmolStr,
    pub sender_comp_id: SmolStr,
    pub target_comp_id: SmolStr,
}

impl FixSession {
    /// FIX.4.4 session between the given counterparty and venue comp ids.
    pub fn fix44<S: AsRef<str>>(sender_comp_id: S, target_comp_id: S) -> Self {
        Self {
            begin_string: SmolStr::new("FIX.4.4"),
            sender_comp_id: SmolStr::new(sender_comp_id),
            target_comp_id: SmolStr::new(target_comp_id),
        }
    }
}

impl Display for FixSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
    }
}

/// Originator of a trading request, used to route replies back and to detect session end.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum Session {
    /// External client connected through the FIX acceptor.
    Fix(FixSession),
    /// Internal synthetic-flow generator.
    Generator,
}

impl Display for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fix(session) => write!(f, "fix session {session}"),
            Self::Generator => write!(f, "generator session"),
        }
    }
}

/// Emitted by a gateway when an external session disconnects.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SessionTerminatedEvent {
    pub session: Session,
}
