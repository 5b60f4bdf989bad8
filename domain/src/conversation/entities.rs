//! Conversation entities

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::DomainError;
use crate::tool::{ToolCall, ToolResult};

/// Unique conversation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One atomic unit of conversation history.
///
/// A tool turn carries the calls of one planning step together with their
/// results, so eviction can never separate the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Assigned by [`Conversation::append`]; zero until then.
    pub sequence_number: u64,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            sequence_number: 0,
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Build a tool turn from one planning step.
    ///
    /// Fails unless `results` pairs up one-to-one with `calls`, in the same
    /// order, by call id.
    pub fn tool_exchange(calls: Vec<ToolCall>, results: Vec<ToolResult>) -> Result<Self, DomainError> {
        if calls.is_empty() {
            return Err(DomainError::InvalidTurn("tool turn without calls".to_string()));
        }
        if calls.len() != results.len() {
            return Err(DomainError::InvalidTurn(format!(
                "{} calls but {} results",
                calls.len(),
                results.len()
            )));
        }

        let mut seen = HashSet::new();
        for (call, result) in calls.iter().zip(&results) {
            if !seen.insert(&call.call_id) {
                return Err(DomainError::InvalidTurn(format!(
                    "duplicate call id {}",
                    call.call_id
                )));
            }
            if result.call_id() != &call.call_id {
                return Err(DomainError::InvalidTurn(format!(
                    "result {} does not match call {}",
                    result.call_id(),
                    call.call_id
                )));
            }
        }

        let content = results
            .iter()
            .map(|r| format!("{} [{}]", r.tool_name(), r.status()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut turn = Self::new(Role::Tool, content);
        turn.tool_calls = calls;
        turn.tool_results = results;
        Ok(turn)
    }
}

/// Ordered, bounded sequence of turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    capacity: usize,
    turns: VecDeque<Turn>,
    next_sequence: u64,
}

impl Conversation {
    /// A capacity of zero is treated as one.
    pub fn new(id: ConversationId, capacity: usize) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            turns: VecDeque::new(),
            next_sequence: 1,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn, assign its sequence number and evict overflow.
    ///
    /// Returns the assigned sequence number.
    pub fn append(&mut self, mut turn: Turn) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        turn.sequence_number = sequence;
        self.turns.push_back(turn);
        self.evict_if_over_capacity();
        sequence
    }

    /// Drop the oldest turns until at most `capacity` remain.
    ///
    /// Returns how many turns were evicted.
    pub fn evict_if_over_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Snapshot of the visible history, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
