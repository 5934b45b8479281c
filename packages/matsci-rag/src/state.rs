//! Conversation state threaded through the query pipeline.
//!
//! Each derived field is written by exactly one stage and never overwritten
//! within a run. Stages return a [`StateUpdate`] and the pipeline applies it,
//! so a second write to the same field is caught as [`RagError::StateConflict`].

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// Render history as `role: content` lines.
pub fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A partial update produced by one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Summary(String),
    RelatedAttributes(Vec<String>),
    SearchQuery(String),
    RequiredDataPoints(usize),
    MaterialIds(Vec<String>),
    Contexts(Vec<String>),
    Output(String),
}

impl StateUpdate {
    /// Name of the field this update writes.
    pub fn field(&self) -> &'static str {
        match self {
            StateUpdate::Summary(_) => "summary",
            StateUpdate::RelatedAttributes(_) => "related_attributes",
            StateUpdate::SearchQuery(_) => "search_query",
            StateUpdate::RequiredDataPoints(_) => "required_data_points",
            StateUpdate::MaterialIds(_) => "material_ids",
            StateUpdate::Contexts(_) => "contexts",
            StateUpdate::Output(_) => "output",
        }
    }
}

/// State of a single pipeline invocation.
///
/// Every invocation owns its own value; nothing is shared between sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    query: String,
    chat_history: Vec<ChatMessage>,
    summary: Option<String>,
    related_attributes: Option<Vec<String>>,
    search_query: Option<String>,
    required_data_points: Option<usize>,
    material_ids: Option<Vec<String>>,
    contexts: Option<Vec<String>>,
    output: Option<String>,
}

impl ConversationState {
    /// Start a run for `query` with the prior turns.
    pub fn new(query: impl Into<String>, chat_history: Vec<ChatMessage>) -> Self {
        Self {
            query: query.into(),
            chat_history,
            ..Default::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn related_attributes(&self) -> Option<&[String]> {
        self.related_attributes.as_deref()
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    pub fn required_data_points(&self) -> Option<usize> {
        self.required_data_points
    }

    pub fn material_ids(&self) -> Option<&[String]> {
        self.material_ids.as_deref()
    }

    /// Retrieved contexts, `None` when retrieval never ran.
    pub fn contexts(&self) -> Option<&[String]> {
        self.contexts.as_deref()
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// The summary, or the raw question before summarization has run.
    pub fn effective_question(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.query)
    }

    /// Apply a stage's update. Fails if the field (or its mutually exclusive
    /// partner) is already set.
    pub fn apply(&mut self, update: StateUpdate) -> Result<()> {
        let conflict = |field| Err(RagError::StateConflict { field });

        match update {
            StateUpdate::Summary(v) => set_once(&mut self.summary, v, "summary"),
            StateUpdate::RelatedAttributes(v) => {
                set_once(&mut self.related_attributes, v, "related_attributes")
            }
            StateUpdate::SearchQuery(v) => set_once(&mut self.search_query, v, "search_query"),
            StateUpdate::RequiredDataPoints(v) => {
                if self.material_ids.is_some() {
                    return conflict("material_ids");
                }
                set_once(&mut self.required_data_points, v, "required_data_points")
            }
            StateUpdate::MaterialIds(v) => {
                if self.required_data_points.is_some() {
                    return conflict("required_data_points");
                }
                set_once(&mut self.material_ids, v, "material_ids")
            }
            StateUpdate::Contexts(v) => set_once(&mut self.contexts, v, "contexts"),
            StateUpdate::Output(v) => set_once(&mut self.output, v, "output"),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, field: &'static str) -> Result<()> {
    if slot.is_some() {
        return Err(RagError::StateConflict { field });
    }
    *slot = Some(value);
    Ok(())
}
