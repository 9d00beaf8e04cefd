//! Chat data model
//!
//! Timestamps are `DateTime<Utc>` in memory and RFC 3339 strings on disk
//! and on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

/// Characters of the first question kept in a session title.
pub const TITLE_QUERY_CHARS: usize = 30;

/// Title for a session scoped to `context`.
pub fn session_title_for(context: Option<&ServiceContext>) -> String {
    match context {
        Some(context) => format!(
            "Chat about {}",
            context.service_name.as_deref().unwrap_or("Service")
        ),
        None => DEFAULT_SESSION_TITLE.to_string(),
    }
}

/// Title derived from the first question of a session.
pub fn title_from_query(query: &str) -> String {
    if query.chars().count() > TITLE_QUERY_CHARS {
        let head: String = query.chars().take(TITLE_QUERY_CHARS).collect();
        format!("{}...", head)
    } else {
        query.to_string()
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One step of the agent's reasoning chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningStep {
    pub step: u32,
    pub thought: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// Kind of material an answer cites
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Document,
    Api,
    Service,
}

/// Material cited by an assistant answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Tag scoping a session or message to part of a service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl ServiceContext {
    /// Context naming only a service.
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            ..Default::default()
        }
    }
}

/// A single chat message; not edited after creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<ReasoningStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ServiceContext>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            reasoning: None,
            sources: None,
            context: None,
        }
    }

    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// A plain assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The assistant message carrying an agent answer, its reasoning and
    /// its sources.
    pub fn from_agent_response(response: &AgentResponse) -> Self {
        Self {
            reasoning: response.reasoning_chain.clone(),
            sources: response.sources.clone(),
            ..Self::assistant(response.response.clone())
        }
    }

    pub fn with_context(mut self, context: ServiceContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// A conversation and its messages in order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_context: Option<ServiceContext>,
}

/// Agent strategy requested for an answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Direct,
    React,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "react" => Ok(Self::React),
            other => Err(format!("unknown strategy '{}': expected direct or react", other)),
        }
    }
}

/// Context sent along with an agent query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_context: Option<ServiceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<Message>>,
}

/// Body of `POST /api/v1/agents/augment`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AgentContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reasoning_loops: Option<u32>,
}

/// Answer returned by the agent endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_chain: Option<Vec<ReasoningStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
