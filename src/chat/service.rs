//! Agent endpoint calls
//!
//! The chat client talks to the backend resolved from the environment
//! alone; it does not follow `apiRootUrl` or the proxy settings and sends
//! no authorization headers.

use super::store::ChatSessionStore;
use super::types::{AgentContext, AgentRequest, AgentResponse, ServiceContext, Strategy};
use crate::client::url::strip_trailing_slash;
use crate::client::{error_chain, http_error, ClientEnvironment};
use crate::error::{ClientResult, ManomanError};
use reqwest::Client;
use tracing::{debug, error};

/// Messages of prior conversation sent as context.
pub const HISTORY_WINDOW: usize = 5;

/// Reasoning loop budget requested from the agent.
pub const MAX_REASONING_LOOPS: u32 = 3;

const AGENT_ROLE: &str = "admin";

/// Client for the agent chat endpoints
#[derive(Debug, Clone)]
pub struct ChatService {
    http: Client,
    base_url: String,
}

impl ChatService {
    /// Service targeting the environment's fallback base URL.
    pub fn new(env: &ClientEnvironment) -> Self {
        Self::with_base_url(env.fallback_base_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: strip_trailing_slash(&base_url).to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the agent request for `message`, using the last messages of
    /// `session_id` as conversation history.
    pub fn build_request(
        &self,
        store: &ChatSessionStore,
        message: &str,
        session_id: &str,
        service_context: Option<ServiceContext>,
        strategy: Strategy,
    ) -> AgentRequest {
        let history = store
            .get_session(session_id)
            .map(|session| {
                let skip = session.messages.len().saturating_sub(HISTORY_WINDOW);
                session.messages.into_iter().skip(skip).collect()
            })
            .unwrap_or_default();

        AgentRequest {
            query: message.to_string(),
            context: Some(AgentContext {
                user_role: Some(AGENT_ROLE.to_string()),
                department: None,
                service_context,
                conversation_history: Some(history),
            }),
            strategy: Some(strategy),
            max_reasoning_loops: Some(MAX_REASONING_LOOPS),
        }
    }

    /// Ask the agent about `message` in the context of a session
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Http` for a non-2xx status,
    /// `ManomanError::Network` if the request cannot be sent and
    /// `ManomanError::Parse` for an unreadable body.
    pub async fn send_message(
        &self,
        store: &ChatSessionStore,
        message: &str,
        session_id: &str,
        service_context: Option<ServiceContext>,
        strategy: Strategy,
    ) -> ClientResult<AgentResponse> {
        let request = self.build_request(store, message, session_id, service_context, strategy);
        let url = format!("{}/api/v1/agents/augment", self.base_url);
        debug!(url = %url, session_id, strategy = ?strategy, "Sending agent query");

        let response = match self.http.post(&url).json(&request).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let err = http_error(response.status());
                error!(error = %err, "Chat service error");
                return Err(err);
            }
            Err(e) => {
                let err = ManomanError::Network(error_chain(&e));
                error!(error = %err, "Chat service error");
                return Err(err);
            }
        };

        response
            .json::<AgentResponse>()
            .await
            .map_err(|e| ManomanError::Parse(format!("Invalid agent response: {}", error_chain(&e))))
    }

    /// Ask the backend to forget the agent's conversation memory
    ///
    /// The response status and body are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Network` only if the request cannot be sent.
    pub async fn clear_memory(&self) -> ClientResult<()> {
        let url = format!("{}/api/v1/agents/augment/memory/clear", self.base_url);
        self.http
            .post(&url)
            .send()
            .await
            .map_err(|e| ManomanError::Network(error_chain(&e)))?;
        Ok(())
    }
}
