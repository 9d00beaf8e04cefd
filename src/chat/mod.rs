//! Chat sessions and the agent chat endpoint
//!
//! - `types`: messages, sessions and agent payloads
//! - `store`: [`ChatSessionStore`], persisted under the `chat_sessions` slot
//! - `service`: [`ChatService`], calls to `/api/v1/agents/augment`

pub mod service;
pub mod store;
pub mod types;

pub use service::ChatService;
pub use store::ChatSessionStore;
pub use types::{
    AgentContext, AgentRequest, AgentResponse, ChatSession, Message, ReasoningStep, Role,
    ServiceContext, Source, SourceType, Strategy,
};
