//! Core types shared by the registry, the catalog and the orchestrator

mod turn;
mod tool;
mod stream;

pub use turn::{ConversationTurn, ContentPart, TurnContent, TurnRole};
pub use tool::{ToolCall, ToolDescriptor, ToolResult};
pub use stream::{ModelResponse, StreamChunk};
