//! MCP stdio transport
//!
//! `McpLauncher` spawns a provider's command with piped stdio, completes the
//! MCP `initialize` handshake through rmcp and hands back a session the
//! connection layer can list and call tools on.

mod client;

pub use client::{McpLauncher, McpSession};
