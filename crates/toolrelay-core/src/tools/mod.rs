//! Tool catalog and built-in management tools
//!
//! The `ToolCatalog` merges the tools of every registered provider into one
//! routing table. Management tools (`add_provider`, `remove_provider`,
//! `list_providers`) are offered alongside and executed against the
//! registry directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolCatalog                                │
//! │                                             │
//! │  - tools/list on every ready provider       │
//! │  - Validates names and schemas              │
//! │  - First registered provider wins a name    │
//! │  - Routes tool name -> provider             │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ ProviderRegistry (liveness, lookup)
//!           ▼
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ calc (stdio) │ │ docs (stdio) │ │ ...          │
//! └──────────────┘ └──────────────┘ └──────────────┘
//! ```

mod catalog;
pub mod management;
pub mod validation;

pub use catalog::{
    QuarantinedTool, RefreshFailure, RefreshReport, RoutingEntry, ToolCatalog, ToolCollision,
};
pub use management::{is_management_tool, management_tools, ManagementOutcome};
