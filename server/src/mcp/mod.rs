//! MCP (Model Context Protocol) adapter.
//!
//! ```text
//! MCP client (agent)
//!   ↓ tools/call
//! ChessMcpServer
//!   ↓
//! ToolDispatcher ──→ chess::Position   (rules)
//!                ├─→ SchedulerHandle   (engine queue → EngineSession)
//!                └─→ GameService       (Lichess HTTP)
//! ```

pub mod server;
pub mod transport;

pub use transport::{serve_http, serve_stdio};
