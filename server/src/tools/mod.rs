//! Named tools: argument validation, routing and result shaping.

mod dispatcher;
mod error;
pub mod params;
mod report;

pub use dispatcher::{ToolDispatcher, ToolSettings};
pub use error::ToolError;
