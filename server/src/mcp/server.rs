//! MCP tool surface over the [`ToolDispatcher`].

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;

use crate::tools::params::{
    AnalyzePositionParams, BestMoveParams, CloudEvalParams, FetchUserGamesParams,
    LegalMovesParams, ValidateMoveParams,
};
use crate::tools::{ToolDispatcher, ToolError};

/// Chess analysis MCP server. Clones share one dispatcher, and through it
/// one engine.
#[derive(Clone)]
pub struct ChessMcpServer {
    tool_router: ToolRouter<Self>,
    dispatcher: Arc<ToolDispatcher>,
}

impl ChessMcpServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            dispatcher,
        }
    }
}

/// Typed tool errors are reported as error results, not protocol errors,
/// so the calling agent sees the kind and message.
fn respond<T: Serialize>(outcome: Result<T, ToolError>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                McpError::internal_error(format!("Serialization error: {e}"), None)
            })?;
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
        Err(err) => {
            tracing::warn!(kind = %err.kind, "Tool call failed: {}", err.message);
            Ok(CallToolResult::error(vec![Content::text(
                err.to_json().to_string(),
            )]))
        }
    }
}

#[tool_router]
impl ChessMcpServer {
    #[tool(
        name = "analyze_position",
        description = "Analyze a chess position with Stockfish. Returns the evaluation from the side to move (centipawns or mate), the best move in UCI and SAN, the principal variation and the depth reached. Optional depth (default 18, max 25), time_ms and multi_pv (1-5)."
    )]
    async fn analyze_position(
        &self,
        Parameters(params): Parameters<AnalyzePositionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.analyze_position(params).await)
    }

    #[tool(
        name = "get_best_move",
        description = "Calculate the best move for a chess position given as FEN. Returns the move in UCI and SAN with its from and to squares."
    )]
    async fn get_best_move(
        &self,
        Parameters(params): Parameters<BestMoveParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.get_best_move(params).await)
    }

    #[tool(
        name = "validate_move",
        description = "Check whether a UCI move is legal in a position. Legal moves also return SAN, the resulting FEN, and whether the move gives check or checkmate."
    )]
    async fn validate_move(
        &self,
        Parameters(params): Parameters<ValidateMoveParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.validate_move(params))
    }

    #[tool(
        name = "get_legal_moves",
        description = "List every legal move in a position in UCI and SAN, with the count and the side to move."
    )]
    async fn get_legal_moves(
        &self,
        Parameters(params): Parameters<LegalMovesParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.get_legal_moves(params))
    }

    #[tool(
        name = "fetch_user_games",
        description = "Fetch recent games of a Lichess user with PGN, players, result and opening. max_games defaults to 10 (max 50); time_control filters by perf type such as blitz or rapid. Requires LICHESS_TOKEN."
    )]
    async fn fetch_user_games(
        &self,
        Parameters(params): Parameters<FetchUserGamesParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.fetch_user_games(params).await)
    }

    #[tool(
        name = "get_cloud_eval",
        description = "Look up the Lichess cloud evaluation of a position. Returns found=false when the position is not in the database."
    )]
    async fn get_cloud_eval(
        &self,
        Parameters(params): Parameters<CloudEvalParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.dispatcher.get_cloud_eval(params).await)
    }
}

#[tool_handler]
impl ServerHandler for ChessMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "chess-mcp-server".to_string(),
                title: Some("Chess MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Chess analysis backed by Stockfish and Lichess. Positions are FEN strings and \
                 moves are UCI (e2e4, e7e8q, castling as e1g1). Use validate_move and \
                 get_legal_moves for rule questions, analyze_position or get_best_move for \
                 engine analysis, fetch_user_games and get_cloud_eval for Lichess data."
                    .to_string(),
            ),
        }
    }
}
