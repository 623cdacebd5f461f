//! Success payloads returned by the tools.

use chess::Side;
use engine::Score;
use serde::Serialize;

use crate::remote::{CloudPv, GameSummary};

/// Plies of the principal variation included in a report.
pub const PV_PLIES: usize = 5;

/// Engine evaluation from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    #[serde(rename = "type")]
    pub kind: EvaluationKind,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationKind {
    Centipawns,
    Mate,
}

impl From<Score> for Evaluation {
    fn from(score: Score) -> Self {
        match score {
            Score::Centipawns(value) => Self {
                kind: EvaluationKind::Centipawns,
                value,
            },
            Score::Mate(value) => Self {
                kind: EvaluationKind::Mate,
                value,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisLine {
    pub multipv: u32,
    pub depth: u32,
    pub evaluation: Option<Evaluation>,
    pub moves: Vec<String>,
    pub moves_san: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub fen: String,
    pub turn: Side,
    pub best_move: Option<String>,
    pub best_move_san: Option<String>,
    pub evaluation: Option<Evaluation>,
    pub principal_variation: Vec<String>,
    pub principal_variation_san: Vec<String>,
    /// Depth the engine actually reached.
    pub depth: u32,
    pub requested_depth: u32,
    pub lines: Vec<AnalysisLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestMoveReport {
    pub fen: String,
    pub best_move_uci: String,
    pub best_move_san: String,
    pub from_square: String,
    pub to_square: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveValidation {
    pub is_legal: bool,
    pub move_uci: String,
    pub original_fen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_san: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resulting_fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkmate: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegalMovesReport {
    pub fen: String,
    pub legal_moves_uci: Vec<String>,
    pub legal_moves_san: Vec<String>,
    pub count: usize,
    pub turn: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGamesReport {
    pub username: String,
    pub games_count: usize,
    pub games: Vec<GameSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Cloud evaluation, or the explicit `found: false` marker when the
/// position is not in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudEvalReport {
    pub fen: String,
    pub found: bool,
    /// Centipawns of the first line, from White's point of view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_eval: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knodes: Option<u64>,
    pub best_moves: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pvs: Vec<CloudPv>,
}

impl CloudEvalReport {
    pub fn not_found(fen: String) -> Self {
        Self {
            fen,
            found: false,
            cloud_eval: None,
            mate: None,
            depth: None,
            knodes: None,
            best_moves: Vec::new(),
            pvs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluation_shape() {
        let value = serde_json::to_value(Evaluation::from(Score::Mate(-3))).unwrap();
        assert_eq!(value, json!({"type": "mate", "value": -3}));
        let value = serde_json::to_value(Evaluation::from(Score::Centipawns(42))).unwrap();
        assert_eq!(value, json!({"type": "centipawns", "value": 42}));
    }

    #[test]
    fn test_not_found_marker() {
        let value = serde_json::to_value(CloudEvalReport::not_found("x".to_string())).unwrap();
        assert_eq!(value, json!({"fen": "x", "found": false, "best_moves": []}));
    }
}
