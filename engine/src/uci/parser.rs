//! Line parser for what an engine prints on stdout.

use crate::{EngineInfo, Score, UciError};

#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent when there is no legal move.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
    },
    Info(EngineInfo),
}

/// Only a `bestmove` line that cannot be read is `MalformedMessage`, since
/// it ends a search. Every other unrecognised line is `UnknownMessage` and
/// safe to skip (banners, `option` declarations, blank lines).
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(UciError::UnknownMessage(line.to_string()));
    };

    match head {
        "uciok" => Ok(UciMessage::UciOk),
        "readyok" => Ok(UciMessage::ReadyOk),
        "info" => Ok(UciMessage::Info(parse_info(words.collect()))),
        "bestmove" => {
            let malformed = || UciError::MalformedMessage(line.to_string());
            let mv = words.next().ok_or_else(malformed)?;
            let mv = move_or_none(mv).map_err(|_| malformed())?;
            // A bad ponder move is not worth failing the search over
            let ponder = match (words.next(), words.next()) {
                (Some("ponder"), Some(p)) => move_or_none(p).ok().flatten(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }
        "id" => match (words.next(), words.collect::<Vec<_>>()) {
            (Some(name), rest) if !rest.is_empty() => Ok(UciMessage::Id {
                name: name.to_string(),
                value: rest.join(" "),
            }),
            _ => Err(UciError::UnknownMessage(line.to_string())),
        },
        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// `(none)` and the null move `0000` both mean "no move".
fn move_or_none(token: &str) -> Result<Option<String>, UciError> {
    if matches!(token, "(none)" | "0000") {
        return Ok(None);
    }
    let mv = chess::parse_uci_move(token)?;
    Ok(Some(chess::format_uci_move(mv)))
}

/// Fields that carry exactly one value token. Listed so a `pv` run knows
/// where it ends.
const VALUE_FIELDS: &[&str] = &[
    "depth",
    "seldepth",
    "time",
    "nodes",
    "multipv",
    "currmove",
    "currmovenumber",
    "hashfull",
    "nps",
    "tbhits",
    "sbhits",
    "cpuload",
];

fn ends_pv(token: &str) -> bool {
    VALUE_FIELDS.contains(&token)
        || matches!(token, "score" | "pv" | "refutation" | "currline" | "string")
}

fn parse_info(tokens: Vec<&str>) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut rest = tokens.as_slice();

    while let Some((&field, tail)) = rest.split_first() {
        rest = tail;
        match field {
            "string" => {
                info.string = Some(rest.join(" "));
                break;
            }
            "pv" => {
                let len = rest.iter().position(|t| ends_pv(t)).unwrap_or(rest.len());
                // A bad ply invalidates everything after it
                info.pv = rest[..len]
                    .iter()
                    .map_while(|t| chess::parse_uci_move(t).ok())
                    .map(chess::format_uci_move)
                    .collect();
                rest = &rest[len..];
            }
            "score" => {
                let (kind, value) = match rest {
                    [kind, value, ..] => (*kind, value.parse::<i32>().ok()),
                    _ => break,
                };
                info.score = match kind {
                    "cp" => value.map(Score::Centipawns),
                    "mate" => value.map(Score::Mate),
                    _ => None,
                };
                rest = &rest[2..];
            }
            "lowerbound" | "upperbound" => info.bound = true,
            field if VALUE_FIELDS.contains(&field) => {
                let Some((&value, tail)) = rest.split_first() else {
                    break;
                };
                rest = tail;
                match field {
                    "depth" => info.depth = value.parse().ok(),
                    "multipv" => info.multipv = value.parse().ok(),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    info
}
