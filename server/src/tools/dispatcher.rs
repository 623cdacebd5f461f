use std::sync::Arc;
use std::time::Duration;

use chess::Position;
use engine::{AnalysisLimits, AnalysisResult, MAX_MULTI_PV};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use super::error::{ErrorKind, ToolError};
use super::params::{
    AnalyzePositionParams, BestMoveParams, CloudEvalParams, FetchUserGamesParams,
    LegalMovesParams, ValidateMoveParams,
};
use super::report::{
    AnalysisLine, AnalysisReport, BestMoveReport, CloudEvalReport, Evaluation, LegalMovesReport,
    MoveValidation, UserGamesReport, PV_PLIES,
};
use crate::config::{self, ServerConfig};
use crate::remote::{GameService, GamesQuery};
use crate::scheduler::SchedulerHandle;

/// Lichess perf types accepted as `time_control`.
const PERF_TYPES: &[&str] = &[
    "ultraBullet",
    "bullet",
    "blitz",
    "rapid",
    "classical",
    "correspondence",
    "chess960",
    "crazyhouse",
    "antichess",
    "atomic",
    "horde",
    "kingOfTheHill",
    "racingKings",
    "threeCheck",
];

/// Names of every tool, in the order they are listed to clients.
pub const TOOL_NAMES: &[&str] = &[
    "analyze_position",
    "get_best_move",
    "validate_move",
    "get_legal_moves",
    "fetch_user_games",
    "get_cloud_eval",
];

/// Tunables the dispatcher applies to tool arguments.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub default_depth: u32,
    pub default_time_ms: u64,
    /// Deadline for one engine-bound call, queueing included.
    pub analysis_timeout: Duration,
    pub max_games: u32,
}

impl From<&ServerConfig> for ToolSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_depth: config.default_depth,
            default_time_ms: config::DEFAULT_TIME_MS,
            analysis_timeout: config.analysis_timeout,
            max_games: config.max_games,
        }
    }
}

/// Maps tool invocations onto the position validator, the analysis
/// scheduler and the remote game service.
///
/// Every argument is validated before anything stateful is touched.
pub struct ToolDispatcher {
    scheduler: SchedulerHandle,
    games: Arc<dyn GameService>,
    settings: ToolSettings,
}

impl ToolDispatcher {
    pub fn new(
        scheduler: SchedulerHandle,
        games: Arc<dyn GameService>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            scheduler,
            games,
            settings,
        }
    }

    /// Route a named invocation with JSON arguments.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        tracing::debug!(tool = name, "Dispatching tool call");
        match name {
            "analyze_position" => to_json(self.analyze_position(decode(args)?).await?),
            "get_best_move" => to_json(self.get_best_move(decode(args)?).await?),
            "validate_move" => to_json(self.validate_move(decode(args)?)?),
            "get_legal_moves" => to_json(self.get_legal_moves(decode(args)?)?),
            "fetch_user_games" => to_json(self.fetch_user_games(decode(args)?).await?),
            "get_cloud_eval" => to_json(self.get_cloud_eval(decode(args)?).await?),
            other => Err(ToolError::new(
                ErrorKind::UnknownTool,
                format!("Unknown tool '{}'; available: {}", other, TOOL_NAMES.join(", ")),
            )),
        }
    }

    #[tracing::instrument(level = "info", skip_all, fields(fen = %params.fen))]
    pub async fn analyze_position(
        &self,
        params: AnalyzePositionParams,
    ) -> Result<AnalysisReport, ToolError> {
        let position = searchable_position(&params.fen)?;
        let limits = self.limits(params.depth, params.time_ms, params.multi_pv)?;
        let requested_depth = limits.depth.unwrap_or(self.settings.default_depth);

        let result = self.run_analysis(&position, limits).await?;

        let principal_variation = truncate(&result.principal_variation);
        let lines = result
            .lines
            .iter()
            .map(|line| {
                let moves = truncate(&line.pv);
                AnalysisLine {
                    multipv: line.multipv,
                    depth: line.depth,
                    evaluation: line.score.map(Evaluation::from),
                    moves_san: position.line_to_san(&moves),
                    moves,
                }
            })
            .collect();

        Ok(AnalysisReport {
            fen: position.fen().to_string(),
            turn: position.side_to_move(),
            best_move_san: result.best_move.as_deref().and_then(|m| position.san(m)),
            best_move: result.best_move.clone(),
            evaluation: result.score.map(Evaluation::from),
            principal_variation_san: position.line_to_san(&principal_variation),
            principal_variation,
            depth: result.depth_reached,
            requested_depth,
            lines,
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(fen = %params.fen))]
    pub async fn get_best_move(&self, params: BestMoveParams) -> Result<BestMoveReport, ToolError> {
        let position = searchable_position(&params.fen)?;
        let limits = self.limits(params.depth, params.time_ms, None)?;

        let result = self.run_analysis(&position, limits).await?;
        let best = result.best_move.ok_or_else(|| {
            ToolError::new(ErrorKind::EngineProtocolError, "Engine returned no move")
        })?;
        let san = position.san(&best).ok_or_else(|| illegal_suggestion(&best))?;

        Ok(BestMoveReport {
            fen: position.fen().to_string(),
            from_square: best[0..2].to_string(),
            to_square: best[2..4].to_string(),
            best_move_san: san,
            best_move_uci: best,
        })
    }

    pub fn validate_move(&self, params: ValidateMoveParams) -> Result<MoveValidation, ToolError> {
        let position = parse_position(&params.fen)?;
        let outcome = position.play(&params.move_uci)?;

        let mut validation = MoveValidation {
            is_legal: outcome.is_some(),
            move_uci: params.move_uci.trim().to_string(),
            original_fen: position.fen().to_string(),
            move_san: None,
            resulting_fen: None,
            check: None,
            checkmate: None,
        };
        if let Some(outcome) = outcome {
            validation.move_san = Some(outcome.san);
            validation.resulting_fen = Some(outcome.position.fen().to_string());
            validation.check = Some(outcome.is_check);
            validation.checkmate = Some(outcome.is_checkmate);
        }
        Ok(validation)
    }

    pub fn get_legal_moves(&self, params: LegalMovesParams) -> Result<LegalMovesReport, ToolError> {
        let position = parse_position(&params.fen)?;
        let (legal_moves_uci, legal_moves_san): (Vec<_>, Vec<_>) = position
            .legal_move_details()
            .into_iter()
            .map(|m| (m.uci, m.san))
            .unzip();

        Ok(LegalMovesReport {
            fen: position.fen().to_string(),
            count: legal_moves_uci.len(),
            legal_moves_uci,
            legal_moves_san,
            turn: position.side_to_move(),
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(username = %params.username))]
    pub async fn fetch_user_games(
        &self,
        params: FetchUserGamesParams,
    ) -> Result<UserGamesReport, ToolError> {
        let username = params.username.trim();
        validate_username(username)?;

        let max_games = params.max_games.unwrap_or(config::DEFAULT_GAMES);
        if max_games == 0 || max_games > self.settings.max_games {
            return Err(ToolError::invalid_argument(format!(
                "max_games must be between 1 and {}, got {}",
                self.settings.max_games, max_games
            )));
        }

        let perf_type = match params.time_control.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tc) => match PERF_TYPES.iter().find(|p| p.eq_ignore_ascii_case(tc)) {
                Some(perf) => Some(perf.to_string()),
                None => {
                    return Err(ToolError::invalid_argument(format!(
                        "Unknown time_control '{}'; expected one of: {}",
                        tc,
                        PERF_TYPES.join(", ")
                    )))
                }
            },
        };

        let query = GamesQuery {
            username: username.to_string(),
            max_games,
            perf_type,
        };
        let games = self.games.fetch_user_games(&query).await?;
        tracing::info!(count = games.len(), "Fetched user games");

        let message = games.is_empty().then(|| {
            "No games found. User might have no public games or username doesn't exist."
                .to_string()
        });
        Ok(UserGamesReport {
            username: query.username,
            games_count: games.len(),
            games,
            message,
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(fen = %params.fen))]
    pub async fn get_cloud_eval(&self, params: CloudEvalParams) -> Result<CloudEvalReport, ToolError> {
        let position = parse_position(&params.fen)?;
        let multi_pv = params.multi_pv.unwrap_or(1);
        check_multi_pv(multi_pv)?;

        let fen = position.fen().to_string();
        let Some(eval) = self.games.cloud_eval(&fen, multi_pv).await? else {
            return Ok(CloudEvalReport::not_found(fen));
        };

        let first = eval.pvs.first();
        Ok(CloudEvalReport {
            fen,
            found: true,
            cloud_eval: first.and_then(|pv| pv.cp),
            mate: first.and_then(|pv| pv.mate),
            depth: Some(eval.depth),
            knodes: Some(eval.knodes),
            best_moves: eval
                .pvs
                .iter()
                .filter_map(|pv| pv.moves.split_whitespace().next())
                .take(3)
                .map(str::to_string)
                .collect(),
            pvs: eval.pvs,
        })
    }

    /// Build search limits, applying defaults and the depth cap.
    fn limits(
        &self,
        depth: Option<u32>,
        time_ms: Option<u64>,
        multi_pv: Option<u32>,
    ) -> Result<AnalysisLimits, ToolError> {
        let depth = match depth {
            None => self.settings.default_depth,
            Some(0) => return Err(ToolError::invalid_argument("depth must be positive")),
            Some(d) if d > config::MAX_DEPTH => {
                tracing::debug!(requested = d, "Capping depth at {}", config::MAX_DEPTH);
                config::MAX_DEPTH
            }
            Some(d) => d,
        };

        let budget_ms = self.settings.analysis_timeout.as_millis() as u64;
        let time_ms = match time_ms {
            None => self.settings.default_time_ms.min(budget_ms),
            Some(0) => return Err(ToolError::invalid_argument("time_ms must be positive")),
            Some(t) if t > budget_ms => {
                return Err(ToolError::invalid_argument(format!(
                    "time_ms must not exceed {}",
                    budget_ms
                )))
            }
            Some(t) => t,
        };

        let mut limits = AnalysisLimits::depth(depth).with_time_ms(time_ms);
        if let Some(n) = multi_pv {
            check_multi_pv(n)?;
            limits = limits.with_multi_pv(n);
        }
        Ok(limits)
    }

    async fn run_analysis(
        &self,
        position: &Position,
        limits: AnalysisLimits,
    ) -> Result<AnalysisResult, ToolError> {
        let deadline = Instant::now() + self.settings.analysis_timeout;
        let result = self
            .scheduler
            .submit(position.clone(), limits, deadline)
            .await?;

        if let Some(best) = &result.best_move {
            if position.san(best).is_none() {
                return Err(illegal_suggestion(best));
            }
        }
        Ok(result)
    }
}

fn parse_position(fen: &str) -> Result<Position, ToolError> {
    Ok(Position::parse(fen.trim())?)
}

/// A valid position that still has a move to search for.
fn searchable_position(fen: &str) -> Result<Position, ToolError> {
    let position = parse_position(fen)?;
    if !position.has_legal_moves() {
        return Err(ToolError::invalid_position(
            "Position has no legal moves (checkmate or stalemate)",
        ));
    }
    Ok(position)
}

fn check_multi_pv(n: u32) -> Result<(), ToolError> {
    if !(1..=MAX_MULTI_PV).contains(&n) {
        return Err(ToolError::invalid_argument(format!(
            "multi_pv must be between 1 and {}, got {}",
            MAX_MULTI_PV, n
        )));
    }
    Ok(())
}

/// Lichess usernames: 2 to 30 letters, digits, `_` or `-`.
fn validate_username(username: &str) -> Result<(), ToolError> {
    let valid = (2..=30).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ToolError::invalid_argument(format!(
            "Invalid username '{}'",
            username
        )));
    }
    Ok(())
}

fn illegal_suggestion(mv: &str) -> ToolError {
    ToolError::new(
        ErrorKind::EngineProtocolError,
        format!("Engine suggested a move that is not legal here: {}", mv),
    )
}

fn truncate(line: &[String]) -> Vec<String> {
    line.iter().take(PV_PLIES).cloned().collect()
}

fn decode<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::invalid_argument(e.to_string()))
}

fn to_json<T: Serialize>(report: T) -> Result<Value, ToolError> {
    serde_json::to_value(report).map_err(|e| ToolError::new(ErrorKind::Internal, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{CloudEval, CloudPv, GameSummary, RemoteError};
    use crate::scheduler::spawn_scheduler;
    use crate::scheduler::testing::{EngineStats, MockLauncher};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SCHOLARS_MATE: &str =
        "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4";
    const BAD_FEN: &str = "not a fen";

    #[derive(Default)]
    struct MockGameService {
        games_calls: AtomicUsize,
        eval_calls: AtomicUsize,
        last_query: Mutex<Option<GamesQuery>>,
        games: Vec<GameSummary>,
        eval: Option<CloudEval>,
        fail_with: Option<RemoteError>,
    }

    #[async_trait]
    impl GameService for MockGameService {
        async fn fetch_user_games(
            &self,
            query: &GamesQuery,
        ) -> Result<Vec<GameSummary>, RemoteError> {
            self.games_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(self.games.clone()),
            }
        }

        async fn cloud_eval(
            &self,
            _fen: &str,
            _multi_pv: u32,
        ) -> Result<Option<CloudEval>, RemoteError> {
            self.eval_calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(self.eval.clone()),
            }
        }
    }

    fn settings() -> ToolSettings {
        ToolSettings {
            default_depth: 18,
            default_time_ms: 1,
            analysis_timeout: Duration::from_secs(2),
            max_games: 50,
        }
    }

    fn setup_with(games: MockGameService) -> (ToolDispatcher, MockLauncher, Arc<MockGameService>) {
        let launcher = MockLauncher::default();
        let scheduler = spawn_scheduler(launcher.clone(), 8);
        let games = Arc::new(games);
        let dispatcher = ToolDispatcher::new(scheduler, games.clone(), settings());
        (dispatcher, launcher, games)
    }

    fn setup() -> (ToolDispatcher, MockLauncher, Arc<MockGameService>) {
        setup_with(MockGameService::default())
    }

    fn analyze(fen: &str) -> AnalyzePositionParams {
        AnalyzePositionParams {
            fen: fen.to_string(),
            depth: None,
            time_ms: None,
            multi_pv: None,
        }
    }

    #[tokio::test]
    async fn test_analyze_position_reports_legal_best_move() {
        let (dispatcher, _, _) = setup();
        let report = dispatcher
            .analyze_position(analyze(chess::START_FEN))
            .await
            .unwrap();

        let legal = dispatcher
            .get_legal_moves(LegalMovesParams {
                fen: chess::START_FEN.to_string(),
            })
            .unwrap();
        let best = report.best_move.clone().unwrap();
        assert!(legal.legal_moves_uci.contains(&best));
        assert!(report.best_move_san.is_some());
        assert_eq!(report.turn, chess::Side::White);
        assert_eq!(report.requested_depth, 18);
        assert_eq!(report.principal_variation, vec![best]);
        assert_eq!(report.principal_variation_san.len(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["evaluation"], json!({"type": "centipawns", "value": 35}));
    }

    #[tokio::test]
    async fn test_depth_capped_and_zero_rejected() {
        let (dispatcher, launcher, _) = setup();
        let report = dispatcher
            .analyze_position(AnalyzePositionParams {
                depth: Some(40),
                ..analyze(chess::START_FEN)
            })
            .await
            .unwrap();
        assert_eq!(report.requested_depth, 25);
        assert_eq!(report.depth, 25);

        let err = dispatcher
            .analyze_position(AnalyzePositionParams {
                depth: Some(0),
                ..analyze(chess::START_FEN)
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(EngineStats::get(&launcher.stats.searches), 1);
    }

    #[tokio::test]
    async fn test_bad_multi_pv_and_time_never_reach_engine() {
        let (dispatcher, launcher, _) = setup();
        for params in [
            AnalyzePositionParams {
                multi_pv: Some(6),
                ..analyze(chess::START_FEN)
            },
            AnalyzePositionParams {
                time_ms: Some(0),
                ..analyze(chess::START_FEN)
            },
            AnalyzePositionParams {
                time_ms: Some(60_000),
                ..analyze(chess::START_FEN)
            },
        ] {
            let err = dispatcher.analyze_position(params).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument);
        }
        assert_eq!(EngineStats::get(&launcher.stats.launches), 0);
    }

    #[tokio::test]
    async fn test_malformed_fen_never_reaches_engine_or_remote() {
        let (dispatcher, launcher, games) = setup();

        let tools = [
            ("analyze_position", json!({"fen": BAD_FEN})),
            ("get_best_move", json!({"fen": BAD_FEN})),
            ("validate_move", json!({"fen": BAD_FEN, "move_uci": "e2e4"})),
            ("get_legal_moves", json!({"fen": BAD_FEN})),
            ("get_cloud_eval", json!({"fen": BAD_FEN})),
        ];
        for (name, args) in tools {
            let err = dispatcher.call(name, args).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidPosition, "{}", name);
        }

        assert_eq!(EngineStats::get(&launcher.stats.launches), 0);
        assert_eq!(games.eval_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_position_without_moves_is_rejected() {
        let (dispatcher, launcher, _) = setup();
        let err = dispatcher
            .analyze_position(analyze(SCHOLARS_MATE))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPosition);
        assert_eq!(EngineStats::get(&launcher.stats.searches), 0);
    }

    #[tokio::test]
    async fn test_get_best_move_squares() {
        let (dispatcher, _, _) = setup();
        let report = dispatcher
            .get_best_move(BestMoveParams {
                fen: chess::START_FEN.to_string(),
                depth: Some(5),
                time_ms: None,
            })
            .await
            .unwrap();
        assert_eq!(
            format!("{}{}", report.from_square, report.to_square),
            report.best_move_uci
        );
        assert!(!report.best_move_san.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_calls_are_stable() {
        let (dispatcher, launcher, _) = setup();
        let mut best_moves = Vec::new();
        for _ in 0..5 {
            let report = dispatcher
                .analyze_position(analyze(chess::START_FEN))
                .await
                .unwrap();
            best_moves.push(report.best_move);
        }
        assert!(best_moves.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(EngineStats::get(&launcher.stats.launches), 1);
    }

    #[tokio::test]
    async fn test_validate_move_e2e4() {
        let (dispatcher, _, _) = setup();
        let validation = dispatcher
            .validate_move(ValidateMoveParams {
                fen: chess::START_FEN.to_string(),
                move_uci: "e2e4".to_string(),
            })
            .unwrap();

        assert!(validation.is_legal);
        assert_eq!(validation.move_san.as_deref(), Some("e4"));
        assert!(validation
            .resulting_fen
            .as_deref()
            .unwrap()
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert_eq!(validation.check, Some(false));
        assert_eq!(validation.checkmate, Some(false));
    }

    #[tokio::test]
    async fn test_validate_move_illegal_and_malformed() {
        let (dispatcher, _, _) = setup();
        let validation = dispatcher
            .validate_move(ValidateMoveParams {
                fen: chess::START_FEN.to_string(),
                move_uci: "e2e5".to_string(),
            })
            .unwrap();
        assert!(!validation.is_legal);
        assert!(validation.move_san.is_none());

        let value = serde_json::to_value(&validation).unwrap();
        assert!(value.get("resulting_fen").is_none());

        let err = dispatcher
            .validate_move(ValidateMoveParams {
                fen: chess::START_FEN.to_string(),
                move_uci: "e9".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMove);
    }

    #[tokio::test]
    async fn test_validate_move_reports_mate() {
        let (dispatcher, _, _) = setup();
        let validation = dispatcher
            .validate_move(ValidateMoveParams {
                fen: "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4"
                    .to_string(),
                move_uci: "h5f7".to_string(),
            })
            .unwrap();
        assert!(validation.is_legal);
        assert_eq!(validation.move_san.as_deref(), Some("Qxf7#"));
        assert_eq!(validation.check, Some(true));
        assert_eq!(validation.checkmate, Some(true));
    }

    #[tokio::test]
    async fn test_get_legal_moves_start_position() {
        let (dispatcher, _, _) = setup();
        let report = dispatcher
            .get_legal_moves(LegalMovesParams {
                fen: chess::START_FEN.to_string(),
            })
            .unwrap();
        assert_eq!(report.count, 20);
        assert_eq!(report.legal_moves_san.len(), 20);
        assert!(report.legal_moves_uci.contains(&"g1f3".to_string()));
        assert!(report.legal_moves_san.contains(&"Nf3".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_user_games_bounds_checked_before_remote() {
        let (dispatcher, _, games) = setup();

        for args in [
            json!({"username": "alice", "max_games": 51}),
            json!({"username": "alice", "max_games": 0}),
            json!({"username": "a"}),
            json!({"username": "bad name!"}),
            json!({"username": "alice", "time_control": "hyperbullet"}),
            json!({"username": "alice", "max_games": -1}),
        ] {
            let err = dispatcher.call("fetch_user_games", args).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument);
        }
        assert_eq!(games.games_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_user_games_passes_query() {
        let game = GameSummary {
            id: "abcd1234".to_string(),
            pgn: String::new(),
            white: Some("alice".to_string()),
            black: Some("bob".to_string()),
            winner: None,
            opening: None,
            time_control: Some("blitz".to_string()),
            rated: Some(true),
            url: "https://lichess.org/abcd1234".to_string(),
        };
        let (dispatcher, _, games) = setup_with(MockGameService {
            games: vec![game],
            ..Default::default()
        });

        let report = dispatcher
            .fetch_user_games(FetchUserGamesParams {
                username: "alice".to_string(),
                max_games: None,
                time_control: Some("Blitz".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(report.games_count, 1);
        assert!(report.message.is_none());

        let query = games.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.max_games, 10);
        assert_eq!(query.perf_type.as_deref(), Some("blitz"));
    }

    #[tokio::test]
    async fn test_fetch_user_games_empty_has_message() {
        let (dispatcher, _, _) = setup();
        let report = dispatcher
            .fetch_user_games(FetchUserGamesParams {
                username: "alice".to_string(),
                max_games: Some(5),
                time_control: None,
            })
            .await
            .unwrap();
        assert_eq!(report.games_count, 0);
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn test_remote_errors_are_shaped() {
        let (dispatcher, _, _) = setup_with(MockGameService {
            fail_with: Some(RemoteError::MissingCredential),
            ..Default::default()
        });
        let err = dispatcher
            .call("fetch_user_games", json!({"username": "alice"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigurationError);

        let (dispatcher, _, _) = setup_with(MockGameService {
            fail_with: Some(RemoteError::Status {
                status: 429,
                message: "Too many requests".to_string(),
            }),
            ..Default::default()
        });
        let err = dispatcher
            .call("get_cloud_eval", json!({"fen": chess::START_FEN}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RemoteServiceError);
        assert_eq!(err.status, Some(429));
    }

    #[tokio::test]
    async fn test_cloud_eval_not_found_marker() {
        let (dispatcher, _, games) = setup();
        let value = dispatcher
            .call("get_cloud_eval", json!({"fen": chess::START_FEN}))
            .await
            .unwrap();
        assert_eq!(value["found"], json!(false));
        assert!(value.get("error").is_none());
        assert_eq!(games.eval_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cloud_eval_found() {
        let eval = CloudEval {
            fen: chess::START_FEN.to_string(),
            depth: 40,
            knodes: 1000,
            pvs: vec![
                CloudPv {
                    moves: "e2e4 e7e5".to_string(),
                    cp: Some(18),
                    mate: None,
                },
                CloudPv {
                    moves: "d2d4 d7d5".to_string(),
                    cp: Some(15),
                    mate: None,
                },
            ],
        };
        let (dispatcher, _, _) = setup_with(MockGameService {
            eval: Some(eval),
            ..Default::default()
        });
        let report = dispatcher
            .get_cloud_eval(CloudEvalParams {
                fen: chess::START_FEN.to_string(),
                multi_pv: Some(2),
            })
            .await
            .unwrap();
        assert!(report.found);
        assert_eq!(report.cloud_eval, Some(18));
        assert_eq!(report.depth, Some(40));
        assert_eq!(report.best_moves, vec!["e2e4", "d2d4"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let (dispatcher, _, _) = setup();
        let err = dispatcher.call("resign", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownTool);

        let err = dispatcher
            .call("get_legal_moves", json!({"position": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = dispatcher.call("get_legal_moves", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
