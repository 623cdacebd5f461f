use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{CloudEval, GameService, GameSummary, GamesQuery, RemoteError};

const GAMES_TIMEOUT: Duration = Duration::from_secs(30);
const CLOUD_EVAL_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_PREVIEW_CHARS: usize = 500;
const GAME_URL_BASE: &str = "https://lichess.org";

/// HTTP client for the Lichess REST API.
#[derive(Debug, Clone)]
pub struct LichessClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl LichessClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chess-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            token,
        })
    }

    fn games_url(&self, username: &str) -> String {
        format!("{}/games/user/{}", self.api_base, username)
    }

    fn cloud_eval_url(&self) -> String {
        format!("{}/cloud-eval", self.api_base)
    }
}

fn games_params(query: &GamesQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("max", query.max_games.to_string()),
        ("pgnInJson", "true".to_string()),
        ("clocks", "false".to_string()),
        ("evals", "false".to_string()),
        ("opening", "true".to_string()),
        ("moves", "false".to_string()),
        ("tags", "true".to_string()),
    ];
    if let Some(perf) = &query.perf_type {
        params.push(("perfType", perf.clone()));
    }
    params
}

async fn error_for_status(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(ERROR_PREVIEW_CHARS).collect();
    tracing::error!("Lichess API error: {} - {}", status, message);
    RemoteError::Status { status, message }
}

#[async_trait]
impl GameService for LichessClient {
    #[tracing::instrument(level = "info", skip_all, fields(username = %query.username, max = query.max_games))]
    async fn fetch_user_games(&self, query: &GamesQuery) -> Result<Vec<GameSummary>, RemoteError> {
        let token = self.token.as_deref().ok_or(RemoteError::MissingCredential)?;

        tracing::info!("Fetching games from Lichess");
        let response = self
            .http
            .get(self.games_url(&query.username))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .query(&games_params(query))
            .timeout(GAMES_TIMEOUT)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        tracing::info!(status = response.status().as_u16(), "Lichess API responded");
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(parse_games_ndjson(&body))
    }

    #[tracing::instrument(level = "info", skip_all, fields(fen = %fen, multi_pv))]
    async fn cloud_eval(&self, fen: &str, multi_pv: u32) -> Result<Option<CloudEval>, RemoteError> {
        let mut request = self
            .http
            .get(self.cloud_eval_url())
            .query(&[("fen", fen.to_string()), ("multiPv", multi_pv.to_string())])
            .timeout(CLOUD_EVAL_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("Position not in cloud evaluation database");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct RawGame {
    id: String,
    #[serde(default)]
    pgn: Option<String>,
    #[serde(default)]
    players: RawPlayers,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    opening: Option<RawOpening>,
    #[serde(default)]
    speed: Option<String>,
    #[serde(default)]
    rated: Option<bool>,
}

#[derive(Deserialize, Default)]
struct RawPlayers {
    #[serde(default)]
    white: RawPlayer,
    #[serde(default)]
    black: RawPlayer,
}

#[derive(Deserialize, Default)]
struct RawPlayer {
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    name: String,
}

#[derive(Deserialize)]
struct RawOpening {
    name: String,
}

impl From<RawGame> for GameSummary {
    fn from(raw: RawGame) -> Self {
        Self {
            url: format!("{}/{}", GAME_URL_BASE, raw.id),
            id: raw.id,
            pgn: raw.pgn.unwrap_or_default(),
            white: raw.players.white.user.map(|u| u.name),
            black: raw.players.black.user.map(|u| u.name),
            winner: raw.winner,
            opening: raw.opening.map(|o| o.name),
            time_control: raw.speed,
            rated: raw.rated,
        }
    }
}

/// One game per line. Lines that fail to parse are logged and skipped.
pub(crate) fn parse_games_ndjson(body: &str) -> Vec<GameSummary> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<RawGame>(line) {
            Ok(raw) => Some(GameSummary::from(raw)),
            Err(e) => {
                let preview: String = line.chars().take(100).collect();
                tracing::warn!("Skipping unparseable game line ({}): {}", e, preview);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::routing::get;
    use axum::Router;

    use super::*;

    /// Last request the stub received.
    #[derive(Default)]
    struct Seen {
        headers: HeaderMap,
        query: HashMap<String, String>,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }
    }

    /// Answers GET `/api{path}` with `status` and `body` on an ephemeral
    /// port. Returns the API base to hand to `LichessClient::new`.
    async fn stub_lichess(
        path: &str,
        status: HttpStatus,
        body: &'static str,
    ) -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let recorder = seen.clone();
        let handler = move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
            let recorder = recorder.clone();
            async move {
                *recorder.lock().unwrap() = Seen { headers, query };
                (status, body)
            }
        };
        let router = Router::new().route(&format!("/api{path}"), get(handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}/api"), seen)
    }

    fn alice_blitz() -> GamesQuery {
        GamesQuery {
            username: "alice".to_string(),
            max_games: 5,
            perf_type: Some("blitz".to_string()),
        }
    }

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[tokio::test]
    async fn test_fetch_games_sends_token_and_ndjson_accept() {
        let body = concat!(
            r#"{"id":"abcd1234","speed":"blitz","players":{"white":{"user":{"name":"alice"}},"black":{"user":{"name":"bob"}}},"pgn":"1. e4 e5 *"}"#,
            "\n",
            r#"{"id":"efgh5678","speed":"blitz","players":{"white":{"user":{"name":"bob"}},"black":{"user":{"name":"alice"}}}}"#,
            "\n",
        );
        let (base, seen) = stub_lichess("/games/user/alice", HttpStatus::OK, body).await;
        let client = LichessClient::new(base, Some("secret-token".to_string())).unwrap();

        let games = client.fetch_user_games(&alice_blitz()).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, "abcd1234");
        assert_eq!(games[1].black.as_deref(), Some("alice"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.header("authorization"), Some("Bearer secret-token"));
        assert_eq!(seen.header("accept"), Some("application/x-ndjson"));
        assert_eq!(seen.query.get("max").map(String::as_str), Some("5"));
        assert_eq!(seen.query.get("perfType").map(String::as_str), Some("blitz"));
        assert_eq!(seen.query.get("pgnInJson").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_fetch_games_error_status_keeps_code_and_body() {
        let (base, _seen) =
            stub_lichess("/games/user/alice", HttpStatus::TOO_MANY_REQUESTS, "slow down").await;
        let client = LichessClient::new(base, Some("secret-token".to_string())).unwrap();

        let err = client.fetch_user_games(&alice_blitz()).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        match err {
            RemoteError::Status { message, .. } => assert_eq!(message, "slow down"),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cloud_eval_not_found_is_none() {
        let (base, seen) = stub_lichess("/cloud-eval", HttpStatus::NOT_FOUND, "").await;
        let client = LichessClient::new(base, None).unwrap();

        let eval = client.cloud_eval(AFTER_E4, 2).await.unwrap();
        assert!(eval.is_none());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.query.get("fen").map(String::as_str), Some(AFTER_E4));
        assert_eq!(seen.query.get("multiPv").map(String::as_str), Some("2"));
        assert_eq!(seen.header("authorization"), None);
    }

    #[tokio::test]
    async fn test_cloud_eval_found() {
        let body = r#"{"fen":"rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1","knodes":101,"depth":46,"pvs":[{"moves":"c7c5 g1f3","cp":22}]}"#;
        let (base, _seen) = stub_lichess("/cloud-eval", HttpStatus::OK, body).await;
        let client = LichessClient::new(base, None).unwrap();

        let eval = client.cloud_eval(AFTER_E4, 1).await.unwrap().unwrap();
        assert_eq!(eval.depth, 46);
        assert_eq!(eval.pvs[0].cp, Some(22));
    }

    #[tokio::test]
    async fn test_cloud_eval_garbage_body_is_decode_error() {
        let (base, _seen) = stub_lichess("/cloud-eval", HttpStatus::OK, "<html>oops</html>").await;
        let client = LichessClient::new(base, None).unwrap();

        let err = client.cloud_eval(AFTER_E4, 1).await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cloud_eval_server_error() {
        let (base, _seen) =
            stub_lichess("/cloud-eval", HttpStatus::INTERNAL_SERVER_ERROR, "boom").await;
        let client = LichessClient::new(base, None).unwrap();

        let err = client.cloud_eval(AFTER_E4, 1).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_parse_games_ndjson() {
        let body = r#"{"id":"abcd1234","rated":true,"speed":"blitz","winner":"white","players":{"white":{"user":{"name":"alice"},"rating":1800},"black":{"user":{"name":"bob"},"rating":1750}},"opening":{"eco":"C50","name":"Italian Game"},"pgn":"1. e4 e5 *"}
not json at all
{"id":"efgh5678","speed":"rapid","players":{"white":{"aiLevel":3},"black":{"user":{"name":"alice"}}}}
"#;
        let games = parse_games_ndjson(body);
        assert_eq!(games.len(), 2);

        assert_eq!(games[0].id, "abcd1234");
        assert_eq!(games[0].white.as_deref(), Some("alice"));
        assert_eq!(games[0].black.as_deref(), Some("bob"));
        assert_eq!(games[0].opening.as_deref(), Some("Italian Game"));
        assert_eq!(games[0].time_control.as_deref(), Some("blitz"));
        assert_eq!(games[0].rated, Some(true));
        assert_eq!(games[0].url, "https://lichess.org/abcd1234");

        assert_eq!(games[1].white, None);
        assert_eq!(games[1].winner, None);
        assert_eq!(games[1].pgn, "");
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_games_ndjson("").is_empty());
        assert!(parse_games_ndjson("\n\n").is_empty());
    }

    #[test]
    fn test_games_params() {
        let query = GamesQuery {
            username: "alice".to_string(),
            max_games: 5,
            perf_type: Some("blitz".to_string()),
        };
        let params = games_params(&query);
        assert!(params.contains(&("max", "5".to_string())));
        assert!(params.contains(&("moves", "false".to_string())));
        assert!(params.contains(&("perfType", "blitz".to_string())));

        let query = GamesQuery {
            perf_type: None,
            ..query
        };
        assert!(!games_params(&query).iter().any(|(k, _)| *k == "perfType"));
    }

    #[test]
    fn test_urls() {
        let client = LichessClient::new("https://lichess.org/api", None).unwrap();
        assert_eq!(
            client.games_url("alice"),
            "https://lichess.org/api/games/user/alice"
        );
        assert_eq!(client.cloud_eval_url(), "https://lichess.org/api/cloud-eval");
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        // Unroutable base: any request attempt would surface as Transport
        let client = LichessClient::new("http://127.0.0.1:9", None).unwrap();
        let query = GamesQuery {
            username: "alice".to_string(),
            max_games: 5,
            perf_type: None,
        };
        let err = client.fetch_user_games(&query).await.unwrap_err();
        assert!(matches!(err, RemoteError::MissingCredential));
    }

    #[test]
    fn test_cloud_eval_decodes() {
        let body = r#"{"fen":"rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1","knodes":101,"depth":46,"pvs":[{"moves":"c7c5 g1f3","cp":22},{"moves":"e7e5 g1f3","cp":27}]}"#;
        let eval: CloudEval = serde_json::from_str(body).unwrap();
        assert_eq!(eval.depth, 46);
        assert_eq!(eval.pvs.len(), 2);
        assert_eq!(eval.pvs[0].cp, Some(22));
        assert_eq!(eval.pvs[0].mate, None);
    }
}
