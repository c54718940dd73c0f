use crate::analysis::comparator::{self, ComparisonResult};
use crate::analysis::options::{self, MarketSnapshot, StockAnalysis};
use crate::config::{validate_jump, validate_lattice};
use crate::errors::{EngineError, EngineResult};
use crate::models::{JumpParameters, LatticeConfig, OptionType, PricingInput};
use crate::state::{AppState, PerfCounters};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, serde::Deserialize)]
pub struct CompareRequest {
    pub input: PricingInput,
    pub kind: OptionType,
    /// Overrides the configured tree settings for this request
    #[serde(default)]
    pub lattice: Option<LatticeConfig>,
    #[serde(default)]
    pub jump: Option<JumpParameters>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidInput(_)
            | EngineError::InsufficientHistory(_)
            | EngineError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::NoOptionsData(_) => StatusCode::NOT_FOUND,
            EngineError::NonFinite(_) | EngineError::Config(_) | EngineError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET /api/health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "comparisons_served": state.counters.comparisons_served.load(Relaxed),
        "analyses_served": state.counters.analyses_served.load(Relaxed),
        "jump_fallbacks": state.counters.jump_fallbacks.load(Relaxed),
        "requests_rejected": state.counters.requests_rejected.load(Relaxed),
    }))
}

/// POST /api/compare -- three-model comparison for one contract
pub async fn post_compare(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ComparisonResult>, EngineError> {
    let result = match parse_body::<CompareRequest>(&body) {
        Ok(req) => {
            let worker_state = state.clone();
            join(tokio::task::spawn_blocking(move || run_compare(&worker_state, &req))).await
        }
        Err(e) => Err(e),
    }
    .inspect_err(|e| reject(&state, e))?;

    PerfCounters::bump(&state.counters.comparisons_served);
    if result.fallback_applied {
        PerfCounters::bump(&state.counters.jump_fallbacks);
    }
    Ok(Json(result))
}

/// POST /api/analyze -- trailing vol, chain selection and call/put comparison
pub async fn post_analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StockAnalysis>, EngineError> {
    let analysis = match parse_body::<MarketSnapshot>(&body) {
        Ok(snapshot) => {
            let worker_state = state.clone();
            join(tokio::task::spawn_blocking(move || {
                options::analyze(&snapshot, &worker_state.comparator, &worker_state.config)
            }))
            .await
        }
        Err(e) => Err(e),
    }
    .inspect_err(|e| reject(&state, e))?;

    PerfCounters::bump(&state.counters.analyses_served);
    for leg in [&analysis.call, &analysis.put] {
        if leg.comparison.fallback_applied {
            PerfCounters::bump(&state.counters.jump_fallbacks);
        }
    }
    Ok(Json(analysis))
}

/// Decode a JSON body so malformed requests still get a JSON error.
fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> EngineResult<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Lattice cost grows with steps^2; pricing runs off the async workers.
async fn join<T>(task: JoinHandle<EngineResult<T>>) -> EngineResult<T> {
    task.await.map_err(|e| EngineError::Task(e.to_string()))?
}

fn run_compare(state: &AppState, req: &CompareRequest) -> EngineResult<ComparisonResult> {
    let result = match (req.lattice, req.jump) {
        (None, None) => state.comparator.compare(&req.input, req.kind)?,
        (lattice, jump) => {
            let lattice = lattice.unwrap_or(state.config.lattice);
            let jump = jump.unwrap_or(state.config.jump);
            validate_lattice(&lattice).map_err(EngineError::InvalidInput)?;
            validate_jump(&jump).map_err(EngineError::InvalidInput)?;
            comparator::compare(&req.input, req.kind, lattice, jump)?
        }
    };

    result.ensure_finite()?;
    Ok(result)
}

fn reject(state: &AppState, e: &EngineError) {
    PerfCounters::bump(&state.counters.requests_rejected);
    tracing::warn!(error = %e, "request rejected");
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::server::router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn send(
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let app = router(AppState::new(AppConfig::default()));
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        let resp = app.oneshot(req).await.expect("router is infallible");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn compare_body(vol: f64) -> serde_json::Value {
        serde_json::json!({
            "input": {
                "spot": 100.0,
                "strike": 110.0,
                "time_to_expiry_years": 30.0 / 365.0,
                "risk_free_rate": 0.05,
                "volatility": { "value": vol, "unit": "percent" }
            },
            "kind": "call"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(AppState::new(AppConfig::default()));
        let req = Request::builder().uri("/api/health").body(Body::empty()).expect("valid request");
        let resp = app.oneshot(req).await.expect("router is infallible");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_compare_ok() {
        let (status, json) = send("POST", "/api/compare", compare_body(20.0)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        let analytic = json["analytic_price"].as_f64().expect("analytic price");
        assert!(analytic > 0.0 && analytic < 100.0, "analytic={analytic}");
        assert_eq!(json["warnings"].as_array().map(|w| w.len()), Some(0));
    }

    #[tokio::test]
    async fn test_compare_with_overrides() {
        let mut body = compare_body(20.0);
        body["lattice"] =
            serde_json::json!({ "steps": 50, "american": true, "dividend_yield": 0.0 });
        body["kind"] = serde_json::json!("put");
        let (status, json) = send("POST", "/api/compare", body).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        // American put on a 10% ITM strike is worth at least intrinsic
        assert!(json["lattice_price"].as_f64().unwrap_or(0.0) >= 10.0, "{json}");
    }

    #[tokio::test]
    async fn test_compare_bad_override_rejected() {
        let mut body = compare_body(20.0);
        body["lattice"] =
            serde_json::json!({ "steps": 0, "american": false, "dividend_yield": 0.0 });
        let (status, _) = send("POST", "/api/compare", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_compare_oversized_steps_rejected() {
        for steps in [serde_json::json!(1_000_000), serde_json::json!(u64::MAX)] {
            let mut body = compare_body(20.0);
            body["lattice"] =
                serde_json::json!({ "steps": steps, "american": false, "dividend_yield": 0.0 });
            let (status, json) = send("POST", "/api/compare", body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{json}");
            assert!(json["error"].as_str().unwrap_or("").contains("steps"), "{json}");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let body = serde_json::json!({ "input": 5, "kind": "call" });
        let (status, json) = send("POST", "/api/compare", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap_or("").starts_with("parse error"), "{json}");

        let (status, json) = send("POST", "/api/analyze", serde_json::json!([1, 2])).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].is_string(), "{json}");
    }

    #[tokio::test]
    async fn test_compare_zero_vol_rejected() {
        let (status, json) = send("POST", "/api/compare", compare_body(0.0)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap_or("").contains("volatility"), "{json}");
    }

    #[tokio::test]
    async fn test_analyze_without_chains() {
        let closes: Vec<f64> = (0..35).map(|i| 100.0 + (i % 4) as f64).collect();
        let body = serde_json::json!({
            "ticker": "msft",
            "spot": 100.0,
            "closes": closes,
            "as_of": "2026-01-05",
            "chains": []
        });
        let (status, _) = send("POST", "/api/analyze", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_ok() {
        let closes: Vec<f64> = (0..35).map(|i| 100.0 + (i % 4) as f64).collect();
        let body = serde_json::json!({
            "ticker": "msft",
            "spot": 100.0,
            "closes": closes,
            "risk_free_rate": 0.04,
            "as_of": "2026-01-05",
            "chains": [{
                "expiration": "2026-02-20",
                "calls": [{ "strike": 110.0, "last_price": 1.2, "implied_volatility": 0.3 }],
                "puts": [{ "strike": 90.0, "last_price": 0.9 }]
            }]
        });
        let (status, json) = send("POST", "/api/analyze", body).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["ticker"], "MSFT");
        assert_eq!(json["days_to_expiration"], 46);
        assert_eq!(json["put"]["implied_volatility_pct"], serde_json::Value::Null);
    }
}
