use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    DecileRow, EconomicParameters, F1_OPTIMAL_THRESHOLD, GlobalStats, ROI_OPTIMAL_THRESHOLD,
    ReferenceData, RoiResult, SegmentSelection, SegmentSummary, TargetMode, ThresholdCurvePoint,
    ThresholdRow, breakeven_rate_percent, calculate_roi, resolve_segment, simulation_report_csv,
    threshold_curve,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTargetMode {
    Decile,
    Threshold,
    Custom,
}

impl From<CliTargetMode> for TargetMode {
    fn from(value: CliTargetMode) -> Self {
        match value {
            CliTargetMode::Decile => TargetMode::Decile,
            CliTargetMode::Threshold => TargetMode::Threshold,
            CliTargetMode::Custom => TargetMode::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTargetMode {
    #[serde(alias = "byDecile", alias = "by_decile", alias = "by-decile")]
    Decile,
    #[serde(alias = "byThreshold", alias = "by_threshold", alias = "by-threshold")]
    Threshold,
    Custom,
}

impl From<ApiTargetMode> for CliTargetMode {
    fn from(value: ApiTargetMode) -> Self {
        match value {
            ApiTargetMode::Decile => CliTargetMode::Decile,
            ApiTargetMode::Threshold => CliTargetMode::Threshold,
            ApiTargetMode::Custom => CliTargetMode::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ResponseMode {
    Decile,
    Threshold,
    Custom,
}

impl From<TargetMode> for ResponseMode {
    fn from(value: TargetMode) -> Self {
        match value {
            TargetMode::Decile => ResponseMode::Decile,
            TargetMode::Threshold => ResponseMode::Threshold,
            TargetMode::Custom => ResponseMode::Custom,
        }
    }
}

// Decile selections arrive as a JSON array from the web app and as a
// comma-separated string in query parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DecileList {
    List(Vec<u32>),
    Csv(String),
}

impl DecileList {
    fn into_vec(self) -> Result<Vec<u32>, String> {
        match self {
            DecileList::List(deciles) => Ok(deciles),
            DecileList::Csv(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Ok(Vec::new());
                }
                raw.split(',')
                    .map(|part| {
                        part.trim()
                            .parse::<u32>()
                            .map_err(|_| format!("invalid decile identifier: {part:?}"))
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    action_cost: Option<f64>,
    value_saved: Option<f64>,
    effectiveness: Option<f64>,
    target_mode: Option<ApiTargetMode>,
    deciles: Option<DecileList>,
    threshold: Option<f64>,
    custom_clients: Option<u64>,
    custom_rate: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "downsell",
    about = "Down-sell targeting ROI simulator (risk deciles + probability thresholds + custom segments)"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 250.0,
        help = "Cost to contact one customer (SMS, call, offer) in FCFA"
    )]
    action_cost: f64,
    #[arg(
        long,
        default_value_t = 25_000.0,
        help = "Annual value preserved per retained customer in FCFA"
    )]
    value_saved: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        help = "Share of contacted down-sellers actually retained, in percent"
    )]
    effectiveness: f64,
    #[arg(long, value_enum, default_value_t = CliTargetMode::Decile)]
    target_mode: CliTargetMode,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [1u32, 2, 3],
        help = "Risk deciles to target in decile mode (1 = highest risk)"
    )]
    deciles: Vec<u32>,
    #[arg(
        long,
        default_value_t = 0.7,
        help = "Requested probability cutoff in threshold mode; snaps to the nearest published row"
    )]
    threshold: f64,
    #[arg(long, default_value_t = 30_000, help = "Segment size in custom mode")]
    custom_clients: u64,
    #[arg(
        long,
        default_value_t = 70.0,
        help = "Down-sell rate of the custom segment, in percent"
    )]
    custom_rate: f64,
}

#[derive(Debug)]
struct ApiRequest {
    params: EconomicParameters,
    mode: TargetMode,
    selection: SegmentSelection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperatingPointSummary {
    threshold: f64,
    clients: u64,
    net_benefit: f64,
    roi_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    mode: ResponseMode,
    action_cost: f64,
    value_saved: f64,
    effectiveness: f64,
    global: GlobalStats,
    total_down_sellers: u64,
    max_roi_percent: f64,
    breakeven_rate_percent: Option<f64>,
    selected_deciles: Option<Vec<u32>>,
    requested_threshold: Option<f64>,
    f1_optimal: Option<OperatingPointSummary>,
    roi_optimal: Option<OperatingPointSummary>,
    segment: Option<SegmentSummary>,
    roi: Option<RoiResult>,
    deciles: Vec<DecileRow>,
    threshold_curve: Vec<ThresholdCurvePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceResponse {
    global: GlobalStats,
    deciles: Vec<DecileRow>,
    thresholds: Vec<ThresholdRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    if !cli.action_cost.is_finite() || cli.action_cost <= 0.0 {
        return Err("--action-cost must be > 0".to_string());
    }

    if !cli.value_saved.is_finite() || cli.value_saved <= 0.0 {
        return Err("--value-saved must be > 0".to_string());
    }

    if !cli.effectiveness.is_finite()
        || cli.effectiveness <= 0.0
        || cli.effectiveness > 100.0
    {
        return Err("--effectiveness must be between 0 (exclusive) and 100".to_string());
    }

    if !(0.0..=1.0).contains(&cli.threshold) {
        return Err("--threshold must be between 0 and 1".to_string());
    }

    if !(0.0..=100.0).contains(&cli.custom_rate) {
        return Err("--custom-rate must be between 0 and 100".to_string());
    }

    if cli.custom_clients == 0 {
        return Err("--custom-clients must be > 0".to_string());
    }

    for decile in &cli.deciles {
        if !(1..=10).contains(decile) {
            return Err(format!("--deciles entries must be between 1 and 10, got {decile}"));
        }
    }

    let params = EconomicParameters {
        action_cost: cli.action_cost,
        value_saved: cli.value_saved,
        effectiveness: cli.effectiveness / 100.0,
    };

    let mode: TargetMode = cli.target_mode.into();
    let selection = match mode {
        TargetMode::Decile => SegmentSelection::Deciles(cli.deciles),
        TargetMode::Threshold => SegmentSelection::Threshold(cli.threshold),
        TargetMode::Custom => SegmentSelection::Custom {
            client_count: cli.custom_clients,
            down_rate: cli.custom_rate / 100.0,
        },
    };

    Ok(ApiRequest {
        params,
        mode,
        selection,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let data = ReferenceData::load()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let stats = data.global_stats();
    let state = Arc::new(data);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/reference", get(reference_handler))
        .route("/api/report", get(report_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    println!("Down-sell simulator listening on http://{addr}");
    println!(
        "Reference data: {} test customers, global down-sell rate {:.1}%",
        stats.total_test_sample,
        stats.global_down_rate * 100.0
    );
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    State(data): State<Arc<ReferenceData>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&data, payload)
}

async fn simulate_post_handler(
    State(data): State<Arc<ReferenceData>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&data, payload)
}

fn simulate_handler_impl(data: &ReferenceData, payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    json_response(StatusCode::OK, build_simulate_response(data, &request))
}

async fn reference_handler(State(data): State<Arc<ReferenceData>>) -> Response {
    json_response(
        StatusCode::OK,
        ReferenceResponse {
            global: data.global_stats(),
            deciles: data.deciles().to_vec(),
            thresholds: data.thresholds().to_vec(),
        },
    )
}

async fn report_handler(
    State(data): State<Arc<ReferenceData>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let csv = simulation_report_csv(&data, &request.params);
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"down_sell_simulation.csv\"",
            ),
        ],
        csv,
    )
        .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.action_cost {
        cli.action_cost = v;
    }
    if let Some(v) = payload.value_saved {
        cli.value_saved = v;
    }
    if let Some(v) = payload.effectiveness {
        cli.effectiveness = v;
    }
    if let Some(v) = payload.target_mode {
        cli.target_mode = v.into();
    }
    if let Some(v) = payload.deciles {
        cli.deciles = v.into_vec()?;
    }
    if let Some(v) = payload.threshold {
        cli.threshold = v;
    }
    if let Some(v) = payload.custom_clients {
        cli.custom_clients = v;
    }
    if let Some(v) = payload.custom_rate {
        cli.custom_rate = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        action_cost: 250.0,
        value_saved: 25_000.0,
        effectiveness: 12.0,
        target_mode: CliTargetMode::Decile,
        deciles: vec![1, 2, 3],
        threshold: 0.7,
        custom_clients: 30_000,
        custom_rate: 70.0,
    }
}

fn operating_point_summary(
    data: &ReferenceData,
    params: &EconomicParameters,
    threshold: f64,
) -> Option<OperatingPointSummary> {
    let segment = resolve_segment(data, &SegmentSelection::Threshold(threshold))?;
    let matched = segment.matched_threshold?;
    if matched != threshold {
        return None;
    }
    let roi = calculate_roi(segment.client_count as f64, segment.down_rate, params);
    Some(OperatingPointSummary {
        threshold,
        clients: segment.client_count,
        net_benefit: roi.net_benefit,
        roi_percent: roi.roi_percent,
    })
}

fn build_simulate_response(data: &ReferenceData, request: &ApiRequest) -> SimulateResponse {
    let params = &request.params;
    let global = data.global_stats();

    let segment = resolve_segment(data, &request.selection);
    let roi = segment
        .map(|segment| calculate_roi(segment.client_count as f64, segment.down_rate, params));

    let max_roi = resolve_segment(data, &SegmentSelection::Deciles(vec![1]))
        .map(|top| calculate_roi(top.client_count as f64, top.down_rate, params).roi_percent)
        .unwrap_or(0.0);

    let (selected_deciles, requested_threshold) = match &request.selection {
        SegmentSelection::Deciles(deciles) => (Some(deciles.clone()), None),
        SegmentSelection::Threshold(requested) => (None, Some(*requested)),
        SegmentSelection::Custom { .. } => (None, None),
    };

    let (f1_optimal, roi_optimal) = if request.mode == TargetMode::Threshold {
        (
            operating_point_summary(data, params, F1_OPTIMAL_THRESHOLD),
            operating_point_summary(data, params, ROI_OPTIMAL_THRESHOLD),
        )
    } else {
        (None, None)
    };

    SimulateResponse {
        mode: request.mode.into(),
        action_cost: params.action_cost,
        value_saved: params.value_saved,
        effectiveness: params.effectiveness,
        global,
        total_down_sellers: (global.total_test_sample as f64 * global.global_down_rate) as u64,
        max_roi_percent: max_roi,
        breakeven_rate_percent: breakeven_rate_percent(params),
        selected_deciles,
        requested_threshold,
        f1_optimal,
        roi_optimal,
        segment,
        roi,
        deciles: data.deciles().to_vec(),
        threshold_curve: threshold_curve(data, params),
    }
}
