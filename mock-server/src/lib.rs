//! In-memory stand-in for the locomotive analytics API.
//!
//! Serves the same routes and JSON shapes as the production server from a
//! fixed fleet, plus an HTML landing page at `/`. `MockOptions::latency`
//! delays every response, which is how callers exercise their timeouts.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

pub mod fleet;
pub mod ml;

pub use ml::{PredictionResponse, WheelInput};

#[derive(Clone, Debug, Default)]
pub struct MockOptions {
    /// Delay applied before every handler runs.
    pub latency: Duration,
}

#[derive(Clone)]
struct AppState {
    options: Arc<MockOptions>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            success: None,
            error: message.into(),
        }),
    )
}

pub fn app() -> Router {
    app_with(MockOptions::default())
}

pub fn app_with(options: MockOptions) -> Router {
    let state = AppState {
        options: Arc::new(options),
    };
    Router::new()
        .route("/", get(index))
        .route("/health", get(root_health))
        .route("/api/v1/ml/health", get(ml::health))
        .route("/api/v1/ml/info", get(ml::info))
        .route("/api/v1/ml/predict", post(ml::predict))
        .route(
            "/api/v1/ml/upload",
            post(ml::upload).layer(DefaultBodyLimit::max(ml::MAX_FILE_SIZE + (1 << 20))),
        )
        .route("/api/v1/task1/branches", get(branch_analysis))
        .route("/api/v1/task1/depots", get(task1_depots))
        .route("/api/v1/task1/depots/{depo}/branches", get(depot_branches))
        .route("/api/v1/popular-direction", get(popular_directions))
        .route(
            "/api/v1/locomotives/{series}/{number}/popular-direction",
            get(locomotive_popular_direction),
        )
        .route("/api/v1/task3/depots", get(list_depots))
        .route("/api/v1/task3/depots/{depo}", get(depot_info))
        .route("/api/v1/task3/generate", post(generate_maps))
        .layer(middleware::from_fn_with_state(state.clone(), apply_latency))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockOptions::default()).await
}

pub async fn run_with(listener: TcpListener, options: MockOptions) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(options)).await
}

async fn apply_latency(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.options.latency.is_zero() {
        tokio::time::sleep(state.options.latency).await;
    }
    next.run(request).await
}

async fn index() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Locomotive analytics</title></head>\
         <body><a href=\"/task1\">Branches</a> <a href=\"/task2\">Directions</a> \
         <a href=\"/task3\">Maps</a> <a href=\"/ml\">Wheel wear</a></body></html>",
    )
}

async fn root_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- task1: branch analysis ---

#[derive(Debug, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub station: String,
    pub visits: u32,
    pub frequency: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BranchInfo {
    pub branch_id: String,
    pub core_stations: Vec<String>,
    pub station_count: usize,
    pub terminals: Vec<TerminalInfo>,
    pub example_path: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepotBranches {
    pub depo_code: String,
    pub branch_count: usize,
    pub branches: Vec<BranchInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BranchStats {
    pub total_depots: usize,
    pub total_branches: usize,
    pub total_terminals: usize,
    pub avg_branches_per_depo: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BranchAnalysis {
    pub depots: Vec<DepotBranches>,
    pub overall_stats: BranchStats,
}

fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(part) / f64::from(total) * 1000.0).round() / 10.0
}

fn branches_of(depot: &fleet::Depot) -> DepotBranches {
    let branches: Vec<BranchInfo> = depot
        .branches
        .iter()
        .map(|b| {
            let total: u32 = b.terminals.iter().map(|(_, visits)| visits).sum();
            let core: Vec<String> = b.core_stations.iter().map(|s| s.to_string()).collect();
            let mut example_path = core.clone();
            if let Some((terminal, _)) = b.terminals.first() {
                example_path.push(terminal.to_string());
            }
            BranchInfo {
                branch_id: b.id.to_string(),
                station_count: core.len(),
                core_stations: core,
                terminals: b
                    .terminals
                    .iter()
                    .map(|(station, visits)| TerminalInfo {
                        station: station.to_string(),
                        visits: *visits,
                        frequency: percent(*visits, total),
                    })
                    .collect(),
                example_path,
            }
        })
        .collect();
    DepotBranches {
        depo_code: depot.id.to_string(),
        branch_count: branches.len(),
        branches,
    }
}

async fn branch_analysis() -> Json<BranchAnalysis> {
    let depots: Vec<DepotBranches> = fleet::FLEET.iter().map(branches_of).collect();
    let total_branches: usize = depots.iter().map(|d| d.branch_count).sum();
    let total_terminals = depots
        .iter()
        .flat_map(|d| &d.branches)
        .map(|b| b.terminals.len())
        .sum();
    Json(BranchAnalysis {
        overall_stats: BranchStats {
            total_depots: depots.len(),
            total_branches,
            total_terminals,
            avg_branches_per_depo: total_branches as f64 / depots.len().max(1) as f64,
        },
        depots,
    })
}

async fn task1_depots() -> Json<Value> {
    let depots: Vec<&str> = fleet::FLEET.iter().map(|d| d.id).collect();
    Json(json!({ "total_depots": depots.len(), "depots": depots }))
}

async fn depot_branches(Path(depo): Path<String>) -> ApiResult<DepotBranches> {
    fleet::depot(&depo)
        .map(|d| Json(branches_of(d)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Depot not found"))
}

// --- task2: popular directions ---

#[derive(Debug, Serialize, Deserialize)]
pub struct LocomotiveDirection {
    pub terminal: String,
    pub visits: u32,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocomotiveStats {
    pub model: String,
    pub number: String,
    pub depo: String,
    pub depo_name: String,
    pub total_trips: u32,
    pub directions: Vec<LocomotiveDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_popular: Option<LocomotiveDirection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepotDirections {
    pub depo_code: String,
    pub depo_name: String,
    pub locomotive_count: usize,
    pub locomotives: Vec<LocomotiveStats>,
}

fn stats_of(depot: &fleet::Depot, loco: &fleet::Locomotive) -> LocomotiveStats {
    let total = loco.total_trips();
    let directions: Vec<LocomotiveDirection> = loco
        .trips
        .iter()
        .map(|(terminal, visits)| LocomotiveDirection {
            terminal: terminal.to_string(),
            visits: *visits,
            percentage: percent(*visits, total),
        })
        .collect();
    let most_popular = loco
        .trips
        .iter()
        .max_by_key(|(_, visits)| *visits)
        .map(|(terminal, visits)| LocomotiveDirection {
            terminal: terminal.to_string(),
            visits: *visits,
            percentage: percent(*visits, total),
        });
    LocomotiveStats {
        model: loco.model.to_string(),
        number: loco.number.to_string(),
        depo: depot.id.to_string(),
        depo_name: depot.name.to_string(),
        total_trips: total,
        directions,
        most_popular,
    }
}

async fn popular_directions() -> Json<Value> {
    let depots: Vec<DepotDirections> = fleet::FLEET
        .iter()
        .map(|d| DepotDirections {
            depo_code: d.id.to_string(),
            depo_name: d.name.to_string(),
            locomotive_count: d.locomotives.len(),
            locomotives: d.locomotives.iter().map(|l| stats_of(d, l)).collect(),
        })
        .collect();
    let total_locomotives: usize = depots.iter().map(|d| d.locomotive_count).sum();
    let total_trips: u32 = depots
        .iter()
        .flat_map(|d| &d.locomotives)
        .map(|l| l.total_trips)
        .sum();
    Json(json!({
        "depots": depots,
        "overall_stats": {
            "total_locomotives": total_locomotives,
            "total_trips": total_trips,
        }
    }))
}

async fn locomotive_popular_direction(
    Path((series, number)): Path<(String, String)>,
) -> ApiResult<LocomotiveStats> {
    fleet::locomotive(&series, &number)
        .map(|(depot, loco)| Json(stats_of(depot, loco)))
        .ok_or_else(|| {
            error(
                StatusCode::NOT_FOUND,
                format!("locomotive {series} {number} not found"),
            )
        })
}

// --- task3: depot maps ---

#[derive(Debug, Serialize, Deserialize)]
pub struct DepotsList {
    pub total: usize,
    pub depots: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepotInfo {
    pub depo_id: String,
    pub region: String,
    pub locomotive_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GenerateMapsRequest {
    pub depo_id: String,
    pub max_locomotives: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocomotiveMap {
    pub key: String,
    pub model: String,
    pub number: String,
    pub url: String,
    pub trip_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MapsList {
    pub overview: String,
    pub heatmap: String,
    pub locomotives: Vec<LocomotiveMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateMapsResponse {
    pub depot_id: String,
    pub generated_at: String,
    pub maps: MapsList,
}

async fn list_depots() -> Json<DepotsList> {
    Json(DepotsList {
        total: fleet::FLEET.len(),
        depots: fleet::FLEET.iter().map(|d| d.id.to_string()).collect(),
    })
}

async fn depot_info(Path(depo): Path<String>) -> ApiResult<DepotInfo> {
    fleet::depot(&depo)
        .map(|d| {
            Json(DepotInfo {
                depo_id: d.id.to_string(),
                region: d.region.to_string(),
                locomotive_count: d.locomotives.len(),
            })
        })
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))
}

async fn generate_maps(
    payload: Result<Json<GenerateMapsRequest>, JsonRejection>,
) -> ApiResult<GenerateMapsResponse> {
    let Json(input) =
        payload.map_err(|rejection| error(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    if !(1..=20).contains(&input.max_locomotives) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "max_locomotives must be between 1 and 20",
        ));
    }
    let depot = fleet::depot(&input.depo_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;

    let run = Uuid::new_v4();
    let base = format!("/maps/{run}");
    let locomotives = depot
        .locomotives
        .iter()
        .take(input.max_locomotives as usize)
        .map(|l| LocomotiveMap {
            key: format!("{}_{}", l.model, l.number),
            model: l.model.to_string(),
            number: l.number.to_string(),
            url: format!("{base}/{}_{}.html", l.model, l.number),
            trip_count: l.total_trips(),
        })
        .collect::<Vec<_>>();
    info!(depot = depot.id, maps = locomotives.len(), "generated depot maps");

    Ok(Json(GenerateMapsResponse {
        depot_id: depot.id.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        maps: MapsList {
            overview: format!("{base}/overview.html"),
            heatmap: format!("{base}/heatmap.html"),
            locomotives,
        },
    }))
}
