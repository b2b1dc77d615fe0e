use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_TOKEN_HEADER: &str = "APITOKEN";

pub const MACHINE_SIZES: [&str; 4] = ["small", "medium", "large", "xlarge"];

pub const REGIONS: [(&str, &str); 3] = [
    ("us-east-1", "US East (N. Virginia)"),
    ("eu-west-1", "EU (Ireland)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
];

pub const MEETING_IDS: [&str; 2] = ["weekly-standup", "board-review"];

pub const RECORDING_IDS: [&str; 2] = [
    "6e35e3b2778883f5db637d7a5dba0a427f692e91-1546529412476",
    "a9d2f0c1b7e6453890ab12cd34ef5678901234ab-1546529500000",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub name: String,
    pub machine_size: String,
    pub region: String,
    pub status: InstanceStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEvent {
    pub sequence: u64,
    pub event: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "MeetingID")]
    pub meeting_id: String,
    #[serde(rename = "MeetingName")]
    pub meeting_name: String,
    #[serde(rename = "Running")]
    pub running: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recording {
    #[serde(rename = "RecordingID")]
    pub recording_id: String,
    #[serde(rename = "MeetingID")]
    pub meeting_id: String,
    #[serde(rename = "Published")]
    pub published: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Region {
    pub name: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct CreateInstance {
    #[serde(rename = "MachineSize", default = "default_machine_size")]
    pub machine_size: String,
    #[serde(rename = "Region")]
    pub region: Option<String>,
}

fn default_machine_size() -> String {
    MACHINE_SIZES[0].to_string()
}

/// Wire envelope. `data` is serialized as `null` when absent.
#[derive(Serialize)]
struct Envelope<T> {
    status: &'static str,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Default)]
struct Db {
    instances: BTreeMap<String, Instance>,
    history: BTreeMap<String, Vec<HistoryEvent>>,
    next_sequence: u64,
    meetings: BTreeMap<String, Meeting>,
    recordings: BTreeMap<String, Recording>,
}

impl Db {
    fn seeded() -> Self {
        let mut db = Db::default();
        for (i, id) in MEETING_IDS.iter().enumerate() {
            db.meetings.insert(
                id.to_string(),
                Meeting {
                    meeting_id: id.to_string(),
                    meeting_name: id.replace('-', " "),
                    running: i == 0,
                },
            );
        }
        for (id, meeting) in RECORDING_IDS.iter().zip(MEETING_IDS) {
            db.recordings.insert(
                id.to_string(),
                Recording {
                    recording_id: id.to_string(),
                    meeting_id: meeting.to_string(),
                    published: true,
                },
            );
        }
        db
    }

    fn record(&mut self, name: &str, event: &str) {
        self.next_sequence += 1;
        self.history.entry(name.to_string()).or_default().push(HistoryEvent {
            sequence: self.next_sequence,
            event: event.to_string(),
        });
    }
}

#[derive(Clone)]
struct AppState {
    api_token: Arc<str>,
    db: Arc<RwLock<Db>>,
}

/// Router serving the VM API for one customer under `/{customer_id}/vm`.
pub fn app(customer_id: &str, api_token: &str) -> Router {
    let state = AppState {
        api_token: Arc::from(api_token),
        db: Arc::new(RwLock::new(Db::seeded())),
    };
    let api = Router::new()
        .route("/instances", get(list_instances).post(create_instance))
        .route("/instances/{name}", get(get_instance).delete(delete_instance))
        .route("/instances/{name}/start", patch(start_instance))
        .route("/instances/{name}/stop", put(stop_instance))
        .route("/instances/{name}/history", get(instance_history))
        .route("/meetings", get(list_meetings))
        .route("/meetings/{id}", get(get_meeting))
        .route("/recordings", get(list_recordings))
        .route(
            "/recordings/{id}",
            get(get_recording)
                .put(publish_recording)
                .patch(unpublish_recording)
                .delete(delete_recording),
        )
        .route("/regions", get(list_regions))
        .route("/billing/activity", get(billing_activity))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);

    Router::new().nest(&format!("/{customer_id}/vm"), api)
}

pub async fn run(listener: TcpListener, customer_id: &str, api_token: &str) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), customer_id, "serving mock VM API");
    axum::serve(listener, app(customer_id, api_token)).await
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(API_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if token != Some(&*state.api_token) {
        debug!(uri = %request.uri(), "rejecting request with bad token");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(request).await
}

fn success<T: Serialize>(data: Option<T>) -> Response {
    Json(Envelope {
        status: "success",
        data,
        message: None,
    })
    .into_response()
}

/// Lists are sent as `data: null` when empty.
fn collection<T: Serialize>(items: Vec<T>) -> Response {
    success((!items.is_empty()).then_some(items))
}

fn fail(code: StatusCode, message: &str) -> Response {
    let body = Envelope::<()> {
        status: "fail",
        data: None,
        message: Some(message.to_string()),
    };
    (code, Json(body)).into_response()
}

fn instance_not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "instance not found")
}

fn recording_not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "recording not found")
}

// --- instances ---

async fn list_instances(State(state): State<AppState>, Query(filter): Query<HashMap<String, String>>) -> Response {
    let db = state.db.read().await;
    let instances: Vec<Instance> = db
        .instances
        .values()
        .filter(|i| filter.get("region").map_or(true, |r| *r == i.region))
        .filter(|i| {
            filter.get("status").map_or(true, |s| match i.status {
                InstanceStatus::Running => s == "running",
                InstanceStatus::Stopped => s == "stopped",
            })
        })
        .cloned()
        .collect();
    collection(instances)
}

async fn create_instance(State(state): State<AppState>, Json(input): Json<CreateInstance>) -> Response {
    if !MACHINE_SIZES.contains(&input.machine_size.as_str()) {
        return fail(StatusCode::UNPROCESSABLE_ENTITY, "unknown machine size");
    }
    let region = input.region.unwrap_or_else(|| REGIONS[0].0.to_string());
    if !REGIONS.iter().any(|(name, _)| *name == region) {
        return fail(StatusCode::UNPROCESSABLE_ENTITY, "unknown region");
    }

    let simple = Uuid::new_v4().simple().to_string();
    let instance = Instance {
        name: format!("bbb-{}", &simple[..16]),
        machine_size: input.machine_size,
        region,
        status: InstanceStatus::Running,
    };

    let mut db = state.db.write().await;
    db.instances.insert(instance.name.clone(), instance.clone());
    db.record(&instance.name, "created");
    debug!(name = %instance.name, "created instance");
    success(Some(instance))
}

async fn get_instance(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.instances.get(&name) {
        Some(instance) => success(Some(instance.clone())),
        None => instance_not_found(),
    }
}

async fn delete_instance(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let mut db = state.db.write().await;
    if db.instances.remove(&name).is_none() {
        return instance_not_found();
    }
    db.history.remove(&name);
    success(None::<()>)
}

async fn start_instance(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    set_status(&state, &name, InstanceStatus::Running, "started").await
}

async fn stop_instance(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    set_status(&state, &name, InstanceStatus::Stopped, "stopped").await
}

async fn set_status(state: &AppState, name: &str, status: InstanceStatus, event: &str) -> Response {
    let mut db = state.db.write().await;
    let Some(instance) = db.instances.get_mut(name) else {
        return instance_not_found();
    };
    if instance.status == status {
        return fail(StatusCode::CONFLICT, &format!("instance already {event}"));
    }
    instance.status = status;
    let instance = instance.clone();
    db.record(name, event);
    success(Some(instance))
}

async fn instance_history(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let db = state.db.read().await;
    if !db.instances.contains_key(&name) {
        return instance_not_found();
    }
    success(db.history.get(&name).cloned())
}

// --- meetings ---

async fn list_meetings(State(state): State<AppState>) -> Response {
    let db = state.db.read().await;
    collection(db.meetings.values().cloned().collect())
}

async fn get_meeting(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.meetings.get(&id) {
        Some(meeting) => success(Some(meeting.clone())),
        None => fail(StatusCode::NOT_FOUND, "meeting not found"),
    }
}

// --- recordings ---

async fn list_recordings(State(state): State<AppState>) -> Response {
    let db = state.db.read().await;
    collection(db.recordings.values().cloned().collect())
}

async fn get_recording(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.recordings.get(&id) {
        Some(recording) => success(Some(recording.clone())),
        None => recording_not_found(),
    }
}

async fn publish_recording(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    set_published(&state, &id, true).await
}

async fn unpublish_recording(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    set_published(&state, &id, false).await
}

async fn set_published(state: &AppState, id: &str, published: bool) -> Response {
    let mut db = state.db.write().await;
    match db.recordings.get_mut(id) {
        Some(recording) => {
            recording.published = published;
            success(Some(recording.clone()))
        }
        None => recording_not_found(),
    }
}

async fn delete_recording(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut db = state.db.write().await;
    match db.recordings.remove(&id) {
        Some(_) => success(None::<()>),
        None => recording_not_found(),
    }
}

// --- regions & billing ---

async fn list_regions() -> Response {
    let regions: Vec<Region> = REGIONS
        .iter()
        .map(|(name, description)| Region {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();
    collection(regions)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BillingActivity {
    instance_count: usize,
    running_count: usize,
}

async fn billing_activity(State(state): State<AppState>) -> Response {
    let db = state.db.read().await;
    let running_count = db
        .instances
        .values()
        .filter(|i| i.status == InstanceStatus::Running)
        .count();
    success(Some(BillingActivity {
        instance_count: db.instances.len(),
        running_count,
    }))
}
