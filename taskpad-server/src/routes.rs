//! HTTP routes of the task API: shared state, handlers and server startup.
//!
//! | route | handler |
//! |---|---|
//! | `GET /health` | liveness |
//! | `GET /api/todos` | list the caller's tasks, newest first |
//! | `POST /api/todos` | create a task (201) |
//! | `GET /api/todos/{id}` | fetch one task |
//! | `PATCH /api/todos/{id}` | merge a partial update |
//! | `DELETE /api/todos/{id}` | remove a task |
//!
//! Every `/api` route requires the [`USER_ID_HEADER`]; requests without it
//! are rejected with 401.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use taskpad_proto::task::{Task, TaskId};
use taskpad_proto::wire::{MessageBody, NewTask, TODOS_PATH, TaskPatch, USER_ID_HEADER};

use crate::store::TaskRepository;

/// Shared server state.
#[derive(Default)]
pub struct ServerState {
    /// Per-user task records.
    pub store: TaskRepository,
}

impl ServerState {
    /// Creates a state with an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state over an existing repository.
    #[must_use]
    pub const fn with_store(store: TaskRepository) -> Self {
        Self { store }
    }
}

/// Handler failures, rendered as `{"message": ...}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body breaks a field rule.
    #[error("{0}")]
    BadRequest(String),
    /// The user header is missing or blank.
    #[error("please sign in")]
    Unauthorized,
    /// No task with the given id belongs to the caller.
    #[error("task not found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(MessageBody::new(self.to_string()))).into_response()
    }
}

/// Builds the router over the given state.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    let item_path = format!("{TODOS_PATH}/{{id}}");
    axum::Router::new()
        .route("/health", get(health))
        .route(TODOS_PATH, get(list_tasks).post(create_task))
        .route(
            &item_path,
            get(get_task).patch(update_task).delete(delete_task),
        )
        .with_state(state)
}

/// Starts the server on the given address with empty state and returns the
/// bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-built [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Extracts the calling user from the request headers.
fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_tasks(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = caller(&headers)?;
    let tasks = state.store.list(&user_id).await;
    tracing::debug!(user_id = %user_id, count = tasks.len(), "listed tasks");
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(new_task): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let user_id = caller(&headers)?;
    new_task.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let task = state.store.create(&user_id, new_task, Utc::now()).await;
    tracing::info!(user_id = %user_id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let user_id = caller(&headers)?;
    state
        .store
        .get(&user_id, &TaskId::new(id))
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let user_id = caller(&headers)?;
    patch.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let id = TaskId::new(id);
    let task = state
        .store
        .update(&user_id, &id, &patch, Utc::now())
        .await
        .ok_or(ApiError::NotFound)?;
    tracing::info!(user_id = %user_id, task_id = %id, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let user_id = caller(&headers)?;
    let id = TaskId::new(id);
    if !state.store.delete(&user_id, &id).await {
        return Err(ApiError::NotFound);
    }
    tracing::info!(user_id = %user_id, task_id = %id, "task deleted");
    Ok(Json(MessageBody::new("task deleted")))
}
