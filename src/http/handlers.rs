use super::state::{AppState, SessionSlot};
use crate::api::{ListingKind, MachineDetails, MachineListing, SellMachineRequest};
use crate::capture::{CaptureOptions, CaptureSession, CaptureStatus, RecorderPhase};
use crate::device::FacingMode;
use crate::error::{CaptureError, SubmitError};
use crate::form::{AttachmentSummary, ListingFilter};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpenCaptureRequest {
    /// Camera to try first (defaults to the configured facing mode)
    pub facing_mode: Option<FacingMode>,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub session_id: String,
    pub status: String,
    pub attachment: AttachmentSummary,
    pub videos_attached: usize,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSellRequest {
    #[serde(flatten)]
    pub details: MachineDetails,
    #[serde(default)]
    pub other_options: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    pub message: String,
    pub listing: SellMachineRequest,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by a handler, rendered as `ErrorResponse`
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn session_not_found(session_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("Capture session {} not found", session_id),
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<CaptureError> for HttpError {
    fn from(err: CaptureError) -> Self {
        let status = match &err {
            CaptureError::CameraUnavailable(_) | CaptureError::SwitchFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CaptureError::InvalidTransition { .. }
            | CaptureError::NoActiveStream
            | CaptureError::EmptyRecording => StatusCode::CONFLICT,
            CaptureError::Encoder(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<SubmitError> for HttpError {
    fn from(err: SubmitError) -> Self {
        let status = match &err {
            SubmitError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            SubmitError::MissingField(_) | SubmitError::MissingAttachment(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SubmitError::Upload { .. } | SubmitError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

type HandlerResult<T> = Result<Json<T>, HttpError>;

// ============================================================================
// Capture handlers
// ============================================================================

/// POST /capture/open
/// Acquire a camera and open a capture session
pub async fn open_capture(
    State(state): State<AppState>,
    body: Option<Json<OpenCaptureRequest>>,
) -> HandlerResult<CaptureStatus> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let options = CaptureOptions {
        facing_mode: req.facing_mode.unwrap_or(state.capture.facing_mode),
        ..state.capture.clone()
    };

    let session = CaptureSession::open(
        Arc::clone(&state.devices),
        Arc::clone(&state.encoders),
        options,
    )
    .await?;

    let status = session.status();
    info!("Capture session opened: {}", status.session_id);

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(
            status.session_id.clone(),
            Arc::new(SessionSlot::new(session)),
        );
    }

    Ok(Json(status))
}

/// POST /capture/:session_id/switch
/// Switch between front and back camera
pub async fn switch_camera(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CaptureStatus> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    if let Err(e) = session.switch_camera().await {
        warn!("Camera switch failed for {}: {}", session_id, e);
        return Err(e.into());
    }

    Ok(Json(session.status()))
}

/// POST /capture/:session_id/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CaptureStatus> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    session.start_recording().await?;
    info!("Recording started for {}", session_id);

    Ok(Json(session.status()))
}

/// POST /capture/:session_id/record/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CaptureStatus> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    match session.stop_recording().await {
        Ok(_) => Ok(Json(session.status())),
        Err(e) => {
            error!("Failed to stop recording for {}: {}", session_id, e);
            Err(e.into())
        }
    }
}

/// POST /capture/:session_id/accept
/// Attach the stopped recording to the sell form and close the session
pub async fn accept_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<AcceptResponse> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;

    // Check before taking the session so a refused accept keeps the modal open
    let status = guard
        .as_ref()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?
        .status();
    if status.recorder.phase != RecorderPhase::Stopped {
        return Err(CaptureError::invalid(status.recorder.phase, "accept recording").into());
    }
    if status.recorder.bytes == 0 {
        return Err(CaptureError::EmptyRecording.into());
    }

    let session = guard
        .take()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id);
    }

    let mut form = state.sell_form.lock().await;
    let index = session.accept(&mut form.videos)?;
    let attachment = form
        .videos
        .summaries()
        .into_iter()
        .nth(index)
        .ok_or_else(|| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "attachment missing"))?;

    info!(
        "Recording {} attached from {}",
        attachment.file_name, session_id
    );

    Ok(Json(AcceptResponse {
        session_id,
        status: "closed".to_string(),
        attachment,
        videos_attached: form.videos.len(),
    }))
}

/// POST /capture/:session_id/discard
/// Drop the stopped recording; the camera keeps running
pub async fn discard_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CaptureStatus> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    session.discard()?;

    Ok(Json(session.status()))
}

/// POST /capture/:session_id/close
/// Close the modal from any state, releasing the camera
pub async fn close_capture(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CloseResponse> {
    let slot = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    }
    .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    let session = slot.lock().await.take();
    match session {
        Some(session) => {
            session.close();
            Ok(Json(CloseResponse {
                session_id,
                status: "closed".to_string(),
            }))
        }
        None => Err(HttpError::session_not_found(&session_id)),
    }
}

/// GET /capture/:session_id/status
pub async fn get_capture_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<CaptureStatus> {
    let slot = state
        .session(&session_id)
        .await
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;
    let mut guard = slot.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| HttpError::session_not_found(&session_id))?;

    Ok(Json(session.poll()?))
}

// ============================================================================
// Form handlers
// ============================================================================

/// GET /form/videos
/// List the video attachments on the sell form
pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<AttachmentSummary>> {
    let form = state.sell_form.lock().await;
    Json(form.videos.summaries())
}

/// DELETE /form/videos/:index
pub async fn remove_video(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> HandlerResult<Vec<AttachmentSummary>> {
    let mut form = state.sell_form.lock().await;

    match form.videos.remove(index) {
        Some(removed) => {
            info!("Removed video {} from form", removed.file_name());
            Ok(Json(form.videos.summaries()))
        }
        None => Err(HttpError::new(
            StatusCode::NOT_FOUND,
            format!("No video at index {}", index),
        )),
    }
}

/// POST /form/submit
/// Upload attachments and create the sell listing
pub async fn submit_sell_form(
    State(state): State<AppState>,
    Json(req): Json<SubmitSellRequest>,
) -> HandlerResult<SubmitResponse> {
    let mut form = state.sell_form.lock().await;
    form.details = req.details;
    form.other_options = req.other_options;

    match form.submit(state.api.as_ref(), &state.uploads).await {
        Ok(listing) => Ok(Json(SubmitResponse {
            status: "created".to_string(),
            message: "Machine listing created successfully!".to_string(),
            listing,
        })),
        Err(e) => {
            error!("Failed to submit sell listing: {}", e);
            Err(e.into())
        }
    }
}

/// GET /machines/:kind?search=..&category=..
pub async fn list_machines(
    State(state): State<AppState>,
    Path(kind): Path<ListingKind>,
    Query(filter): Query<ListingFilter>,
) -> HandlerResult<Vec<MachineListing>> {
    let listings = state.api.list_machines(kind).await.map_err(|e| {
        error!("Failed to fetch machines: {:#}", e);
        HttpError::new(StatusCode::BAD_GATEWAY, format!("Failed to fetch machines: {}", e))
    })?;

    let filtered = filter.apply(&listings).into_iter().cloned().collect();
    Ok(Json(filtered))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
