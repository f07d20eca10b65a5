//! HTTP API for driving capture sessions from a page
//!
//! This module provides a REST API around the capture modal and sell form:
//! - POST /capture/open - Acquire a camera and open a session
//! - POST /capture/:id/switch - Switch front/back camera
//! - POST /capture/:id/record/start, /record/stop - Control the recorder
//! - POST /capture/:id/accept, /discard, /close - Leave the stopped state or the modal
//! - GET /capture/:id/status - Query session status
//! - GET /form/videos, DELETE /form/videos/:index, POST /form/submit - Sell form
//! - GET /machines/:kind - Filtered machine listings
//! - GET /health - Health check
//!
//! Sessions nobody touches for `capture.idle_timeout_secs` are closed by
//! `spawn_session_reaper`.

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::{spawn_session_reaper, AppState, SessionSlot};
