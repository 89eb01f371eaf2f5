//! HTTP API for the consultation front end
//!
//! - GET /health - Health check
//! - GET /api/specialists - Specialist catalog
//! - POST /api/suggest-doctors - Suggest specialists for symptom notes
//! - POST /api/session-chart - Create a consultation record
//! - GET /api/session-chart - One record, or the caller's history
//! - POST /api/sessions/:id/connect - Start the voice call
//! - POST /api/sessions/:id/disconnect - End the call and generate the report
//! - GET /api/sessions/:id/status - Lifecycle status
//! - GET /api/sessions/:id/transcript - Accumulated transcript

mod handlers;
mod identity;
mod routes;
mod state;

pub use handlers::{DisconnectResponse, ErrorResponse};
pub use identity::{CurrentUser, USER_EMAIL_HEADER};
pub use routes::create_router;
pub use state::AppState;
