use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
///
/// # Response Format
/// ```json
/// {
///   "status": "pong"
/// }
/// ```
///
/// Unauthenticated, so load balancers and orchestrators can probe it without a token.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}
