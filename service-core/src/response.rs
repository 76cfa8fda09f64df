//! Success envelope for REST responses.

use axum::Json;
use serde::Serialize;

/// Wire envelope: `{"success": true, "result": …}` on success. Failures are
/// rendered by [`crate::error::AppError`] as `{"success": false, "message": …}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(result: T) -> Json<Self> {
        Json(Self {
            success: true,
            result: Some(result),
        })
    }
}
