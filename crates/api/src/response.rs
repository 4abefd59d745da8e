//! Shared response envelope types for API handlers.
//!
//! List endpoints use a `{ "data": [...] }` envelope. Single entities are
//! returned as-is.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
