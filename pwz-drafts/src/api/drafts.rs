//! Draft endpoints
//!
//! - `POST /drafts` (optional `X-Tenant-Id`)
//! - `GET /drafts?tenant=`
//! - `GET /drafts/:id`
//! - `PUT /drafts/:id/sections/:section` (optional `If-Match`)
//! - `POST /drafts/:id/publish` (optional `If-Match`)
//!
//! Every single-draft response carries `ETag: "<version>"`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use crate::document::Document;
use crate::error::DraftError;
use crate::reconciler::DraftSummary;
use crate::AppState;

/// Header carrying the opaque tenant id
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub tenant: Option<String>,
}

/// POST /drafts
pub async fn create_draft(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let tenant = tenant_header(&headers)?;
    let summary = state.reconciler.create_draft(tenant.as_deref()).await?;
    Ok(with_etag(StatusCode::CREATED, summary))
}

/// GET /drafts?tenant=
///
/// Falls back to the `X-Tenant-Id` header when the query parameter is absent.
pub async fn list_drafts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<DraftSummary>>> {
    let tenant = match query.tenant.filter(|t| !t.is_empty()) {
        Some(tenant) => tenant,
        None => tenant_header(&headers)?
            .ok_or_else(|| {
                ApiError::BadRequest("tenant query parameter or X-Tenant-Id header required".into())
            })?,
    };

    let drafts = state.reconciler.list_drafts(&tenant).await?;
    Ok(Json(drafts))
}

/// GET /drafts/:id
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let summary = state.reconciler.get_draft(id).await?;
    Ok(with_etag(StatusCode::OK, summary))
}

/// PUT /drafts/:id/sections/:section
///
/// The body is the partial subtree for that one section. A body that is not
/// JSON is reported as `InvalidSection` like any other malformed payload.
pub async fn save_section(
    State(state): State<AppState>,
    Path((id, section)): Path<(Uuid, String)>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body
        .map_err(|rejection| DraftError::invalid_section(section.as_str(), rejection.body_text()))?;
    let expected = expected_version(&headers)?;

    let mut payload = Document::new();
    payload.insert(section, body);

    let summary = state.reconciler.save_section(id, payload, expected).await?;
    Ok(with_etag(StatusCode::OK, summary))
}

/// POST /drafts/:id/publish
pub async fn publish_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let expected = expected_version(&headers)?;
    let summary = state.reconciler.publish(id, expected).await?;
    Ok(with_etag(StatusCode::OK, summary))
}

fn with_etag(status: StatusCode, summary: DraftSummary) -> Response {
    let etag = format!("\"{}\"", summary.version);
    (status, [(header::ETAG, etag)], Json(summary)).into_response()
}

fn tenant_header(headers: &HeaderMap) -> ApiResult<Option<String>> {
    match headers.get(TENANT_HEADER) {
        None => Ok(None),
        Some(value) => {
            let tenant = value
                .to_str()
                .map_err(|_| ApiError::BadRequest("X-Tenant-Id is not valid text".into()))?
                .trim();
            Ok((!tenant.is_empty()).then(|| tenant.to_string()))
        }
    }
}

/// Parse `If-Match`; accepts `3`, `"3"` and `W/"3"`
fn expected_version(headers: &HeaderMap) -> ApiResult<Option<i64>> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("If-Match is not valid text".into()))?
        .trim();
    if raw.is_empty() || raw == "*" {
        return Ok(None);
    }

    parse_version_tag(raw).map(Some).ok_or_else(|| {
        ApiError::BadRequest(format!("If-Match must be a draft version, got '{}'", raw))
    })
}

fn parse_version_tag(raw: &str) -> Option<i64> {
    let unweak = raw.strip_prefix("W/").unwrap_or(raw);
    let unquoted = unweak
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(unweak);
    unquoted.parse::<i64>().ok().filter(|v| *v >= 0)
}
