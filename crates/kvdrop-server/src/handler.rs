use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use kvdrop_types::DEFAULT_CONTENT_TYPE;

use crate::cache::CachePolicy;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult, NOT_FOUND_BODY};
use crate::service::{BlobService, FetchedBlob, Upload};

/// Name of the multipart field carrying the blob.
pub const DATA_FIELD: &str = "data";

pub const GREETING: &str = "Hello World!";

/// Shared handler state. Everything request handlers need is injected here.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlobService>,
    pub public_base_url: Option<Url>,
    /// Authority used for access URLs when neither a public base URL nor a
    /// `Host` header is available.
    pub fallback_authority: SocketAddr,
    pub max_upload_bytes: usize,
    pub legacy_not_found_status: bool,
    pub cache_policy: CachePolicy,
}

impl AppState {
    pub fn new(service: Arc<BlobService>, config: &ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            service,
            public_base_url: config.public_base_url()?,
            fallback_authority: config.bind_addr,
            max_upload_bytes: config.max_upload_bytes,
            legacy_not_found_status: config.compat.legacy_not_found_status,
            cache_policy: CachePolicy::EDGE,
        })
    }

    /// Base URL for access URLs built in response to a request with
    /// `headers`.
    fn base_url(&self, headers: &HeaderMap) -> ServerResult<Url> {
        if let Some(base) = &self.public_base_url {
            return Ok(base.clone());
        }
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|proto| matches!(*proto, "http" | "https"))
            .unwrap_or("http");
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|host| Url::parse(&format!("{scheme}://{host}/")).ok());
        match host {
            Some(url) => Ok(url),
            None => Url::parse(&format!("{scheme}://{}/", self.fallback_authority))
                .map_err(|e| ServerError::Internal(format!("cannot build base URL: {e}"))),
        }
    }
}

/// JSON body of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub access_url: String,
    pub metadata: ResourceMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub resource_id: String,
    pub resource_shasum: String,
}

/// `GET /`
pub async fn index_handler() -> &'static str {
    GREETING
}

/// `GET /{id}`
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    match state.service.fetch_blob(&id).await {
        Ok(blob) => Ok(blob_response(blob, &state.cache_policy)),
        Err(ServerError::NotFound(id)) if state.legacy_not_found_status => {
            debug!(%id, "blob not found (legacy status)");
            Ok((StatusCode::BAD_REQUEST, NOT_FOUND_BODY).into_response())
        }
        Err(e) => Err(e),
    }
}

fn blob_response(blob: FetchedBlob, policy: &CachePolicy) -> Response {
    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(encoding) = blob.encoding.header_value() {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    if let Ok(cache_control) = HeaderValue::from_str(&policy.header_value()) {
        headers.insert(header::CACHE_CONTROL, cache_control);
    }
    (StatusCode::OK, headers, Body::from(blob.body)).into_response()
}

/// `PUT /` with a multipart form holding a `data` field.
pub async fn store_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    let mut multipart = multipart.map_err(|e| ServerError::InvalidInput(e.body_text()))?;
    let upload = read_data_field(&mut multipart, state.max_upload_bytes)
        .await?
        .ok_or_else(|| ServerError::InvalidInput(format!("missing field {DATA_FIELD:?}")))?;

    let stored = state.service.store_blob(upload).await?;
    let access_url = state
        .base_url(&headers)?
        .join(stored.identifier.as_str())
        .map_err(|e| ServerError::Internal(format!("cannot build access URL: {e}")))?;

    let body = StoreResponse {
        access_url: access_url.to_string(),
        metadata: ResourceMetadata {
            resource_id: stored.identifier.to_string(),
            resource_shasum: stored.digest.to_hex(),
        },
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Buffer the first `data` field, enforcing `limit`. Other fields are
/// skipped.
async fn read_data_field(
    multipart: &mut Multipart,
    limit: usize,
) -> ServerResult<Option<Upload>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(DATA_FIELD) {
            debug!(name = ?field.name(), "ignoring form field");
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            if buf.len() + chunk.len() > limit {
                return Err(ServerError::PayloadTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        return Ok(Some(Upload::new(buf.freeze(), content_type)));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError, limit: usize) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge { limit }
    } else {
        ServerError::InvalidInput(e.body_text())
    }
}
