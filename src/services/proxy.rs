// src/services/proxy.rs
//
// Pass-through forwarding of `/api/github/*path` to the upstream API with
// the server-held credential attached.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::DateTime;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;

use crate::github::rate_limit::{REMAINING_HEADER, RESET_HEADER};
use crate::github::transport::{GITHUB_ACCEPT, GITHUB_API_VERSION, USER_AGENT_VALUE};

const PATH_PARAM: &str = "path";

/// Request headers never copied upstream. `accept-encoding` is dropped so
/// the upstream body arrives uncompressed; only `content-type` is echoed
/// back and the router applies its own compression.
const DROPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "accept-encoding",
    "authorization",
    "content-length",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "cookie",
];

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid upstream path: {0}")]
    InvalidPath(String),

    #[error("configured GitHub token is not a valid header value")]
    InvalidCredential,

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

pub struct ProxyForwarder {
    client: reqwest::Client,
    upstream: Url,
    token: Option<SecretString>,
}

impl ProxyForwarder {
    pub fn new(upstream_base: &str, token: Option<SecretString>) -> Result<Self, ProxyError> {
        let mut upstream = Url::parse(upstream_base)?;
        // Keep a trailing slash so joins stay below the base path.
        if !upstream.path().ends_with('/') {
            let path = format!("{}/", upstream.path());
            upstream.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            upstream,
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Upstream URL for `path` with the inbound query, minus the `path`
    /// parameter. Paths that would leave the upstream base are refused.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Result<Url, ProxyError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.split('/').any(|segment| segment == ".." || segment == ".")
            || path.contains("://")
            || path.contains('\\')
        {
            return Err(ProxyError::InvalidPath(path.to_string()));
        }

        let mut url = self.upstream.join(path)?;
        if url.origin() != self.upstream.origin() || !url.path().starts_with(self.upstream.path()) {
            return Err(ProxyError::InvalidPath(path.to_string()));
        }

        url.set_query(strip_path_param(query).as_deref());
        Ok(url)
    }

    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response {
        match self.try_forward(method, path, query, headers, body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Proxy error for /{}: {}", path, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Failed to fetch from GitHub",
                        "details": e.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }

    async fn try_forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let url = self.upstream_url(path, query)?;
        tracing::info!("Proxying {} {}", method, url.path());

        let mut outbound = forwardable_headers(headers);
        outbound
            .entry(header::ACCEPT)
            .or_insert(HeaderValue::from_static(GITHUB_ACCEPT));
        outbound
            .entry(header::USER_AGENT)
            .or_insert(HeaderValue::from_static(USER_AGENT_VALUE));
        outbound
            .entry(HeaderName::from_static("x-github-api-version"))
            .or_insert(HeaderValue::from_static(GITHUB_API_VERSION));

        match &self.token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|_| ProxyError::InvalidCredential)?;
                outbound.insert(header::AUTHORIZATION, value);
            }
            None => tracing::warn!("No GitHub token configured, proxying unauthenticated"),
        }

        let mut request = self.client.request(method.clone(), url).headers(outbound);
        if method != Method::GET && method != Method::HEAD && !body.is_empty() {
            request = request.body(body);
        }

        let upstream = request.send().await?;
        let status = upstream.status();
        let upstream_headers = upstream.headers().clone();
        let payload = upstream.bytes().await?;

        Ok(build_response(status, &upstream_headers, payload))
    }
}

/// Inbound headers with hop-by-hop entries and credentials removed.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !DROPPED_REQUEST_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// The inbound query string without the `path` parameter.
pub fn strip_path_param(query: Option<&str>) -> Option<String> {
    let query = query.filter(|q| !q.is_empty())?;
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key != PATH_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        return None;
    }

    Some(
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}

/// Echo the upstream response, copying the rate-limit headers under their
/// canonical names. A 403 with an exhausted quota becomes the
/// `{error, resetAt}` envelope.
pub fn build_response(status: StatusCode, upstream_headers: &HeaderMap, payload: Bytes) -> Response {
    let remaining = upstream_headers.get(REMAINING_HEADER).cloned();
    let reset = upstream_headers.get(RESET_HEADER).cloned();

    let mut response = if status == StatusCode::FORBIDDEN
        && remaining.as_ref().and_then(|v| v.to_str().ok()) == Some("0")
    {
        let reset_at = reset
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));

        tracing::warn!("Upstream rate limit exhausted, resets at {:?}", reset_at);
        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "GitHub API rate limit exceeded",
                "resetAt": reset_at,
            })),
        )
            .into_response()
    } else {
        let mut response = Response::new(Body::from(payload));
        *response.status_mut() = status;
        if let Some(content_type) = upstream_headers.get(header::CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        response
    };

    let headers = response.headers_mut();
    if let Some(value) = remaining {
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
    }
    if let Some(value) = reset {
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
    }

    response
}
