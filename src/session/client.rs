use super::credentials::parse_cookie_pairs;
use super::types::*;
use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, COOKIE};
use percent_encoding::percent_decode_str;
use reqwest::Client;
use tracing::debug;

/// Headers the web player always sends.
const FIXED_HEADERS: [(&str, &str); 3] = [("xt-agent", "web"), ("x-client", "web"), ("xtbz", "ykt")];

/// Cookie values mirrored into request headers: (header, cookie name).
/// Values are percent-decoded first, the way the browser's player reads them.
const COOKIE_HEADERS: [(&str, &str); 3] = [
    ("university-id", "university_id"),
    ("uv-id", "uv_id"),
    ("x-csrftoken", "csrftoken"),
];

const MAX_ERROR_BODY_CHARS: usize = 240;

/// Raw platform response with a success status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json(&self) -> Result<serde_json::Value, ClientError> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Authenticated transport. Cheap to clone; every clone shares the same
/// connection pool and the same fixed credential.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
}

impl SessionClient {
    pub fn new(settings: &SessionSettings, cookie: &str) -> Result<Self, ClientError> {
        let headers = build_headers(cookie)?;

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = ?request.method, %url, "sending platform request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(classroom_id) = request.classroom_id {
            builder = builder.header("classroom-id", classroom_id.to_string());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read body: {e}")))?;

        Ok(ApiResponse { status, body })
    }

    pub async fn send_json(&self, request: ApiRequest) -> Result<serde_json::Value, ClientError> {
        self.send(request).await?.json()
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn classify_status(status: u16, body: &str) -> ClientError {
    if status == 401 || status == 403 {
        return ClientError::Auth { status };
    }

    let body = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
    if should_retry_http_status(status) {
        if body.is_empty() {
            ClientError::Transport(format!("HTTP status {status}"))
        } else {
            ClientError::Transport(format!("HTTP status {status} ({body})"))
        }
    } else {
        ClientError::Rejected { status, body }
    }
}

fn build_headers(cookie: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));

    for (name, value) in FIXED_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    let cookie_value = HeaderValue::from_str(cookie.trim())
        .map_err(|_| ClientError::Setup("cookie contains characters not allowed in a header".to_string()))?;
    headers.insert(COOKIE, cookie_value);

    let pairs = parse_cookie_pairs(cookie);
    for (header, cookie_name) in COOKIE_HEADERS {
        let Some((_, value)) = pairs.iter().find(|(name, _)| name == cookie_name) else {
            continue;
        };
        let value = percent_decode_str(value).decode_utf8_lossy();
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(header), value);
            }
            Err(_) => debug!(cookie = cookie_name, "skipping cookie that is not a valid header value"),
        }
    }

    Ok(headers)
}
