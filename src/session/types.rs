use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One call against the platform, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub classroom_id: Option<u64>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            classroom_id: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            classroom_id: None,
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Requests scoped to a classroom carry a `classroom-id` header.
    pub fn for_classroom(mut self, classroom_id: u64) -> Self {
        self.classroom_id = Some(classroom_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: std::time::Duration,
}
