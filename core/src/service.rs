//! The contract every endpoint definition implements.
//!
//! # Design
//! The data every endpoint shares (method, path template, headers, query,
//! body) lives in `ServiceDescriptor`. Endpoint types own a descriptor and
//! implement `Service`, overriding `content_body` to serialize their payload
//! and `on_response` to react to a successful call. The request itself is
//! built by the provided `create_http_request`, once per attempt.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ClientOptions;
use crate::error::ApiError;
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::params::{encode_pairs, ParameterCollection};

pub const USER_AGENT: &str = concat!("contentstack-management-rust/", env!("CARGO_PKG_VERSION"));
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub method: HttpMethod,
    /// Path relative to the versioned base URL; may contain `{token}`s.
    pub resource_path: String,
    pub headers: Headers,
    /// Template token (braces included) to literal value.
    pub path_resources: BTreeMap<String, String>,
    /// Always appended to the query string.
    pub query_resources: BTreeMap<String, String>,
    /// Appended to the query string only when `use_query_string` is set.
    pub parameters: ParameterCollection,
    pub body: Option<Vec<u8>>,
    pub use_query_string: bool,
    /// Sent as `authorization` instead of the session `authtoken`.
    pub management_token: Option<String>,
    /// Sent as the `api_version` header when set.
    pub api_version: Option<String>,
}

impl ServiceDescriptor {
    pub fn new(method: HttpMethod, resource_path: impl Into<String>) -> Result<Self, ApiError> {
        let resource_path = resource_path.into();
        if resource_path.trim().is_empty() {
            return Err(ApiError::Validation { field: "resource_path" });
        }
        Ok(Self {
            method,
            resource_path,
            headers: Headers::new(),
            path_resources: BTreeMap::new(),
            query_resources: BTreeMap::new(),
            parameters: ParameterCollection::new(),
            body: None,
            use_query_string: method == HttpMethod::Get,
            management_token: None,
            api_version: None,
        })
    }

    pub fn with_parameters(mut self, parameters: ParameterCollection) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn add_path_resource(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.path_resources.insert(token.into(), value.into());
    }

    pub fn add_query_resource(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_resources.insert(key.into(), value.into());
    }

    pub fn set_json_body<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<(), ApiError> {
        let bytes =
            serde_json::to_vec(payload).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        self.body = Some(bytes);
        Ok(())
    }

    /// `resource_path` with every path resource token substituted.
    pub fn resolved_path(&self) -> String {
        self.path_resources
            .iter()
            .fold(self.resource_path.clone(), |path, (token, value)| path.replace(token, value))
    }

    /// Encoded query string without `?`, or `None` when there is nothing to send.
    pub fn query_string(&self) -> Option<String> {
        let mut pairs: Vec<(String, String)> = self
            .query_resources
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if self.use_query_string {
            pairs.extend(self.parameters.pairs());
        }
        if pairs.is_empty() {
            None
        } else {
            Some(encode_pairs(pairs))
        }
    }

    pub fn request_url(&self, config: &ClientOptions) -> Result<String, ApiError> {
        let base = config.base_url();
        let path = self.resolved_path();
        let mut url = if base.ends_with('/') || path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        if let Some(query) = self.query_string() {
            url.push('?');
            url.push_str(&query);
        }
        url::Url::parse(&url).map_err(|e| ApiError::InvalidUri(format!("{url}: {e}")))?;
        Ok(url)
    }
}

/// An endpoint definition the pipeline can execute.
pub trait Service: Send {
    fn descriptor(&self) -> &ServiceDescriptor;

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor;

    /// Fill `descriptor().body` from the typed payload, if any. Called before
    /// every attempt, so it must give the same result each time.
    fn content_body(&mut self) -> Result<(), ApiError> {
        Ok(())
    }

    /// Called with every successful response before it is returned.
    fn on_response(&mut self, _response: &HttpResponse, _config: &ClientOptions) -> Result<(), ApiError> {
        Ok(())
    }

    fn has_request_body(&self) -> bool {
        self.descriptor().method.has_request_body()
    }

    fn create_http_request(&mut self, config: &ClientOptions) -> Result<HttpRequest, ApiError> {
        self.content_body()?;
        let descriptor = self.descriptor();
        let url = descriptor.request_url(config)?;

        let mut headers = Headers::new();
        headers.insert("Content-Type", JSON_CONTENT_TYPE);
        headers.insert("User-Agent", USER_AGENT);
        if !config.early_access.is_empty() {
            headers.insert("x-header-ea", config.early_access.join(","));
        }
        for (name, value) in descriptor.headers.iter() {
            headers.insert(name, value);
        }
        match &descriptor.management_token {
            Some(token) => {
                headers.remove("authtoken");
                headers.insert("authorization", token.clone());
            }
            None if !headers.contains("authtoken") => {
                if let Some(token) = config.auth_token() {
                    headers.insert("authtoken", token);
                }
            }
            None => {}
        }
        if let Some(version) = &descriptor.api_version {
            headers.insert("api_version", version.clone());
        }

        let body = if self.has_request_body() {
            descriptor.body.clone()
        } else {
            None
        };

        Ok(HttpRequest {
            method: descriptor.method,
            url,
            headers,
            body,
        })
    }
}

/// A bare descriptor is a service with no payload and no response hook.
impl Service for ServiceDescriptor {
    fn descriptor(&self) -> &ServiceDescriptor {
        self
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        self
    }
}
