use serde::Serialize;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::service::{Service, ServiceDescriptor};
use crate::services::Stack;

fn wrap<T: Serialize + ?Sized>(data_key: &str, payload: &T) -> Result<serde_json::Value, ApiError> {
    let value =
        serde_json::to_value(payload).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    let mut body = serde_json::Map::new();
    body.insert(data_key.to_string(), value);
    Ok(serde_json::Value::Object(body))
}

fn require_data_key(data_key: &str) -> Result<(), ApiError> {
    if data_key.trim().is_empty() {
        return Err(ApiError::Validation { field: "data_key" });
    }
    Ok(())
}

/// `POST` or `PUT` of a typed payload wrapped under `data_key`, e.g.
/// `{"content_type": {...}}`.
#[derive(Debug, Clone)]
pub struct CreateUpdateService<T> {
    descriptor: ServiceDescriptor,
    data_key: String,
    payload: T,
}

impl<T: Serialize + Send> CreateUpdateService<T> {
    pub fn create(
        stack: &Stack,
        resource_path: impl Into<String>,
        data_key: impl Into<String>,
        payload: T,
    ) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Post, stack, resource_path, data_key, payload)
    }

    pub fn update(
        stack: &Stack,
        resource_path: impl Into<String>,
        data_key: impl Into<String>,
        payload: T,
    ) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Put, stack, resource_path, data_key, payload)
    }

    fn new(
        method: HttpMethod,
        stack: &Stack,
        resource_path: impl Into<String>,
        data_key: impl Into<String>,
        payload: T,
    ) -> Result<Self, ApiError> {
        let data_key = data_key.into();
        require_data_key(&data_key)?;
        let mut descriptor = ServiceDescriptor::new(method, resource_path)?;
        stack.scope(&mut descriptor);
        Ok(Self {
            descriptor,
            data_key,
            payload,
        })
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T: Serialize + Send> Service for CreateUpdateService<T> {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }

    fn content_body(&mut self) -> Result<(), ApiError> {
        let body = wrap(&self.data_key, &self.payload)?;
        self.descriptor.set_json_body(&body)
    }
}

/// `GET` or `DELETE` of a single stack resource. A delete may carry a
/// wrapped JSON payload.
#[derive(Debug, Clone)]
pub struct FetchDeleteService {
    descriptor: ServiceDescriptor,
    payload: Option<serde_json::Value>,
}

impl FetchDeleteService {
    pub fn fetch(stack: &Stack, resource_path: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Get, stack, resource_path)
    }

    pub fn delete(stack: &Stack, resource_path: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Delete, stack, resource_path)
    }

    fn new(method: HttpMethod, stack: &Stack, resource_path: impl Into<String>) -> Result<Self, ApiError> {
        let mut descriptor = ServiceDescriptor::new(method, resource_path)?;
        stack.scope(&mut descriptor);
        Ok(Self {
            descriptor,
            payload: None,
        })
    }

    pub fn with_payload<T: Serialize + ?Sized>(mut self, data_key: &str, payload: &T) -> Result<Self, ApiError> {
        require_data_key(data_key)?;
        self.payload = Some(wrap(data_key, payload)?);
        Ok(self)
    }

    pub fn with_query_resource(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.add_query_resource(key, value);
        self
    }
}

impl Service for FetchDeleteService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }

    fn content_body(&mut self) -> Result<(), ApiError> {
        match &self.payload {
            Some(payload) => self.descriptor.set_json_body(payload),
            None => Ok(()),
        }
    }
}
