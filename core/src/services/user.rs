use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::service::{Service, ServiceDescriptor};

/// `GET user`: the user owning the current session token.
#[derive(Debug, Clone)]
pub struct GetLoggedInUserService {
    descriptor: ServiceDescriptor,
}

impl GetLoggedInUserService {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            descriptor: ServiceDescriptor::new(HttpMethod::Get, "user")?,
        })
    }
}

impl Service for GetLoggedInUserService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }
}
