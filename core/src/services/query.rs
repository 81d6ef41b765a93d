use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::params::ParameterCollection;
use crate::service::{Service, ServiceDescriptor};
use crate::services::Stack;

/// `GET` on a stack collection, e.g. `content_types` or `entries`, filtered
/// by query parameters.
#[derive(Debug, Clone)]
pub struct QueryService {
    descriptor: ServiceDescriptor,
}

impl QueryService {
    pub fn new(
        stack: &Stack,
        resource_path: impl Into<String>,
        parameters: ParameterCollection,
    ) -> Result<Self, ApiError> {
        let mut descriptor =
            ServiceDescriptor::new(HttpMethod::Get, resource_path)?.with_parameters(parameters);
        stack.scope(&mut descriptor);
        Ok(Self { descriptor })
    }
}

impl Service for QueryService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }
}
