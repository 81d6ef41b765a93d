use crate::config::ClientOptions;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::service::{Service, ServiceDescriptor};
use crate::services::Stack;
use crate::types::BulkPublishDetails;

const BULK_API_VERSION: &str = "3.2";

/// `POST bulk/publish`. Sends the bulk `api_version` header, which is
/// dropped again once the request succeeds.
#[derive(Debug, Clone)]
pub struct BulkPublishService {
    descriptor: ServiceDescriptor,
    details: BulkPublishDetails,
}

impl BulkPublishService {
    pub fn new(stack: &Stack, details: BulkPublishDetails) -> Result<Self, ApiError> {
        if details.entries.is_empty() && details.assets.is_empty() {
            return Err(ApiError::Validation { field: "details" });
        }
        if details.environments.is_empty() {
            return Err(ApiError::Validation { field: "environments" });
        }
        if details.locales.is_empty() {
            return Err(ApiError::Validation { field: "locales" });
        }
        let mut descriptor = ServiceDescriptor::new(HttpMethod::Post, "bulk/publish")?;
        stack.scope(&mut descriptor);
        descriptor.api_version = Some(BULK_API_VERSION.to_string());
        Ok(Self { descriptor, details })
    }

    pub fn skip_workflow_stage_check(mut self) -> Self {
        self.descriptor.headers.insert("skip_workflow_stage_check", "true");
        self
    }

    pub fn approvals(mut self) -> Self {
        self.descriptor.headers.insert("approvals", "true");
        self
    }

    /// Also publish referenced (nested) entries.
    pub fn nested(mut self) -> Self {
        self.descriptor.add_query_resource("nested", "true");
        self
    }
}

impl Service for BulkPublishService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }

    fn content_body(&mut self) -> Result<(), ApiError> {
        self.descriptor.set_json_body(&self.details)
    }

    fn on_response(&mut self, _response: &HttpResponse, _config: &ClientOptions) -> Result<(), ApiError> {
        self.descriptor.api_version = None;
        self.descriptor.headers.remove("api_version");
        Ok(())
    }
}
