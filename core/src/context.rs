//! Per-call state threaded through the pipeline.

use crate::config::ClientOptions;
use crate::http::HttpResponse;
use crate::service::Service;

/// Everything one top-level call needs, created fresh for each call.
pub struct ExecutionContext<'a> {
    pub request: RequestContext<'a>,
    pub response: ResponseContext,
}

pub struct RequestContext<'a> {
    pub service: &'a mut dyn Service,
    pub config: &'a ClientOptions,
    /// Retries performed so far; only the retry handler increments it.
    pub retries: u32,
}

#[derive(Debug, Default)]
pub struct ResponseContext {
    /// Response of the latest successful attempt.
    pub response: Option<HttpResponse>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(service: &'a mut dyn Service, config: &'a ClientOptions) -> Self {
        Self {
            request: RequestContext {
                service,
                config,
                retries: 0,
            },
            response: ResponseContext::default(),
        }
    }

    pub fn resource_path(&self) -> &str {
        &self.request.service.descriptor().resource_path
    }
}
