use std::sync::Arc;

use async_trait::async_trait;

use super::{Next, PipelineHandler};
use crate::context::ExecutionContext;
use crate::error::{ApiError, ErrorResponse, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::log::LogManager;
use crate::transport::Transport;

/// Innermost handler: one HTTP attempt per invocation.
///
/// A response in 200..400 is handed to the service's `on_response` hook and
/// stored in the context; anything from 400 up becomes an `ErrorResponse`.
/// Transport failures come back unchanged. A failed attempt is logged at
/// `warn`; whether the call as a whole failed is for the outer handlers to say.
pub struct HttpHandler {
    transport: Arc<dyn Transport>,
    logger: Arc<LogManager>,
}

impl HttpHandler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            logger: Arc::new(LogManager::new()),
        }
    }

    fn prepare(&self, ctx: &mut ExecutionContext<'_>) -> Result<HttpRequest, ApiError> {
        ctx.response.response = None;
        let request = ctx.request.service.create_http_request(ctx.request.config)?;
        self.logger.debug(&format!("{} {}", request.method, request.url));
        Ok(request)
    }

    fn complete(
        &self,
        ctx: &mut ExecutionContext<'_>,
        sent: Result<HttpResponse, TransportError>,
    ) -> Result<(), ApiError> {
        let response = sent?;
        if !response.is_success() {
            return Err(ErrorResponse::from_response(&response).into());
        }
        ctx.request.service.on_response(&response, ctx.request.config)?;
        ctx.response.response = Some(response);
        Ok(())
    }

    fn report(&self, ctx: &ExecutionContext<'_>, outcome: Result<(), ApiError>) -> Result<(), ApiError> {
        if let Err(error) = &outcome {
            self.logger.warn(&format!(
                "{} {} attempt {} failed: {error}",
                ctx.request.service.descriptor().method,
                ctx.resource_path(),
                ctx.request.retries + 1
            ));
        }
        outcome
    }
}

#[async_trait]
impl PipelineHandler for HttpHandler {
    fn name(&self) -> &'static str {
        "http"
    }

    fn attach_logger(&mut self, logger: Arc<LogManager>) {
        self.logger = logger;
    }

    fn invoke_sync(&self, ctx: &mut ExecutionContext<'_>, _next: Next<'_>) -> Result<(), ApiError> {
        let outcome = self.prepare(ctx).and_then(|request| {
            let sent = self.transport.send(&request);
            self.complete(ctx, sent)
        });
        self.report(ctx, outcome)
    }

    async fn invoke_async(&self, ctx: &mut ExecutionContext<'_>, _next: Next<'_>) -> Result<(), ApiError> {
        let outcome = match self.prepare(ctx) {
            Ok(request) => {
                let sent = self.transport.send_async(&request).await;
                self.complete(ctx, sent)
            }
            Err(error) => Err(error),
        };
        self.report(ctx, outcome)
    }
}
