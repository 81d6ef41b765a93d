//! Request execution pipeline.
//!
//! # Design
//! Handlers are kept in an ordered `Vec`, outermost first. Each handler gets
//! a `Next` continuation over the handlers behind it and decides whether to
//! call it, call it again (retry), or finish on its own (the HTTP handler).
//! Running out of handlers before one finishes the call is a configuration
//! error. The same chain serves the blocking and the async entry points;
//! only the transport call and the retry wait differ between them.

mod http_handler;
mod retry_handler;
mod retry_policy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::log::{LogManager, LogSink};

pub use http_handler::HttpHandler;
pub use retry_handler::RetryHandler;
pub use retry_policy::{DefaultRetryPolicy, RetryPolicy};

#[async_trait]
pub trait PipelineHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called when the handler is mounted so the whole chain logs through
    /// the same manager.
    fn attach_logger(&mut self, _logger: Arc<LogManager>) {}

    fn invoke_sync(&self, ctx: &mut ExecutionContext<'_>, next: Next<'_>) -> Result<(), ApiError>;

    async fn invoke_async(&self, ctx: &mut ExecutionContext<'_>, next: Next<'_>) -> Result<(), ApiError>;

    fn dispose(&mut self) {}
}

/// The handlers behind the current one.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Box<dyn PipelineHandler>],
}

impl<'a> Next<'a> {
    fn new(handlers: &'a [Box<dyn PipelineHandler>]) -> Self {
        Self { handlers }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn invoke_sync(self, ctx: &mut ExecutionContext<'_>) -> Result<(), ApiError> {
        match self.handlers.split_first() {
            Some((handler, rest)) => handler.invoke_sync(ctx, Next::new(rest)),
            None => Err(dangling_chain()),
        }
    }

    pub async fn invoke_async(self, ctx: &mut ExecutionContext<'_>) -> Result<(), ApiError> {
        match self.handlers.split_first() {
            Some((handler, rest)) => handler.invoke_async(ctx, Next::new(rest)).await,
            None => Err(dangling_chain()),
        }
    }
}

fn dangling_chain() -> ApiError {
    ApiError::InvalidOperation("pipeline ran out of handlers before the request was sent".into())
}

/// Owns the handler chain of one client.
///
/// Mounting or replacing handlers takes `&mut self`, so the chain cannot
/// change while a call borrowed from it is in flight.
pub struct Pipeline {
    handlers: Vec<Box<dyn PipelineHandler>>,
    logger: Arc<LogManager>,
    disposed: bool,
}

impl Pipeline {
    /// Build a chain from handlers listed outermost first.
    pub fn new(handlers: Vec<Box<dyn PipelineHandler>>, logger: Arc<LogManager>) -> Self {
        let mut pipeline = Self {
            handlers: Vec::with_capacity(handlers.len()),
            logger,
            disposed: false,
        };
        for mut handler in handlers {
            handler.attach_logger(pipeline.logger.clone());
            pipeline.handlers.push(handler);
        }
        pipeline
    }

    pub fn single(handler: Box<dyn PipelineHandler>, logger: Arc<LogManager>) -> Self {
        Self::new(vec![handler], logger)
    }

    pub fn logger(&self) -> &Arc<LogManager> {
        &self.logger
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), ApiError> {
        if self.disposed {
            Err(ApiError::Disposed("pipeline"))
        } else {
            Ok(())
        }
    }

    pub fn invoke_sync(&self, ctx: &mut ExecutionContext<'_>) -> Result<HttpResponse, ApiError> {
        self.ensure_live()?;
        Next::new(&self.handlers).invoke_sync(ctx)?;
        take_response(ctx)
    }

    pub async fn invoke_async(&self, ctx: &mut ExecutionContext<'_>) -> Result<HttpResponse, ApiError> {
        self.ensure_live()?;
        Next::new(&self.handlers).invoke_async(ctx).await?;
        take_response(ctx)
    }

    /// Mount `handler` in front of the current chain.
    pub fn add_handler(&mut self, mut handler: Box<dyn PipelineHandler>) -> Result<(), ApiError> {
        self.ensure_live()?;
        handler.attach_logger(self.logger.clone());
        self.handlers.insert(0, handler);
        Ok(())
    }

    /// Replace the whole chain with `handler`. The old handlers are disposed.
    pub fn replace_handler(&mut self, mut handler: Box<dyn PipelineHandler>) -> Result<(), ApiError> {
        self.ensure_live()?;
        handler.attach_logger(self.logger.clone());
        for mut old in std::mem::replace(&mut self.handlers, vec![handler]) {
            old.dispose();
        }
        Ok(())
    }

    pub fn add_logger(&self, sink: Arc<dyn LogSink>) -> Result<(), ApiError> {
        self.ensure_live()?;
        self.logger.add_logger(sink);
        Ok(())
    }

    /// Dispose every handler, outermost first. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for handler in &mut self.handlers {
            handler.dispose();
        }
        self.disposed = true;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn take_response(ctx: &mut ExecutionContext<'_>) -> Result<HttpResponse, ApiError> {
    ctx.response.response.take().ok_or_else(|| {
        ApiError::InvalidOperation("pipeline finished without producing a response".into())
    })
}
