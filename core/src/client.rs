//! Entry point for the management API.
//!
//! # Design
//! `ManagementClient` owns the shared options, the handler chain and,
//! through the HTTP handler, the transport. Every call wraps the service in
//! a fresh `ExecutionContext` and runs it through the chain; the blocking
//! and async methods differ only in which pipeline entry point they use.
//! Errors are returned as-is from the pipeline, never turned into empty
//! results.

use std::sync::Arc;

use crate::config::ClientOptions;
use crate::context::ExecutionContext;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::log::{LogManager, LogSink};
use crate::pipeline::{DefaultRetryPolicy, HttpHandler, Pipeline, PipelineHandler, RetryHandler, RetryPolicy};
use crate::service::Service;
use crate::services::{GetLoggedInUserService, LoginService, LogoutService, Stack};
use crate::transport::{HttpTransport, Transport};
use crate::types::Credentials;

pub struct ManagementClient {
    options: Arc<ClientOptions>,
    pipeline: Pipeline,
}

impl ManagementClient {
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let transport = Arc::new(HttpTransport::new(&options)?);
        Ok(Self::with_transport(options, transport))
    }

    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Self {
        let policy = Arc::new(DefaultRetryPolicy::from_options(&options));
        Self::with_retry_policy(options, transport, policy)
    }

    pub fn with_retry_policy(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        let handlers: Vec<Box<dyn PipelineHandler>> = vec![
            Box::new(RetryHandler::new(policy)),
            Box::new(HttpHandler::new(transport)),
        ];
        Self {
            options: Arc::new(options),
            pipeline: Pipeline::new(handlers, Arc::new(LogManager::new())),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn stack(&self, api_key: impl Into<String>) -> Result<Stack, ApiError> {
        Stack::new(api_key)
    }

    pub fn invoke(&self, service: &mut dyn Service) -> Result<HttpResponse, ApiError> {
        let mut ctx = ExecutionContext::new(service, &self.options);
        self.pipeline.invoke_sync(&mut ctx)
    }

    pub async fn invoke_async(&self, service: &mut dyn Service) -> Result<HttpResponse, ApiError> {
        let mut ctx = ExecutionContext::new(service, &self.options);
        self.pipeline.invoke_async(&mut ctx).await
    }

    pub fn login(&self, credentials: Credentials, tfa_token: Option<&str>) -> Result<HttpResponse, ApiError> {
        let mut service = self.login_service(credentials, tfa_token)?;
        self.invoke(&mut service)
    }

    pub async fn login_async(
        &self,
        credentials: Credentials,
        tfa_token: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let mut service = self.login_service(credentials, tfa_token)?;
        self.invoke_async(&mut service).await
    }

    /// Log out `authtoken`, or the client's own session when `None`.
    pub fn logout(&self, authtoken: Option<&str>) -> Result<HttpResponse, ApiError> {
        let mut service = self.logout_service(authtoken)?;
        self.invoke(&mut service)
    }

    pub async fn logout_async(&self, authtoken: Option<&str>) -> Result<HttpResponse, ApiError> {
        let mut service = self.logout_service(authtoken)?;
        self.invoke_async(&mut service).await
    }

    pub fn get_user(&self) -> Result<HttpResponse, ApiError> {
        let mut service = self.user_service()?;
        self.invoke(&mut service)
    }

    pub async fn get_user_async(&self) -> Result<HttpResponse, ApiError> {
        let mut service = self.user_service()?;
        self.invoke_async(&mut service).await
    }

    pub fn add_logger(&self, sink: Arc<dyn LogSink>) -> Result<(), ApiError> {
        self.pipeline.add_logger(sink)
    }

    pub fn add_handler(&mut self, handler: Box<dyn PipelineHandler>) -> Result<(), ApiError> {
        self.pipeline.add_handler(handler)
    }

    pub fn replace_handler(&mut self, handler: Box<dyn PipelineHandler>) -> Result<(), ApiError> {
        self.pipeline.replace_handler(handler)
    }

    pub fn dispose(&mut self) {
        self.pipeline.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.pipeline.is_disposed()
    }

    fn login_service(&self, credentials: Credentials, tfa_token: Option<&str>) -> Result<LoginService, ApiError> {
        if self.options.is_authenticated() {
            return Err(ApiError::InvalidOperation(
                "already logged in; log out before logging in again".into(),
            ));
        }
        LoginService::new(credentials, tfa_token.map(str::to_string))
    }

    fn logout_service(&self, authtoken: Option<&str>) -> Result<LogoutService, ApiError> {
        let token = authtoken
            .map(str::to_string)
            .or_else(|| self.options.auth_token())
            .ok_or_else(|| ApiError::InvalidOperation("not logged in".into()))?;
        LogoutService::new(token)
    }

    fn user_service(&self) -> Result<GetLoggedInUserService, ApiError> {
        if !self.options.is_authenticated() {
            return Err(ApiError::InvalidOperation("not logged in".into()));
        }
        GetLoggedInUserService::new()
    }
}
