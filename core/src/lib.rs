//! Client core for the Contentstack content management API.
//!
//! # Overview
//! Endpoint definitions (`Service` implementations) describe a call as data.
//! `ManagementClient` runs each one through a handler pipeline: the retry
//! handler wraps the HTTP handler, which builds the request, sends it through
//! the transport and turns the answer into either an `HttpResponse` or an
//! `ApiError`.
//!
//! # Design
//! - Requests and responses are plain owned data (`http` module), so
//!   descriptors and status handling are testable without a network.
//! - Statuses 200..400 count as success; 400 and above become a structured
//!   `ErrorResponse`. Transport failures keep their own error variant.
//! - Blocking and async calls share the same handlers; only the transport
//!   call and the retry sleep differ.
//! - The session token lives in the shared `ClientOptions` and is written by
//!   login and logout responses.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod log;
pub mod params;
pub mod pipeline;
pub mod service;
pub mod services;
pub mod transport;
pub mod types;

pub use client::ManagementClient;
pub use config::{ClientOptions, ProxyOptions};
pub use context::ExecutionContext;
pub use error::{ApiError, ErrorResponse, TransportError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use log::{LogManager, LogSink, MemorySink};
pub use params::{ParameterCollection, ParameterValue};
pub use pipeline::{DefaultRetryPolicy, HttpHandler, Pipeline, PipelineHandler, RetryHandler, RetryPolicy};
pub use service::{Service, ServiceDescriptor};
pub use services::{
    BulkPublishService, CreateUpdateService, FetchDeleteService, GetLoggedInUserService, LoginService,
    LogoutService, QueryService, Stack,
};
pub use transport::{HttpTransport, Transport};
pub use types::{BulkPublishDetails, Credentials, Notice, User, UserResponse};
