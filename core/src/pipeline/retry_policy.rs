use std::time::Duration;

use crate::config::ClientOptions;
use crate::context::ExecutionContext;
use crate::error::ApiError;

/// Decides whether a failed attempt is retried and how long to wait first.
///
/// Implementations must not keep per-call state: everything they need is in
/// the context, and one instance serves every call of a client.
pub trait RetryPolicy: Send + Sync {
    /// Maximum number of retries after the first attempt.
    fn retry_limit(&self) -> u32;

    fn can_retry(&self, ctx: &ExecutionContext<'_>) -> bool;

    fn retry_for_error(&self, ctx: &ExecutionContext<'_>, error: &ApiError) -> bool;

    /// Delay before the retry numbered `ctx.request.retries`.
    fn wait_before_retry(&self, ctx: &ExecutionContext<'_>) -> Duration;
}

/// Retries connectivity failures, timeouts, 408, 429 and 5xx answers, with
/// a delay that grows linearly with the retry number.
#[derive(Debug, Clone)]
pub struct DefaultRetryPolicy {
    retry_on_error: bool,
    retry_limit: u32,
    retry_delay: Duration,
}

impl DefaultRetryPolicy {
    pub fn new(retry_limit: u32, retry_delay: Duration) -> Self {
        Self {
            retry_on_error: true,
            retry_limit,
            retry_delay,
        }
    }

    pub fn from_options(options: &ClientOptions) -> Self {
        Self {
            retry_on_error: options.retry_on_error,
            retry_limit: options.retry_limit,
            retry_delay: options.retry_delay,
        }
    }

    pub fn retry_on_error(mut self, enabled: bool) -> Self {
        self.retry_on_error = enabled;
        self
    }

    fn is_retryable_status(status: u16) -> bool {
        status == 408 || status == 429 || status >= 500
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    fn can_retry(&self, _ctx: &ExecutionContext<'_>) -> bool {
        self.retry_on_error
    }

    fn retry_for_error(&self, _ctx: &ExecutionContext<'_>, error: &ApiError) -> bool {
        match error {
            ApiError::Transport(transport) => transport.is_transient(),
            ApiError::Api(response) => Self::is_retryable_status(response.status_code),
            _ => false,
        }
    }

    fn wait_before_retry(&self, ctx: &ExecutionContext<'_>) -> Duration {
        self.retry_delay.saturating_mul(ctx.request.retries.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorResponse, TransportError};
    use crate::http::{Headers, HttpMethod, HttpResponse};
    use crate::service::ServiceDescriptor;

    fn api_error(status: u16) -> ApiError {
        ErrorResponse::from_response(&HttpResponse::new(status, Headers::new(), Vec::new())).into()
    }

    #[test]
    fn classifies_errors() {
        let policy = DefaultRetryPolicy::new(3, Duration::from_millis(100));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let ctx = ExecutionContext::new(&mut service, &config);

        for status in [408, 429, 500, 502, 503, 504] {
            assert!(policy.retry_for_error(&ctx, &api_error(status)), "{status}");
        }
        for status in [400, 401, 403, 404, 409, 422] {
            assert!(!policy.retry_for_error(&ctx, &api_error(status)), "{status}");
        }
        assert!(policy.retry_for_error(&ctx, &TransportError::Connect("refused".into()).into()));
        assert!(policy.retry_for_error(&ctx, &TransportError::Timeout(Duration::from_secs(1)).into()));
        assert!(!policy.retry_for_error(&ctx, &TransportError::Other("tls".into()).into()));
        assert!(!policy.retry_for_error(&ctx, &ApiError::Validation { field: "email" }));
        assert!(!policy.retry_for_error(&ctx, &ApiError::Disposed("pipeline")));
    }

    #[test]
    fn delay_scales_with_retry_number() {
        let policy = DefaultRetryPolicy::new(3, Duration::from_millis(100));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        ctx.request.retries = 1;
        assert_eq!(policy.wait_before_retry(&ctx), Duration::from_millis(100));
        ctx.request.retries = 3;
        assert_eq!(policy.wait_before_retry(&ctx), Duration::from_millis(300));
    }

    #[test]
    fn follows_client_options() {
        let options = ClientOptions::new().with_retry(false, 7, Duration::from_millis(5));
        let policy = DefaultRetryPolicy::from_options(&options);
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let ctx = ExecutionContext::new(&mut service, &options);
        assert_eq!(policy.retry_limit(), 7);
        assert!(!policy.can_retry(&ctx));
    }
}
