use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Next, PipelineHandler, RetryPolicy};
use crate::context::ExecutionContext;
use crate::error::ApiError;
use crate::log::LogManager;

/// Re-runs the inner handlers while the policy allows it.
///
/// Attempts are strictly sequential. When no retry is allowed the error of
/// the last attempt is returned exactly as the inner handler produced it.
pub struct RetryHandler {
    policy: Arc<dyn RetryPolicy>,
    logger: Arc<LogManager>,
}

impl RetryHandler {
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            policy,
            logger: Arc::new(LogManager::new()),
        }
    }

    /// Either schedules another attempt and returns the delay before it, or
    /// hands `error` back untouched.
    fn schedule_retry(&self, ctx: &mut ExecutionContext<'_>, error: ApiError) -> Result<Duration, ApiError> {
        let limit = self.policy.retry_limit();
        let retry = ctx.request.retries < limit
            && self.policy.can_retry(ctx)
            && self.policy.retry_for_error(ctx, &error);
        if !retry {
            self.logger.error(&format!(
                "{} error for {}, giving up after {} retries: {error}",
                error.kind(),
                ctx.resource_path(),
                ctx.request.retries
            ));
            return Err(error);
        }

        ctx.request.retries += 1;
        self.logger.warn(&format!(
            "{} error for {}, retry {} of {}: {error}",
            error.kind(),
            ctx.resource_path(),
            ctx.request.retries,
            limit
        ));
        Ok(self.policy.wait_before_retry(ctx))
    }
}

#[async_trait]
impl PipelineHandler for RetryHandler {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn attach_logger(&mut self, logger: Arc<LogManager>) {
        self.logger = logger;
    }

    fn invoke_sync(&self, ctx: &mut ExecutionContext<'_>, next: Next<'_>) -> Result<(), ApiError> {
        loop {
            match next.invoke_sync(ctx) {
                Ok(()) => return Ok(()),
                Err(error) => {
                    let delay = self.schedule_retry(ctx, error)?;
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }

    async fn invoke_async(&self, ctx: &mut ExecutionContext<'_>, next: Next<'_>) -> Result<(), ApiError> {
        loop {
            match next.invoke_async(ctx).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    let delay = self.schedule_retry(ctx, error)?;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use crate::error::TransportError;
    use crate::http::HttpMethod;
    use crate::log::MemorySink;
    use crate::pipeline::{DefaultRetryPolicy, HttpHandler, Pipeline};
    use crate::service::ServiceDescriptor;
    use crate::transport::testing::{Outcome, ScriptedTransport};

    fn pipeline(transport: &Arc<ScriptedTransport>, policy: DefaultRetryPolicy) -> Pipeline {
        let handlers: Vec<Box<dyn PipelineHandler>> = vec![
            Box::new(RetryHandler::new(Arc::new(policy))),
            Box::new(HttpHandler::new(transport.clone())),
        ];
        Pipeline::new(handlers, Arc::new(LogManager::new()))
    }

    fn policy(limit: u32) -> DefaultRetryPolicy {
        DefaultRetryPolicy::new(limit, Duration::ZERO)
    }

    #[test]
    fn retries_exactly_up_to_the_limit() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Refused));
        let pipeline = pipeline(&transport, policy(3));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        let err = pipeline.invoke_sync(&mut ctx).unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Connect(_))));
        assert_eq!(ctx.request.retries, 3);
        assert_eq!(transport.requests().len(), 4);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Respond(
            422,
            r#"{"error_message":"Title is not unique","error_code":115,"errors":{"title":["is not unique"]}}"#,
        )));
        let pipeline = pipeline(&transport, policy(3));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Post, "content_types").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        let err = pipeline.invoke_sync(&mut ctx).unwrap_err();
        let details = err.error_response().unwrap();
        assert_eq!(details.error_code, 115);
        assert_eq!(details.errors.as_ref().unwrap()["title"][0], "is not unique");
        assert_eq!(ctx.request.retries, 0);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn recovers_after_transient_failures() {
        let transport = Arc::new(ScriptedTransport::new(
            [Outcome::Respond(503, ""), Outcome::Reset],
            Outcome::Respond(200, r#"{"user":{"uid":"u1"}}"#),
        ));
        let pipeline = pipeline(&transport, policy(5));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        let response = pipeline.invoke_sync(&mut ctx).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(ctx.request.retries, 2);
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn disabled_retries_make_a_single_attempt() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Respond(500, "")));
        let pipeline = pipeline(&transport, policy(3).retry_on_error(false));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        let err = pipeline.invoke_sync(&mut ctx).unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn zero_limit_never_retries() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Refused));
        let pipeline = pipeline(&transport, policy(0));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        pipeline.invoke_sync(&mut ctx).unwrap_err();
        assert_eq!(ctx.request.retries, 0);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn logs_each_retry_and_the_final_failure() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Respond(502, "")));
        let pipeline = pipeline(&transport, policy(2));
        let sink = Arc::new(MemorySink::default());
        pipeline.add_logger(sink.clone()).unwrap();
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "stacks").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        pipeline.invoke_sync(&mut ctx).unwrap_err();

        let entries = sink.entries();
        let retries: Vec<&String> = entries
            .iter()
            .filter(|(level, message)| *level == tracing::Level::WARN && message.contains(", retry "))
            .map(|(_, message)| message)
            .collect();
        assert_eq!(retries.len(), 2);
        assert!(retries[0].starts_with("api error for stacks, retry 1 of 2"), "{}", retries[0]);
        assert!(retries[1].starts_with("api error for stacks, retry 2 of 2"), "{}", retries[1]);

        let attempts = entries
            .iter()
            .filter(|(level, message)| *level == tracing::Level::WARN && message.contains(" attempt "))
            .count();
        assert_eq!(attempts, 3);

        let errors: Vec<&String> = entries
            .iter()
            .filter(|(level, _)| *level == tracing::Level::ERROR)
            .map(|(_, message)| message)
            .collect();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].starts_with("api error for stacks, giving up after 2 retries"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn async_retries_exactly_up_to_the_limit() {
        let transport = Arc::new(ScriptedTransport::always(Outcome::Respond(503, "")));
        let pipeline = pipeline(&transport, DefaultRetryPolicy::new(2, Duration::from_millis(1)));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Get, "user").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        let err = pipeline.invoke_async(&mut ctx).await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(ctx.request.retries, 2);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn async_recovers_after_transient_failure() {
        let transport = Arc::new(ScriptedTransport::new(
            [Outcome::Refused],
            Outcome::Respond(201, "{}"),
        ));
        let pipeline = pipeline(&transport, policy(1));
        let config = ClientOptions::default();
        let mut service = ServiceDescriptor::new(HttpMethod::Post, "stacks").unwrap();
        let mut ctx = ExecutionContext::new(&mut service, &config);

        assert_eq!(pipeline.invoke_async(&mut ctx).await.unwrap().status, 201);
        assert_eq!(ctx.request.retries, 1);
    }
}
