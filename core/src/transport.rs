//! The HTTP transport seam.
//!
//! # Design
//! A transport takes a fully built `HttpRequest` and returns the raw
//! `HttpResponse` for any status code; status interpretation belongs to the
//! pipeline. Redirects are never followed, so a 3xx reaches the caller as-is.
//! The default `HttpTransport` uses `ureq` for blocking calls and `reqwest`
//! for async calls, both configured from the same `ClientOptions`.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClientOptions;
use crate::error::{ApiError, TransportError};
use crate::http::{Headers, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    async fn send_async(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport shared by every call of one client.
pub struct HttpTransport {
    agent: ureq::Agent,
    client: reqwest::Client,
    timeout: Duration,
    max_body: usize,
}

impl HttpTransport {
    pub fn new(options: &ClientOptions) -> Result<Self, ApiError> {
        let mut agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .timeout_global(Some(options.timeout));
        let mut client_builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::none());

        if let Some(proxy) = &options.proxy {
            let url = proxy.url();
            let blocking_proxy = ureq::Proxy::new(&url)
                .map_err(|e| TransportError::Other(format!("invalid proxy {url}: {e}")))?;
            agent_config = agent_config.proxy(Some(blocking_proxy));
            let async_proxy = reqwest::Proxy::all(&url)
                .map_err(|e| TransportError::Other(format!("invalid proxy {url}: {e}")))?;
            client_builder = client_builder.proxy(async_proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            agent: agent_config.build().new_agent(),
            client,
            timeout: options.timeout,
            max_body: options.max_response_content_buffer_size,
        })
    }

    fn map_ureq_error(&self, error: ureq::Error) -> TransportError {
        match error {
            ureq::Error::Io(io) => TransportError::Io(io),
            ureq::Error::Timeout(_) => TransportError::Timeout(self.timeout),
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                TransportError::Connect(error.to_string())
            }
            ureq::Error::ConnectProxyFailed(message) => TransportError::Connect(message),
            ureq::Error::BodyExceedsLimit(_) => TransportError::BodyTooLarge {
                limit: self.max_body,
            },
            other => TransportError::Other(other.to_string()),
        }
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout(self.timeout);
        }
        if let Some(io) = inner_io_error(&error) {
            return TransportError::Io(std::io::Error::new(io.kind(), io.to_string()));
        }
        if error.is_connect() {
            return TransportError::Connect(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

/// Walk the source chain for the underlying I/O error, if there is one.
fn inner_io_error<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a std::io::Error> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = err.source();
    }
    None
}

fn build_request<B>(request: &HttpRequest, body: B) -> Result<http::Request<B>, TransportError> {
    let mut builder = http::Request::builder()
        .method(http::Method::from(request.method))
        .uri(&request.url);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }
    builder
        .body(body)
        .map_err(|e| TransportError::Other(format!("failed to build request: {e}")))
}

#[async_trait]
impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = match &request.body {
            Some(body) => self.agent.run(build_request(request, body.clone())?),
            None => self.agent.run(build_request(request, ())?),
        }
        .map_err(|e| self.map_ureq_error(e))?;

        let status = response.status().as_u16();
        let headers = Headers::from(response.headers());
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body as u64)
            .read_to_vec()
            .map_err(|e| self.map_ureq_error(e))?;
        Ok(HttpResponse::new(status, headers, body))
    }

    async fn send_async(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(http::Method::from(request.method), &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e))?;
        if response.content_length().is_some_and(|len| len > self.max_body as u64) {
            return Err(TransportError::BodyTooLarge {
                limit: self.max_body,
            });
        }
        let status = response.status().as_u16();
        let headers = Headers::from(response.headers());
        let body = response.bytes().await.map_err(|e| self.map_reqwest_error(e))?;
        if body.len() > self.max_body {
            return Err(TransportError::BodyTooLarge {
                limit: self.max_body,
            });
        }
        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyOptions;

    #[test]
    fn builds_with_default_options() {
        assert!(HttpTransport::new(&ClientOptions::default()).is_ok());
    }

    #[test]
    fn builds_with_proxy() {
        let options = ClientOptions::new().with_proxy(ProxyOptions {
            host: "127.0.0.1".into(),
            port: 3128,
            username: None,
            password: None,
        });
        assert!(HttpTransport::new(&options).is_ok());
    }

    #[test]
    fn unreachable_host_is_a_transient_transport_error() {
        let options = ClientOptions::new().with_timeout(Duration::from_secs(2));
        let transport = HttpTransport::new(&options).unwrap();
        // port 1 on loopback is closed
        let request = HttpRequest {
            method: crate::http::HttpMethod::Get,
            url: "http://127.0.0.1:1/v3/user".into(),
            headers: Headers::new(),
            body: None,
        };
        let err = transport.send(&request).unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
