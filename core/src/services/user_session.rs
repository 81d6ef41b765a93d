use serde::Serialize;

use crate::config::ClientOptions;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::service::{Service, ServiceDescriptor};
use crate::types::Credentials;

const SESSION_PATH: &str = "user-session";

#[derive(Serialize)]
struct LoginBody<'a> {
    user: LoginUser<'a>,
}

#[derive(Serialize)]
struct LoginUser<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tfa_token: Option<&'a str>,
}

/// `POST user-session`. Stores the returned `user.authtoken` on success.
#[derive(Debug, Clone)]
pub struct LoginService {
    descriptor: ServiceDescriptor,
    credentials: Credentials,
    tfa_token: Option<String>,
}

impl LoginService {
    pub fn new(credentials: Credentials, tfa_token: Option<String>) -> Result<Self, ApiError> {
        if credentials.email.trim().is_empty() {
            return Err(ApiError::Validation { field: "email" });
        }
        if credentials.password.is_empty() {
            return Err(ApiError::Validation { field: "password" });
        }
        Ok(Self {
            descriptor: ServiceDescriptor::new(HttpMethod::Post, SESSION_PATH)?,
            credentials,
            tfa_token: tfa_token.filter(|token| !token.is_empty()),
        })
    }
}

impl Service for LoginService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }

    fn content_body(&mut self) -> Result<(), ApiError> {
        let body = LoginBody {
            user: LoginUser {
                email: &self.credentials.email,
                password: &self.credentials.password,
                tfa_token: self.tfa_token.as_deref(),
            },
        };
        self.descriptor.set_json_body(&body)
    }

    fn on_response(&mut self, response: &HttpResponse, config: &ClientOptions) -> Result<(), ApiError> {
        let body: serde_json::Value = response.json()?;
        if let Some(token) = body["user"]["authtoken"].as_str() {
            config.set_auth_token(Some(token.to_string()));
        }
        Ok(())
    }
}

/// `DELETE user-session` for `authtoken`. Clears the stored token only if
/// it is the one being logged out.
#[derive(Debug, Clone)]
pub struct LogoutService {
    descriptor: ServiceDescriptor,
    authtoken: String,
}

impl LogoutService {
    pub fn new(authtoken: impl Into<String>) -> Result<Self, ApiError> {
        let authtoken = authtoken.into();
        if authtoken.trim().is_empty() {
            return Err(ApiError::Validation { field: "authtoken" });
        }
        let mut descriptor = ServiceDescriptor::new(HttpMethod::Delete, SESSION_PATH)?;
        descriptor.headers.insert("authtoken", authtoken.clone());
        Ok(Self { descriptor, authtoken })
    }
}

impl Service for LogoutService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut ServiceDescriptor {
        &mut self.descriptor
    }

    fn on_response(&mut self, _response: &HttpResponse, config: &ClientOptions) -> Result<(), ApiError> {
        if config.auth_token().as_deref() == Some(self.authtoken.as_str()) {
            config.set_auth_token(None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Headers;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse::new(200, Headers::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn login_body_matches_wire_format() {
        let mut service = LoginService::new(Credentials::new("a@b.com", "secret"), None).unwrap();
        let req = service.create_http_request(&ClientOptions::default()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.contentstack.io:443/v3/user-session");
        assert_eq!(
            String::from_utf8(req.body.unwrap()).unwrap(),
            r#"{"user":{"email":"a@b.com","password":"secret"}}"#
        );
    }

    #[test]
    fn login_body_carries_tfa_token() {
        let mut service =
            LoginService::new(Credentials::new("a@b.com", "secret"), Some("123456".into())).unwrap();
        let req = service.create_http_request(&ClientOptions::default()).unwrap();
        assert_eq!(
            String::from_utf8(req.body.unwrap()).unwrap(),
            r#"{"user":{"email":"a@b.com","password":"secret","tfa_token":"123456"}}"#
        );
    }

    #[test]
    fn login_requires_credentials() {
        let err = LoginService::new(Credentials::new("", "secret"), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "email" }));
        let err = LoginService::new(Credentials::new("a@b.com", ""), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "password" }));
    }

    #[test]
    fn login_response_stores_token() {
        let config = ClientOptions::default();
        let mut service = LoginService::new(Credentials::new("a@b.com", "secret"), None).unwrap();
        service
            .on_response(&ok(r#"{"user":{"uid":"u1","authtoken":"X"}}"#), &config)
            .unwrap();
        assert_eq!(config.auth_token().as_deref(), Some("X"));
    }

    #[test]
    fn logout_clears_matching_token() {
        let config = ClientOptions::new().with_auth_token("X");
        let mut service = LogoutService::new("X").unwrap();
        let req = service.create_http_request(&config).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.headers.get("authtoken"), Some("X"));
        service.on_response(&ok(r#"{"notice":"bye"}"#), &config).unwrap();
        assert_eq!(config.auth_token(), None);
    }

    #[test]
    fn logout_of_another_token_keeps_stored_one() {
        let config = ClientOptions::new().with_auth_token("X");
        let mut service = LogoutService::new("Y").unwrap();
        let req = service.create_http_request(&config).unwrap();
        assert_eq!(req.headers.get("authtoken"), Some("Y"));
        service.on_response(&ok("{}"), &config).unwrap();
        assert_eq!(config.auth_token().as_deref(), Some("X"));
    }

    #[test]
    fn logout_requires_token() {
        let err = LogoutService::new("").unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "authtoken" }));
    }
}
