use crate::error::ApiError;
use crate::service::ServiceDescriptor;

/// Scope shared by every stack-level service: the stack API key, an
/// optional management token and an optional branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    api_key: String,
    management_token: Option<String>,
    branch: Option<String>,
}

impl Stack {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::Validation { field: "api_key" });
        }
        Ok(Self {
            api_key,
            management_token: None,
            branch: None,
        })
    }

    pub fn with_management_token(mut self, token: impl Into<String>) -> Self {
        self.management_token = Some(token.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn management_token(&self) -> Option<&str> {
        self.management_token.as_deref()
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub(crate) fn scope(&self, descriptor: &mut ServiceDescriptor) {
        descriptor.headers.insert("api_key", self.api_key.clone());
        if let Some(branch) = &self.branch {
            descriptor.headers.insert("branch", branch.clone());
        }
        descriptor.management_token = self.management_token.clone();
    }
}
