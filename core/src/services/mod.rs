//! Endpoint definitions bundled with the client.
//!
//! Each type owns a `ServiceDescriptor`, validates its required arguments in
//! its constructor and implements `Service`.

mod bulk;
mod crud;
mod query;
mod stack;
mod user;
mod user_session;

pub use bulk::BulkPublishService;
pub use crud::{CreateUpdateService, FetchDeleteService};
pub use query::QueryService;
pub use stack::Stack;
pub use user::GetLoggedInUserService;
pub use user_session::{LoginService, LogoutService};
