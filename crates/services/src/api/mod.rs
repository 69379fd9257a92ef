mod auth_context;
mod client;

pub use auth_context::AuthContext;
pub use client::ApiClient;
