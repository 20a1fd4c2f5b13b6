pub mod client;
pub mod credentials;
pub mod types;

pub use client::{ApiResponse, SessionClient};
pub use credentials::{provider_for, CredentialProvider, FirefoxCookieStore, StaticCookie};
pub use types::*;
