//! Remote collaborators.
//!
//! The portal talks to exactly two opaque endpoints. Each sits behind a trait so
//! the state machines can be driven by the real HTTP client in production and
//! by the in-memory mocks in tests, without either side knowing which.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::PortalError;
use crate::models::{AuthReply, AuthRequest, GenerationRequest};

/// reqwest-backed implementations.
pub mod http;

/// In-memory implementations for tests and offline runs.
pub mod mock;

pub use http::{HttpAuthClient, HttpGenerationClient};
pub use mock::{MockAuthService, MockGenerationService};

/// AuthService
///
/// Contract for the single auth endpoint. An `Ok` reply always has
/// `success == true`; every refusal comes back as `PortalError::Rejected`.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn call(&self, request: &AuthRequest) -> Result<AuthReply, PortalError>;
}

/// GenerationService
///
/// Contract for the generation endpoint. Returns the raw JSON body of a
/// successful HTTP exchange; decoding per module is the controller's job.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, PortalError>;
}

pub type AuthServiceState = Arc<dyn AuthService>;
pub type GenerationServiceState = Arc<dyn GenerationService>;
