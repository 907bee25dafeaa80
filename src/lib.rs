// --- Module Structure ---

// State machines.
pub mod auth;
pub mod controller;

// Data, rendering and wiring.
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod services;

// Terminal front-end commands.
pub mod handlers;

// --- Public Re-exports ---

pub use auth::{AuthGate, AuthState};
pub use config::AppConfig;
pub use controller::{ModuleController, PendingGeneration, Resolution};
pub use error::{ConfigError, PortalError};
pub use services::{
    AuthService, AuthServiceState, GenerationService, GenerationServiceState, HttpAuthClient,
    HttpGenerationClient, MockAuthService, MockGenerationService,
};

use models::ModuleOptions;
use std::sync::Arc;

/// Services
///
/// The two remote collaborators, shared behind trait objects so the same
/// Portal runs against HTTP in production and against mocks in tests.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthServiceState,
    pub generation: GenerationServiceState,
}

impl Services {
    /// Builds the reqwest-backed services from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, PortalError> {
        Ok(Self {
            auth: Arc::new(HttpAuthClient::new(
                &config.auth_url,
                config.request_timeout,
            )?),
            generation: Arc::new(HttpGenerationClient::new(
                &config.generation_url,
                config.request_timeout,
                config.wire_format,
            )?),
        })
    }
}

/// Portal
///
/// One user's view of the product: the Auth Gate, the Module Interaction
/// Controller and the configuration that decides whether the gate applies.
/// Owned by a single front-end loop; nothing in it is shared.
#[derive(Debug)]
pub struct Portal {
    pub config: AppConfig,
    gate: AuthGate,
    controller: ModuleController,
}

impl Portal {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            gate: AuthGate::new(),
            controller: ModuleController::new(),
        }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut AuthGate {
        &mut self.gate
    }

    /// True when the controller may be used: either the gate is off or a
    /// session exists.
    pub fn is_open(&self) -> bool {
        !self.config.auth_gate || self.gate.is_authenticated()
    }

    /// Read access to the controller, subject to the gate.
    pub fn controller(&self) -> Result<&ModuleController, PortalError> {
        if self.is_open() {
            Ok(&self.controller)
        } else {
            Err(PortalError::Unauthenticated)
        }
    }

    /// Write access to the controller, subject to the gate.
    pub fn controller_mut(&mut self) -> Result<&mut ModuleController, PortalError> {
        if self.is_open() {
            Ok(&mut self.controller)
        } else {
            Err(PortalError::Unauthenticated)
        }
    }

    /// Runs one generation for the current selection, tagging the request
    /// with the session's user id when there is one.
    pub async fn generate(
        &mut self,
        service: &dyn GenerationService,
        options: ModuleOptions,
    ) -> Result<Resolution, PortalError> {
        let user_id = self.gate.session().user_id;
        self.controller_mut()?
            .run_submit(service, options, user_id)
            .await
    }

    /// Ends the session and wipes all module state.
    pub fn logout(&mut self) {
        self.gate.logout();
        self.controller.reset();
    }
}
