use std::collections::HashSet;

use crate::{
    error::{PortalError, messages},
    models::{AuthRequest, Session, normalize_code},
    services::AuthService,
};

/// AuthState
///
/// Where the caller is in the gate. `Registering` carries the code the backend
/// accepted so `register` can present it again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    EnteringCode,
    Registering {
        code: String,
    },
    LoggingIn,
    Authenticated,
}

impl AuthState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::EnteringCode => "entering code",
            AuthState::Registering { .. } => "registering",
            AuthState::LoggingIn => "logging in",
            AuthState::Authenticated => "authenticated",
        }
    }
}

/// AuthGate
///
/// Walks a caller from "no session" to "authenticated" through either the
/// access-code → registration path or the login path.
///
/// Every operation either moves to the next state or returns an error and
/// leaves the state exactly as it was. Nothing is retried automatically.
#[derive(Debug, Default)]
pub struct AuthGate {
    state: AuthState,
    session: Session,
    // Codes this gate has seen consumed by a successful registration.
    consumed: HashSet<String>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Switches to the login tab. A validated but unused code is dropped.
    pub fn show_login(&mut self) {
        if !self.is_authenticated() {
            self.state = AuthState::LoggingIn;
        }
    }

    /// Switches back to the access-code tab.
    pub fn show_code_entry(&mut self) {
        if !self.is_authenticated() {
            self.state = AuthState::EnteringCode;
        }
    }

    /// submit_code
    ///
    /// Validates an access code with the backend. On success the gate moves to
    /// `Registering` holding the normalized code.
    ///
    /// A code this gate already saw consumed is refused locally and never sent.
    pub async fn submit_code(
        &mut self,
        service: &dyn AuthService,
        code: &str,
    ) -> Result<(), PortalError> {
        if self.state != AuthState::EnteringCode {
            return Err(PortalError::InvalidState(self.state.label()));
        }

        let code = normalize_code(code);
        if code.is_empty() {
            return Err(PortalError::validation(messages::EMPTY_CODE));
        }
        if self.consumed.contains(&code) {
            tracing::warn!(%code, "refusing access code already consumed");
            return Err(PortalError::Rejected(messages::CODE_CONSUMED.to_string()));
        }

        let reply = service
            .call(&AuthRequest::CheckCode { code: code.clone() })
            .await?;

        let code = reply
            .code
            .map(|c| normalize_code(&c))
            .filter(|c| !c.is_empty())
            .unwrap_or(code);
        tracing::info!(%code, "access code accepted");
        self.state = AuthState::Registering { code };
        Ok(())
    }

    /// register
    ///
    /// Creates an account with the code validated by `submit_code`. The code is
    /// recorded as consumed once the backend confirms.
    pub async fn register(
        &mut self,
        service: &dyn AuthService,
        username: &str,
        password: &str,
    ) -> Result<(), PortalError> {
        let AuthState::Registering { code } = &self.state else {
            return Err(PortalError::InvalidState(self.state.label()));
        };
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::validation(messages::EMPTY_CREDENTIALS));
        }

        let code = code.clone();
        let reply = service
            .call(&AuthRequest::Register {
                username: username.to_string(),
                password: password.to_string(),
                code: code.clone(),
            })
            .await?;

        self.consumed.insert(code);
        self.session = Session::signed_in(
            reply.user_id,
            reply.username.or_else(|| Some(username.to_string())),
        );
        self.state = AuthState::Authenticated;
        tracing::info!(user_id = ?self.session.user_id, %username, "registered");
        Ok(())
    }

    /// login
    ///
    /// Signs in an existing account from the login tab.
    pub async fn login(
        &mut self,
        service: &dyn AuthService,
        username: &str,
        password: &str,
    ) -> Result<(), PortalError> {
        if self.state != AuthState::LoggingIn {
            return Err(PortalError::InvalidState(self.state.label()));
        }
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::validation(messages::EMPTY_CREDENTIALS));
        }

        let reply = service
            .call(&AuthRequest::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        self.session = Session::signed_in(
            reply.user_id,
            reply.username.or_else(|| Some(username.to_string())),
        );
        self.state = AuthState::Authenticated;
        tracing::info!(user_id = ?self.session.user_id, %username, "logged in");
        Ok(())
    }

    /// Clears the session and returns to the access-code tab.
    pub fn logout(&mut self) {
        if self.is_authenticated() {
            tracing::info!(user_id = ?self.session.user_id, "logged out");
        }
        self.session = Session::default();
        self.state = AuthState::EnteringCode;
    }
}
