/// User-facing fallback and validation messages.
///
/// The product ships in Russian, so every string that can reach the screen
/// lives here rather than being scattered through the state machines.
pub mod messages {
    pub const EMPTY_PROMPT: &str = "Введите запрос";
    pub const EMPTY_CREDENTIALS: &str = "Все поля обязательны";
    pub const EMPTY_CODE: &str = "Введите код доступа";
    pub const NO_MODULE: &str = "Выберите модуль";
    pub const CODE_CONSUMED: &str = "Код уже использован";
    pub const AUTH_FALLBACK: &str = "Ошибка";
    pub const GENERATION_FALLBACK: &str = "Не удалось обработать запрос";
    pub const NOTHING_TO_SAVE: &str = "Нет результата для сохранения";
    pub const SAVE_FAILED: &str = "Не удалось сохранить файл";
}

/// PortalError
///
/// Every failure the Auth Gate or the Module Interaction Controller can report.
/// None of them are fatal: the caller shows the message and the user may retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    /// Local input check failed. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// The remote endpoint answered but refused the request
    /// (bad code, bad credentials, backend-reported generation error).
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable answer: network unreachable,
    /// timeout, or a body that could not be decoded.
    #[error("{message}")]
    Transport {
        /// Shown to the user.
        message: String,
        /// Logged, never shown.
        detail: String,
    },

    /// A generation request is already in flight for this controller.
    #[error("request already in progress")]
    Busy,

    /// Writing a result to disk failed.
    #[error("{message}: {path}")]
    Save { path: String, message: String },

    /// The auth gate is enabled and no session exists.
    #[error("authentication required")]
    Unauthenticated,

    /// The operation is not valid in the gate's current state
    /// (e.g. `register` without a validated code).
    #[error("operation not allowed while {0}")]
    InvalidState(&'static str),
}

impl PortalError {
    pub fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    /// Builds a remote rejection from an optional backend message,
    /// substituting the fallback when the backend sent none.
    pub fn rejected(message: Option<String>, fallback: &str) -> Self {
        match message {
            Some(msg) if !msg.trim().is_empty() => Self::Rejected(msg),
            _ => Self::Rejected(fallback.to_string()),
        }
    }

    pub fn transport(detail: impl ToString) -> Self {
        Self::Transport {
            message: messages::GENERATION_FALLBACK.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("request timed out: {err}"))
        } else {
            Self::transport(err)
        }
    }
}

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment is incomplete or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
