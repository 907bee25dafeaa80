use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{AuthService, GenerationService};
use crate::error::PortalError;
use crate::models::{
    AccessCode, AuthReply, AuthRequest, GenerationRequest, MediaType, ModuleId, normalize_code,
};

// --- Auth ---

#[derive(Debug, Clone)]
struct MockUser {
    id: i64,
    username: String,
    password: String,
}

#[derive(Debug, Default)]
struct AuthStore {
    codes: Vec<AccessCode>,
    users: Vec<MockUser>,
}

/// MockAuthService
///
/// In-memory stand-in for the auth endpoint. Mirrors the remote behaviour:
/// codes are looked up case-insensitively, registration consumes a code
/// exactly once, usernames are unique, and ids are assigned sequentially.
#[derive(Debug, Default)]
pub struct MockAuthService {
    store: Mutex<AuthStore>,
    calls: AtomicUsize,
    /// When true, every call fails as if the network were down.
    pub should_fail: bool,
}

impl MockAuthService {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            store: Mutex::new(AuthStore {
                codes: codes.iter().map(|code| AccessCode::new(code)).collect(),
                users: Vec::new(),
            }),
            ..Self::default()
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds an existing account. Ids follow insertion order starting at 1.
    pub async fn with_user(self, username: &str, password: &str) -> Self {
        {
            let mut store = self.store.lock().await;
            let id = store.users.len() as i64 + 1;
            store.users.push(MockUser {
                id,
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        self
    }

    /// Number of requests that reached this service.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn is_consumed(&self, code: &str) -> bool {
        let code = normalize_code(code);
        self.store
            .lock()
            .await
            .codes
            .iter()
            .any(|c| c.code == code && c.consumed)
    }
}

fn refuse(message: &str) -> PortalError {
    PortalError::Rejected(message.to_string())
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn call(&self, request: &AuthRequest) -> Result<AuthReply, PortalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(PortalError::transport("mock auth: simulated network failure"));
        }

        let mut store = self.store.lock().await;
        match request {
            AuthRequest::CheckCode { code } => {
                let code = normalize_code(code);
                match store.codes.iter().find(|c| c.code == code) {
                    None => Err(refuse("Неверный код")),
                    Some(c) if c.consumed => Err(refuse("Код уже использован")),
                    Some(_) => Ok(AuthReply {
                        success: true,
                        code: Some(code),
                        ..AuthReply::default()
                    }),
                }
            }
            AuthRequest::Register {
                username,
                password,
                code,
            } => {
                if username.is_empty() || password.is_empty() || code.is_empty() {
                    return Err(refuse("Все поля обязательны"));
                }
                let code = normalize_code(code);
                let Some(index) = store
                    .codes
                    .iter()
                    .position(|c| c.code == code && !c.consumed)
                else {
                    return Err(refuse("Код недействителен"));
                };
                if store.users.iter().any(|u| &u.username == username) {
                    return Err(refuse("Имя пользователя занято"));
                }

                let id = store.users.len() as i64 + 1;
                store.users.push(MockUser {
                    id,
                    username: username.clone(),
                    password: password.clone(),
                });
                store.codes[index].consumed = true;

                Ok(AuthReply {
                    success: true,
                    user_id: Some(id),
                    username: Some(username.clone()),
                    ..AuthReply::default()
                })
            }
            AuthRequest::Login { username, password } => {
                if username.is_empty() || password.is_empty() {
                    return Err(refuse("Все поля обязательны"));
                }
                store
                    .users
                    .iter()
                    .find(|u| &u.username == username && &u.password == password)
                    .map(|u| AuthReply {
                        success: true,
                        user_id: Some(u.id),
                        username: Some(u.username.clone()),
                        ..AuthReply::default()
                    })
                    .ok_or_else(|| refuse("Неверный логин или пароль"))
            }
        }
    }
}

// --- Generation ---

/// MockGenerationService
///
/// Replays scripted outcomes in order. Once the script runs out it answers
/// with a canned body for the requested module, echoing the prompt.
#[derive(Debug, Default)]
pub struct MockGenerationService {
    script: Mutex<VecDeque<Result<Value, PortalError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for the next call.
    pub async fn push(&self, outcome: Result<Value, PortalError>) {
        self.script.lock().await.push_back(outcome);
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    fn canned(request: &GenerationRequest) -> Value {
        let prompt = &request.prompt;
        match request.module {
            ModuleId::Text => json!({ "response": format!("DUWDU1: {prompt}") }),
            ModuleId::Webgen => json!({
                "html": format!("<!DOCTYPE html><html><body><h1>{prompt}</h1></body></html>"),
                "message": format!("DUWDU WebGen создал сайт по запросу: {prompt}"),
            }),
            ModuleId::Imaging => {
                let kind = request.media_type.unwrap_or(MediaType::Image).as_str();
                let ext = if kind == "image" { "jpg" } else { "mp4" };
                json!({
                    "url": format!("https://cdn.example.invalid/duwdu1.{ext}"),
                    "type": kind,
                    "message": format!("DUWDU создал {kind}: {prompt}"),
                })
            }
            ModuleId::Voice => json!({
                "audio_url": "https://cdn.example.invalid/duwdu1.mp3",
                "text": prompt,
                "voice": request.voice.map(|v| v.as_str()),
                "message": "DUWDU озвучил текст",
            }),
        }
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, PortalError> {
        self.requests.lock().await.push(request.clone());
        match self.script.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(Self::canned(request)),
        }
    }
}
