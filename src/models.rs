use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{PortalError, messages};

// --- Module Catalog ---

/// ModuleId
///
/// The fixed set of capabilities the portal exposes. At most one is selected
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ModuleId {
    Text,
    Webgen,
    Imaging,
    Voice,
}

impl ModuleId {
    pub const ALL: [ModuleId; 4] = [
        ModuleId::Text,
        ModuleId::Webgen,
        ModuleId::Imaging,
        ModuleId::Voice,
    ];

    /// Identifier used by the flat wire format.
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::Text => "text",
            ModuleId::Webgen => "webgen",
            ModuleId::Imaging => "imaging",
            ModuleId::Voice => "voice",
        }
    }

    /// Identifier used by the legacy `moduleType` wire format.
    pub fn legacy_str(self) -> &'static str {
        match self {
            ModuleId::Text => "text",
            ModuleId::Webgen => "website",
            ModuleId::Imaging => "media",
            ModuleId::Voice => "voice",
        }
    }

    pub fn card(self) -> &'static ModuleCard {
        match self {
            ModuleId::Text => &MODULES[0],
            ModuleId::Webgen => &MODULES[1],
            ModuleId::Imaging => &MODULES[2],
            ModuleId::Voice => &MODULES[3],
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = PortalError;

    /// Accepts both the current ids and the legacy aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ModuleId::Text),
            "webgen" | "website" => Ok(ModuleId::Webgen),
            "imaging" | "media" => Ok(ModuleId::Imaging),
            "voice" => Ok(ModuleId::Voice),
            _ => Err(PortalError::validation(messages::NO_MODULE)),
        }
    }
}

/// ModuleCard
///
/// Static presentation data for one module card.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleCard {
    pub id: ModuleId,
    pub title: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    /// Tailwind gradient classes for the card background.
    pub color: &'static str,
}

pub static MODULES: [ModuleCard; 4] = [
    ModuleCard {
        id: ModuleId::Text,
        title: "DUWDU1 Нейросеть",
        icon: "Zap",
        description: "Революционная ИИ-система в 26 раз мощнее GPT-4",
        color: "from-orange-500 to-orange-600",
    },
    ModuleCard {
        id: ModuleId::Webgen,
        title: "WebGen",
        icon: "Globe",
        description: "Создание профессиональных сайтов за секунды",
        color: "from-orange-600 to-amber-500",
    },
    ModuleCard {
        id: ModuleId::Imaging,
        title: "Imaging",
        icon: "Image",
        description: "Генерация фото и видео невиданного качества",
        color: "from-amber-500 to-orange-500",
    },
    ModuleCard {
        id: ModuleId::Voice,
        title: "Voice",
        icon: "Mic",
        description: "Голосовой интерфейс с человеческой интонацией",
        color: "from-orange-400 to-orange-600",
    },
];

// --- Module Options ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(PortalError::Validation(format!("unknown media type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Voice {
    #[default]
    Male,
    Female,
    Child,
}

impl Voice {
    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Male => "male",
            Voice::Female => "female",
            Voice::Child => "child",
        }
    }
}

impl FromStr for Voice {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Voice::Male),
            "female" => Ok(Voice::Female),
            "child" => Ok(Voice::Child),
            other => Err(PortalError::Validation(format!("unknown voice: {other}"))),
        }
    }
}

/// ModuleOptions
///
/// Per-submit overrides. Fields that do not belong to the selected module are
/// dropped during request shaping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleOptions {
    pub media_type: Option<MediaType>,
    pub voice: Option<Voice>,
}

// --- Generation Wire Types ---

/// WireFormat
///
/// The generation endpoint exists in two dialects: the flat one
/// (`module` + `type`) and the legacy one (`moduleType` + `mediaType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Flat,
    Legacy,
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(WireFormat::Flat),
            "legacy" => Ok(WireFormat::Legacy),
            other => Err(other.to_string()),
        }
    }
}

/// GenerationRequest
///
/// A fully shaped request. Built only by `GenerationRequest::shape`, which
/// guarantees the option fields match the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub user_id: Option<i64>,
    pub module: ModuleId,
    pub prompt: String,
    pub media_type: Option<MediaType>,
    pub voice: Option<Voice>,
}

impl GenerationRequest {
    /// Keeps `media_type` only for imaging and `voice` only for voice.
    pub fn shape(
        module: ModuleId,
        prompt: &str,
        media_type: MediaType,
        voice: Voice,
        user_id: Option<i64>,
    ) -> Self {
        Self {
            user_id,
            module,
            prompt: prompt.to_string(),
            media_type: (module == ModuleId::Imaging).then_some(media_type),
            voice: (module == ModuleId::Voice).then_some(voice),
        }
    }

    /// Serializes the request in the dialect the endpoint expects.
    pub fn to_body(&self, format: WireFormat) -> Value {
        let mut body = Map::new();
        if let Some(user_id) = self.user_id {
            body.insert("userId".into(), Value::from(user_id));
        }
        match format {
            WireFormat::Flat => {
                body.insert("module".into(), Value::from(self.module.as_str()));
            }
            WireFormat::Legacy => {
                body.insert("moduleType".into(), Value::from(self.module.legacy_str()));
            }
        }
        // The flat voice handler reads the prompt from `text`.
        let prompt_key = match (format, self.module) {
            (WireFormat::Flat, ModuleId::Voice) => "text",
            _ => "prompt",
        };
        body.insert(prompt_key.into(), Value::from(self.prompt.as_str()));
        if let Some(media_type) = self.media_type {
            let key = match format {
                WireFormat::Flat => "type",
                WireFormat::Legacy => "mediaType",
            };
            body.insert(key.into(), Value::from(media_type.as_str()));
        }
        if let Some(voice) = self.voice {
            body.insert("voice".into(), Value::from(voice.as_str()));
        }
        Value::Object(body)
    }
}

/// GenerationResponse
///
/// The typed result of one generation call. The primary field of each variant
/// is guaranteed present; everything else is read defensively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum GenerationResponse {
    Text {
        text: String,
    },
    Website {
        html: String,
        message: Option<String>,
    },
    Media {
        url: String,
        media_type: MediaType,
        message: Option<String>,
    },
    Voice {
        audio_url: String,
        text: Option<String>,
        message: Option<String>,
    },
}

impl GenerationResponse {
    /// decode
    ///
    /// Interprets a raw endpoint body for the module the request was issued for.
    /// Accepts `{success, response: {...}}`, `{response: "<text>"}` and the flat
    /// module object. A missing primary field is a failure.
    pub fn decode(
        module: ModuleId,
        body: &Value,
        requested_media: Option<MediaType>,
    ) -> Result<Self, PortalError> {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(PortalError::rejected(
                str_field(body, &["error"]),
                messages::GENERATION_FALLBACK,
            ));
        }
        let payload = match body.get("response") {
            Some(inner @ Value::Object(_)) => inner,
            _ => body,
        };
        let missing = || {
            PortalError::rejected(
                str_field(body, &["error"]),
                messages::GENERATION_FALLBACK,
            )
        };

        match module {
            ModuleId::Text => {
                let text = body
                    .get("response")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| str_field(payload, &["text", "response"]))
                    .ok_or_else(missing)?;
                Ok(Self::Text { text })
            }
            ModuleId::Webgen => Ok(Self::Website {
                html: str_field(payload, &["html"]).ok_or_else(missing)?,
                message: str_field(payload, &["message"]),
            }),
            ModuleId::Imaging => {
                let url = str_field(payload, &["url"]).ok_or_else(missing)?;
                let media_type = str_field(payload, &["type", "mediaType"])
                    .and_then(|kind| kind.parse().ok())
                    .or(requested_media)
                    .unwrap_or_default();
                Ok(Self::Media {
                    url,
                    media_type,
                    message: str_field(payload, &["message"]),
                })
            }
            ModuleId::Voice => Ok(Self::Voice {
                audio_url: str_field(payload, &["audioUrl", "audio_url"]).ok_or_else(missing)?,
                text: str_field(payload, &["text"]),
                message: str_field(payload, &["message"]),
            }),
        }
    }

    pub fn module(&self) -> ModuleId {
        match self {
            Self::Text { .. } => ModuleId::Text,
            Self::Website { .. } => ModuleId::Webgen,
            Self::Media { .. } => ModuleId::Imaging,
            Self::Voice { .. } => ModuleId::Voice,
        }
    }
}

/// First non-empty string among `keys`.
fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// --- Auth Wire Types ---

/// AuthRequest
///
/// The body posted to the auth endpoint, discriminated by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export)]
pub enum AuthRequest {
    CheckCode {
        code: String,
    },
    Register {
        username: String,
        password: String,
        code: String,
    },
    Login {
        username: String,
        password: String,
    },
}

impl AuthRequest {
    pub fn action(&self) -> &'static str {
        match self {
            AuthRequest::CheckCode { .. } => "check_code",
            AuthRequest::Register { .. } => "register",
            AuthRequest::Login { .. } => "login",
        }
    }
}

/// AuthReply
///
/// Lenient view of the auth endpoint's answer. Every field is optional; an
/// absent `success` means failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct AuthReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(type = "number | null")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Accepts a numeric id either as a JSON number or as a numeric string.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// --- Session ---

/// Session
///
/// Who is using the portal. Empty until a login or registration succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    pub authenticated: bool,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    #[ts(type = "string | null")]
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn signed_in(user_id: Option<i64>, username: Option<String>) -> Self {
        Self {
            authenticated: true,
            user_id,
            username,
            authenticated_at: Some(Utc::now()),
        }
    }
}

/// AccessCode
///
/// A single-use registration token. `consumed` flips once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode {
    pub code: String,
    pub consumed: bool,
}

impl AccessCode {
    pub fn new(code: &str) -> Self {
        Self {
            code: normalize_code(code),
            consumed: false,
        }
    }
}

/// Codes compare case-insensitively and ignore surrounding whitespace.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
