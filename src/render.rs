//! Response rendering.
//!
//! A pure function of the selected module and the current response. Each
//! module reads only its own fields; anything missing or mismatched renders
//! as nothing.

use std::fmt;

use crate::models::{GenerationResponse, MediaType, ModuleId};

/// View
///
/// Borrowed, display-ready projection of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<'a> {
    Text {
        text: &'a str,
    },
    Website {
        message: Option<&'a str>,
        html: &'a str,
    },
    Media {
        media_type: MediaType,
        url: &'a str,
        message: Option<&'a str>,
    },
    Audio {
        url: &'a str,
        text: Option<&'a str>,
        message: Option<&'a str>,
    },
}

pub fn view(
    selected: Option<ModuleId>,
    response: Option<&GenerationResponse>,
) -> Option<View<'_>> {
    let module = selected?;
    let view = match (module, response?) {
        (ModuleId::Text, GenerationResponse::Text { text }) => View::Text { text },
        (ModuleId::Webgen, GenerationResponse::Website { html, message }) => View::Website {
            message: message.as_deref(),
            html,
        },
        (
            ModuleId::Imaging,
            GenerationResponse::Media {
                url,
                media_type,
                message,
            },
        ) => View::Media {
            media_type: *media_type,
            url,
            message: message.as_deref(),
        },
        (
            ModuleId::Voice,
            GenerationResponse::Voice {
                audio_url,
                text,
                message,
            },
        ) => View::Audio {
            url: audio_url,
            text: text.as_deref(),
            message: message.as_deref(),
        },
        _ => return None,
    };
    Some(view)
}

impl View<'_> {
    /// File a `save` writes when no path is given. Only text and website
    /// results have content of their own; media stays remote.
    pub fn default_save_path(&self) -> Option<&'static str> {
        match self {
            View::Text { .. } => Some("duwdu1-text.txt"),
            View::Website { .. } => Some("duwdu1-site.html"),
            _ => None,
        }
    }

    /// Download name offered for media results.
    pub fn suggested_filename(&self) -> Option<String> {
        match self {
            View::Media { media_type, .. } => {
                let ext = match media_type {
                    MediaType::Image => "jpg",
                    MediaType::Video => "mp4",
                };
                Some(format!("duwdu1-{}.{ext}", media_type.as_str()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Text { text } => write!(f, "{text}"),
            View::Website { message, html } => {
                if let Some(message) = message {
                    writeln!(f, "{message}")?;
                }
                write!(f, "{html}")
            }
            View::Media {
                media_type,
                url,
                message,
            } => {
                if let Some(message) = message {
                    writeln!(f, "{message}")?;
                }
                let label = match media_type {
                    MediaType::Image => "Фото",
                    MediaType::Video => "Видео",
                };
                write!(f, "{label}: {url}")?;
                if let Some(name) = self.suggested_filename() {
                    write!(f, " ({name})")?;
                }
                Ok(())
            }
            View::Audio { url, text, message } => {
                if let Some(message) = message {
                    writeln!(f, "{message}")?;
                }
                write!(f, "Аудио: {url}")?;
                if let Some(text) = text {
                    write!(f, "\nОзвучен текст: {text}")?;
                }
                Ok(())
            }
        }
    }
}
