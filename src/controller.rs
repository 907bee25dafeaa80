use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{PortalError, messages},
    models::{GenerationRequest, GenerationResponse, MediaType, ModuleId, ModuleOptions, Voice},
    render::{self, View},
    services::GenerationService,
};

/// PendingGeneration
///
/// Ticket for the one request a controller may have in flight. The caller
/// executes `request` and hands the outcome back through `resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub id: Uuid,
    pub request: GenerationRequest,
}

/// What `resolve` did with an outcome that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response is now on screen.
    Applied,
    /// The ticket was stale, cancelled or unknown; state was left alone
    /// (apart from clearing `pending` for a stale ticket).
    Discarded,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: Uuid,
    // Set when the module changes mid-request.
    stale: bool,
}

/// ModuleController
///
/// Holds the selected module, the prompt being typed, the module options and
/// the last response. At most one generation request is in flight at a time.
#[derive(Debug, Default)]
pub struct ModuleController {
    selected: Option<ModuleId>,
    prompt: String,
    response: Option<GenerationResponse>,
    media_type: MediaType,
    voice: Voice,
    in_flight: Option<InFlight>,
}

impl ModuleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_module(&self) -> Option<ModuleId> {
        self.selected
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn response(&self) -> Option<&GenerationResponse> {
        self.response.as_ref()
    }

    pub fn pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    /// Switches module. Prompt and response are always cleared; a request still
    /// in flight for the previous module will have its outcome discarded.
    pub fn select_module(&mut self, module: ModuleId) {
        self.mark_stale();
        self.selected = Some(module);
        self.prompt.clear();
        self.response = None;
        tracing::debug!(%module, "module selected");
    }

    pub fn update_prompt(&mut self, text: &str) {
        self.prompt = text.to_string();
    }

    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.media_type = media_type;
    }

    pub fn set_voice(&mut self, voice: Voice) {
        self.voice = voice;
    }

    /// Drops everything, as after a logout. An outstanding ticket becomes
    /// unknown and its outcome is discarded.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Abandons a ticket whose outcome will never be resolved. `pending` is
    /// cleared if the ticket is still the one in flight.
    pub fn cancel(&mut self, ticket: &PendingGeneration) {
        self.clear_in_flight(ticket.id);
    }

    fn clear_in_flight(&mut self, request_id: Uuid) {
        if self.in_flight.as_ref().is_some_and(|flight| flight.id == request_id) {
            self.in_flight = None;
            tracing::debug!(%request_id, "generation cancelled");
        }
    }

    fn mark_stale(&mut self) {
        if let Some(flight) = self.in_flight.as_mut() {
            flight.stale = true;
        }
    }

    /// submit
    ///
    /// Validates and shapes a request for the selected module, marks the
    /// controller pending and returns the ticket to execute. Options given here
    /// override (and replace) the stored media type and voice.
    ///
    /// # Errors
    /// `Busy` while a request is in flight; `Validation` when no module is
    /// selected or the prompt is blank. No ticket means no network call.
    pub fn submit(
        &mut self,
        options: ModuleOptions,
        user_id: Option<i64>,
    ) -> Result<PendingGeneration, PortalError> {
        if self.pending() {
            return Err(PortalError::Busy);
        }
        let module = self
            .selected
            .ok_or_else(|| PortalError::validation(messages::NO_MODULE))?;
        if self.prompt.trim().is_empty() {
            return Err(PortalError::validation(messages::EMPTY_PROMPT));
        }

        if let Some(media_type) = options.media_type {
            self.media_type = media_type;
        }
        if let Some(voice) = options.voice {
            self.voice = voice;
        }

        let request =
            GenerationRequest::shape(module, &self.prompt, self.media_type, self.voice, user_id);
        let id = Uuid::new_v4();
        self.response = None;
        self.in_flight = Some(InFlight { id, stale: false });
        tracing::info!(request_id = %id, %module, "generation submitted");

        Ok(PendingGeneration { id, request })
    }

    /// resolve
    ///
    /// Applies the outcome of a ticket. On success the decoded response
    /// replaces the old one; on failure the error is returned and no response
    /// is set. Either way `pending` is false afterwards.
    pub fn resolve(
        &mut self,
        ticket: &PendingGeneration,
        outcome: Result<Value, PortalError>,
    ) -> Result<Resolution, PortalError> {
        let request_id = ticket.id;
        let flight = match self.in_flight.take() {
            Some(flight) if flight.id == request_id => flight,
            other => {
                self.in_flight = other;
                tracing::debug!(%request_id, "ignoring outcome for unknown request");
                return Ok(Resolution::Discarded);
            }
        };
        if flight.stale {
            tracing::debug!(%request_id, "discarding stale generation outcome");
            return Ok(Resolution::Discarded);
        }

        let module = ticket.request.module;
        let decoded = outcome.and_then(|body| {
            GenerationResponse::decode(module, &body, ticket.request.media_type)
        });
        match decoded {
            Ok(response) => {
                tracing::info!(%request_id, %module, "generation completed");
                self.response = Some(response);
                Ok(Resolution::Applied)
            }
            Err(err) => {
                match &err {
                    PortalError::Transport { detail, .. } => {
                        tracing::error!(%request_id, %module, %detail, "generation failed")
                    }
                    other => tracing::warn!(%request_id, %module, error = %other, "generation refused"),
                }
                Err(err)
            }
        }
    }

    /// Submits, awaits the service and resolves in one step. Dropping the
    /// returned future before it completes cancels the request.
    pub async fn run_submit(
        &mut self,
        service: &dyn GenerationService,
        options: ModuleOptions,
        user_id: Option<i64>,
    ) -> Result<Resolution, PortalError> {
        let ticket = self.submit(options, user_id)?;
        let mut guard = CancelOnDrop {
            controller: self,
            request_id: ticket.id,
        };
        let outcome = service.generate(&ticket.request).await;
        guard.controller.resolve(&ticket, outcome)
    }

    /// What the response area should show right now.
    pub fn view(&self) -> Option<View<'_>> {
        render::view(self.selected, self.response.as_ref())
    }
}

/// Clears the in-flight slot if `run_submit` is dropped mid-await.
/// After a normal resolve the slot is already empty and this is a no-op.
struct CancelOnDrop<'a> {
    controller: &'a mut ModuleController,
    request_id: Uuid,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.controller.clear_in_flight(self.request_id);
    }
}
