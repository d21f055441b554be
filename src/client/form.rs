//! Lead-capture form submission.
//!
//! ```text
//! Idle ──submit──▶ Validating ──▶ Blocked | Invalid | Submitting
//! Submitting ──▶ Confirmed | Failed ──(8 s)──▶ Idle
//! ```

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::transport::{GatewayTransport, TransportError};
use crate::client::validation::{validate, ContactFields, Field, FieldErrors};

pub const FORM_DEADLINE: Duration = Duration::from_secs(15);
pub const RESET_DELAY: Duration = Duration::from_secs(8);
pub const MAX_ATTEMPTS: u32 = 3;

pub const CEILING_MESSAGE: &str = "Trop de tentatives. Veuillez réessayer plus tard.";
pub const TIMEOUT_MESSAGE: &str = "La requête a expiré. Veuillez réessayer.";
pub const RATE_LIMIT_MESSAGE: &str = "Trop de soumissions. Veuillez patienter quelques minutes.";
pub const FALLBACK_MESSAGE: &str = "Une erreur est survenue. Veuillez réessayer.";
pub const CONFIRMATION: &str = "Merci ! Nous vous recontactons sous 24h.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Ceiling,
    Honeypot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Validating,
    Blocked { reason: BlockReason },
    Invalid { errors: FieldErrors },
    Submitting,
    Confirmed { at: Instant },
    Failed { message: String, at: Instant },
}

impl FormState {
    /// Text a visitor sees for this state, if any. A honeypot block shows
    /// nothing.
    pub fn notice(&self) -> Option<&str> {
        match self {
            FormState::Blocked {
                reason: BlockReason::Ceiling,
            } => Some(CEILING_MESSAGE),
            FormState::Confirmed { .. } => Some(CONFIRMATION),
            FormState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            FormState::Invalid { errors } => Some(errors),
            _ => None,
        }
    }
}

/// Outcome of the pre-flight checks, in the order they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    CeilingReached,
    Honeypot,
    Invalid(FieldErrors),
    Valid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    Checked(Verdict),
    Delivered { at: Instant },
    Rejected { message: String, at: Instant },
    ResetElapsed,
    Edited(Field),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEffect {
    None,
    /// Run the pre-flight checks.
    Check,
    /// Send the sanitized fields.
    Dispatch,
    /// Empty every field, honeypot included.
    ClearFields,
}

impl FormState {
    pub fn on(self, event: FormEvent) -> (FormState, FormEffect) {
        use FormEvent as E;
        use FormState as S;

        match (self, event) {
            (S::Idle | S::Invalid { .. } | S::Failed { .. } | S::Blocked { .. }, E::Submit) => {
                (S::Validating, FormEffect::Check)
            }
            (S::Validating, E::Checked(verdict)) => match verdict {
                Verdict::CeilingReached => (
                    S::Blocked {
                        reason: BlockReason::Ceiling,
                    },
                    FormEffect::None,
                ),
                Verdict::Honeypot => (
                    S::Blocked {
                        reason: BlockReason::Honeypot,
                    },
                    FormEffect::None,
                ),
                Verdict::Invalid(errors) => (S::Invalid { errors }, FormEffect::None),
                Verdict::Valid => (S::Submitting, FormEffect::Dispatch),
            },
            (S::Submitting, E::Delivered { at }) => (S::Confirmed { at }, FormEffect::None),
            (S::Submitting, E::Rejected { message, at }) => (S::Failed { message, at }, FormEffect::None),
            (S::Submitting, E::Cancelled) => (S::Idle, FormEffect::None),
            (S::Confirmed { .. }, E::ResetElapsed) => (S::Idle, FormEffect::ClearFields),
            (S::Failed { .. }, E::ResetElapsed) => (S::Idle, FormEffect::None),
            (S::Invalid { mut errors }, E::Edited(field)) => {
                errors.remove(&field);
                if errors.is_empty() {
                    (S::Idle, FormEffect::None)
                } else {
                    (S::Invalid { errors }, FormEffect::None)
                }
            }
            (state, _) => (state, FormEffect::None),
        }
    }
}

/// Submissions dispatched by one form over its lifetime. Only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionAttemptCounter(u32);

impl SubmissionAttemptCounter {
    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    pub fn ceiling_reached(&self) -> bool {
        self.0 >= MAX_ATTEMPTS
    }
}

/// Drives one lead-capture form against the gateway.
pub struct FormSubmissionController<T> {
    transport: T,
    fields: ContactFields,
    state: FormState,
    attempts: SubmissionAttemptCounter,
    deadline: Duration,
    cancel: CancellationToken,
}

impl<T: GatewayTransport> FormSubmissionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            fields: ContactFields::default(),
            state: FormState::Idle,
            attempts: SubmissionAttemptCounter::default(),
            deadline: FORM_DEADLINE,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn fields(&self) -> &ContactFields {
        &self.fields
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn apply(&mut self, event: FormEvent) -> FormEffect {
        let current = std::mem::replace(&mut self.state, FormState::Idle);
        let (next, effect) = current.on(event);
        self.state = next;

        if effect == FormEffect::ClearFields {
            self.fields = ContactFields::default();
        }
        effect
    }

    /// Store a field value (capped) and clear that field's error.
    pub fn set_field(&mut self, field: Field, value: &str) {
        self.fields.set(field, value);
        self.apply(FormEvent::Edited(field));
    }

    pub fn set_honeypot(&mut self, value: &str) {
        self.fields.honeypot = value.to_string();
    }

    fn check(&self) -> Verdict {
        if self.attempts.ceiling_reached() {
            return Verdict::CeilingReached;
        }
        if self.fields.honeypot_filled() {
            return Verdict::Honeypot;
        }

        let errors = validate(&self.fields);
        if errors.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Invalid(errors)
        }
    }

    /// Run one submit attempt to completion.
    pub async fn submit(&mut self) -> &FormState {
        if self.cancel.is_cancelled() || self.apply(FormEvent::Submit) != FormEffect::Check {
            return &self.state;
        }

        let verdict = self.check();
        match &verdict {
            Verdict::CeilingReached => tracing::warn!(attempts = self.attempts.get(), "Submission ceiling reached"),
            Verdict::Honeypot => tracing::debug!("Honeypot filled, dropping submission"),
            _ => {}
        }

        if self.apply(FormEvent::Checked(verdict)) != FormEffect::Dispatch {
            return &self.state;
        }

        self.attempts.increment();
        let request = self.fields.to_request();

        let event = tokio::select! {
            _ = self.cancel.cancelled() => FormEvent::Cancelled,
            outcome = tokio::time::timeout(self.deadline, self.transport.send_contact(request)) => {
                let at = Instant::now();
                match outcome {
                    Ok(Ok(_ack)) => FormEvent::Delivered { at },
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Contact submission failed");
                        FormEvent::Rejected { message: failure_message(e), at }
                    }
                    Err(_) => FormEvent::Rejected { message: TIMEOUT_MESSAGE.to_string(), at },
                }
            }
        };

        self.apply(event);
        &self.state
    }

    /// Return to `Idle` if the post-outcome delay has passed at `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(due) = self.reset_due() {
            if now >= due {
                self.apply(FormEvent::ResetElapsed);
            }
        }
    }

    /// Wait out the post-outcome delay, then return to `Idle`.
    pub async fn settle(&mut self) -> &FormState {
        if let Some(due) = self.reset_due() {
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep_until(due) => {
                    self.apply(FormEvent::ResetElapsed);
                }
            }
        }
        &self.state
    }

    fn reset_due(&self) -> Option<Instant> {
        match &self.state {
            FormState::Confirmed { at } | FormState::Failed { at, .. } => Some(*at + RESET_DELAY),
            _ => None,
        }
    }
}

fn failure_message(error: TransportError) -> String {
    match error {
        TransportError::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
        TransportError::Status {
            message: Some(message), ..
        } => message,
        _ => FALLBACK_MESSAGE.to_string(),
    }
}
