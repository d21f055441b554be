//! Conversational widget session.
//!
//! # States
//! ```text
//! Idle ──edit──▶ Composing ──submit──▶ AwaitingResponse ──reply/error/timeout──▶ Idle
//! ```
//!
//! The state is one tagged value; [`ChatState::on`] is the whole transition
//! table. The controller runs the effect it returns: appending a message,
//! or appending one and calling the gateway.

use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::transport::{GatewayTransport, TransportError};
use crate::protocol::{reply_text, ChatMessage, ChatRequest};

pub const CHAT_DEADLINE: Duration = Duration::from_secs(30);

pub const SYSTEM_PROMPT: &str = "Tu es l'assistant virtuel de NeuroLeads, une agence qui aide les \
entreprises B2B à générer des leads grâce à l'IA. Nos solutions : AI Revenue Engine, Voice Agents IA, \
Automatisation sur mesure, Sites IA & Chatbots. Le diagnostic initial de 30 minutes est gratuit. \
Réponds en français, en trois phrases maximum, avec un ton professionnel et chaleureux. \
Si la personne souhaite un devis ou un rendez-vous, invite-la à réserver un diagnostic gratuit.";

pub const GREETING: &str = "Bonjour ! Comment puis-je vous aider aujourd'hui ?";

pub const QUICK_REPLIES: [&str; 4] = [
    "En savoir plus sur vos solutions",
    "Réserver un diagnostic",
    "Combien ça coûte ?",
    "Parler à un conseiller",
];

pub const APOLOGY: &str = "Désolé, je n'ai pas pu traiter votre demande. Pouvez-vous reformuler votre question ?";

pub const PLEASE_WAIT: &str =
    "Vous envoyez beaucoup de messages en peu de temps. Merci de patienter une minute avant de réessayer.";

pub const TIMEOUT_APOLOGY: &str = "Désolé, notre assistant met trop de temps à répondre. \
Vous pouvez nous joindre directement au 01 84 60 12 34 ou à contact@neuroleads.fr.";

/// Why the last exchange did not produce a real reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFailure {
    RateLimited,
    Provider,
    InvalidResponse,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Composing { draft: String },
    AwaitingResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Edit(String),
    UserSubmit,
    ProviderSuccess(Value),
    ProviderError { rate_limited: bool },
    Timeout,
    /// The session was torn down while a call was in flight.
    Cancelled,
}

/// Work the controller must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEffect {
    None,
    /// Append the user message and call the gateway.
    Dispatch(ChatMessage),
    /// Append an assistant message and record the outcome.
    Reply {
        message: ChatMessage,
        failure: Option<ChatFailure>,
    },
}

impl ChatState {
    /// The transition table.
    pub fn on(self, event: ChatEvent) -> (ChatState, ChatEffect) {
        use ChatEvent as E;
        use ChatState as S;

        match (self, event) {
            (S::Idle | S::Composing { .. }, E::Edit(text)) => {
                if text.trim().is_empty() {
                    (S::Idle, ChatEffect::None)
                } else {
                    (S::Composing { draft: text }, ChatEffect::None)
                }
            }
            (S::Composing { draft }, E::UserSubmit) => (
                S::AwaitingResponse,
                ChatEffect::Dispatch(ChatMessage::user(draft.trim())),
            ),
            (S::AwaitingResponse, E::ProviderSuccess(payload)) => match reply_text(&payload) {
                Some(text) => (S::Idle, reply(text, None)),
                None => (S::Idle, reply(APOLOGY, Some(ChatFailure::InvalidResponse))),
            },
            (S::AwaitingResponse, E::ProviderError { rate_limited: true }) => {
                (S::Idle, reply(PLEASE_WAIT, Some(ChatFailure::RateLimited)))
            }
            (S::AwaitingResponse, E::ProviderError { rate_limited: false }) => {
                (S::Idle, reply(APOLOGY, Some(ChatFailure::Provider)))
            }
            (S::AwaitingResponse, E::Timeout) => (S::Idle, reply(TIMEOUT_APOLOGY, Some(ChatFailure::Timeout))),
            (S::AwaitingResponse, E::Cancelled) => (S::Idle, ChatEffect::None),
            // Submitting while awaiting, editing while the input is disabled,
            // and outcomes with nothing in flight change nothing.
            (state, _) => (state, ChatEffect::None),
        }
    }
}

fn reply(text: &str, failure: Option<ChatFailure>) -> ChatEffect {
    ChatEffect::Reply {
        message: ChatMessage::assistant(text),
        failure,
    }
}

/// One conversation, in memory only.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    messages: Vec<ChatMessage>,
    state: ChatState,
    last_error: Option<ChatFailure>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            state: ChatState::Idle,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Conversation so far, oldest first. The greeting is not part of it.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn last_error(&self) -> Option<ChatFailure> {
        self.last_error
    }

    pub fn is_pending(&self) -> bool {
        self.state == ChatState::AwaitingResponse
    }
}

/// Drives one [`ChatSession`] against the gateway.
///
/// `submit` takes `&mut self` and holds it until the call resolves, so a
/// session never has two requests in flight.
pub struct ChatSessionController<T> {
    transport: T,
    session: ChatSession,
    system_prompt: String,
    deadline: Duration,
    cancel: CancellationToken,
}

impl<T: GatewayTransport> ChatSessionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: ChatSession::new(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            deadline: CHAT_DEADLINE,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn state(&self) -> &ChatState {
        &self.session.state
    }

    /// Token that tears the session down from elsewhere (widget closed,
    /// page unloading).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn apply(&mut self, event: ChatEvent) -> ChatEffect {
        let current = std::mem::replace(&mut self.session.state, ChatState::Idle);
        let (next, effect) = current.on(event);
        self.session.state = next;

        match &effect {
            ChatEffect::Dispatch(message) => self.session.messages.push(message.clone()),
            ChatEffect::Reply { message, failure } => {
                self.session.messages.push(message.clone());
                self.session.last_error = *failure;
            }
            ChatEffect::None => {}
        }

        effect
    }

    /// Update the input draft. A closed session takes no input.
    pub fn edit(&mut self, text: &str) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.apply(ChatEvent::Edit(text.to_string()));
    }

    /// Send the current draft and wait for the outcome.
    pub async fn submit(&mut self) -> &ChatState {
        if self.cancel.is_cancelled() {
            return &self.session.state;
        }

        if !matches!(self.apply(ChatEvent::UserSubmit), ChatEffect::Dispatch(_)) {
            return &self.session.state;
        }

        let request = ChatRequest {
            messages: self.session.messages.clone(),
            system: self.system_prompt.clone(),
        };

        tracing::debug!(session = %self.session.id, turns = request.messages.len(), "Sending chat turn");

        // Leaving this select drops the losing branch, which aborts the
        // in-flight HTTP request.
        let event = tokio::select! {
            _ = self.cancel.cancelled() => ChatEvent::Cancelled,
            outcome = tokio::time::timeout(self.deadline, self.transport.send_chat(request)) => match outcome {
                Ok(Ok(payload)) => ChatEvent::ProviderSuccess(payload),
                Ok(Err(TransportError::RateLimited)) => ChatEvent::ProviderError { rate_limited: true },
                Ok(Err(e)) => {
                    tracing::warn!(session = %self.session.id, error = %e, "Chat turn failed");
                    ChatEvent::ProviderError { rate_limited: false }
                }
                Err(_) => {
                    tracing::warn!(session = %self.session.id, deadline = ?self.deadline, "Chat turn timed out");
                    ChatEvent::Timeout
                }
            },
        };

        self.apply(event);
        &self.session.state
    }

    /// Type `text` and send it; used for quick replies.
    pub async fn send_text(&mut self, text: &str) -> &ChatState {
        self.edit(text);
        self.submit().await
    }
}
