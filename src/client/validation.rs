//! Lead-capture field rules: input caps, batch validation, sanitization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::protocol::ContactRequest;

pub const SERVICES: [&str; 4] = [
    "AI Revenue Engine",
    "Voice Agents IA",
    "Automatisation sur mesure",
    "Sites IA & Chatbots",
];

pub const BUDGETS: [&str; 4] = [
    "< 5 000 €",
    "5 000 € – 15 000 €",
    "15 000 € – 50 000 €",
    "> 50 000 €",
];

pub const SHORT_FIELD_MAX: usize = 100;
pub const MESSAGE_MAX: usize = 1000;
pub const NAME_MIN: usize = 2;

pub const NAME_REQUIRED: &str = "Le nom est requis";
pub const NAME_TOO_SHORT: &str = "Le nom doit contenir au moins 2 caractères";
pub const EMAIL_REQUIRED: &str = "L'email est requis";
pub const EMAIL_INVALID: &str = "Veuillez entrer un email valide";
pub const SERVICE_REQUIRED: &str = "Veuillez choisir un service";
pub const BUDGET_INVALID: &str = "Veuillez choisir un budget dans la liste";
pub const MESSAGE_TOO_LONG: &str = "Le message ne doit pas dépasser 1000 caractères";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern"));
static ANGLE_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>]").expect("valid pattern"));
static SCRIPT_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript:").expect("valid pattern"));
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on\w+=").expect("valid pattern"));

/// Form fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Company,
    Service,
    Budget,
    Message,
}

impl Field {
    /// Longest value accepted at input time, for free-text fields.
    pub fn input_cap(&self) -> Option<usize> {
        match self {
            Field::Name | Field::Email | Field::Company => Some(SHORT_FIELD_MAX),
            Field::Message => Some(MESSAGE_MAX),
            Field::Service | Field::Budget => None,
        }
    }
}

/// Field-scoped validation messages.
pub type FieldErrors = BTreeMap<Field, &'static str>;

/// Raw field state of one lead-capture form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub company: String,
    pub service: String,
    pub budget: String,
    pub message: String,
    /// Never shown to a human.
    pub honeypot: String,
}

impl ContactFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Company => &self.company,
            Field::Service => &self.service,
            Field::Budget => &self.budget,
            Field::Message => &self.message,
        }
    }

    /// Store a value, truncated to the field's input cap.
    pub fn set(&mut self, field: Field, value: &str) {
        let value = match field.input_cap() {
            Some(cap) => value.chars().take(cap).collect(),
            None => value.to_string(),
        };

        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Company => self.company = value,
            Field::Service => self.service = value,
            Field::Budget => self.budget = value,
            Field::Message => self.message = value,
        }
    }

    pub fn honeypot_filled(&self) -> bool {
        !self.honeypot.is_empty()
    }

    /// Sanitized wire copy. Enumerated fields pass through untouched;
    /// empty optionals are omitted.
    pub fn to_request(&self) -> ContactRequest {
        let optional = |value: String| Some(value).filter(|v| !v.is_empty());

        ContactRequest {
            name: Some(sanitize_input(&self.name)),
            email: Some(sanitize_input(&self.email)),
            company: optional(sanitize_input(&self.company)),
            service: Some(self.service.clone()),
            budget: optional(self.budget.clone()),
            message: optional(sanitize_input(&self.message)),
        }
    }
}

/// Strip markup-capable fragments from free text: angle brackets,
/// `javascript:` schemes and inline `on<event>=` handlers, then trim.
pub fn sanitize_input(input: &str) -> String {
    let without_brackets = ANGLE_BRACKETS.replace_all(input, "");
    let without_scheme = SCRIPT_SCHEME.replace_all(&without_brackets, "");
    let without_handlers = EVENT_HANDLER.replace_all(&without_scheme, "");
    without_handlers.trim().to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Validate every field and collect all errors at once.
pub fn validate(fields: &ContactFields) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let name = fields.name.trim();
    if name.is_empty() {
        errors.insert(Field::Name, NAME_REQUIRED);
    } else if name.chars().count() < NAME_MIN {
        errors.insert(Field::Name, NAME_TOO_SHORT);
    }

    let email = fields.email.trim();
    if email.is_empty() {
        errors.insert(Field::Email, EMAIL_REQUIRED);
    } else if !is_valid_email(email) {
        errors.insert(Field::Email, EMAIL_INVALID);
    }

    if !SERVICES.contains(&fields.service.as_str()) {
        errors.insert(Field::Service, SERVICE_REQUIRED);
    }

    if !fields.budget.is_empty() && !BUDGETS.contains(&fields.budget.as_str()) {
        errors.insert(Field::Budget, BUDGET_INVALID);
    }

    if fields.message.chars().count() > MESSAGE_MAX {
        errors.insert(Field::Message, MESSAGE_TOO_LONG);
    }

    errors
}
