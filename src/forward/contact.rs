//! Contact forwarding to the transactional email provider.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use super::{classify_send_error, endpoint, ForwardError, InvalidRequest, RequestForwarder};
use crate::observability::metrics;
use crate::protocol::{ContactAck, ContactRequest};

pub const NOT_PROVIDED: &str = "Non renseigné";
pub const NO_MESSAGE: &str = "Aucun message";
pub const CONTACT_SENT: &str = "Message envoyé avec succès.";

/// Template parameters expected by the email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    pub name: String,
    pub email: String,
    pub company: String,
    pub service: String,
    pub budget: String,
    pub message: String,
}

#[derive(Serialize)]
struct EmailSendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a TemplateParams,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Check required fields and map the submission onto template parameters.
pub fn template_params(request: &ContactRequest) -> Result<TemplateParams, InvalidRequest> {
    let name = present(&request.name).ok_or(InvalidRequest::MissingRequiredField("name"))?;
    let email = present(&request.email).ok_or(InvalidRequest::MissingRequiredField("email"))?;
    let service = present(&request.service).ok_or(InvalidRequest::MissingRequiredField("service"))?;

    Ok(TemplateParams {
        name: name.to_string(),
        email: email.to_string(),
        company: present(&request.company).unwrap_or(NOT_PROVIDED).to_string(),
        service: service.to_string(),
        budget: present(&request.budget).unwrap_or(NOT_PROVIDED).to_string(),
        message: present(&request.message).unwrap_or(NO_MESSAGE).to_string(),
    })
}

fn required<'a>(secret: &'a Option<SecretString>, name: &str) -> Result<&'a str, ForwardError> {
    secret
        .as_ref()
        .map(|s| s.expose_secret())
        .ok_or_else(|| ForwardError::Internal(format!("{} not configured", name)))
}

impl RequestForwarder {
    /// Send a lead through the email provider.
    pub async fn forward_contact(&self, request: &ContactRequest) -> Result<ContactAck, ForwardError> {
        let params = template_params(request)?;

        let secrets = &self.secrets;
        let body = EmailSendRequest {
            service_id: required(&secrets.email_service_id, "email service id")?,
            template_id: required(&secrets.email_template_id, "email template id")?,
            user_id: required(&secrets.email_public_key, "email public key")?,
            access_token: secrets.email_private_key.as_ref().map(|s| s.expose_secret()),
            template_params: &params,
        };

        tracing::debug!(service = %params.service, "Forwarding contact submission");

        let response = self
            .client
            .post(endpoint(&self.email.base_url, "/api/v1.0/email/send"))
            .header("origin", &self.email.origin)
            .json(&body)
            .timeout(Duration::from_secs(self.email.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Email provider request failed");
                classify_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(status = status.as_u16(), body = %detail, "Email provider error");
            metrics::record_provider_error("email", status.as_u16());
            return Err(ForwardError::Provider {
                status: status.as_u16(),
            });
        }

        tracing::info!(service = %params.service, "Contact submission delivered");

        Ok(ContactAck {
            success: true,
            message: CONTACT_SENT.to_string(),
        })
    }
}
