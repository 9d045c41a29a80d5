use crate::configuration::EmailClientSettings;
use crate::error::EmailError;
use crate::validators::is_valid_email;
use serde::Serialize;

/// Posts transactional mail as JSON to `{base_url}/email`.
#[derive(Clone, Debug)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
    app_base_url: String,
}

#[derive(Clone, Debug)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let email =
            is_valid_email(s).map_err(|e| EmailError::InvalidRecipient(e.to_string()))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Html")]
    html: &'a str,
}

impl EmailClient {
    /// `app_base_url` is the public URL of this service, used in mail links.
    pub fn from_settings(
        settings: &EmailClientSettings,
        app_base_url: &str,
    ) -> Result<Self, EmailError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            sender: SenderEmail::parse(&settings.sender_email)?,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: self.sender.inner(),
            to: recipient,
            subject,
            html: html_content,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }

    pub async fn send_verification_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.verification_link(token);
        let html = format!(
            "Welcome to Alpha Creator!<br />\
             Click <a href=\"{}\">here</a> to verify your email address.",
            link
        );
        self.send_email(recipient, "Verify your email", &html).await
    }

    pub async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.password_reset_link(token);
        let html = format!(
            "A password reset was requested for your account.<br />\
             Click <a href=\"{}\">here</a> to choose a new password. \
             The link expires in one hour.",
            link
        );
        self.send_email(recipient, "Reset your password", &html).await
    }

    fn verification_link(&self, token: &str) -> String {
        format!("{}/api/v1/auth/verify-email?token={}", self.app_base_url, token)
    }

    fn password_reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.app_base_url, token)
    }
}
