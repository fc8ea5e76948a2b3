use crate::domain::models::booking::Booking;
use crate::domain::models::notification::{Actor, NotificationKind};
use crate::domain::ports::NotificationDispatcher;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::error;

pub const NOTIFICATION_TEMPLATE: &str = "notification.html";

const DEFAULT_TEMPLATE: &str = r#"<html><body>
<h2>{{ subject }}</h2>
<p>Booking <strong>{{ booking_id }}</strong>{% if booking_date %} on {{ booking_date }}{% if start_time %} at {{ start_time }}{% endif %}{% endif %}.</p>
<p>Status: {{ creative_status }} / {{ client_status }}</p>
</body></html>"#;

/// Loads the email templates. Fails only if a template does not parse.
pub fn load_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_template(NOTIFICATION_TEMPLATE, DEFAULT_TEMPLATE)
        .map_err(|e| AppError::Internal(format!("Failed to load notification template: {}", e)))?;
    Ok(tera)
}

/// Sends notifications through the mail relay. The relay resolves user ids
/// to addresses.
pub struct HttpEmailDispatcher {
    client: Client,
    api_url: String,
    api_key: String,
    templates: Arc<Tera>,
}

impl HttpEmailDispatcher {
    pub fn new(api_url: String, api_key: String, templates: Arc<Tera>) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            templates,
        }
    }

    fn render(&self, kind: NotificationKind, booking: &Booking) -> Result<String, AppError> {
        let mut ctx = Context::new();
        ctx.insert("subject", kind.subject());
        ctx.insert("booking_id", &booking.id);
        ctx.insert("booking_date", &booking.booking_date.map(|d| d.to_string()));
        ctx.insert("start_time", &booking.start_time.map(|t| t.to_string()));
        ctx.insert("creative_status", booking.creative_status.as_str());
        ctx.insert("client_status", booking.client_status.as_str());

        self.templates.render(NOTIFICATION_TEMPLATE, &ctx)
            .map_err(|e| AppError::ExternalService(format!("Template render failed: {}", e)))
    }
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from_alias: &'a str,
    to_user_id: &'a str,
    subject: &'a str,
    html_body: String,
}

#[async_trait]
impl NotificationDispatcher for HttpEmailDispatcher {
    async fn notify(&self, kind: NotificationKind, booking: &Booking, _actor: &Actor) -> Result<(), AppError> {
        let payload = EmailPayload {
            from_alias: "bookings",
            to_user_id: kind.recipient().user_id(booking),
            subject: kind.subject(),
            html_body: self.render(kind, booking)?,
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Mail service connection error: {}", e);
                error!("{}", msg);
                AppError::ExternalService(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Mail service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::ExternalService(msg));
        }

        Ok(())
    }
}
