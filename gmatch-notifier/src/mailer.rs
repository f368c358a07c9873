// SMTP mailer

use gmatch_config::EmailSection;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tera::{Context, Tera};
use tracing::{info, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::event::MatchEvent;
use crate::templates;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: Tera,
    from: Mailbox,
    match_url: String,
}

impl Mailer {
    pub fn new(config: &EmailSection) -> NotifyResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotifyError::Config(format!("smtp relay {}: {}", config.smtp_host, e)))?
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        let templates = templates::build_templates()
            .map_err(|e| NotifyError::Config(format!("mail templates: {}", e)))?;

        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| NotifyError::Config(format!("from address {}: {}", config.from_address, e)))?;

        Ok(Self {
            transport,
            templates,
            from,
            match_url: format!("{}/match", config.frontend_url.trim_end_matches('/')),
        })
    }

    pub async fn send(&self, event: &MatchEvent) -> NotifyResult<()> {
        let (subject, text, html) = self.render(event);

        let to: Mailbox = event
            .recipient()
            .parse()
            .map_err(|e| NotifyError::Transport(format!("recipient {}: {}", event.recipient(), e)))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject);

        // Plain-text fallback when the HTML template failed to render.
        let message = match html {
            Some(html) => builder
                .multipart(MultiPart::alternative_plain_html(text, html))
                .map_err(|e| NotifyError::Transport(e.to_string()))?,
            None => builder
                .body(text)
                .map_err(|e| NotifyError::Transport(e.to_string()))?,
        };

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(recipient = event.recipient(), "notification sent");
        Ok(())
    }

    /// Render subject, plain-text body, and (best-effort) HTML body.
    fn render(&self, event: &MatchEvent) -> (&'static str, String, Option<String>) {
        match event {
            MatchEvent::Matched {
                display_name,
                partner_name,
                score,
                ..
            } => {
                let text = templates::matched_text(
                    display_name,
                    partner_name.as_deref(),
                    *score,
                    &self.match_url,
                );

                let mut ctx = Context::new();
                ctx.insert("display_name", display_name);
                ctx.insert("partner_name", partner_name);
                ctx.insert("score", score);
                ctx.insert("match_url", &self.match_url);
                let html = self.render_template("matched.html", &ctx);

                (templates::MATCHED_SUBJECT, text, html)
            }
            MatchEvent::Expired { display_name, .. } => {
                let text = templates::expired_text(display_name, &self.match_url);

                let mut ctx = Context::new();
                ctx.insert("display_name", display_name);
                ctx.insert("match_url", &self.match_url);
                let html = self.render_template("expired.html", &ctx);

                (templates::EXPIRED_SUBJECT, text, html)
            }
        }
    }

    fn render_template(&self, name: &str, ctx: &Context) -> Option<String> {
        match self.templates.render(name, ctx) {
            Ok(html) => Some(html),
            Err(e) => {
                warn!(template = name, error = %e, "template rendering failed, sending plain text only");
                None
            }
        }
    }
}
