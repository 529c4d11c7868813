//! SMTP email delivery
//!
//! Outgoing mail for order notifications. The transport mode follows the
//! SMTP settings: implicit TLS, STARTTLS, or plain.

use std::{sync::Arc, time::Duration};

use lettre::{
    message::{header, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use shared::OrderDetail;

use crate::config::SmtpConfig;
use crate::error::{AppError, AppResult};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP client for outgoing mail
#[derive(Clone)]
pub struct EmailClient {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailClient {
    /// Build a client from SMTP settings.
    ///
    /// Returns `Ok(None)` when SMTP is not configured at all and an error when
    /// it is only partly configured.
    pub fn from_config(config: &SmtpConfig) -> AppResult<Option<Self>> {
        if config.host.is_none() && config.username.is_none() && config.password.is_none() {
            return Ok(None);
        }
        Self::new(config).map(Some)
    }

    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let (host, username, password) = match (&config.host, &config.username, &config.password) {
            (Some(host), Some(username), Some(password)) => (host, username, password),
            _ => {
                return Err(AppError::Configuration(
                    "SMTP is not configured correctly. Set SMTP_HOST, SMTP_USERNAME and SMTP_PASSWORD."
                        .to_string(),
                ))
            }
        };

        let builder = if config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| AppError::Configuration(format!("Invalid SMTP host: {}", e)))?
        } else if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Configuration(format!("Invalid SMTP host: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        let from = sender_mailbox(config)?;

        Ok(Self {
            transport: Arc::new(transport),
            from,
        })
    }

    /// Send a plain-text email with an optional HTML alternative
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::validation("email", format!("Invalid recipient email: {}", e)))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject);

        let message = match html_body {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            ),
            None => builder
                .header(header::ContentType::TEXT_PLAIN)
                .body(text_body.to_string()),
        }
        .map_err(|e| AppError::Email(format!("Failed to build email: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!("Failed to send email to {}: {}", to, e);
            AppError::Email(format!("SMTP error: {}", e))
        })?;

        tracing::info!("Email sent to {}", to);
        Ok(())
    }

    /// Tell the customer their order has been confirmed
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        customer_name: &str,
        order: &OrderDetail,
    ) -> AppResult<()> {
        let email = order_confirmation_email(customer_name, order);
        self.send_email(to, &email.subject, &email.text, Some(&email.html))
            .await
    }
}

/// `"{from_name} <{from_email}>"`, falling back to the username as address
fn sender_mailbox(config: &SmtpConfig) -> AppResult<Mailbox> {
    let address = config
        .from_email
        .as_ref()
        .or(config.username.as_ref())
        .ok_or_else(|| AppError::Configuration("SMTP_FROM_EMAIL is not set".to_string()))?;

    format!("{} <{}>", config.from_name, address)
        .parse()
        .map_err(|e| AppError::Configuration(format!("Invalid sender address: {}", e)))
}

/// Rendered email content
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

pub fn order_confirmation_email(customer_name: &str, order: &OrderDetail) -> RenderedEmail {
    let short_id: String = order.order.id.to_string().chars().take(8).collect();
    let subject = format!("[Amoura] Your order #{} is confirmed", short_id);

    let mut text = format!(
        "Hi {},\n\nYour order #{} has been confirmed.\nDelivery: {} ({})\nAddress: {}, {}, {}\n\n",
        customer_name,
        short_id,
        order.order.delivery_date,
        order.order.delivery_window.as_str(),
        order.order.full_address,
        order.order.ward,
        order.order.province,
    );
    let mut rows = String::new();

    for line in &order.items {
        let name = line.item.product_name.as_deref().unwrap_or("Item");
        text.push_str(&format!(
            "- {} x{}: {}\n",
            name,
            line.item.quantity,
            money(line.line_total)
        ));
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(name),
            line.item.quantity,
            money(line.line_total)
        ));
    }

    text.push_str(&format!(
        "\nSubtotal: {}\nTax: {}\nTotal: {}\n\nThank you for ordering from Amoura!\n",
        money(order.subtotal),
        money(order.tax_amount),
        money(order.order.total_amount)
    ));

    let html = format!(
        "<h2>Your order #{id} is confirmed</h2>\
         <p>Hi {name},</p>\
         <p>Delivery on <b>{date}</b> ({window}) to {address}, {ward}, {province}.</p>\
         <table><tr><th>Item</th><th>Qty</th><th>Total</th></tr>{rows}</table>\
         <p>Subtotal: {subtotal}<br/>Tax: {tax}<br/><b>Total: {total}</b></p>\
         <p>Thank you for ordering from Amoura!</p>",
        id = short_id,
        name = escape_html(customer_name),
        date = order.order.delivery_date,
        window = order.order.delivery_window.as_str(),
        address = escape_html(&order.order.full_address),
        ward = escape_html(&order.order.ward),
        province = escape_html(&order.order.province),
        rows = rows,
        subtotal = money(order.subtotal),
        tax = money(order.tax_amount),
        total = money(order.order.total_amount),
    );

    RenderedEmail { subject, text, html }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
