//! Send a test message through the configured SMTP server
//!
//! Usage: `send-test-email <recipient>`

use amoura_backend::{config::SmtpConfig, external::EmailClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amoura_backend=debug,send_test_email=info".into()),
        )
        .init();

    let recipient = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: send-test-email <recipient>"))?;

    let smtp = SmtpConfig::load()?;
    tracing::info!(
        host = smtp.host.as_deref().unwrap_or("<unset>"),
        port = smtp.port,
        use_tls = smtp.use_tls,
        use_ssl = smtp.use_ssl,
        "Loaded SMTP settings"
    );

    let client = EmailClient::new(&smtp)?;
    client
        .send_email(
            &recipient,
            "[Amoura] SMTP test",
            "This is a test email from the Amoura backend. If you can read it, SMTP works.",
            Some("<p>This is a test email from the <strong>Amoura</strong> backend.</p><p>If you can read it, SMTP works.</p>"),
        )
        .await?;

    tracing::info!(%recipient, "Test email sent");
    Ok(())
}
