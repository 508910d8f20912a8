use async_trait::async_trait;

/// Out-of-band notification sender. The reset flow only needs
/// fire-and-forget delivery; implementations pick the transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn password_reset_requested(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default wiring when no delivery transport is configured: log the event.
/// The raw token only appears at debug level.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn password_reset_requested(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(email = %email, "password reset requested; no delivery transport configured");
        tracing::debug!(token = %token, "password reset token");
        Ok(())
    }
}
