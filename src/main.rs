//! Flipped Tutor - mastery dashboard CLI and server

use flipped_tutor::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for more)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    // Install Rustls crypto provider for HTTPS support
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::warn!("A Rustls crypto provider was already installed; keeping it");
    }

    cli::run().await
}
