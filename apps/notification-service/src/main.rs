//! Notification Service Entry Point

use core_config::tracing::install_color_eyre;
use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    notification_service::run().await
}
