use anyhow::Result;
use ccip_gateway_core::Gateway;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct GatewayServer {
    pub listener: TcpListener,
    pub gateway: Arc<Gateway>,
    pub max_body_size: usize,
}

impl GatewayServer {
    /// Run the server until the cancellation token is cancelled.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<()> {
        tracing::info!(
            listen_addr = ?self.listener.local_addr()?,
            functions = self.gateway.methods().count(),
            "Started API server"
        );
        for method in self.gateway.methods() {
            tracing::info!(selector = %method.selector(), %method, "Serving function");
        }

        crate::api::serve(
            self.listener,
            self.gateway,
            self.max_body_size,
            cancel_token,
        )
        .await?;

        tracing::info!("Api stopped.");
        Ok(())
    }
}
