//! # `api`
//!
//! HTTP binding of the CCIP-Read gateway.
//!
//! ## `POST /`
//!
//! Any path accepts a CCIP-Read request.
//!
//! #### Request
//!
//! ```json
//! {
//!     "data": "0x3b3b57de0000000000000000000000000000000000000000000000000000000000000001",
//!     "sender": "0x1111111111111111111111111111111111111111"
//! }
//! ```
//!
//! `sender` is optional. When it is present and an allow-list is configured,
//! it must be one of the allowed addresses.
//!
//! #### Success Response
//!
//! ```json
//! {
//!     "data": "0x0000000000000000000000001111111111111111111111111111111111111111"
//! }
//! ```
//!
//! #### Error Response
//!
//! ```json
//! {
//!     "message": "function 0xdeadbeef not found"
//! }
//! ```
//!
//! ## Status Codes
//!
//! - 400: Malformed body, malformed call data or undecodable arguments
//! - 401: Sender rejected
//! - 404: No handler for the selector
//! - 405: Method other than `POST`
//! - 500: Handler error or handler output that does not match the declared outputs
//!
//! `GET /health` answers `200 ok`.

pub mod accept;

use ccip_gateway_core::Gateway;

use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio_util::sync::CancellationToken;

use hyper_util::rt::TokioIo;
use tokio::net::{
    TcpListener,
    TcpStream,
};

use anyhow::Result;

/// Start the API server
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    max_body_size: usize,
    cancel_token: CancellationToken,
) -> Result<()> {
    // We start a loop to continuously accept incoming connections
    loop {
        tokio::select! {
                () = cancel_token.cancelled() => {
                    tracing::info!("Api received cancellation signal, shutting down...");
                    break;
                }
                res = listener.accept() => {
                    match res {
                        Ok((stream, socketaddr)) => {
                            serve_connection(
                                socketaddr,
                                gateway.clone(),
                                max_body_size,
                                stream,
                            );
                        }
                        Err(err) => {
                            tracing::error!(?err, "Error accepting connection");
                        }
                    }
                }
        }
    }

    Ok(())
}

fn serve_connection(
    socketaddr: SocketAddr,
    gateway: Arc<Gateway>,
    max_body_size: usize,
    stream: TcpStream,
) {
    tracing::debug!("Connection from: {}", socketaddr);

    // Use an adapter to access something implementing `tokio::io` traits as if they implement
    // `hyper::rt` IO traits.
    let io = TokioIo::new(stream);

    // Spawn a tokio task to serve multiple connections concurrently
    tokio::task::spawn(async move {
        crate::accept!(io, gateway, max_body_size, socketaddr);
    });
}

/// Serves one HTTP/1 connection with [`accept::accept_request`].
#[macro_export]
macro_rules! accept {
    (
        $io:expr,
        $gateway:expr,
        $max_body_size:expr,
        $client_addr:expr
    ) => {
        let gateway = $gateway.clone();
        let max_body_size = $max_body_size;
        let client_addr = $client_addr;
        // Bind the incoming connection to our service
        if let Err(err) = hyper::server::conn::http1::Builder::new()
            // `service_fn` converts our function in a `Service`
            .serve_connection(
                $io,
                hyper::service::service_fn(move |req| {
                    let gateway = gateway.clone();
                    async move {
                        $crate::api::accept::accept_request(req, gateway, max_body_size, client_addr)
                            .await
                    }
                }),
            )
            .await
        {
            tracing::error!(?err, "Error serving connection");
        }
    };
}
