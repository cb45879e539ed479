use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;
use tracing::debug;

use crate::lib::errors::LoginError;

/// TCP listener on `127.0.0.1` with an OS-assigned port.
///
/// Dropping it (or the server it is handed to) closes the socket.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl LoopbackListener {
    /// Bind `127.0.0.1:0`. Failure is fatal for the login attempt; there is no retry.
    pub async fn bind() -> Result<Self, LoginError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|source| LoginError::Bind { source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| LoginError::Bind { source })?;
        debug!(
            target: "stackeye::auth",
            addr = %local_addr,
            "Bound loopback callback listener"
        );
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.listener
    }
}
