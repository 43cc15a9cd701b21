// Context types to group parameters

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::RtmpSessionStatus;

/// Session context
#[derive(Clone)]
pub struct SessionContext {
    /// Session ID
    pub id: u64,

    /// Client remote address
    pub addr: SocketAddr,

    /// Session status
    pub status: Arc<Mutex<RtmpSessionStatus>>,
}
