// Server context passed to every session

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{RtmpServerConfiguration, RtmpServerStatus};

/// Server context: configuration plus the shared stream registry
#[derive(Clone)]
pub struct RtmpServerContext {
    /// Server configuration
    pub config: Arc<RtmpServerConfiguration>,

    /// Server status
    pub status: Arc<Mutex<RtmpServerStatus>>,
}
