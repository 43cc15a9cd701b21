// Server status: the stream source registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::log::Logger;
use crate::rtmp::{RtmpError, SOURCE_CLEANUP_DELAY_SECONDS};
use crate::stream::RtmpStreamSource;

/// Process-wide server status
/// The stream source registry is the only state shared across sessions
pub struct RtmpServerStatus {
    /// Stream sources, by stream key
    pub sources: HashMap<String, Arc<RtmpStreamSource>>,
}

impl RtmpServerStatus {
    /// Creates new RtmpServerStatus
    pub fn new() -> RtmpServerStatus {
        RtmpServerStatus {
            sources: HashMap::new(),
        }
    }

    /// Admits a publisher for a stream key, creating the source if needed
    ///
    /// # Arguments
    ///
    /// * `status` - Server status
    /// * `key` - Stream key
    /// * `session_id` - Session ID of the publishing connection
    ///
    /// # Return value
    ///
    /// Returns the stream source, or StreamBusy when another
    /// session already publishes on the key
    pub async fn get_or_create_for_publisher(
        status: &Mutex<RtmpServerStatus>,
        key: &str,
        session_id: u64,
    ) -> Result<Arc<RtmpStreamSource>, RtmpError> {
        let mut status_v = status.lock().await;

        match status_v.sources.get(key) {
            Some(source) => {
                let source = source.clone();
                drop(status_v);

                source.set_publisher(session_id)?;

                Ok(source)
            }
            None => {
                let source = Arc::new(RtmpStreamSource::new(key.to_string(), session_id));

                status_v.sources.insert(key.to_string(), source.clone());

                Ok(source)
            }
        }
    }

    /// Finds the source for a subscriber
    ///
    /// # Arguments
    ///
    /// * `status` - Server status
    /// * `key` - Stream key
    ///
    /// # Return value
    ///
    /// Returns the stream source, or StreamNotFound when no
    /// publisher ever opened the key
    pub async fn get_for_subscriber(
        status: &Mutex<RtmpServerStatus>,
        key: &str,
    ) -> Result<Arc<RtmpStreamSource>, RtmpError> {
        let status_v = status.lock().await;

        match status_v.sources.get(key) {
            Some(source) => Ok(source.clone()),
            None => Err(RtmpError::StreamNotFound),
        }
    }

    /// Detaches the publisher of a stream key and schedules the
    /// removal of the source
    ///
    /// The source stays registered for the grace period, so a
    /// reconnecting publisher finds its subscribers still attached.
    /// The removal only happens if no publisher came back.
    ///
    /// # Arguments
    ///
    /// * `logger` - The server logger
    /// * `status` - Server status
    /// * `key` - Stream key
    /// * `session_id` - Session ID of the detaching publisher
    pub async fn detach_publisher(
        logger: &Logger,
        status: &Arc<Mutex<RtmpServerStatus>>,
        key: &str,
        session_id: u64,
    ) {
        Self::detach_publisher_with_delay(
            logger,
            status,
            key,
            session_id,
            Duration::from_secs(SOURCE_CLEANUP_DELAY_SECONDS),
        )
        .await;
    }

    /// Detaches the publisher with an explicit cleanup grace period
    pub async fn detach_publisher_with_delay(
        logger: &Logger,
        status: &Arc<Mutex<RtmpServerStatus>>,
        key: &str,
        session_id: u64,
        delay: Duration,
    ) {
        let status_v = status.lock().await;

        let source = match status_v.sources.get(key) {
            Some(source) => source.clone(),
            None => {
                return;
            }
        };

        drop(status_v);

        source.clear_publisher(session_id);

        if logger.config.debug_enabled {
            logger.log_debug(&format!(
                "Publisher detached from {}, cleanup in {} seconds",
                key,
                delay.as_secs()
            ));
        }

        let status_for_task = status.clone();
        let key_for_task = key.to_string();
        let cleanup_logger = logger.make_child_logger("[CLEANUP] ");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut status_v = status_for_task.lock().await;

            let still_idle = match status_v.sources.get(&key_for_task) {
                Some(source) => !source.has_publisher(),
                None => false,
            };

            if still_idle {
                if let Some(source) = status_v.sources.remove(&key_for_task) {
                    drop(status_v);

                    source.close_all_subscribers();

                    cleanup_logger.log_debug(&format!("Removed idle stream: {}", key_for_task));
                }
            }
        });
    }

    /// Removes a subscriber from the source of a stream key
    ///
    /// # Arguments
    ///
    /// * `status` - Server status
    /// * `key` - Stream key
    /// * `addr` - Remote address of the subscriber
    pub async fn remove_subscriber(status: &Mutex<RtmpServerStatus>, key: &str, addr: &str) {
        let status_v = status.lock().await;

        if let Some(source) = status_v.sources.get(key) {
            let source = source.clone();
            drop(status_v);

            source.remove_subscriber(addr);
        }
    }
}

// Tests
