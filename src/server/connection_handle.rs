// Connection handling logic

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
};

use crate::{
    log::Logger,
    session::{handle_rtmp_session, RtmpSessionStatus, SessionContext},
};

use super::{RtmpServerContext, SessionIdGenerator};

/// Handles incoming connection (after accepting it)
///
/// # Arguments
///
/// * `logger` - The server logger
/// * `server_context` - The server context
/// * `session_id_generator` - Generator for session IDs
/// * `connection` - The TCP connection
/// * `addr` - The client remote address
pub async fn handle_connection(
    logger: Arc<Logger>,
    server_context: RtmpServerContext,
    session_id_generator: Arc<Mutex<SessionIdGenerator>>,
    connection: TcpStream,
    addr: SocketAddr,
) {
    // Generate an unique ID for the session
    let mut session_id_generator_v = session_id_generator.as_ref().lock().await;
    let session_id = (*session_id_generator_v).generate_id();
    drop(session_id_generator_v);

    // Create a logger for the session
    let session_logger = Arc::new(
        logger
            .as_ref()
            .make_child_logger(&format!("[#{}] ", session_id)),
    );

    // Log request
    if server_context.config.log_requests {
        session_logger.log_info(&format!("Connection accepted from {}", addr));
    }

    // Create status for the session
    let session_status = Arc::new(Mutex::new(RtmpSessionStatus::new()));

    let session_context = SessionContext {
        id: session_id,
        addr,
        status: session_status,
    };

    // Split the connection for concurrent reads and writes
    let (read_stream, write_stream) = tokio::io::split(connection);
    let write_stream = Arc::new(Mutex::new(write_stream));

    // Handle session
    handle_rtmp_session(
        &session_logger,
        server_context,
        session_context,
        read_stream,
        &write_stream,
    )
    .await;

    // Ensure connection is closed
    let mut write_stream_v = write_stream.lock().await;
    let _ = write_stream_v.shutdown().await;
}
