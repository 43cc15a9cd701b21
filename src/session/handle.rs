// Logic to handle RTMP sessions

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    time::timeout,
};

use crate::{
    log::Logger,
    rtmp::{generate_s0_s1_s2, RtmpError, RTMP_SIG_SIZE, RTMP_VERSION},
    server::{RtmpServerConfiguration, RtmpServerContext},
};

use super::{
    do_session_cleanup, handle_rtmp_message, read_rtmp_message, session_write_bytes,
    RtmpSessionReadStatus, SessionContext,
};

/// Handles RTMP session: handshake, then the chunk read loop
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `read_stream` - IO stream to read bytes
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_session<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Arc<Logger>,
    server_context: RtmpServerContext,
    session_context: SessionContext,
    mut read_stream: TR,
    write_stream: &Arc<Mutex<TW>>,
) {
    // Handshake

    if let Err(e) = do_handshake(
        &mut read_stream,
        write_stream,
        &server_context.config,
        logger,
    )
    .await
    {
        if server_context.config.log_requests {
            logger.log_error(&format!("BAD HANDSHAKE: {}", e));
        }

        return;
    }

    if server_context.config.log_requests && logger.config.debug_enabled {
        logger.log_debug("Handshake completed");
    }

    // Chunk read loop

    let mut read_status = RtmpSessionReadStatus::new();

    loop {
        let message = match read_rtmp_message(
            &mut read_stream,
            write_stream.as_ref(),
            &mut read_status,
            logger,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                if server_context.config.log_requests {
                    if e.is_peer_closed() {
                        if logger.config.debug_enabled {
                            logger.log_debug("Connection closed by peer");
                        }
                    } else {
                        logger.log_error(&format!("Chunk read error: {}", e));
                    }
                }

                break;
            }
        };

        if let Err(e) = handle_rtmp_message(
            logger,
            &server_context,
            &session_context,
            message,
            &mut read_status,
            write_stream,
        )
        .await
        {
            if server_context.config.log_requests {
                match &e {
                    RtmpError::StreamBusy | RtmpError::StreamNotFound => {
                        logger.log_info(&format!("Session ended: {}", e));
                    }
                    _ => {
                        logger.log_error(&format!("Session error: {}", e));
                    }
                }
            }

            break;
        }
    }

    // Cleanup

    do_session_cleanup(logger, &server_context, &session_context).await;
}

/// Performs the server side of the RTMP handshake
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes
/// * `write_stream` - IO stream to write bytes
/// * `config` - Server configuration
/// * `logger` - Session logger
async fn do_handshake<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    read_stream: &mut TR,
    write_stream: &Mutex<TW>,
    config: &RtmpServerConfiguration,
    logger: &Logger,
) -> Result<(), RtmpError> {
    let timeout_duration = Duration::from_secs(config.handshake_timeout_seconds as u64);

    // Read C0 + C1

    let mut c0c1 = vec![0u8; 1 + RTMP_SIG_SIZE];

    match timeout(timeout_duration, read_stream.read_exact(&mut c0c1)).await {
        Ok(r) => {
            r.map_err(RtmpError::from_io)?;
        }
        Err(_) => {
            return Err(RtmpError::HandshakeFailed(
                "timed out reading C0 + C1".to_string(),
            ));
        }
    }

    let version = c0c1[0];

    if version != RTMP_VERSION {
        return Err(RtmpError::UnsupportedVersion(version));
    }

    // Write S0 + S1 + S2

    let response = generate_s0_s1_s2(&c0c1[1..], logger)?;

    session_write_bytes(write_stream, &response)
        .await
        .map_err(RtmpError::from_io)?;

    // Read C2 (contents not validated)

    let mut c2 = vec![0u8; RTMP_SIG_SIZE];

    match timeout(timeout_duration, read_stream.read_exact(&mut c2)).await {
        Ok(r) => {
            r.map_err(RtmpError::from_io)?;
        }
        Err(_) => {
            return Err(RtmpError::HandshakeFailed(
                "timed out reading C2".to_string(),
            ));
        }
    }

    Ok(())
}

// Tests
