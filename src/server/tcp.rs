// TCP server

use std::sync::Arc;

use tokio::{
    net::TcpListener,
    sync::{mpsc::Sender, Mutex},
};

use crate::log::Logger;

use super::{handle_connection, RtmpServerContext, SessionIdGenerator};

/// Run the TCP server
pub fn tcp_server(
    logger: Arc<Logger>,
    server_context: RtmpServerContext,
    session_id_generator: Arc<Mutex<SessionIdGenerator>>,
    end_notifier: Sender<()>,
) {
    tokio::spawn(async move {
        let listen_addr = server_context.config.get_tcp_listen_addr();

        // Create listener
        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {}", e));
                end_notifier
                    .send(())
                    .await
                    .expect("failed to notify to main thread");
                return;
            }
        };

        logger.log_info(&format!("Listening on {}", listen_addr));

        loop {
            let accept_res = listener.accept().await;

            match accept_res {
                Ok((connection, addr)) => {
                    // Handle connection
                    let context = server_context.clone();
                    let generator = session_id_generator.clone();
                    let conn_logger = logger.clone();

                    tokio::spawn(async move {
                        handle_connection(conn_logger, context, generator, connection, addr).await;
                    });
                }
                Err(e) => {
                    logger.log_error(&format!("Could not accept connection: {}", e));
                    end_notifier
                        .send(())
                        .await
                        .expect("failed to notify to main thread");
                    return;
                }
            }
        }
    });
}
