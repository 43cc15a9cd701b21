// RTMP server

mod config;
mod connection_handle;
mod context;
mod session_id_generator;
mod status;
mod tcp;

use std::sync::Arc;

pub use config::*;
pub use connection_handle::*;
pub use context::*;
pub use session_id_generator::*;
pub use status::*;
pub use tcp::*;

use tokio::sync::Mutex;

use crate::log::Logger;

/// Runs the RTMP server
pub async fn run_server(
    logger: Logger,
    config: Arc<RtmpServerConfiguration>,
    server_status: Arc<Mutex<RtmpServerStatus>>,
) {
    let session_id_generator = Arc::new(Mutex::new(SessionIdGenerator::new()));

    let server_context = RtmpServerContext {
        config,
        status: server_status,
    };

    let (end_notifier_tcp, mut end_receiver_tcp) = tokio::sync::mpsc::channel::<()>(1);

    tcp_server(
        Arc::new(logger.make_child_logger("[SERVER:TCP] ")),
        server_context,
        session_id_generator,
        end_notifier_tcp,
    );

    end_receiver_tcp
        .recv()
        .await
        .expect("could not receive signal from TCP server thread");
}
