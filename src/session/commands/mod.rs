// RTMP command handlers

mod connect;
mod create_stream;
mod delete_stream;
mod play;
mod publish;

pub use connect::*;
pub use create_stream::*;
pub use delete_stream::*;
pub use play::*;
pub use publish::*;
