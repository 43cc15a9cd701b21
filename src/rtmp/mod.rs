// RTMP protocol utilities

mod chunk;
mod command;
mod constants;
mod data;
mod error;
mod handshake;
mod messages;
mod packet;
mod tc_url;

pub use chunk::*;
pub use command::*;
pub use constants::*;
pub use data::*;
pub use error::*;
pub use handshake::*;
pub use messages::*;
pub use packet::*;
pub use tc_url::*;
