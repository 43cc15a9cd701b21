// Media packet model

mod packet;

pub use packet::*;
