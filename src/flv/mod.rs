// FLV tag utilities

mod tag;

pub use tag::*;
