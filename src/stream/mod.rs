// Stream relay primitives

mod cache;
mod queue;
mod source;
mod subscriber;

pub use cache::*;
pub use queue::*;
pub use source::*;
pub use subscriber::*;

/// Builds the registry key of a stream
pub fn gen_stream_key(vhost: &str, app: &str, stream: &str) -> String {
    format!("{}/{}/{}", vhost, app, stream)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_stream_key() {
        assert_eq!(
            gen_stream_key("_defaultVhost_", "live", "cam1"),
            "_defaultVhost_/live/cam1"
        );
    }
}
