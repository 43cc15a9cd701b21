// tcUrl parsing

use std::net::IpAddr;

use url::Url;

use crate::utils::parse_query_string_simple;

use super::RtmpError;

/// Default RTMP port
pub const RTMP_DEFAULT_PORT: u16 = 1935;

/// Default vhost, used when the connect URL does not pin one
pub const DEFAULT_VHOST: &str = "_defaultVhost_";

/// Relevant fields of a parsed tcUrl
pub struct TcUrlInfo {
    /// Host part
    pub host: String,

    /// Port (defaults to 1935)
    pub port: u16,

    /// Derived vhost
    pub vhost: String,
}

/// Parses the tcUrl of a connect command: rtmp://host[:port]/app[?vhost=X&...]
///
/// The vhost is taken from the vhost query parameter when the host is a
/// local address, and from the host name itself otherwise.
///
/// # Arguments
///
/// * `tc_url` - The tcUrl value
///
/// # Return value
///
/// Returns the parsed info, or CommandRejected for URLs no RTMP client sends
pub fn parse_tc_url(tc_url: &str) -> Result<TcUrlInfo, RtmpError> {
    let url = match Url::parse(tc_url) {
        Ok(u) => u,
        Err(_) => {
            return Err(RtmpError::CommandRejected(format!(
                "invalid tcUrl: {}",
                tc_url
            )));
        }
    };

    if url.scheme() != "rtmp" {
        return Err(RtmpError::CommandRejected(format!(
            "unsupported tcUrl scheme: {}",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(h) => h.to_string(),
        None => {
            return Err(RtmpError::CommandRejected(
                "tcUrl has no host".to_string(),
            ));
        }
    };

    let port = url.port().unwrap_or(RTMP_DEFAULT_PORT);

    let vhost = if is_local_host(&host) {
        let query_params = parse_query_string_simple(url.query().unwrap_or(""));

        match query_params.get("vhost") {
            Some(v) if !v.is_empty() => v.clone(),
            _ => DEFAULT_VHOST.to_string(),
        }
    } else {
        host.clone()
    };

    Ok(TcUrlInfo { host, port, vhost })
}

/// Checks if a host refers to the server itself rather than a vhost name
/// IP literals are never vhost names
fn is_local_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    host.parse::<IpAddr>().is_ok()
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tc_url_hostname() {
        let info = parse_tc_url("rtmp://stream.example.com/live").unwrap();

        assert_eq!(info.host, "stream.example.com");
        assert_eq!(info.port, 1935);
        assert_eq!(info.vhost, "stream.example.com");

        let info = parse_tc_url("rtmp://stream.example.com:1936/live").unwrap();

        assert_eq!(info.port, 1936);
    }

    #[test]
    fn test_parse_tc_url_local_with_vhost_param() {
        let info = parse_tc_url("rtmp://127.0.0.1/live?vhost=example.com").unwrap();

        assert_eq!(info.host, "127.0.0.1");
        assert_eq!(info.vhost, "example.com");

        let info = parse_tc_url("rtmp://localhost:1935/live?vhost=a.b&token=x").unwrap();

        assert_eq!(info.vhost, "a.b");
    }

    #[test]
    fn test_parse_tc_url_local_without_vhost_param() {
        let info = parse_tc_url("rtmp://192.168.1.10/live").unwrap();

        assert_eq!(info.vhost, DEFAULT_VHOST);
    }

    #[test]
    fn test_parse_tc_url_invalid() {
        assert!(parse_tc_url("http://example.com/live").is_err());
        assert!(parse_tc_url("not a url").is_err());
    }
}
