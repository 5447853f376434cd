//! Request descriptor extraction.
//!
//! The gate never sees a concrete request type. Hosts implement
//! [`RequestView`] over whatever they carry, and [`extract`] turns that view
//! into an owned [`RequestDescriptor`] for a single check.

use std::borrow::Cow;

/// User agent reported when the request carries none.
pub const UNKNOWN_USER_AGENT: &str = "unknown";

/// Read-only view of the inbound request metadata the gate needs.
pub trait RequestView {
    /// Look a header up by name, ignoring ASCII case. First occurrence wins.
    fn header(&self, name: &str) -> Option<&[u8]>;

    /// Peer address as text.
    fn client_addr(&self) -> Cow<'_, str>;

    /// Request URI (path part).
    fn uri(&self) -> &str;

    fn user_agent(&self) -> Option<&[u8]> {
        self.header("user-agent")
    }
}

/// One forwarded header. `name` is the configured spelling, not the client's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub name: String,
    pub value: Vec<u8>,
}

/// Per-request input of the decision service.
///
/// Client-controlled fields stay raw bytes until encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub user_agent: Vec<u8>,
    pub servername: String,
    pub uri: String,
    pub client_ip: String,
    pub headers: Vec<HeaderPair>,
}

/// Build the descriptor for one check.
///
/// Configured headers missing from the request are skipped; the rest keep
/// the configured order.
pub fn extract<R, S>(req: &R, extract_headers: &[S], servername: &str) -> RequestDescriptor
where
    R: RequestView + ?Sized,
    S: AsRef<str>,
{
    let user_agent = req
        .user_agent()
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| UNKNOWN_USER_AGENT.as_bytes().to_vec());

    let headers = extract_headers
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            req.header(name).map(|value| HeaderPair {
                name: name.to_string(),
                value: value.to_vec(),
            })
        })
        .collect();

    RequestDescriptor {
        user_agent,
        servername: servername.to_string(),
        uri: req.uri().to_string(),
        client_ip: req.client_addr().into_owned(),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRequest {
        headers: Vec<(&'static str, &'static str)>,
    }

    impl RequestView for FakeRequest {
        fn header(&self, name: &str) -> Option<&[u8]> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_bytes())
        }

        fn client_addr(&self) -> Cow<'_, str> {
            Cow::Borrowed("10.0.0.7")
        }

        fn uri(&self) -> &str {
            "/api/v1/items"
        }
    }

    #[test]
    fn missing_user_agent_is_unknown() {
        let req = FakeRequest { headers: vec![] };
        let d = extract(&req, &[] as &[&str], "edge-1");
        assert_eq!(d.user_agent, b"unknown");
        assert_eq!(d.servername, "edge-1");
        assert_eq!(d.uri, "/api/v1/items");
        assert_eq!(d.client_ip, "10.0.0.7");
        assert!(d.headers.is_empty());
    }

    #[test]
    fn present_headers_only_in_configured_order() {
        let req = FakeRequest {
            headers: vec![("x-b", "vb"), ("User-Agent", "curl/8"), ("X-C", "vc")],
        };
        let d = extract(&req, &["X-A", "X-C", "X-B"], "unset");
        assert_eq!(d.user_agent, b"curl/8");
        assert_eq!(
            d.headers,
            vec![
                HeaderPair { name: "X-C".into(), value: b"vc".to_vec() },
                HeaderPair { name: "X-B".into(), value: b"vb".to_vec() },
            ]
        );
    }

    #[test]
    fn first_duplicate_wins() {
        let req = FakeRequest {
            headers: vec![("X-Key", "first"), ("x-key", "second")],
        };
        let d = extract(&req, &["x-KEY"], "unset");
        assert_eq!(d.headers.len(), 1);
        assert_eq!(d.headers[0].name, "x-KEY");
        assert_eq!(d.headers[0].value, b"first");
    }
}
