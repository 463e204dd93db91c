//! Per-device HTTP session

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport};

/// Join a device base URL and an absolute path
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// One logical client session against a single modem.
///
/// Owned by whoever drives a poll cycle and lent out as `&mut Session` to the
/// login strategy and the parser in turn. Cookies from every response are
/// merged in; the HNAP PrivateKey lives here between login and parse.
pub struct Session {
    transport: Arc<dyn Transport>,
    cookies: BTreeMap<String, String>,
    private_key: Option<String>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cookies: BTreeMap::new(),
            private_key: None,
        }
    }

    /// Session backed by a fresh reqwest client with the default timeout
    pub fn with_default_transport() -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    /// Send a request with the session's cookies attached, merging `Set-Cookie`
    pub fn send(&mut self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(cookie) = self.cookie_header() {
            request.headers.push(("Cookie".to_string(), cookie));
        }
        let response = self.transport.send(&request)?;
        self.merge_cookies(&response);
        Ok(response)
    }

    pub fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::get(url))
    }

    pub fn post_form(
        &mut self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.send(HttpRequest::post(url, RequestBody::Form(fields)))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn remove_cookie(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    pub fn set_private_key(&mut self, key: String) {
        self.private_key = Some(key);
    }

    pub fn clear_private_key(&mut self) {
        self.private_key = None;
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let header = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }

    fn merge_cookies(&mut self, response: &HttpResponse) {
        for raw in response.set_cookies() {
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    trace!(cookie = %name, "Storing cookie");
                    self.cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://192.168.100.1/", "/HNAP1/"), "http://192.168.100.1/HNAP1/");
        assert_eq!(join_url("http://192.168.100.1", "MotoHome.asp"), "http://192.168.100.1/MotoHome.asp");
    }

    #[test]
    fn test_cookies_round_trip_through_requests() {
        let mock = Arc::new(MockTransport::new());
        mock.push(Ok(HttpResponse::ok("").with_header("Set-Cookie", "sessionId=abc123; Path=/; HttpOnly")));
        mock.push_ok("");

        let mut session = Session::new(mock.clone());
        session.get("http://modem/login").unwrap();
        assert_eq!(session.cookie("sessionId"), Some("abc123"));

        session.set_cookie("uid", "xyz");
        session.get("http://modem/status").unwrap();
        let sent = mock.request(1).unwrap();
        assert_eq!(sent.header("Cookie"), Some("sessionId=abc123; uid=xyz"));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let mut session = Session::new(Arc::new(MockTransport::new()));
        session.set_private_key("SECRETKEY".to_string());
        let debug = format!("{:?}", session);
        assert!(!debug.contains("SECRETKEY"));
        assert!(debug.contains("has_private_key: true"));
    }
}
