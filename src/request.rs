//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;

/// An incoming HTTP request, as handed to handlers.
///
/// The server fills it from the wire. Tests and other integrations build one
/// with [`Request::new`] and the `with_*` methods.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) id: Option<String>,
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) body: Bytes,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            remote_addr: None,
            body: Bytes::new(),
        }
    }

    /// Sets the traceability identifier assigned by request-id middleware.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> Option<&str> { self.id.as_deref() }
    pub fn method(&self) -> &str { &self.method }
    /// Path and query exactly as requested.
    pub fn url(&self) -> &str { &self.url }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The client address: first `x-forwarded-for` hop, else the peer IP.
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self.header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        match forwarded {
            Some(ip) => Some(ip.to_owned()),
            None => self.remote_addr.map(|addr| addr.ip().to_string()),
        }
    }
}
