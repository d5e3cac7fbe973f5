//! Incoming HTTP request type.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue, IntoHeaderName};
use http::{Method, Uri};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::application::Application;
use crate::mapping::Characteristics;
use crate::session::SessionKey;

/// An incoming HTTP request.
///
/// Cloning is cheap: the body is reference counted and clones share the
/// session identity pinned by [`SessionProvider`](crate::SessionProvider).
#[derive(Clone)]
pub struct Request {
    method: Method,
    scheme: Option<String>,
    authority: Option<String>,
    script_name: String,
    path: String,
    params: Characteristics,
    headers: HeaderMap,
    body: Bytes,
    pub(crate) application: Option<Arc<Application>>,
    pub(crate) session: Arc<OnceLock<SessionKey>>,
}

impl Request {
    /// Builds a request for `target` (a path with an optional query string).
    ///
    /// ```rust
    /// use aurora::Request;
    /// use http::Method;
    ///
    /// let req = Request::new(Method::GET, "/posts?page=2");
    /// assert_eq!(req.path(), "/posts");
    /// assert_eq!(req.param("page"), Some("2"));
    /// ```
    pub fn new(method: Method, target: &str) -> Self {
        match target.parse::<Uri>() {
            Ok(uri) => Self::from_uri(method, &uri),
            Err(_) => {
                let (path, query) = target.split_once('?').map_or((target, None), |(p, q)| (p, Some(q)));
                Self::build(method, None, None, path, query)
            }
        }
    }

    fn from_uri(method: Method, uri: &Uri) -> Self {
        let authority = uri.authority().map(|a| a.as_str());
        Self::build(method, uri.scheme_str(), authority, uri.path(), uri.query())
    }

    /// The path is percent-decoded before it is stored; byte sequences that
    /// are not UTF-8 decode to U+FFFD.
    fn build(method: Method, scheme: Option<&str>, authority: Option<&str>, path: &str, query: Option<&str>) -> Self {
        Self {
            method,
            scheme: scheme.map(str::to_owned),
            authority: authority.map(str::to_owned),
            script_name: String::new(),
            path: percent_decode_str(path).decode_utf8_lossy().into_owned(),
            params: query.map(parse_urlencoded).unwrap_or_default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            application: None,
            session: Arc::new(OnceLock::new()),
        }
    }

    pub fn with_header(mut self, name: impl IntoHeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) async fn from_hyper(req: hyper::Request<Incoming>) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        let mut request = Self::from_uri(parts.method, &parts.uri).with_body(body);
        request.headers = parts.headers;
        Ok(request)
    }

    /// Moves `script_name` from the front of the path into
    /// [`script_name`](Self::script_name).
    pub(crate) fn mount(&mut self, script_name: &str) {
        if script_name.is_empty() {
            return;
        }
        if let Some(rest) = self.path.strip_prefix(script_name) {
            if rest.is_empty() || rest.starts_with('/') {
                self.path = if rest.is_empty() { "/".to_owned() } else { rest.to_owned() };
                self.script_name = script_name.to_owned();
            }
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The path relative to the application mount point.
    pub fn path(&self) -> &str { &self.path }

    /// The mount point of the application, empty when mounted at the root.
    pub fn script_name(&self) -> &str { &self.script_name }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named parameter.
    ///
    /// Parameters are the query string plus every characteristic the
    /// application's mapper extracted from the path. For a route
    /// `/(?P<id>\d+)`, `req.param("id")` on `/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Characteristics { &self.params }

    pub fn params_mut(&mut self) -> &mut Characteristics { &mut self.params }

    /// Returns the value of the cookie `name`, if the client sent one.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(cookie::Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == name)
            .map(|c| c.value().to_owned())
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> Characteristics {
        parse_urlencoded_bytes(&self.body)
    }

    /// The absolute URL of the application root, with a trailing slash.
    ///
    /// Honours `x-forwarded-proto` from the fronting proxy. The host comes
    /// from the `host` header, else from the request URI (HTTP/2 sends it as
    /// `:authority`), else defaults to `localhost`.
    pub fn application_url(&self) -> String {
        let scheme = self
            .header("x-forwarded-proto")
            .or(self.scheme.as_deref())
            .unwrap_or("http");
        let host = self
            .header(header::HOST.as_str())
            .or(self.authority.as_deref())
            .unwrap_or("localhost");
        format!("{scheme}://{host}{}/", self.script_name.trim_end_matches('/'))
    }

    /// Builds a URL for `characteristics` with the application that is
    /// handling this request. See [`Application::url_for`].
    pub fn url_for(&self, characteristics: &Characteristics) -> Option<String> {
        self.application.as_ref()?.url_for(self, characteristics)
    }
}

fn parse_urlencoded(query: &str) -> Characteristics {
    parse_urlencoded_bytes(query.as_bytes())
}

fn parse_urlencoded_bytes(input: &[u8]) -> Characteristics {
    form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
