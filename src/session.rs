//! Cookie-identified server-side sessions.
//!
//! The browser only ever holds an opaque id followed by its signature; the session
//! data lives in an in-memory cache owned by the [`SessionProvider`]. The
//! signature is the leading 8 hex digits of HMAC-SHA256 over the id, so a
//! client cannot forge somebody else's id without the secret.
//!
//! The in-memory cache is local to one process. Applications running several
//! instances behind a load balancer need sticky sessions. Entries untouched
//! for longer than the cookie max age are pruned whenever a session is
//! looked up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cookie::Cookie;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::request::Request;
use crate::response::Response;

type HmacSha256 = Hmac<Sha256>;
type Cache = HashMap<String, Entry>;

const ID_LEN: usize = 8;

/// One session's data and the last time a request looked it up.
struct Entry {
    data: HashMap<String, String>,
    touched: Instant,
}

impl Entry {
    fn new() -> Self {
        Self { data: HashMap::new(), touched: Instant::now() }
    }
}

/// The session identity pinned on a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SessionKey {
    id: String,
    signature: String,
}

/// Provides state on top of HTTP.
///
/// Share it behind an `Arc`: handlers call [`session`](Self::session), and
/// [`after_handle`](Self::after_handle) installed as a post-dispatch hook
/// writes the cookie back.
///
/// ```rust
/// use std::sync::Arc;
/// use aurora::{Application, SessionProvider};
///
/// let sessions = Arc::new(SessionProvider::new("s3cret"));
/// let app = Application::new().on_post_dispatch(Arc::clone(&sessions).after_handle());
/// ```
pub struct SessionProvider {
    secret: String,
    cookie_name: String,
    max_age: i64,
    cache: Arc<Mutex<Cache>>,
}

impl SessionProvider {
    /// An empty `secret` is replaced by a random one, so cookies can never
    /// be signed with an empty key. Sessions then do not survive a restart.
    pub fn new(secret: impl Into<String>) -> Self {
        let mut secret = secret.into();
        if secret.is_empty() {
            warn!("empty session secret, signing cookies with a random per-process key");
            secret = hex::encode(rand::random::<[u8; 32]>());
        }
        Self {
            secret,
            cookie_name: "aurora-sid".to_owned(),
            max_age: 3300,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Browser cookie lifetime, in seconds.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Returns the session of `req`, creating it on first access.
    pub fn session(&self, req: &Request) -> Session {
        let key = self.key(req);
        let ttl = Duration::from_secs(u64::try_from(self.max_age).unwrap_or(0));
        let mut cache = self.lock();
        cache.retain(|_, entry| entry.touched.elapsed() < ttl);
        cache.entry(key.id.clone()).or_insert_with(Entry::new).touched = Instant::now();
        Session { id: key.id, cache: Arc::clone(&self.cache) }
    }

    /// Sends the session cookie when the session holds data. An empty session
    /// is dropped from the cache and no cookie is sent.
    pub fn persist_session(&self, req: &Request, res: &mut Response) {
        let key = self.key(req);
        let mut cache = self.lock();
        match cache.get(&key.id).map(|entry| entry.data.is_empty()) {
            Some(false) => {
                let path = match req.script_name() {
                    "" => "/".to_owned(),
                    script_name => script_name.to_owned(),
                };
                let cookie = Cookie::build((self.cookie_name.clone(), format!("{}{}", key.id, key.signature)))
                    .max_age(cookie::time::Duration::seconds(self.max_age))
                    .path(path)
                    .build();
                res.set_cookie(&cookie);
            }
            Some(true) => {
                cache.remove(&key.id);
            }
            None => {}
        }
    }

    /// A post-dispatch hook calling [`persist_session`](Self::persist_session).
    pub fn after_handle(self: Arc<Self>) -> impl Fn(&Request, &mut Response) + Send + Sync + 'static {
        move |req, res| self.persist_session(req, res)
    }

    /// The identity of `req`: pinned on the request after the first call so
    /// a handler and the post-dispatch hook agree on it.
    fn key(&self, req: &Request) -> SessionKey {
        req.session
            .get_or_init(|| self.read_cookie(req).unwrap_or_else(|| self.generate()))
            .clone()
    }

    fn read_cookie(&self, req: &Request) -> Option<SessionKey> {
        let value = req.cookie(&self.cookie_name)?;
        if value.len() != 2 * ID_LEN || !value.is_char_boundary(ID_LEN) {
            return None;
        }
        let (id, signature) = value.split_at(ID_LEN);
        if signature != self.sign(id) {
            debug!(cookie = %self.cookie_name, "discarding session cookie with a bad signature");
            return None;
        }
        Some(SessionKey { id: id.to_owned(), signature: signature.to_owned() })
    }

    fn generate(&self) -> SessionKey {
        let id = hex::encode(rand::random::<[u8; ID_LEN / 2]>());
        let signature = self.sign(&id);
        SessionKey { id, signature }
    }

    fn sign(&self, id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(id.as_bytes());
        let mut digest = hex::encode(mac.finalize().into_bytes());
        digest.truncate(ID_LEN);
        digest
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A handle on one session's data.
#[derive(Clone)]
pub struct Session {
    id: String,
    cache: Arc<Mutex<Cache>>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(&self.id)?.data.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.lock()
            .entry(self.id.clone())
            .or_insert_with(Entry::new)
            .data
            .insert(key.into(), value.to_string())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().get_mut(&self.id)?.data.remove(key)
    }

    pub fn clear(&self) {
        if let Some(entry) = self.lock().get_mut(&self.id) {
            entry.data.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().get(&self.id).is_none_or(|entry| entry.data.is_empty())
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
