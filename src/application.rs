//! The web application: path mapping plus named handler dispatch.
//!
//! Every request goes through the same steps:
//!
//! 1. the request path is matched against the application [`Mapper`];
//! 2. the `_handler` characteristic names the handler to run, every other
//!    characteristic is merged into the request parameters;
//! 3. pre-dispatch hooks see the request, the handler produces a response,
//!    post-dispatch hooks see both.
//!
//! A [`DefaultRule`] tagged `_handler = "not_found"` is registered first, so
//! any path no other rule claims lands on the not-found handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::handler::{Handler, SharedHandler};
use crate::mapping::{Characteristics, DefaultRule, Mapper, Rule};
use crate::request::Request;
use crate::response::Response;

/// Characteristic naming the handler a rule dispatches to.
pub const HANDLER: &str = "_handler";

/// Name of the fallback handler for unmapped paths.
pub const NOT_FOUND: &str = "not_found";

type PreDispatch = Box<dyn Fn(&mut Request) + Send + Sync + 'static>;
type PostDispatch = Box<dyn Fn(&Request, &mut Response) + Send + Sync + 'static>;

/// A web application built from rules and the handlers they name.
///
/// Build it once at startup, then hand it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain:
///
/// ```rust
/// use aurora::mapping::Route;
/// use aurora::{Application, Request, Response};
///
/// async fn list_posts(_: Request) -> Response { Response::text("posts") }
/// async fn show_post(req: Request) -> Response {
///     Response::text(format!("post {}", req.param("id").unwrap_or("?")))
/// }
///
/// let app = Application::new()
///     .route(Route::new("/").unwrap(), "list_posts", list_posts)
///     .route(Route::new(r"/(?P<id>\d+)").unwrap(), "show_post", show_post);
/// ```
pub struct Application {
    mapper: Mapper,
    handlers: HashMap<String, SharedHandler>,
    pre_dispatch: Vec<PreDispatch>,
    post_dispatch: Vec<PostDispatch>,
    script_name: String,
}

impl Application {
    pub fn new() -> Self {
        let mut app = Self {
            mapper: Mapper::new(),
            handlers: HashMap::new(),
            pre_dispatch: Vec::new(),
            post_dispatch: Vec::new(),
            script_name: String::new(),
        };
        app.mapper.add_rule(DefaultRule, Characteristics::new().with(HANDLER, NOT_FOUND));
        app.handlers.insert(NOT_FOUND.to_owned(), Arc::new(not_found));
        app
    }

    /// Mounts the application below `script_name` (e.g. `/blog`). The prefix
    /// is stripped from incoming paths and prepended to generated URLs.
    pub fn with_script_name(mut self, script_name: &str) -> Self {
        self.script_name = script_name.trim_end_matches('/').to_owned();
        self
    }

    /// Registers `rule` to dispatch to `handler`, stored under `name`.
    ///
    /// `name` doubles as the `_handler` characteristic used to build URLs
    /// for this rule with [`url_for`](Self::url_for).
    pub fn route(self, rule: impl Rule + 'static, name: &str, handler: impl Handler) -> Self {
        self.rule(rule, Characteristics::new().with(HANDLER, name))
            .handler(name, handler)
    }

    /// Registers a rule with arbitrary metadata. The metadata should carry a
    /// `_handler` entry naming a registered handler.
    pub fn rule(mut self, rule: impl Rule + 'static, metadata: Characteristics) -> Self {
        self.mapper.add_rule(rule, metadata);
        self
    }

    /// Registers `handler` under `name`, replacing any previous one.
    /// Registering [`NOT_FOUND`] replaces the fallback handler.
    pub fn handler(mut self, name: &str, handler: impl Handler) -> Self {
        self.handlers.insert(name.to_owned(), Arc::new(handler));
        self
    }

    /// Runs `hook` after the path is mapped and before the handler is invoked.
    pub fn on_pre_dispatch(mut self, hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.pre_dispatch.push(Box::new(hook));
        self
    }

    /// Runs `hook` on every response before it is sent.
    pub fn on_post_dispatch(
        mut self,
        hook: impl Fn(&Request, &mut Response) + Send + Sync + 'static,
    ) -> Self {
        self.post_dispatch.push(Box::new(hook));
        self
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Builds an absolute URL for `characteristics`.
    ///
    /// The mapper assembles a path, which is resolved below the application
    /// URL of `req`. An assembled URL with a host of its own (an asset on a
    /// CDN, say) is returned unchanged. `None` if no rule can assemble the
    /// characteristics.
    pub fn url_for(&self, req: &Request, characteristics: &Characteristics) -> Option<String> {
        let path = self.mapper.assemble(characteristics)?;
        if Url::parse(&path).is_ok_and(|url| url.has_host()) {
            return Some(path);
        }
        let base = Url::parse(&req.application_url()).ok()?;
        // `./` keeps a colon in the first segment from reading as a scheme.
        let relative = if path.starts_with("//") {
            path
        } else {
            format!("./{}", path.trim_start_matches('/'))
        };
        base.join(&relative).ok().map(String::from)
    }

    /// Dispatches one request and produces one response.
    pub async fn handle(self: Arc<Self>, mut req: Request) -> Response {
        req.mount(&self.script_name);

        let mut chars = self.mapper.match_path(req.path()).unwrap_or_default();
        let name = chars.remove(HANDLER).unwrap_or_else(|| NOT_FOUND.to_owned());
        let handler = match self.handlers.get(&name) {
            Some(handler) => Arc::clone(handler),
            None => {
                warn!(handler = %name, path = req.path(), "no handler registered under this name");
                match self.handlers.get(NOT_FOUND) {
                    Some(handler) => Arc::clone(handler),
                    None => return Response::status(StatusCode::NOT_FOUND),
                }
            }
        };
        debug!(method = %req.method(), path = req.path(), handler = %name, "dispatching");

        req.params_mut().extend(chars);
        for hook in &self.pre_dispatch {
            hook(&mut req);
        }

        req.application = Some(Arc::clone(&self));
        let seen = req.clone();
        let mut res = handler.call(req).await;

        for hook in &self.post_dispatch {
            hook(&seen, &mut res);
        }
        res
    }
}

impl Default for Application {
    fn default() -> Self { Self::new() }
}

/// Fallback handler for requests no rule maps.
async fn not_found(_req: Request) -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).html(
        "<html>\n  <body>\n    <h1>Not Found</h1>\n    \
         <p>The requested path is not found on this server.</p>\n  </body>\n</html>\n",
    )
}
