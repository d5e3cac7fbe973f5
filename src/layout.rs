//! Two-step view rendering.
//!
//! Handlers wrapped with [`partial`] produce page fragments. [`Layout`],
//! installed as a post-dispatch hook, renders every successful fragment
//! inside a shared page template, so the application's look and feel lives
//! in one file. The fragment reaches the template as `content`; since it is
//! already HTML, print it with `{{ content | safe }}`.

use std::future::Future;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tracing::error;

use crate::handler::Handler;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::views::{Context, Views, request_context};

/// Content type marking a response as a page fragment.
pub const PARTIAL: &str = "x-application/partial";

/// Marks every response of `handler` as a page fragment.
pub fn partial<F, Fut, R>(handler: F) -> impl Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    move |req: Request| {
        let fut = handler(req);
        async move {
            let mut res = fut.await.into_response();
            res.set_content_type(PARTIAL);
            res
        }
    }
}

type ContextFn = Box<dyn Fn(&Request) -> Context + Send + Sync + 'static>;

/// Wraps fragment responses in a page template.
///
/// Besides `content`, the template sees `request` (path, script name,
/// application URL and parameters) and whatever the
/// [`with_context`](Self::with_context) callback adds for the request.
pub struct Layout {
    views: Arc<Views>,
    template_name: String,
    content_type: String,
    status_codes: Vec<StatusCode>,
    context: Option<ContextFn>,
}

impl Layout {
    /// Renders fragments with `layout.html` into `text/html` pages, for
    /// `200 OK` responses only.
    pub fn new(views: Arc<Views>) -> Self {
        Self {
            views,
            template_name: "layout.html".to_owned(),
            content_type: "text/html; charset=utf-8".to_owned(),
            status_codes: vec![StatusCode::OK],
            context: None,
        }
    }

    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = template_name.into();
        self
    }

    pub fn with_status_codes(mut self, status_codes: Vec<StatusCode>) -> Self {
        self.status_codes = status_codes;
        self
    }

    /// Adds per-request values to the layout context, e.g. links built with
    /// [`Request::url_for`].
    pub fn with_context(mut self, context: impl Fn(&Request) -> Context + Send + Sync + 'static) -> Self {
        self.context = Some(Box::new(context));
        self
    }

    /// Renders `res` inside the layout template if it is a fragment with one
    /// of the configured status codes. Leaves every other response alone.
    pub fn post_dispatch(&self, req: &Request, res: &mut Response) {
        let is_partial = res.content_type().is_some_and(|ct| ct.contains(PARTIAL));
        if !is_partial || !self.status_codes.contains(&res.status_code()) {
            return;
        }

        let mut context = self.context.as_ref().map(|f| f(req)).unwrap_or_default();
        context.insert("request".to_owned(), request_context(req));
        context.insert("content".to_owned(), Value::String(res.text_body()));
        match self.views.render(&self.template_name, context) {
            Ok(page) => {
                res.set_body(page);
                res.set_content_type(&self.content_type);
            }
            Err(err) => {
                error!(error = %err, template = %self.template_name, "layout rendering failed");
                *res = Response::status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// A post-dispatch hook calling [`post_dispatch`](Self::post_dispatch).
    pub fn after_handle(self: Arc<Self>) -> impl Fn(&Request, &mut Response) + Send + Sync + 'static {
        move |req, res| self.post_dispatch(req, res)
    }
}
