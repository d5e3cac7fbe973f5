//! Template-based view rendering.
//!
//! Templates are looked up by a relative name without the engine extension:
//! `blog/list.html` resolves to the first existing `<dir>/blog/list.html.<ext>`
//! over the registered directories and engine extensions. The remaining
//! extension (`.html`) decides the response content type.
//!
//! [`Tera`](tera) is registered for the `tera` extension out of the box. Other
//! engines plug in through the [`Engine`] trait.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::{debug, error};

use crate::error::Error;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// Template context: named JSON values.
pub type Context = Map<String, Value>;

/// Content type used when the template name has no recognisable extension.
pub const DEFAULT_MIME_TYPE: &str = "text/html";

/// Renders one template file with a context.
pub trait Engine: Send + Sync {
    fn render(&self, file: &Path, context: &Context) -> Result<String, Error>;
}

/// [`Engine`] backed by Tera, with HTML auto-escaping on.
#[derive(Clone, Copy, Debug, Default)]
pub struct TeraEngine;

impl Engine for TeraEngine {
    fn render(&self, file: &Path, context: &Context) -> Result<String, Error> {
        let source = std::fs::read_to_string(file)?;
        let render_err = |source| Error::Render { file: file.to_owned(), source };
        let context = tera::Context::from_value(Value::Object(context.clone())).map_err(render_err)?;
        tera::Tera::one_off(&source, &context, true).map_err(render_err)
    }
}

/// Template rendering service.
pub struct Views {
    paths: Vec<PathBuf>,
    engines: Vec<(String, Arc<dyn Engine>)>,
    defaults: Context,
}

impl Views {
    pub fn new() -> Self {
        let mut views = Self { paths: Vec::new(), engines: Vec::new(), defaults: Context::new() };
        views.add_engine(TeraEngine, &["tera"]);
        views
    }

    /// Registers `engine` for template files ending in any of `extensions`.
    pub fn add_engine(&mut self, engine: impl Engine + 'static, extensions: &[&str]) {
        let engine: Arc<dyn Engine> = Arc::new(engine);
        for ext in extensions {
            match self.engines.iter_mut().find(|(e, _)| e.as_str() == *ext) {
                Some(slot) => slot.1 = Arc::clone(&engine),
                None => self.engines.push(((*ext).to_owned(), Arc::clone(&engine))),
            }
        }
    }

    /// Adds a directory to search for templates. Directories are searched in
    /// the order they were added.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Adds a value every render sees unless its context overrides it.
    pub fn add_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.defaults.insert(key.into(), value.into());
    }

    /// Renders template `name` with the defaults overlaid by `context`.
    pub fn render(&self, name: &str, context: Context) -> Result<String, Error> {
        let mut merged = self.defaults.clone();
        merged.extend(context);

        blocking(|| {
            let (file, engine) = self
                .resolve(name)
                .ok_or_else(|| Error::TemplateNotFound(name.to_owned()))?;
            debug!(template = name, file = %file.display(), "rendering");
            engine.render(&file, &merged)
        })
    }

    /// Renders `name` into a response whose content type is guessed from the
    /// template name. The request is exposed to the template as `request`.
    pub fn render_to_response(&self, req: &Request, name: &str, mut context: Context) -> Result<Response, Error> {
        context.entry("request").or_insert_with(|| request_context(req));
        let body = self.render(name, context)?;
        let content_type = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or(DEFAULT_MIME_TYPE);
        Ok(Response::builder().typed(content_type, body))
    }

    /// A handler that always renders template `name` with `context`.
    pub fn handler_for_template(self: &Arc<Self>, name: &str, context: Context) -> impl Handler + use<> {
        let views = Arc::clone(self);
        let name = name.to_owned();
        move |req: Request| {
            let result = views.render_to_response(&req, &name, context.clone());
            async move {
                result.unwrap_or_else(|err| {
                    error!(error = %err, "template handler failed");
                    Response::status(http::StatusCode::INTERNAL_SERVER_ERROR)
                })
            }
        }
    }

    fn resolve(&self, name: &str) -> Option<(PathBuf, Arc<dyn Engine>)> {
        let relative = normalize(name)?;
        let file_name = relative.file_name()?.to_string_lossy().into_owned();
        for dir in &self.paths {
            for (ext, engine) in &self.engines {
                let file = dir.join(&relative).with_file_name(format!("{file_name}.{ext}"));
                if file.is_file() {
                    return Some((file, Arc::clone(engine)));
                }
            }
        }
        None
    }
}

impl Default for Views {
    fn default() -> Self { Self::new() }
}

/// What templates see of the request being answered.
pub(crate) fn request_context(req: &Request) -> Value {
    json!({
        "path": req.path(),
        "script_name": req.script_name(),
        "application_url": req.application_url(),
        "params": req.params(),
    })
}

/// Runs filesystem work from the request path. On a multi-threaded runtime
/// the worker hands its other tasks off while `f` blocks.
pub(crate) fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => block_in_place(f),
        _ => f(),
    }
}

/// Keeps only the normal components of `name`; `None` if it tries to climb
/// out of the search directory.
pub(crate) fn normalize(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::fs;

    fn views_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Views) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let mut views = Views::new();
        views.add_path(dir.path());
        (dir, views)
    }

    fn ctx(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => Context::new(),
        }
    }

    #[test]
    fn renders_with_defaults_and_context() {
        let (_dir, mut views) = views_with(&[("hello.txt.tera", "{{ greeting }}, {{ name }}!")]);
        views.add_default("greeting", "Hello");
        views.add_default("name", "nobody");
        let out = views.render("hello.txt", ctx(json!({ "name": "Ada" }))).unwrap();
        assert_eq!(out, "Hello, Ada!");
    }

    #[test]
    fn escapes_html() {
        let (_dir, views) = views_with(&[("page.html.tera", "<p>{{ body }}</p>")]);
        let out = views.render("page.html", ctx(json!({ "body": "<script>" }))).unwrap();
        assert_eq!(out, "<p>&lt;script&gt;</p>");
    }

    #[test]
    fn missing_template_is_an_error() {
        let (_dir, views) = views_with(&[]);
        assert!(matches!(
            views.render("nope.html", Context::new()),
            Err(Error::TemplateNotFound(name)) if name == "nope.html"
        ));
    }

    #[test]
    fn parent_components_are_rejected() {
        assert_eq!(normalize("../secret"), None);
        assert_eq!(normalize("/blog/./list.html"), Some(PathBuf::from("blog/list.html")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn renders_on_a_multi_threaded_runtime() {
        let (_dir, views) = views_with(&[("hello.txt.tera", "hi {{ name }}")]);
        let views = Arc::new(views);
        let task = tokio::spawn({
            let views = Arc::clone(&views);
            async move { views.render("hello.txt", ctx(json!({ "name": "Ada" }))) }
        });
        assert_eq!(task.await.unwrap().unwrap(), "hi Ada");
    }

    #[tokio::test]
    async fn renders_on_a_current_thread_runtime() {
        let (_dir, views) = views_with(&[("hello.txt.tera", "hi")]);
        assert_eq!(views.render("hello.txt", Context::new()).unwrap(), "hi");
    }

    #[test]
    fn custom_engines_plug_in() {
        struct Upper;
        impl Engine for Upper {
            fn render(&self, file: &Path, _: &Context) -> Result<String, Error> {
                Ok(fs::read_to_string(file)?.to_uppercase())
            }
        }
        let (_dir, mut views) = views_with(&[("shout.txt.up", "quiet")]);
        views.add_engine(Upper, &["up"]);
        assert_eq!(views.render("shout.txt", Context::new()).unwrap(), "QUIET");
    }

    #[test]
    fn response_content_type_follows_template_name() {
        let (_dir, views) = views_with(&[
            ("data.json.tera", "{\"page\": {{ request.params.page }}}"),
            ("page.tera", "plain"),
        ]);
        let req = Request::new(Method::GET, "/data?page=2");
        let res = views.render_to_response(&req, "data.json", Context::new()).unwrap();
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(res.text_body(), "{\"page\": 2}");

        let res = views.render_to_response(&req, "page", Context::new()).unwrap();
        assert_eq!(res.content_type(), Some(DEFAULT_MIME_TYPE));
    }
}
