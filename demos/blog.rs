//! A tiny blog: list, show and compose posts.
//!
//! Run from the crate root with:
//!   RUST_LOG=aurora=debug,blog=info cargo run --example blog
//!
//! The configuration is read from `demos/blog/aurora.toml`; pass another path
//! as the first argument to override it. Then open http://localhost:8008/.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use aurora::mapping::{Characteristics, Route};
use aurora::{
    Application, Assets, Config, Context, Error, Layout, Request, Response, Server,
    SessionProvider, Views, partial,
};
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Serialize)]
struct Post {
    id: usize,
    title: String,
    body: String,
}

/// Everything the blog handlers share.
struct Blog {
    posts: Mutex<Vec<Post>>,
    views: Arc<Views>,
    sessions: Arc<SessionProvider>,
}

impl Blog {
    fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, title: String, body: String) -> usize {
        let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        let id = posts.len() + 1;
        posts.push(Post { id, title, body });
        id
    }

    fn list(&self, req: Request) -> Result<Response, Error> {
        let flash = self.sessions.session(&req).remove("flash");
        let posts: Vec<Value> = self
            .posts()
            .into_iter()
            .rev()
            .map(|post| {
                let url = req.url_for(&link("show", post.id));
                json!({ "title": post.title, "url": url })
            })
            .collect();
        let context = context(json!({
            "posts": posts,
            "flash": flash,
            "compose_url": req.url_for(&Characteristics::from([("_handler", "compose")])),
        }));
        self.views.render_to_response(&req, "blog/list.html", context)
    }

    fn show(&self, req: Request) -> Result<Response, Error> {
        let post = req
            .param("id")
            .and_then(|id| id.parse::<usize>().ok())
            .and_then(|id| self.posts().into_iter().find(|post| post.id == id));
        let Some(post) = post else {
            return Ok(Response::status(StatusCode::NOT_FOUND));
        };
        let context = context(json!({
            "post": post,
            "list_url": req.url_for(&Characteristics::from([("_handler", "list")])),
        }));
        self.views.render_to_response(&req, "blog/show.html", context)
    }

    fn compose(&self, req: Request) -> Result<Response, Error> {
        if req.method() == Method::POST {
            let form = req.form();
            let title = form.get("title").unwrap_or_default().trim().to_owned();
            let body = form.get("body").unwrap_or_default().trim().to_owned();
            if !title.is_empty() && !body.is_empty() {
                let id = self.publish(title, body);
                info!(id, "post published");
                self.sessions.session(&req).insert("flash", "Your post was published.");
                let location = req.url_for(&link("show", id)).unwrap_or_else(|| "/".to_owned());
                return Ok(Response::redirect(&location));
            }
            warn!("rejected a post without a title or body");
        }
        self.views.render_to_response(&req, "blog/form.html", Context::new())
    }
}

fn link(handler: &str, id: usize) -> Characteristics {
    Characteristics::new().with("_handler", handler).with("id", id)
}

fn context(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        _ => Context::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/blog/aurora.toml"));
    let config = Config::load(&path).unwrap_or_else(|err| {
        warn!(path = %path.display(), "using default configuration: {err}");
        Config::default()
    });

    let assets = Arc::new(Assets::from(&config.assets));
    let views = Arc::new(Views::from(&config.views));
    let sessions = Arc::new(SessionProvider::from(&config.session));
    let layout = Arc::new(Layout::new(Arc::clone(&views)).with_context(|req| {
        let stylesheet = Characteristics::new().with("_handler", "assets").with("filename", "/css/blog.css");
        context(json!({ "stylesheet": req.url_for(&stylesheet) }))
    }));

    let blog = Arc::new(Blog {
        posts: Mutex::new(Vec::new()),
        views,
        sessions: Arc::clone(&sessions),
    });
    blog.publish("Hello".to_owned(), "The first post on this blog.".to_owned());

    let list = {
        let blog = Arc::clone(&blog);
        move |req: Request| std::future::ready(blog.list(req))
    };
    let show = {
        let blog = Arc::clone(&blog);
        move |req: Request| std::future::ready(blog.show(req))
    };
    let compose = {
        let blog = Arc::clone(&blog);
        move |req: Request| std::future::ready(blog.compose(req))
    };

    let app = Application::new()
        .with_script_name(&config.script_name)
        .route(assets.rule(), "assets", assets.handler())
        .route(Route::new("/")?, "list", partial(list))
        .route(Route::new(r"/(?P<id>\d+)")?, "show", partial(show))
        .route(Route::new("/compose")?, "compose", partial(compose))
        .on_post_dispatch(layout.after_handle())
        .on_post_dispatch(sessions.after_handle());

    Server::bind(&config.bind_address)?.serve(app).await
}
