use std::fs;
use std::sync::Arc;

use aurora::mapping::{Characteristics, Route, Template};
use aurora::{Application, Assets, Layout, Request, Response, SessionProvider, Views, partial};
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};

struct Fixture {
    _dir: tempfile::TempDir,
    app: Arc<Application>,
}

async fn list(req: Request) -> Response {
    let first = req
        .url_for(&Characteristics::from([("_handler", "show"), ("id", "1")]))
        .unwrap_or_default();
    Response::html(format!(r#"<a href="{first}">first</a>"#))
}

async fn show(req: Request) -> Response {
    Response::html(format!("<p>post {}</p>", req.param("id").unwrap_or("?")))
}

fn fixture(script_name: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");
    let static_dir = dir.path().join("static");
    fs::create_dir_all(&templates).unwrap();
    fs::create_dir_all(static_dir.join("css")).unwrap();
    fs::write(templates.join("layout.html.tera"), "<main>{{ content | safe }}</main>").unwrap();
    fs::write(static_dir.join("css/site.css"), "main{}").unwrap();

    let mut views = Views::new();
    views.add_path(&templates);
    let views = Arc::new(views);
    let layout = Arc::new(Layout::new(Arc::clone(&views)));
    let sessions = Arc::new(SessionProvider::new("test-secret"));
    let mut assets = Assets::new().with_base_path("/static");
    assets.add_path(&static_dir);
    let assets = Arc::new(assets);

    let visits = {
        let sessions = Arc::clone(&sessions);
        move |req: Request| {
            let session = sessions.session(&req);
            let count = session.get("visits").and_then(|v| v.parse::<u32>().ok()).unwrap_or(0) + 1;
            session.insert("visits", count);
            async move { Response::text(count.to_string()) }
        }
    };

    let app = Application::new()
        .with_script_name(script_name)
        .route(assets.rule(), "assets", assets.handler())
        .route(Route::new("/").unwrap(), "list", partial(list))
        .route(Route::new(r"/(?P<id>\d+)").unwrap(), "show", partial(show))
        .route(Template::new("/visits").unwrap(), "visits", visits)
        .on_post_dispatch(Arc::clone(&layout).after_handle())
        .on_post_dispatch(Arc::clone(&sessions).after_handle());

    Fixture { _dir: dir, app: Arc::new(app) }
}

fn get(target: &str) -> Request {
    Request::new(Method::GET, target).with_header(header::HOST, HeaderValue::from_static("blog.test"))
}

#[tokio::test]
async fn partial_handlers_are_wrapped_in_the_layout() {
    let fx = fixture("");
    let res = Arc::clone(&fx.app).handle(get("/7")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.text_body(), "<main><p>post 7</p></main>");
    assert_eq!(res.content_type(), Some("text/html; charset=utf-8"));
}

#[tokio::test]
async fn handlers_build_urls_for_other_handlers() {
    let fx = fixture("");
    let res = Arc::clone(&fx.app).handle(get("/")).await;
    assert_eq!(res.text_body(), r#"<main><a href="http://blog.test/1">first</a></main>"#);
}

#[tokio::test]
async fn unmapped_paths_are_not_found() {
    let fx = fixture("");
    let res = Arc::clone(&fx.app).handle(get("/no/rule/for/me")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert!(res.text_body().contains("Not Found"));
}

#[tokio::test]
async fn not_found_can_be_replaced() {
    let app = Arc::new(
        Application::new().handler(aurora::NOT_FOUND, |_req: Request| async { StatusCode::GONE }),
    );
    let res = app.handle(get("/anything")).await;
    assert_eq!(res.status_code(), StatusCode::GONE);
}

#[tokio::test]
async fn assets_are_served_and_linked() {
    let fx = fixture("");
    let res = Arc::clone(&fx.app).handle(get("/css/site.css")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.content_type(), Some("text/css"));
    assert_eq!(res.body(), b"main{}");

    let url = fx.app.url_for(&get("/"), &Characteristics::from([("_handler", "assets"), ("filename", "/css/site.css")]));
    assert_eq!(url.as_deref(), Some("http://blog.test/static/css/site.css"));
}

#[tokio::test]
async fn sessions_survive_between_requests() {
    let fx = fixture("");
    let first = Arc::clone(&fx.app).handle(get("/visits")).await;
    assert_eq!(first.text_body(), "1");

    let set_cookie = first.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_owned();
    let pair = set_cookie.split(';').next().unwrap().to_owned();

    let again = get("/visits").with_header(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
    let second = Arc::clone(&fx.app).handle(again).await;
    assert_eq!(second.text_body(), "2");
}

#[tokio::test]
async fn pre_dispatch_hooks_see_the_request() {
    let app = Arc::new(
        Application::new()
            .route(Route::new("/").unwrap(), "echo", |req: Request| async move {
                Response::text(req.param("seen").unwrap_or("no").to_owned())
            })
            .on_pre_dispatch(|req| {
                req.params_mut().insert("seen", "yes");
            }),
    );
    assert_eq!(app.handle(get("/")).await.text_body(), "yes");
}

#[tokio::test]
async fn mounted_applications_strip_and_prepend_the_script_name() {
    let fx = fixture("/blog");
    let res = Arc::clone(&fx.app).handle(get("/blog/3")).await;
    assert_eq!(res.text_body(), "<main><p>post 3</p></main>");

    let res = Arc::clone(&fx.app).handle(get("/blog/")).await;
    assert_eq!(res.text_body(), r#"<main><a href="http://blog.test/blog/1">first</a></main>"#);
}

#[tokio::test]
async fn escaped_paths_match_unicode_routes() {
    let app = Arc::new(Application::new().route(
        Route::new(r"/tags/(?P<name>\w+)").unwrap(),
        "tag",
        |req: Request| async move { Response::text(req.param("name").unwrap_or_default().to_owned()) },
    ));
    let res = Arc::clone(&app).handle(get("/tags/caf%C3%A9")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.text_body(), "café");
}

#[tokio::test]
async fn layout_links_follow_the_mount_point() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("layout.html.tera"), "{{ stylesheet | safe }}|{{ content | safe }}").unwrap();
    fs::write(dir.path().join("site.css"), "").unwrap();

    let mut views = Views::new();
    views.add_path(dir.path());
    let mut assets = Assets::new();
    assets.add_path(dir.path());
    let assets = Arc::new(assets);
    let layout = Arc::new(Layout::new(Arc::new(views)).with_context(|req| {
        let mut context = aurora::Context::new();
        let stylesheet = req.url_for(&Characteristics::from([("_handler", "assets"), ("filename", "/site.css")]));
        context.insert("stylesheet".to_owned(), stylesheet.unwrap_or_default().into());
        context
    }));

    let app = Arc::new(
        Application::new()
            .with_script_name("/blog")
            .route(assets.rule(), "assets", assets.handler())
            .route(Route::new("/").unwrap(), "home", partial(|_req: Request| async { "<p>home</p>" }))
            .on_post_dispatch(layout.after_handle()),
    );
    let res = app.handle(get("/blog/")).await;
    assert_eq!(res.text_body(), "http://blog.test/blog/site.css|<p>home</p>");
}
