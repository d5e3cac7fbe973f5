//! Request handlers.
//!
//! The application keeps handlers of many concrete types in one table keyed
//! by the `_handler` characteristic, so every handler is stored as an
//! `Arc<dyn Handler>` and called through one vtable dispatch per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The boxed future a [`Handler`] resolves to.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Turns a request into a response.
///
/// Implemented for every async function or closure of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Closures capturing shared components (an `Arc<Views>`, an
/// `Arc<SessionProvider>`, ...) qualify as long as they are `Send + Sync`.
/// Types with state of their own can implement it directly:
///
/// ```rust
/// use aurora::{Handler, Request, Response, ResponseFuture};
///
/// struct Greeting(String);
///
/// impl Handler for Greeting {
///     fn call(&self, _req: Request) -> ResponseFuture {
///         let body = self.0.clone();
///         Box::pin(async move { Response::text(body) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> ResponseFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn call(&self, req: Request) -> ResponseFuture {
        let fut = self(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// A handler as stored in the application's dispatch table.
pub(crate) type SharedHandler = Arc<dyn Handler>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    struct Fixed(StatusCode);

    impl Handler for Fixed {
        fn call(&self, _req: Request) -> ResponseFuture {
            let status = self.0;
            Box::pin(async move { Response::status(status) })
        }
    }

    #[tokio::test]
    async fn functions_and_types_share_one_table() {
        async fn hello(_req: Request) -> &'static str {
            "hello"
        }

        let table: Vec<SharedHandler> = vec![Arc::new(hello), Arc::new(Fixed(StatusCode::ACCEPTED))];
        let hello = table[0].call(Request::new(Method::GET, "/")).await;
        assert_eq!(hello.text_body(), "hello");
        let fixed = table[1].call(Request::new(Method::GET, "/")).await;
        assert_eq!(fixed.status_code(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn results_convert_both_ways() {
        let handler = |req: Request| async move {
            match req.param("ok") {
                Some(_) => Ok("fine"),
                None => Err(StatusCode::BAD_REQUEST),
            }
        };
        let ok = Handler::call(&handler, Request::new(Method::GET, "/?ok=1")).await;
        assert_eq!(ok.status_code(), StatusCode::OK);
        let err = Handler::call(&handler, Request::new(Method::GET, "/")).await;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
