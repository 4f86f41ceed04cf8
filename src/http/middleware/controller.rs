//! Terminal middleware adapting plain async handlers.
//!
//! A controller sees only the decoded body and path parameters and returns an
//! envelope. The envelope's `code` becomes the HTTP status. Errors are left to
//! the dispatcher.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::http::middleware::{Middleware, Next};
use crate::http::request::RequestContext;
use crate::http::response::{Envelope, ResponseWriter};
use crate::routing::Params;

/// What a controller gets to see of the request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub body: Value,
    pub params: Params,
}

impl From<&RequestContext> for HttpRequest {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            body: ctx.body.clone(),
            params: ctx.params.clone(),
        }
    }
}

/// Middleware wrapper around an async handler function.
pub struct Controller<F, T> {
    handler: F,
    _result: PhantomData<fn() -> T>,
}

impl<F, Fut, T> Middleware for Controller<F, T>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Envelope<T>>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseWriter,
        _next: Next<'a>,
    ) -> BoxFuture<'a, Result<()>> {
        let fut = (self.handler)(HttpRequest::from(&*req));
        Box::pin(async move {
            let envelope = fut.await?;
            res.send(&envelope)
        })
    }
}

/// Wrap `handler` as the terminal stage of a route.
pub fn controller<F, Fut, T>(handler: F) -> Arc<dyn Middleware>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope<T>>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    Arc::new(Controller {
        handler,
        _result: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::routing::Method;
    use axum::http::{HeaderMap, StatusCode};
    use serde_json::json;

    fn context() -> RequestContext {
        let mut params = Params::new();
        params.insert("id".into(), "42".into());
        RequestContext {
            method: Method::Post,
            path: "/users/42".into(),
            headers: HeaderMap::new(),
            params,
            body: json!({"name": "ana"}),
            client_key: "127.0.0.1".into(),
        }
    }

    #[tokio::test]
    async fn test_controller_writes_envelope() {
        let stage = controller(|req: HttpRequest| async move {
            Ok(Envelope::success(
                201,
                json!({"id": req.params["id"], "name": req.body["name"]}),
            ))
        });

        let chain = vec![stage];
        let mut req = context();
        let mut res = ResponseWriter::new();
        Next::new(&chain).run(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status_code(), StatusCode::CREATED);
        let body: Value = serde_json::from_slice(res.body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"success": true, "code": 201, "error": "", "result": {"id": "42", "name": "ana"}})
        );
    }

    #[tokio::test]
    async fn test_controller_error_propagates() {
        let stage = controller(|_req: HttpRequest| async move {
            Err::<Envelope<()>, _>(AppError::not_found("User not found"))
        });

        let chain = vec![stage];
        let mut req = context();
        let mut res = ResponseWriter::new();
        let err = Next::new(&chain).run(&mut req, &mut res).await.unwrap_err();

        assert_eq!(err.message(), "User not found");
        assert!(!res.is_written());
    }
}
