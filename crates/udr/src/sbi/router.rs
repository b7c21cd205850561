//! SBI router construction.
//!
//! Endpoints are organised in [`RouteGroup`]s: a path prefix, an ordered
//! pre-handler chain and the `(method, pattern, handler)` entries supplied by
//! the processor. A group is assembled once at startup and consumed into an
//! axum [`Router`]; nothing is added to it after the server starts.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{request::Parts, Method},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use super::{auth::RouterAuthorizationCheck, middleware, response};

/// Path prefix of the Nudr_DR data repository service.
pub const NUDR_DR_PREFIX: &str = "/nudr-dr/v2";

/// Boxed future returned by a route handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Type-erased route handler: takes the request, produces the response.
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Check run before the handlers of a group. Returning `Err` short-circuits
/// the request with that response.
pub trait PreHandler: Send + Sync + 'static {
    fn handle(&self, parts: &Parts) -> Result<(), Response>;
}

/// One endpoint registered by the processor.
#[derive(Clone)]
pub struct Route {
    /// Operation name, used in logs.
    pub name: &'static str,
    pub method: Method,
    /// axum path pattern relative to the group prefix, e.g. `/policy-data/ues/:ueId/am-data`.
    pub pattern: &'static str,
    pub handler: Handler,
}

impl Route {
    pub fn new<F, Fut>(name: &'static str, method: Method, pattern: &'static str, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name,
            method,
            pattern,
            handler: Arc::new(move |req| Box::pin(f(req))),
        }
    }
}

/// Endpoints sharing a path prefix and a pre-handler chain.
pub struct RouteGroup {
    prefix: String,
    pre_handlers: Vec<Arc<dyn PreHandler>>,
    routes: Vec<Route>,
}

impl RouteGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            pre_handlers: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Append a pre-handler; handlers run in the order they are added.
    pub fn pre_handler(mut self, pre: impl PreHandler) -> Self {
        self.pre_handlers.push(Arc::new(pre));
        self
    }

    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Consume the group into a router nested under its prefix.
    ///
    /// When the same `(method, pattern)` is registered twice the first entry
    /// wins and the later one is dropped with a warning.
    pub fn into_router(self) -> Router {
        let mut seen: HashSet<(Method, &'static str)> = HashSet::new();
        let mut by_pattern: HashMap<&'static str, MethodRouter> = HashMap::new();

        for route in self.routes {
            if !seen.insert((route.method.clone(), route.pattern)) {
                warn!(route = route.name, method = %route.method, pattern = route.pattern, "duplicate route ignored");
                continue;
            }
            let filter = match MethodFilter::try_from(route.method.clone()) {
                Ok(f) => f,
                Err(_) => {
                    warn!(route = route.name, method = %route.method, "unsupported method, route ignored");
                    continue;
                }
            };
            let handler = route.handler;
            let method_router = by_pattern
                .remove(route.pattern)
                .unwrap_or_else(MethodRouter::new);
            by_pattern.insert(
                route.pattern,
                method_router.on(filter, move |req: Request| {
                    let handler = handler.clone();
                    async move { handler(req).await }
                }),
            );
        }

        if by_pattern.is_empty() {
            return Router::new();
        }

        let mut group = Router::new();
        for (pattern, method_router) in by_pattern {
            group = group.route(pattern, method_router);
        }

        let chain: Arc<[Arc<dyn PreHandler>]> = self.pre_handlers.into();
        let group = group.route_layer(axum_middleware::from_fn(move |req: Request, next: Next| {
            middleware::run_pre_handlers(chain.clone(), req, next)
        }));

        Router::new().nest(&self.prefix, group)
    }
}

/// Build the UDR router: the data repository group behind `gate`, plus the
/// shared access log, timeout and 404 fallback.
pub fn new_router(gate: RouterAuthorizationCheck, routes: Vec<Route>) -> Router {
    RouteGroup::new(NUDR_DR_PREFIX)
        .pre_handler(gate)
        .routes(routes)
        .into_router()
        .fallback(response::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbi::auth::{AuthError, MockSecurityContext};
    use axum::{
        body::Body,
        extract::OriginalUri,
        http::{header::AUTHORIZATION, StatusCode},
        response::IntoResponse,
    };
    use common::ServiceName;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    const AM_DATA: &str = "/nudr-dr/v2/policy-data/ues/imsi-208930000000001/am-data";

    fn gate(allow: bool) -> RouterAuthorizationCheck {
        let mut ctx = MockSecurityContext::new();
        ctx.expect_authorization_check().returning(move |_, _| {
            if allow {
                Ok(())
            } else {
                Err(AuthError::MissingToken)
            }
        });
        RouterAuthorizationCheck::new(ServiceName::NudrDr, Arc::new(ctx))
    }

    fn counting_route(calls: Arc<AtomicUsize>) -> Route {
        Route::new(
            "QueryAmPolicyData",
            Method::GET,
            "/policy-data/ues/:ueId/am-data",
            move |req: Request| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // nest() strips the group prefix; the original path travels as an extension.
                    req.extensions()
                        .get::<OriginalUri>()
                        .map(|uri| uri.path().to_owned())
                        .unwrap_or_default()
                        .into_response()
                }
            },
        )
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, "Bearer token")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn denied_request_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = new_router(gate(false), vec![counting_route(calls.clone())]);

        let resp = app.oneshot(get(AM_DATA)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allowed_request_reaches_handler_once_with_original_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = new_router(gate(true), vec![counting_route(calls.clone())]);

        let resp = app.oneshot(get(AM_DATA)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], AM_DATA.as_bytes());
    }

    #[tokio::test]
    async fn unknown_route_returns_404_without_authorization() {
        let mut ctx = MockSecurityContext::new();
        ctx.expect_authorization_check().times(0);
        let gate = RouterAuthorizationCheck::new(ServiceName::NudrDr, Arc::new(ctx));
        let app = new_router(gate, vec![counting_route(Arc::new(AtomicUsize::new(0)))]);

        let resp = app.oneshot(get("/unknown")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_not_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = new_router(gate(true), vec![counting_route(calls.clone())]);

        let req = axum::http::Request::builder()
            .method(Method::DELETE)
            .uri(AM_DATA)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct Recorder {
        id: u8,
        reject: bool,
        log: Arc<Mutex<Vec<u8>>>,
    }

    impl PreHandler for Recorder {
        fn handle(&self, _parts: &Parts) -> Result<(), Response> {
            self.log.lock().unwrap().push(self.id);
            if self.reject {
                Err(StatusCode::FORBIDDEN.into_response())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn pre_handlers_run_in_registration_order_and_stop_at_first_rejection() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let recorder = |id, reject| Recorder {
            id,
            reject,
            log: log.clone(),
        };
        let app = RouteGroup::new(NUDR_DR_PREFIX)
            .pre_handler(recorder(1, false))
            .pre_handler(recorder(2, true))
            .pre_handler(recorder(3, false))
            .routes([counting_route(calls.clone())])
            .into_router();

        let resp = app.oneshot(get(AM_DATA)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_registration_wins_on_duplicates() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let app = new_router(
            gate(true),
            vec![counting_route(first.clone()), counting_route(second.clone())],
        );

        let resp = app.oneshot(get(AM_DATA)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_group_only_serves_fallback() {
        let app = new_router(gate(true), Vec::new());
        let resp = app.oneshot(get(AM_DATA)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
