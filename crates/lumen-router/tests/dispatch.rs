//! Tests for request dispatch through filters, routes and error handlers.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use lumen_router::{
    Dispatcher, ErrorClass, Filter, FilterMapper, FilterOutcome, Handler, HttpError, Method,
    Priority, Request, Response, RouteMapper, error_handler, handler,
};

/// Records every hook call as `name:phase:params:wildcards`.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn entry(&self, phase: &str, req: &Request) -> String {
        let mut params: Vec<_> = req.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        params.sort();
        format!(
            "{}:{phase}:{}:{}",
            self.name,
            params.join(","),
            req.wildcards.join("/")
        )
    }
}

impl Filter for Recorder {
    fn before<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Result<FilterOutcome, HttpError>> {
        Box::pin(async move {
            let entry = self.entry("before", req);
            self.log.lock().unwrap().push(entry);
            Ok(FilterOutcome::Continue)
        })
    }

    fn after<'a>(
        &'a self,
        req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, Result<Response, HttpError>> {
        Box::pin(async move {
            let entry = self.entry("after", req);
            self.log.lock().unwrap().push(entry);
            Ok(res)
        })
    }
}

/// Halts every request without a token.
struct RequireToken;

impl Filter for RequireToken {
    fn before<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Result<FilterOutcome, HttpError>> {
        Box::pin(async move {
            match req.get_header("Authorization") {
                Some("secret") => Ok(FilterOutcome::Continue),
                Some(_) => Err(HttpError::not_authorized("bad token")),
                None => Ok(FilterOutcome::Halt(Response::error(401))),
            }
        })
    }
}

/// Panics in whichever hook it is registered for.
struct Explode;

impl Filter for Explode {
    fn before<'a>(&'a self, _req: &'a mut Request) -> BoxFuture<'a, Result<FilterOutcome, HttpError>> {
        panic!("before-filter exploded")
    }

    fn after<'a>(
        &'a self,
        _req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, Result<Response, HttpError>> {
        Box::pin(async move {
            if true {
                panic!("after-filter exploded");
            }
            Ok(res)
        })
    }
}

/// Relies on both default hooks.
struct Passthrough;

impl Filter for Passthrough {}

/// Tags every response with a header.
struct Tag;

impl Filter for Tag {
    fn after<'a>(
        &'a self,
        _req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, Result<Response, HttpError>> {
        Box::pin(async move { Ok(res.header("X-Tag", "seen")) })
    }
}

fn dispatcher(log: &Arc<Mutex<Vec<String>>>) -> Dispatcher {
    let mut routes = RouteMapper::new();
    routes
        .map(
            Method::Get,
            "/u/:username",
            handler(|req: Request| async move {
                let name = req.params.get_str("username").unwrap_or_default().to_string();
                Ok(Response::text(format!("hello {name}")))
            }),
        )
        .unwrap();
    routes
        .map(
            Method::Get,
            "/files/*",
            handler(|req: Request| async move { Ok(Response::text(req.wildcards.join("/"))) }),
        )
        .unwrap();
    routes
        .map(
            Method::Post,
            "/u",
            handler(|_req: Request| async move { Err(HttpError::bad_request("missing name")) }),
        )
        .unwrap();
    routes
        .map(
            Method::Get,
            "/admin/panel",
            handler(|_req: Request| async move { Ok(Response::text("admin")) }),
        )
        .unwrap();
    routes
        .map(
            Method::Get,
            "/boom",
            handler(|_req: Request| async move {
                if true {
                    panic!("handler exploded");
                }
                Ok(Response::ok())
            }),
        )
        .unwrap();

    let mut filters: FilterMapper<Arc<dyn Filter>> = FilterMapper::new();
    let recorder = |name| -> Arc<dyn Filter> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
        })
    };
    filters
        .add_filter_before("/*", &[], Priority::LOW, recorder("outer"))
        .unwrap();
    filters
        .add_filter_before("/:section/*", &[], Priority::HIGH, recorder("section"))
        .unwrap();
    filters
        .add_filter_after("/*", &[], Priority::NORMAL, recorder("outer"))
        .unwrap();
    filters
        .add_filter_before("/admin/*", &[], Priority::HIGHEST, Arc::new(RequireToken))
        .unwrap();
    filters
        .add_filter_after("/*", &[], Priority::LOWEST, Arc::new(Tag))
        .unwrap();

    Dispatcher::new(routes.compile().unwrap(), filters)
}

#[tokio::test]
async fn dispatch_runs_filters_around_route() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log);

    let res = dispatcher.handle(Request::get("/u/bob")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string().as_deref(), Some("hello bob"));
    assert_eq!(res.get_header("X-Tag"), Some("seen"));

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "section:before:section=u:bob",
            "outer:before::u/bob",
            "outer:after::u/bob",
        ]
    );
}

#[tokio::test]
async fn dispatch_exposes_route_wildcards() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log);

    let res = dispatcher.handle(Request::get("/files/a/b.txt")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string().as_deref(), Some("a/b.txt"));
}

#[tokio::test]
async fn dispatch_not_found_and_method_not_allowed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log);

    let res = dispatcher.handle(Request::get("/nowhere")).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.get_header("X-Tag"), Some("seen"));

    let res = dispatcher
        .handle(Request::new(Method::Delete, "/u/bob"))
        .await;
    assert_eq!(res.status, 405);
    assert_eq!(res.get_header("Allow"), Some("GET"));
}

#[tokio::test]
async fn dispatch_malformed_path() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log);

    let res = dispatcher.handle(Request::get("/u//bob")).await;
    assert_eq!(res.status, 400);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_halt_skips_route_but_not_after_filters() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log);

    let res = dispatcher.handle(Request::get("/admin/panel")).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.get_header("X-Tag"), Some("seen"));
    assert_eq!(*log.lock().unwrap(), vec!["outer:after::admin/panel"]);

    let res = dispatcher
        .handle(Request::get("/admin/panel").header("Authorization", "secret"))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string().as_deref(), Some("admin"));
}

#[tokio::test]
async fn dispatch_errors_use_nearest_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = dispatcher(&log)
        .with_error_handler(
            ErrorClass::Recoverable,
            error_handler(|e| Response::json(&serde_json::json!({ "error": e.message })).status(e.status())),
        )
        .unwrap()
        .with_error_handler(
            ErrorClass::Fatal,
            error_handler(|_| Response::text("sorry").status(500)),
        )
        .unwrap();

    let res = dispatcher.handle(Request::post("/u")).await;
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body_string().as_deref(),
        Some(r#"{"error":"missing name"}"#)
    );

    let res = dispatcher
        .handle(Request::get("/admin/panel").header("Authorization", "wrong"))
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.get_header("Content-Type"), Some("application/json"));

    let res = dispatcher.handle(Request::get("/boom")).await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body_string().as_deref(), Some("sorry"));
}

#[tokio::test]
async fn dispatch_rejects_duplicate_error_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let result = dispatcher(&log)
        .with_error_handler(ErrorClass::Any, error_handler(|_| Response::error(500)))
        .and_then(|d| d.with_error_handler(ErrorClass::Any, error_handler(|_| Response::error(500))));
    assert!(result.is_err());
}

#[tokio::test]
async fn dispatch_catches_panic_before_handler_future_exists() {
    let mut routes = RouteMapper::new();
    let explode: Handler = Arc::new(|_req: Request| -> BoxFuture<'static, Result<Response, HttpError>> {
        panic!("handler exploded before returning a future")
    });
    routes.map(Method::Get, "/eager", explode).unwrap();

    let mut filters: FilterMapper<Arc<dyn Filter>> = FilterMapper::new();
    filters
        .add_filter_after("/*", &[], Priority::LOWEST, Arc::new(Tag))
        .unwrap();
    let dispatcher = Dispatcher::new(routes.compile().unwrap(), filters);

    let res = dispatcher.handle(Request::get("/eager")).await;
    assert_eq!(res.status, 500);
    assert_eq!(res.get_header("X-Tag"), Some("seen"));
}

#[tokio::test]
async fn dispatch_catches_panicking_filters() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut routes = RouteMapper::new();
    let hits = Arc::clone(&log);
    routes
        .map(
            Method::Get,
            "/a",
            handler(move |_req: Request| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.lock().unwrap().push("route".to_string());
                    Ok(Response::ok())
                }
            }),
        )
        .unwrap();
    routes
        .map(
            Method::Get,
            "/b",
            handler(|_req: Request| async move { Ok(Response::text("b")) }),
        )
        .unwrap();

    let mut filters: FilterMapper<Arc<dyn Filter>> = FilterMapper::new();
    filters
        .add_filter_before("/a", &[], Priority::NORMAL, Arc::new(Explode))
        .unwrap();
    filters
        .add_filter_after("/a", &[], Priority::NORMAL, Arc::new(Tag))
        .unwrap();
    filters
        .add_filter_after("/b", &[], Priority::HIGH, Arc::new(Explode))
        .unwrap();
    filters
        .add_filter_after("/b", &[], Priority::LOW, Arc::new(Tag))
        .unwrap();
    let dispatcher = Dispatcher::new(routes.compile().unwrap(), filters)
        .with_error_handler(
            ErrorClass::Panic,
            error_handler(|e| Response::text(e.message.clone()).status(e.status())),
        )
        .unwrap();

    let res = dispatcher.handle(Request::get("/a")).await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body_string().as_deref(), Some("before-filter for /a panicked"));
    assert_eq!(res.get_header("X-Tag"), Some("seen"));
    assert!(log.lock().unwrap().is_empty());

    let res = dispatcher.handle(Request::get("/b")).await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body_string().as_deref(), Some("after-filter for /b panicked"));
    assert_eq!(res.get_header("X-Tag"), Some("seen"));
}

#[tokio::test]
async fn dispatch_default_hooks_pass_through() {
    let mut routes = RouteMapper::new();
    routes
        .map(
            Method::Get,
            "/u/:username",
            handler(|req: Request| async move {
                let name = req.params.get_str("username").unwrap_or_default().to_string();
                Ok(Response::text(name).status(201))
            }),
        )
        .unwrap();

    let mut filters: FilterMapper<Arc<dyn Filter>> = FilterMapper::new();
    filters
        .add_filter_before("/*", &[], Priority::NORMAL, Arc::new(Passthrough))
        .unwrap();
    filters
        .add_filter_after("/*", &[], Priority::NORMAL, Arc::new(Passthrough))
        .unwrap();
    let dispatcher = Dispatcher::new(routes.compile().unwrap(), filters);

    let res = dispatcher.handle(Request::get("/u/bob")).await;
    assert_eq!(res.status, 201);
    assert_eq!(res.body_string().as_deref(), Some("bob"));
}
