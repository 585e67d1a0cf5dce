#![allow(dead_code)]

use lumen_router::{
    FilterBinding, FilterMapper, Method, Phase, Priority, RouteFormatError, RouteMapper,
    RouteMatch, RouteTable,
};

pub const GET: &[Method] = &[Method::Get];
pub const POST: &[Method] = &[Method::Post];
pub const GET_POST: &[Method] = &[Method::Get, Method::Post];

pub fn compile(routes: &[(Method, &str, &'static str)]) -> RouteTable<&'static str> {
    mapper(routes)
        .compile()
        .unwrap_or_else(|e| panic!("Failed to compile routes: {e}"))
}

pub fn compile_err(routes: &[(Method, &str, &'static str)]) -> RouteFormatError {
    match mapper(routes).compile() {
        Ok(_) => panic!("Expected compile error for: {routes:?}"),
        Err(e) => e,
    }
}

fn mapper(routes: &[(Method, &str, &'static str)]) -> RouteMapper<&'static str> {
    let mut mapper = RouteMapper::new();
    for (method, pattern, handler) in routes {
        mapper
            .map(*method, pattern, *handler)
            .unwrap_or_else(|e| panic!("Failed to map {method} {pattern}: {e}"));
    }
    mapper
}

pub fn find<'a>(
    table: &'a RouteTable<&'static str>,
    method: Method,
    path: &str,
) -> RouteMatch<'a, &'static str> {
    table
        .lookup(method, path)
        .unwrap_or_else(|e| panic!("Malformed path {path}: {e}"))
        .unwrap_or_else(|| panic!("Expected a route for {method} {path}"))
}

pub fn filters(
    entries: &[(Phase, &str, &[Method], Priority, &'static str)],
) -> FilterMapper<&'static str> {
    let mut mapper = FilterMapper::new();
    for (phase, pattern, methods, priority, handler) in entries {
        mapper
            .add_filter(*phase, pattern, methods, *priority, *handler)
            .unwrap_or_else(|e| panic!("Failed to add filter {pattern}: {e}"));
    }
    mapper
}

pub fn names(bindings: &[&FilterBinding<&'static str>]) -> Vec<&'static str> {
    bindings.iter().map(|b| *b.handler()).collect()
}
