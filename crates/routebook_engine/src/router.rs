/* 📖 # Why a Router trait in front of MethodRouter?

The registry only needs to hand a router one binding per route and to ask which paths are
already bound. Anything that offers per-verb binding can receive a service's routes through
`ServiceRegistry::bind_routes`; `MethodRouter` is the small built-in implementation that also
serves requests, so a declared service can run without an external framework.
*/

use routebook_base::RoutebookResult;
use routebook_base::http::{HttpMethod, HttpRequest, HttpResponse, HttpService};
use tracing::debug;

use crate::route::Handler;

/// Binding surface a service's routes are registered into.
pub trait Router {
    fn head(&mut self, path: &str, handler: Handler);
    fn get(&mut self, path: &str, handler: Handler);
    fn post(&mut self, path: &str, handler: Handler);
    fn put(&mut self, path: &str, handler: Handler);
    fn patch(&mut self, path: &str, handler: Handler);
    fn delete(&mut self, path: &str, handler: Handler);

    /// Every bound path, across all methods, in binding order.
    fn bound_paths(&self) -> Vec<String>;

    /// Whether `path` is bound under any method.
    fn has_path(&self, path: &str) -> bool {
        self.bound_paths().iter().any(|bound| bound == path)
    }
}

/// One bound route of a [`MethodRouter`].
#[derive(Debug, Clone)]
pub struct Binding {
    pub method: HttpMethod,
    pub path: String,
    handler: Handler,
}

impl Binding {
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    fn matches_path(&self, request_path: &str) -> bool {
        let mut pattern = self.path.split('/');
        let mut actual = request_path.split('/');
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(expected), Some(segment)) => {
                    if is_placeholder(expected) {
                        if segment.is_empty() {
                            return false;
                        }
                    } else if expected != segment {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

fn is_placeholder(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2)
        || (segment.starts_with(':') && segment.len() > 1)
}

/// A router matching requests by method and path segments.
///
/// `{name}` and `:name` segments match any single non-empty segment. When several bindings
/// match, the earliest one wins.
#[derive(Debug, Clone, Default)]
pub struct MethodRouter {
    bindings: Vec<Binding>,
}

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, method: HttpMethod, path: &str, handler: Handler) {
        debug!(method = %method, path = %path, handler = handler.type_name(), "Binding route");
        self.bindings.push(Binding {
            method,
            path: path.to_string(),
            handler,
        });
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// The handler bound at exactly `path` for `method`, without placeholder matching.
    pub fn binding(&self, method: HttpMethod, path: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|binding| binding.method == method && binding.path == path)
    }
}

impl Router for MethodRouter {
    fn head(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Head, path, handler);
    }

    fn get(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Get, path, handler);
    }

    fn post(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Post, path, handler);
    }

    fn put(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Put, path, handler);
    }

    fn patch(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Patch, path, handler);
    }

    fn delete(&mut self, path: &str, handler: Handler) {
        self.bind(HttpMethod::Delete, path, handler);
    }

    fn bound_paths(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|binding| binding.path.clone())
            .collect()
    }
}

impl HttpService for MethodRouter {
    fn handle_request(&self, request: HttpRequest) -> RoutebookResult<HttpResponse> {
        let method = request.method();
        let path = request.path_without_query().to_string();

        let mut path_known = false;
        for binding in &self.bindings {
            if !binding.matches_path(&path) {
                continue;
            }
            if binding.method == method {
                debug!(method = %method, path = %path, route = %binding.path, "Dispatching request");
                return binding.handler.call(request);
            }
            path_known = true;
        }

        if path_known {
            debug!(method = %method, path = %path, "Method not allowed");
            Ok(HttpResponse::method_not_allowed())
        } else {
            debug!(method = %method, path = %path, "No route found");
            Ok(HttpResponse::not_found())
        }
    }
}
