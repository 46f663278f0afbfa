/* 📖 # Why does the registry inject /md, /jsondoc and /health itself?

Every service declared through routebook can describe itself. When the dispatch table is built,
the registry binds three GET endpoints under its root: the Markdown documentation, the JSON
route list and a liveness check. A service that declares its own route at one of those paths
keeps it; the implicit endpoint is only added where the router has nothing bound yet.

The implicit handlers render from a snapshot of the registry taken when the table is built.
Routes registered afterwards show up only in a dispatch table built later.
*/

use std::sync::Arc;

use routebook_base::RoutebookResult;
use routebook_base::http::{HttpMethod, HttpResponse};
use tracing::{debug, warn};

use crate::render;
use crate::route::{Handler, Route};
use crate::route_builder::{RouteBuilder, concat_path, normalize_indentation};
use crate::router::{MethodRouter, Router};

/// A set of routes sharing a root path and service documentation.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    root_path: String,
    routes: Vec<Route>,
    documentation: String,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            root_path: "/".to_string(),
            routes: Vec::new(),
            documentation: String::new(),
        }
    }

    /// Sets the root path every route of this service is relative to.
    ///
    /// Routes registered before the call keep their old prefix.
    pub fn path(&mut self, root: impl Into<String>) -> &mut Self {
        let root = root.into();
        if !self.routes.is_empty() {
            warn!(
                old_root = %self.root_path,
                new_root = %root,
                routes = self.routes.len(),
                "Root path changed after routes were registered"
            );
        }
        self.root_path = root;
        self
    }

    /// Sets the service documentation. Indentation after newlines is removed.
    pub fn doc(&mut self, documentation: &str) -> &mut Self {
        self.documentation = normalize_indentation(documentation);
        self
    }

    /// Starts a route with the given method under this service's root.
    pub fn method(&self, method: impl Into<String>, sub_path: &str) -> RouteBuilder {
        RouteBuilder::new()
            .root_path(self.root_path.as_str())
            .method(method)
            .path(sub_path)
    }

    pub fn head(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Head, sub_path)
    }

    pub fn get(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Get, sub_path)
    }

    pub fn post(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Post, sub_path)
    }

    pub fn put(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Put, sub_path)
    }

    pub fn patch(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Patch, sub_path)
    }

    pub fn delete(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Delete, sub_path)
    }

    /// OPTIONS routes are documented but never bound by [`ServiceRegistry::bind_routes`].
    pub fn options(&self, sub_path: &str) -> RouteBuilder {
        self.method(HttpMethod::Options, sub_path)
    }

    /// Builds the route and appends it to this service.
    ///
    /// # Panics
    /// If the builder has no handler, see [`RouteBuilder::build`].
    pub fn route(&mut self, builder: RouteBuilder) -> &mut Self {
        let route = builder.root_path(self.root_path.as_str()).build();
        self.push(route);
        self
    }

    /// Like [`ServiceRegistry::route`], returning the missing handler error instead of panicking.
    pub fn try_route(&mut self, builder: RouteBuilder) -> RoutebookResult<&mut Self> {
        let route = builder.root_path(self.root_path.as_str()).try_build()?;
        self.push(route);
        Ok(self)
    }

    fn push(&mut self, route: Route) {
        debug!(
            method = %route.method(),
            path = %route.path(),
            operation = %route.operation(),
            "Registered route"
        );
        self.routes.push(route);
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    /// Binds every route into `router`, then the implicit documentation and health endpoints.
    ///
    /// Routes whose method is not HEAD, GET, POST, PUT, PATCH or DELETE are skipped.
    pub fn bind_routes<R: Router + ?Sized>(&self, router: &mut R) {
        for route in &self.routes {
            let handler = route.handler().clone();
            match route.method() {
                "HEAD" => router.head(route.path(), handler),
                "GET" => router.get(route.path(), handler),
                "POST" => router.post(route.path(), handler),
                "PUT" => router.put(route.path(), handler),
                "PATCH" => router.patch(route.path(), handler),
                "DELETE" => router.delete(route.path(), handler),
                other => {
                    debug!(method = %other, path = %route.path(), "Skipping route with unsupported method");
                }
            }
        }

        let snapshot = Arc::new(self.clone());
        for (sub_path, handler) in implicit_handlers(snapshot) {
            let path = concat_path(&self.root_path, sub_path);
            if router.has_path(&path) {
                debug!(path = %path, "Path already bound, skipping implicit endpoint");
            } else {
                debug!(path = %path, "Adding implicit endpoint");
                router.get(&path, handler);
            }
        }
    }

    /// A fresh [`MethodRouter`] with all routes of this service bound.
    pub fn dispatch_table(&self) -> MethodRouter {
        let mut router = MethodRouter::new();
        self.bind_routes(&mut router);
        router
    }
}

fn implicit_handlers(snapshot: Arc<ServiceRegistry>) -> [(&'static str, Handler); 3] {
    let markdown_service = Arc::clone(&snapshot);
    let json_service = snapshot;
    [
        (
            "md",
            Handler::new(move |_request| {
                Ok(HttpResponse::markdown(render::markdown(&markdown_service)))
            }),
        ),
        (
            "jsondoc",
            Handler::new(move |_request| {
                Ok(HttpResponse::json(render::json_document(&json_service)))
            }),
        ),
        (
            "health",
            Handler::new(|_request| Ok(HttpResponse::text("OK"))),
        ),
    ]
}
