/* 📖 # Why declare routes once?

A route carries both what the router needs (method, path, handler) and what a reader needs
(docs, parameters, media types, samples, error codes). routebook_engine keeps the two in a
single `Route`, assembled by a `RouteBuilder` and collected in a `ServiceRegistry`. The
registry derives the dispatch table, and the renderer derives Markdown and JSON documentation,
from the same list, so documentation cannot drift from what is actually served.
*/

pub mod config;
pub mod parameter;
pub mod render;
pub mod route;
pub mod route_builder;
pub mod router;
pub mod service;

pub use config::{ServeConfig, load_config, parse_config};
pub use parameter::{Parameter, ParameterData, ParameterKind};
pub use render::{json_document, json_routes, markdown, write_markdown};
pub use route::{Handler, ResponseError, Route, RouteDoc, Sample};
pub use route_builder::{RouteBuilder, concat_path, normalize_indentation};
pub use router::{Binding, MethodRouter, Router};
pub use service::ServiceRegistry;
