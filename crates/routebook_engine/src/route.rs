/* 📖 # Why is a Route immutable?

A Route is produced once by `RouteBuilder::build` and then shared by the dispatch table, the
documentation endpoints and any number of request threads. Nothing mutates it after the build,
so every read is lock free. All derived documentation views (`code_format`, `reads`, `writes`)
are pure functions of the stored fields.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use routebook_base::RoutebookResult;
use routebook_base::http::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::parameter::Parameter;

type HandlerFn = dyn Fn(HttpRequest) -> RoutebookResult<HttpResponse> + Send + Sync;

/// A request handler bound to a route.
///
/// Cloning is cheap; clones share the same function.
#[derive(Clone)]
pub struct Handler {
    type_name: &'static str,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(HttpRequest) -> RoutebookResult<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<F>(),
            func: Arc::new(func),
        }
    }

    /// Invoke the handler.
    pub fn call(&self, request: HttpRequest) -> RoutebookResult<HttpResponse> {
        (self.func)(request)
    }

    /// The Rust type name of the wrapped function.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// A label derived from the handler's type name: generics and closure markers are dropped
    /// and the last path segment is kept (`widgets::create_widget` -> `create_widget`).
    pub fn operation_name(&self) -> String {
        let without_generics = self.type_name.split('<').next().unwrap_or(self.type_name);
        without_generics
            .rsplit("::")
            .find(|segment| !segment.is_empty() && *segment != "{{closure}}")
            .unwrap_or(without_generics)
            .to_string()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.type_name).finish()
    }
}

/// An example payload attached to a route for documentation.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// The sample serialized to a JSON string.
    Text(String),
    /// Any other serializable value.
    Structured(Value),
    /// The sample could not be serialized; holds the serializer's error.
    Unserializable(String),
}

impl Sample {
    pub fn capture<T: Serialize + ?Sized>(sample: &T) -> Self {
        match serde_json::to_value(sample) {
            Ok(Value::String(text)) => Self::Text(text),
            Ok(value) => Self::Structured(value),
            Err(e) => {
                debug!(error = %e, "sample payload is not serializable");
                Self::Unserializable(e.to_string())
            }
        }
    }

    /// Raw text of the sample, only for string samples.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) | Self::Unserializable(_) => None,
        }
    }

    /// Pretty JSON rendering with sorted keys and a two-space indent.
    pub fn to_json(&self) -> Option<String> {
        let rendered = match self {
            Self::Text(text) => serde_json::to_string_pretty(text),
            Self::Structured(value) => serde_json::to_string_pretty(value),
            Self::Unserializable(_) => return None,
        };
        rendered
            .map_err(|e| debug!(error = %e, "failed to render sample as JSON"))
            .ok()
    }
}

/// A documented response status of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseError {
    pub code: u16,
    pub message: String,
    pub model: Option<Sample>,
}

const TEXT_MEDIA_TYPES: [&str; 3] = ["text/plain", "text/markdown", "text/html"];
const JSON_MEDIA_TYPE: &str = "application/json";

/// Lower-cased media type with any `;` parameters removed.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn code_format_for(media_types: &[String]) -> &'static str {
    media_types
        .iter()
        .find_map(|media_type| match essence(media_type).as_str() {
            "text/plain" => Some("text"),
            "text/markdown" => Some("markdown"),
            "text/html" => Some("html"),
            JSON_MEDIA_TYPE => Some("json"),
            _ => None,
        })
        .unwrap_or_default()
}

fn render_sample(media_types: &[String], sample: Option<&Sample>) -> String {
    for media_type in media_types {
        let essence = essence(media_type);
        if TEXT_MEDIA_TYPES.contains(&essence.as_str()) {
            return match sample.and_then(Sample::as_text) {
                Some(text) => text.to_string(),
                None => {
                    debug!(media_type = %media_type, "sample is not text, omitting it");
                    String::new()
                }
            };
        }
        if essence == JSON_MEDIA_TYPE {
            match sample.and_then(Sample::to_json) {
                Some(json) => return json,
                None => continue,
            }
        }
    }
    String::new()
}

/// An HTTP endpoint: what to dispatch and how to document it.
#[derive(Debug, Clone)]
pub struct Route {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) handler: Handler,
    pub(crate) doc: String,
    pub(crate) notes: String,
    pub(crate) operation: String,
    pub(crate) consumes: Vec<String>,
    pub(crate) produces: Vec<String>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) response_errors: BTreeMap<u16, ResponseError>,
    pub(crate) read_sample: Option<Sample>,
    pub(crate) write_sample: Option<Sample>,
}

impl Route {
    /// The HTTP method exactly as declared.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Root path joined with the route's sub path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn consumes(&self) -> &[String] {
        &self.consumes
    }

    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Documented response errors in ascending status code order.
    pub fn response_errors(&self) -> impl Iterator<Item = &ResponseError> {
        self.response_errors.values()
    }

    pub fn response_error(&self, code: u16) -> Option<&ResponseError> {
        self.response_errors.get(&code)
    }

    pub fn read_sample(&self) -> Option<&Sample> {
        self.read_sample.as_ref()
    }

    pub fn write_sample(&self) -> Option<&Sample> {
        self.write_sample.as_ref()
    }

    /// Code block language for the first recognized consumed media type, or "".
    ///
    /// Used for both the Reads and the Writes sample blocks.
    pub fn code_format(&self) -> &'static str {
        code_format_for(&self.consumes)
    }

    /// The read sample rendered for the first consumed media type that can render it.
    pub fn reads(&self) -> String {
        render_sample(&self.consumes, self.read_sample.as_ref())
    }

    /// The write sample rendered for the first produced media type that can render it.
    pub fn writes(&self) -> String {
        render_sample(&self.produces, self.write_sample.as_ref())
    }

    /// The serializable documentation projection of this route.
    pub fn to_doc(&self) -> RouteDoc {
        RouteDoc {
            method: self.method.clone(),
            path: self.path.clone(),
            doc: self.doc.clone(),
            notes: self.notes.clone(),
            operation: self.operation.clone(),
            consumes: self.consumes.clone(),
            produces: self.produces.clone(),
            parms: self.parameters.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Structured documentation of a route, as served by the `/jsondoc` endpoint.
///
/// Handlers, response errors and samples are not part of this projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDoc {
    pub method: String,
    pub path: String,
    pub doc: String,
    pub notes: String,
    pub operation: String,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub parms: Vec<Parameter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use routebook_base::http::HttpMethod;
    use serde_json::json;
    use std::collections::HashMap;

    fn create_widget(_request: HttpRequest) -> RoutebookResult<HttpResponse> {
        Ok(HttpResponse::text("created"))
    }

    fn route(consumes: &[&str], produces: &[&str]) -> Route {
        Route {
            method: "POST".to_string(),
            path: "/widgets".to_string(),
            handler: Handler::new(create_widget),
            doc: String::new(),
            notes: String::new(),
            operation: "create".to_string(),
            consumes: consumes.iter().map(|m| m.to_string()).collect(),
            produces: produces.iter().map(|m| m.to_string()).collect(),
            parameters: vec![],
            response_errors: BTreeMap::new(),
            read_sample: None,
            write_sample: None,
        }
    }

    #[test]
    fn test_handler_operation_name() {
        let handler = Handler::new(create_widget);
        assert!(handler.type_name().ends_with("create_widget"));
        assert_eq!(handler.operation_name(), "create_widget");

        let closure = Handler::new(|_request| Ok(HttpResponse::ok()));
        assert_eq!(closure.operation_name(), "test_handler_operation_name");
    }

    #[test]
    fn test_handler_call() {
        let handler = Handler::new(create_widget);
        let response = handler
            .call(HttpRequest::new(HttpMethod::Post, "/widgets"))
            .unwrap();
        assert_eq!(response.body().as_string(), Some("created".to_string()));
    }

    #[test]
    fn test_sample_capture_variants() {
        assert_eq!(Sample::capture("docid"), Sample::Text("docid".to_string()));
        assert_eq!(
            Sample::capture(&json!({"b": 1, "a": 2})),
            Sample::Structured(json!({"a": 2, "b": 1}))
        );

        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        assert!(matches!(Sample::capture(&bad), Sample::Unserializable(_)));
    }

    #[test]
    fn test_code_format_first_match_wins() {
        assert_eq!(route(&["image/png", "text/markdown", "application/json"], &[]).code_format(), "markdown");
        assert_eq!(route(&["application/json; charset=utf-8"], &[]).code_format(), "json");
        assert_eq!(route(&["TEXT/HTML"], &[]).code_format(), "html");
        assert_eq!(route(&["application/xml"], &[]).code_format(), "");
        assert_eq!(route(&[], &["text/plain"]).code_format(), "");
    }

    #[test]
    fn test_reads_json_is_pretty_and_sorted() {
        let mut route = route(&["application/json"], &[]);
        route.read_sample = Some(Sample::capture(&json!({"name": "gear", "color": "red"})));
        assert_eq!(route.reads(), "{\n  \"color\": \"red\",\n  \"name\": \"gear\"\n}");
    }

    #[test]
    fn test_writes_string_sample_as_json() {
        let mut route = route(&[], &["application/json"]);
        route.write_sample = Some(Sample::capture("docid"));
        assert_eq!(route.writes(), "\"docid\"");
    }

    #[test]
    fn test_text_media_renders_raw_string() {
        let mut route = route(&["text/plain"], &["text/html"]);
        route.read_sample = Some(Sample::capture("hello"));
        route.write_sample = Some(Sample::capture("<p>hi</p>"));
        assert_eq!(route.reads(), "hello");
        assert_eq!(route.writes(), "<p>hi</p>");
    }

    #[test]
    fn test_text_media_with_structured_sample_is_omitted() {
        let mut route = route(&["text/plain", "application/json"], &[]);
        route.read_sample = Some(Sample::capture(&json!({"a": 1})));
        assert_eq!(route.reads(), "");
    }

    #[test]
    fn test_unserializable_sample_skips_json_and_continues() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let mut json_only = route(&["application/json"], &[]);
        json_only.read_sample = Some(Sample::capture(&bad));
        assert_eq!(json_only.reads(), "");

        let mut then_text = route(&["application/json", "text/plain"], &[]);
        then_text.read_sample = Some(Sample::capture(&bad));
        assert_eq!(then_text.reads(), "");
    }

    #[test]
    fn test_missing_sample_renders_empty() {
        assert_eq!(route(&["application/json"], &["application/json"]).reads(), "");
        assert_eq!(route(&["application/json"], &["text/plain"]).writes(), "");
        assert_eq!(route(&["image/png"], &[]).reads(), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(route(&[], &[]).to_string(), "POST /widgets");
    }
}
