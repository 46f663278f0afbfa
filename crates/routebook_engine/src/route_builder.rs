use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use routebook_base::http::{HttpRequest, HttpResponse};
use routebook_base::{ErrorKind, RoutebookError, RoutebookResult};
use serde::Serialize;

use crate::parameter::Parameter;
use crate::route::{Handler, ResponseError, Route, Sample};

static INDENTED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]+").expect("indentation pattern is a valid regex"));

/// Removes the indentation that follows every newline, so documentation can be indented in
/// source code without the indentation showing up in rendered output.
pub fn normalize_indentation(text: &str) -> String {
    INDENTED_NEWLINE.replace_all(text, "\n").into_owned()
}

/// Joins a root and a sub path with exactly one `/` between them.
pub fn concat_path(root: &str, sub: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        sub.trim_start_matches('/')
    )
}

/// Accumulates the declaration of one route, then freezes it into a [`Route`].
#[derive(Debug, Default)]
pub struct RouteBuilder {
    root_path: String,
    current_path: String,
    method: String,
    handler: Option<Handler>,
    doc: String,
    notes: String,
    operation: Option<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
    parameters: Vec<Parameter>,
    response_errors: BTreeMap<u16, ResponseError>,
    read_sample: Option<Sample>,
    write_sample: Option<Sample>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn root_path(mut self, root: impl Into<String>) -> Self {
        self.root_path = root.into();
        self
    }

    /// The path relative to the service root.
    pub fn path(mut self, sub_path: impl Into<String>) -> Self {
        self.current_path = sub_path.into();
        self
    }

    /// The HTTP method to match. Methods other than HEAD, GET, POST, PUT, PATCH and DELETE are
    /// documented but never dispatched.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Binds the function called when this route matches. Required.
    pub fn to<F>(mut self, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> RoutebookResult<HttpResponse> + Send + Sync + 'static,
    {
        self.handler = Some(Handler::new(handler));
        self
    }

    /// Binds an already wrapped handler. Required unless [`RouteBuilder::to`] is used.
    pub fn to_handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// What the route is about. Indentation after newlines is removed.
    pub fn doc(mut self, documentation: &str) -> Self {
        self.doc = normalize_indentation(documentation);
        self
    }

    /// A verbose explanation of the route's behavior. Indentation after newlines is removed.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = normalize_indentation(notes);
        self
    }

    /// Media types the route accepts, in order of preference for documentation.
    pub fn consumes<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes = media_types.into_iter().map(Into::into).collect();
        self
    }

    /// Media types the route produces, in order of preference for documentation.
    pub fn produces<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces = media_types.into_iter().map(Into::into).collect();
        self
    }

    /// Records an example request payload.
    ///
    /// Also adds a required body parameter named "body" whose data type is the sample's type
    /// name. Every call adds another one.
    pub fn reads<T: Serialize + ?Sized>(mut self, sample: &T) -> Self {
        self.read_sample = Some(Sample::capture(sample));
        let body = Parameter::body("body", "")
            .required(true)
            .data_type(std::any::type_name::<T>());
        self.param(body)
    }

    /// Records an example response payload.
    pub fn writes<T: Serialize + ?Sized>(mut self, sample: &T) -> Self {
        self.write_sample = Some(Sample::capture(sample));
        self
    }

    /// Adds a parameter. Duplicates are not checked.
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Looks up a parameter added earlier, e.g. the body parameter added by `reads`.
    pub fn parameter_named(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn parameter_named_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name() == name)
    }

    /// Documentation label of the route. Defaults to the handler's function name.
    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Documents a possible response. A later call with the same code replaces this one.
    pub fn returns(mut self, code: u16, message: impl Into<String>) -> Self {
        self.insert_response(code, message.into(), None);
        self
    }

    /// Like [`RouteBuilder::returns`], with an example model for the response.
    pub fn returns_with_model<T: Serialize + ?Sized>(
        mut self,
        code: u16,
        message: impl Into<String>,
        model: &T,
    ) -> Self {
        self.insert_response(code, message.into(), Some(Sample::capture(model)));
        self
    }

    fn insert_response(&mut self, code: u16, message: String, model: Option<Sample>) {
        self.response_errors.insert(
            code,
            ResponseError {
                code,
                message,
                model,
            },
        );
    }

    /// Creates the route, or fails with [`ErrorKind::MissingHandler`] if no handler was bound.
    pub fn try_build(self) -> RoutebookResult<Route> {
        let path = concat_path(&self.root_path, &self.current_path);
        let Some(handler) = self.handler else {
            return Err(Box::new(RoutebookError::new(ErrorKind::MissingHandler {
                method: self.method,
                path,
            })));
        };
        let operation = self
            .operation
            .unwrap_or_else(|| handler.operation_name());

        Ok(Route {
            method: self.method,
            path,
            handler,
            doc: self.doc,
            notes: self.notes,
            operation,
            consumes: self.consumes,
            produces: self.produces,
            parameters: self.parameters,
            response_errors: self.response_errors,
            read_sample: self.read_sample,
            write_sample: self.write_sample,
        })
    }

    /// Creates the route.
    ///
    /// # Panics
    /// If no handler was bound. A route without a handler is a defect in the service setup
    /// and must stop the program before any request is served.
    pub fn build(self) -> Route {
        match self.try_build() {
            Ok(route) => route,
            Err(e) => panic!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterKind;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Widget {
        name: String,
        teeth: u32,
    }

    fn noop(_request: HttpRequest) -> RoutebookResult<HttpResponse> {
        Ok(HttpResponse::ok())
    }

    #[test]
    fn test_concat_path_examples() {
        assert_eq!(concat_path("/api/", "/widgets"), "/api/widgets");
        assert_eq!(concat_path("/api", "widgets"), "/api/widgets");
        assert_eq!(concat_path("/", "/foo"), "/foo");
        assert_eq!(concat_path("", "foo"), "/foo");
        assert_eq!(concat_path("/api//", "//widgets"), "/api/widgets");
    }

    #[test]
    fn test_normalize_indentation() {
        assert_eq!(
            normalize_indentation("first line\n        second\n\t\tthird"),
            "first line\nsecond\nthird"
        );
        assert_eq!(normalize_indentation("no indent\nhere "), "no indent\nhere ");
    }

    #[test]
    fn test_build_assembles_route() {
        let route = RouteBuilder::new()
            .root_path("/api/")
            .path("/widgets")
            .method("POST")
            .to(noop)
            .operation("CreateWidget")
            .doc("Creates a widget.\n    Widgets are forever.")
            .notes("Notes\n\tindented")
            .consumes(["application/json"])
            .produces(vec!["application/json".to_string()])
            .param(Parameter::header("X-Request-Id", "Correlation id"))
            .returns(400, "widget is invalid")
            .returns(409, "widget exists")
            .returns(400, "widget is malformed")
            .build();

        assert_eq!(route.method(), "POST");
        assert_eq!(route.path(), "/api/widgets");
        assert_eq!(route.operation(), "CreateWidget");
        assert_eq!(route.doc(), "Creates a widget.\nWidgets are forever.");
        assert_eq!(route.notes(), "Notes\nindented");
        assert_eq!(route.consumes(), ["application/json"]);
        assert_eq!(route.parameters().len(), 1);

        let codes: Vec<u16> = route.response_errors().map(|e| e.code).collect();
        assert_eq!(codes, vec![400, 409]);
        assert_eq!(
            route.response_error(400).map(|e| e.message.as_str()),
            Some("widget is malformed")
        );
    }

    #[test]
    fn test_reads_adds_body_parameter_each_call() {
        let widget = Widget {
            name: "gear".to_string(),
            teeth: 12,
        };
        let builder = RouteBuilder::new().reads(&widget);

        let body = builder.parameter_named("body").unwrap();
        assert_eq!(body.kind(), ParameterKind::Body);
        assert!(body.data().required);
        assert_eq!(body.data().data_type, std::any::type_name::<Widget>());
        assert!(body.data().data_type.ends_with("Widget"));

        let route = builder.reads(&widget).to(noop).build();
        let bodies = route
            .parameters()
            .iter()
            .filter(|p| p.name() == "body")
            .count();
        assert_eq!(bodies, 2);
        assert_eq!(
            route.read_sample(),
            Some(&Sample::Structured(json!({"name": "gear", "teeth": 12})))
        );
    }

    #[test]
    fn test_parameter_named_mut_adjusts_body() {
        let mut builder = RouteBuilder::new().reads("plain text");
        assert!(builder.parameter_named("missing").is_none());

        builder
            .parameter_named_mut("body")
            .unwrap()
            .data_mut()
            .description = "The document text".to_string();

        let route = builder.to(noop).build();
        assert_eq!(route.parameters()[0].data().description, "The document text");
        assert_eq!(route.parameters()[0].data().data_type, "str");
    }

    #[test]
    fn test_writes_adds_no_parameter() {
        let route = RouteBuilder::new().writes("docid").to(noop).build();
        assert!(route.parameters().is_empty());
        assert_eq!(route.write_sample(), Some(&Sample::Text("docid".to_string())));
    }

    #[test]
    fn test_operation_defaults_to_handler_name() {
        let route = RouteBuilder::new().path("/x").method("GET").to(noop).build();
        assert_eq!(route.operation(), "noop");
    }

    #[test]
    fn test_returns_with_model() {
        let route = RouteBuilder::new()
            .to(noop)
            .returns_with_model(422, "validation failed", &json!({"field": "name"}))
            .build();
        assert_eq!(
            route.response_error(422).and_then(|e| e.model.clone()),
            Some(Sample::Structured(json!({"field": "name"})))
        );
    }

    #[test]
    fn test_try_build_without_handler_fails() {
        let error = RouteBuilder::new()
            .root_path("/api")
            .path("widgets")
            .method("GET")
            .try_build()
            .unwrap_err();
        match error.kind() {
            ErrorKind::MissingHandler { method, path } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/api/widgets");
            }
            _ => panic!("Expected MissingHandler variant"),
        }
    }

    #[test]
    #[should_panic(expected = "No handler specified for route: POST /foo")]
    fn test_build_without_handler_panics() {
        RouteBuilder::new().path("/foo").method("POST").build();
    }

    proptest! {
        #[test]
        fn test_concat_path_has_one_separator(
            root in "/{0,3}([a-z]{1,4}/){0,3}[a-z]{0,4}/{0,3}",
            sub in "/{0,3}([a-z]{1,4}/){0,3}[a-z]{0,4}",
        ) {
            let joined = concat_path(&root, &sub);
            let head = root.trim_end_matches('/');
            let tail = sub.trim_start_matches('/');
            prop_assert_eq!(&joined, &format!("{}/{}", head, tail));
            prop_assert!(joined.starts_with(head));
            prop_assert!(joined.ends_with(tail));
            prop_assert!(!joined[head.len()..joined.len() - tail.len()].contains("//"));
        }

        #[test]
        fn test_normalize_indentation_is_idempotent(text in "[a-z \t\n]{0,40}") {
            let once = normalize_indentation(&text);
            prop_assert!(!once.contains("\n ") && !once.contains("\n\t"));
            prop_assert_eq!(normalize_indentation(&once), once.clone());
        }

        #[test]
        fn test_normalize_without_indentation_is_unchanged(text in "[a-z\n]{0,40}") {
            prop_assert_eq!(normalize_indentation(&text), text);
        }

        #[test]
        fn test_build_path_follows_concat(root in "/?[a-z]{0,5}/?", sub in "/?[a-z]{0,5}") {
            let route = RouteBuilder::new().root_path(root.clone()).path(sub.clone()).to(noop).build();
            prop_assert_eq!(route.path(), concat_path(&root, &sub));
        }
    }
}
