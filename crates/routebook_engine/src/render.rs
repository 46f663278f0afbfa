/* 📖 # Why render through flat view structs?

The Markdown template only sees strings, lists and booleans. Everything that needs Rust logic
(media type scanning, sample rendering, kind labels, joining lists) happens while building the
views, so the template stays a plain layout and cannot disagree with `Route`'s derived views.
*/

use std::io::Write;
use std::sync::LazyLock;

use minijinja::{AutoEscape, Environment};
use routebook_base::{RoutebookResult, err};
use serde::Serialize;
use tracing::error;

use crate::route::{Route, RouteDoc};
use crate::service::ServiceRegistry;

const TEMPLATE_NAME: &str = "service.md";

const SERVICE_TEMPLATE: &str = r#"# `{{ root }}`
{% if documentation %}

{{ documentation }}
{% endif %}
{% if routes %}

{% for route in routes %}
* [{{ route.operation }}](#{{ route.operation | lower }})
{% endfor %}
{% endif %}
{% for route in routes %}

---

## {{ route.operation }}

### {{ route.method }} {{ route.path }}
{% if route.doc %}

_{{ route.doc }}_
{% endif %}
{% if route.notes %}

{{ route.notes }}
{% endif %}
{% if route.parameters %}

_**Parameters:**_

Name | Kind | Description | DataType
---- | ---- | ----------- | --------
{% for parameter in route.parameters %}
{{ parameter.name }} | {{ parameter.kind }} | {{ parameter.description }} | {{ parameter.data_type }}
{% endfor %}
{% endif %}
{% if route.consumes %}

_**Consumes:**_ `{{ route.consumes }}`
{% endif %}
{% if route.reads %}

_**Reads:**_
```{{ route.code_format }}
{{ route.reads }}
```
{% endif %}
{% if route.produces %}

_**Produces:**_ `{{ route.produces }}`
{% endif %}
{% if route.writes %}

_**Writes:**_
```{{ route.code_format }}
{{ route.writes }}
```
{% endif %}
{% if route.errors %}

_**Error returns:**_

Code | Message
---- | -------
{% for error in route.errors %}
{{ error.code }} | {{ error.message }}
{% endfor %}
{% endif %}
{% endfor %}
"#;

static ENVIRONMENT: LazyLock<Result<Environment<'static>, String>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template(TEMPLATE_NAME, SERVICE_TEMPLATE)
        .map_err(|e| e.to_string())?;
    Ok(env)
});

#[derive(Serialize)]
struct ServiceView<'a> {
    root: &'a str,
    documentation: &'a str,
    routes: Vec<RouteView<'a>>,
}

#[derive(Serialize)]
struct RouteView<'a> {
    method: &'a str,
    path: &'a str,
    operation: &'a str,
    doc: &'a str,
    notes: &'a str,
    parameters: Vec<ParameterView<'a>>,
    consumes: String,
    produces: String,
    code_format: &'static str,
    reads: String,
    writes: String,
    errors: Vec<ErrorView<'a>>,
}

#[derive(Serialize)]
struct ParameterView<'a> {
    name: &'a str,
    kind: &'static str,
    description: &'a str,
    data_type: &'a str,
}

#[derive(Serialize)]
struct ErrorView<'a> {
    code: u16,
    message: &'a str,
}

impl<'a> From<&'a ServiceRegistry> for ServiceView<'a> {
    fn from(service: &'a ServiceRegistry) -> Self {
        Self {
            root: service.root_path(),
            documentation: service.documentation(),
            routes: service.routes().iter().map(RouteView::from).collect(),
        }
    }
}

impl<'a> From<&'a Route> for RouteView<'a> {
    fn from(route: &'a Route) -> Self {
        Self {
            method: route.method(),
            path: route.path(),
            operation: route.operation(),
            doc: route.doc(),
            notes: route.notes(),
            parameters: route
                .parameters()
                .iter()
                .map(|parameter| ParameterView {
                    name: parameter.name(),
                    kind: parameter.parameter_kind(),
                    description: &parameter.data().description,
                    data_type: &parameter.data().data_type,
                })
                .collect(),
            consumes: route.consumes().join(", "),
            produces: route.produces().join(", "),
            code_format: route.code_format(),
            reads: route.reads(),
            writes: route.writes(),
            errors: route
                .response_errors()
                .map(|response| ErrorView {
                    code: response.code,
                    message: &response.message,
                })
                .collect(),
        }
    }
}

fn render_markdown(service: &ServiceRegistry) -> RoutebookResult<String> {
    let env = ENVIRONMENT
        .as_ref()
        .map_err(|e| err!("Failed to compile documentation template: {}", e))?;
    let template = env
        .get_template(TEMPLATE_NAME)
        .map_err(|e| err!("Failed to load documentation template: {}", e))?;
    template
        .render(ServiceView::from(service))
        .map_err(|e| err!("Failed to render documentation for {}: {}", service.root_path(), e))
}

/// Markdown documentation of every route of `service`.
///
/// A rendering failure is logged and yields an empty document.
pub fn markdown(service: &ServiceRegistry) -> String {
    render_markdown(service).unwrap_or_else(|e| {
        error!(root = %service.root_path(), error = %e, "Failed to render Markdown documentation");
        String::new()
    })
}

/// Writes the Markdown documentation of `service` to `writer`.
pub fn write_markdown(service: &ServiceRegistry, mut writer: impl Write) -> RoutebookResult<()> {
    let document = render_markdown(service)?;
    writer
        .write_all(document.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| err!("Failed to write Markdown documentation: {}", e))
}

/// The structured documentation of every route of `service`, in registration order.
pub fn json_routes(service: &ServiceRegistry) -> Vec<RouteDoc> {
    service.routes().iter().map(Route::to_doc).collect()
}

/// [`json_routes`] serialized as a JSON array.
pub fn json_document(service: &ServiceRegistry) -> String {
    serde_json::to_string(&json_routes(service)).unwrap_or_else(|e| {
        error!(root = %service.root_path(), error = %e, "Failed to serialize JSON documentation");
        "[]".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;
    use expect_test::expect;
    use routebook_base::http::{HttpRequest, HttpResponse};
    use serde_json::json;

    fn get_widget(_request: HttpRequest) -> RoutebookResult<HttpResponse> {
        Ok(HttpResponse::ok())
    }

    fn widget_service() -> ServiceRegistry {
        let mut service = ServiceRegistry::new();
        service.path("/api").doc("Manages widgets.\n    Widgets have teeth.");
        let get = service
            .get("/widgets/{id}")
            .to(get_widget)
            .operation("GetWidget")
            .doc("Fetches one widget")
            .notes("Unknown ids return 404.")
            .param(Parameter::path("id", "Widget id"))
            .param(Parameter::query("fields", "Fields to include").data_type("csv"))
            .produces(["application/json"])
            .writes(&json!({"teeth": 12, "name": "gear"}))
            .returns(404, "no such widget")
            .returns(400, "id is malformed");
        service.route(get);
        service
    }

    #[test]
    fn test_markdown_layout() {
        let document = markdown(&widget_service());
        expect![[r#"
            # `/api`

            Manages widgets.
            Widgets have teeth.

            * [GetWidget](#getwidget)

            ---

            ## GetWidget

            ### GET /api/widgets/{id}

            _Fetches one widget_

            Unknown ids return 404.

            _**Parameters:**_

            Name | Kind | Description | DataType
            ---- | ---- | ----------- | --------
            id | Path | Widget id | string
            fields | Query | Fields to include | csv

            _**Produces:**_ `application/json`

            _**Writes:**_
            ```
            {
              "name": "gear",
              "teeth": 12
            }
            ```

            _**Error returns:**_

            Code | Message
            ---- | -------
            400 | id is malformed
            404 | no such widget
        "#]]
        .assert_eq(&document);
    }

    #[test]
    fn test_sample_fences_use_consumed_format() {
        let mut service = ServiceRegistry::new();
        let route = service
            .put("/widgets/{id}/label")
            .to(get_widget)
            .consumes(["text/plain"])
            .reads("brass gear")
            .produces(["application/json"])
            .writes(&json!({"label": "brass gear"}));
        service.route(route);

        let document = markdown(&service);
        assert!(document.contains("_**Reads:**_\n```text\nbrass gear\n```"));
        assert!(document.contains("_**Writes:**_\n```text\n{\n  \"label\": \"brass gear\"\n}\n```"));
    }

    #[test]
    fn test_markdown_omits_empty_blocks() {
        let mut service = ServiceRegistry::new();
        service.route(service.delete("/widgets").to(get_widget));

        let document = markdown(&service);
        assert!(document.contains("### DELETE /widgets"));
        assert!(document.contains("* [get_widget](#get_widget)"));
        for block in ["Parameters", "Consumes", "Produces", "Reads", "Writes", "Error returns", "__"] {
            assert!(!document.contains(block), "unexpected {block} in {document}");
        }
    }

    #[test]
    fn test_markdown_of_empty_service() {
        assert_eq!(markdown(&ServiceRegistry::new()), "# `/`\n");
    }

    #[test]
    fn test_write_markdown_matches_markdown() {
        let service = widget_service();
        let mut buffer = Vec::new();
        write_markdown(&service, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), markdown(&service));
    }

    #[test]
    fn test_json_document_shape() {
        let document: serde_json::Value =
            serde_json::from_str(&json_document(&widget_service())).unwrap();
        assert_eq!(
            document,
            json!([{
                "method": "GET",
                "path": "/api/widgets/{id}",
                "doc": "Fetches one widget",
                "notes": "Unknown ids return 404.",
                "operation": "GetWidget",
                "consumes": [],
                "produces": ["application/json"],
                "parms": [
                    {"data": {
                        "name": "id", "description": "Widget id", "datatype": "string",
                        "dataformat": null, "kind": 0, "required": true,
                        "allowablevalues": null, "allowmultiple": false, "defaultvalue": ""
                    }},
                    {"data": {
                        "name": "fields", "description": "Fields to include", "datatype": "csv",
                        "dataformat": null, "kind": 1, "required": false,
                        "allowablevalues": null, "allowmultiple": false, "defaultvalue": ""
                    }}
                ]
            }])
        );
    }

    #[test]
    fn test_json_routes_round_trip() {
        let service = widget_service();
        let routes = json_routes(&service);
        let parsed: Vec<RouteDoc> = serde_json::from_str(&json_document(&service)).unwrap();
        assert_eq!(parsed, routes);
        assert_eq!(json_document(&ServiceRegistry::new()), "[]");
    }
}
