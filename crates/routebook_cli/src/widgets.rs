/* 📖 # Why does the CLI ship a widget service?

The binary demonstrates the whole declaration pipeline on a small but working service: an
in-memory widget inventory. Every route is declared once and the same registry feeds the
printed documentation, the saved documentation and the HTTP dispatch table.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use routebook_base::http::{HttpRequest, HttpResponse, HttpStatusCode};
use routebook_base::{RoutebookResult, err};
use routebook_engine::{Parameter, ServiceRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub name: String,
    pub color: String,
    pub teeth: u32,
}

#[derive(Debug, Serialize)]
struct StoredWidget<'a> {
    id: u32,
    #[serde(flatten)]
    widget: &'a Widget,
}

#[derive(Debug, Default)]
struct Inventory {
    next_id: u32,
    widgets: BTreeMap<u32, Widget>,
}

/// Shared handle to the widget inventory.
#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    inner: Arc<RwLock<Inventory>>,
}

impl WidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, widget: Widget) -> u32 {
        let mut inventory = self.inner.write();
        inventory.next_id += 1;
        let id = inventory.next_id;
        inventory.widgets.insert(id, widget);
        debug!(id, "Stored widget");
        id
    }

    pub fn get(&self, id: u32) -> Option<Widget> {
        self.inner.read().widgets.get(&id).cloned()
    }

    pub fn remove(&self, id: u32) -> Option<Widget> {
        self.inner.write().widgets.remove(&id)
    }

    fn to_json(&self) -> RoutebookResult<String> {
        let inventory = self.inner.read();
        let listed: Vec<StoredWidget> = inventory
            .widgets
            .iter()
            .map(|(id, widget)| StoredWidget { id: *id, widget })
            .collect();
        serde_json::to_string(&listed).map_err(|e| err!("JSON serialization error: {}", e))
    }
}

fn widget_id(request: &HttpRequest) -> Option<u32> {
    request
        .path_without_query()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::new(HttpStatusCode::BadRequest)
        .with_content_type("text/plain")
        .with_body(message)
}

fn sample_widget() -> Widget {
    Widget {
        name: "gear".to_string(),
        color: "brass".to_string(),
        teeth: 24,
    }
}

/// Declares the widget service under `root`, backed by `store`.
pub fn widget_service(root: &str, store: &WidgetStore) -> RoutebookResult<ServiceRegistry> {
    let mut service = ServiceRegistry::new();
    service.path(root).doc(
        "An in-memory inventory of widgets.
        Widgets are kept until the process exits.",
    );

    let list_store = store.clone();
    let list = service
        .get("/widgets")
        .to(move |_request| Ok(HttpResponse::json(list_store.to_json()?)))
        .operation("ListWidgets")
        .doc("Lists every widget in the inventory")
        .produces(["application/json"])
        .writes(&vec![sample_widget()]);

    let create_store = store.clone();
    let create = service
        .post("/widgets")
        .to(move |request: HttpRequest| {
            let Ok(widget) = serde_json::from_slice::<Widget>(request.body().as_bytes()) else {
                return Ok(bad_request("widget is malformed"));
            };
            let id = create_store.insert(widget);
            Ok(HttpResponse::new(HttpStatusCode::Created)
                .with_content_type("text/plain")
                .with_body(id.to_string()))
        })
        .operation("CreateWidget")
        .doc("Adds a widget to the inventory")
        .notes(
            "Responds with the id of the new widget.
            Ids are never reused.",
        )
        .consumes(["application/json"])
        .reads(&sample_widget())
        .produces(["text/plain"])
        .writes("1")
        .returns(400, "widget is malformed");

    let get_store = store.clone();
    let get = service
        .get("/widgets/{id}")
        .to(move |request: HttpRequest| {
            let Some(id) = widget_id(&request) else {
                return Ok(bad_request("id must be a number"));
            };
            match get_store.get(id) {
                Some(widget) => serde_json::to_string(&widget)
                    .map(HttpResponse::json)
                    .map_err(|e| err!("JSON serialization error: {}", e)),
                None => Ok(HttpResponse::not_found()),
            }
        })
        .operation("GetWidget")
        .doc("Fetches one widget")
        .param(Parameter::path("id", "Id returned by CreateWidget").data_type("u32"))
        .produces(["application/json"])
        .writes(&sample_widget())
        .returns(400, "id must be a number")
        .returns(404, "no such widget");

    let delete_store = store.clone();
    let delete = service
        .delete("/widgets/{id}")
        .to(move |request: HttpRequest| {
            let Some(id) = widget_id(&request) else {
                return Ok(bad_request("id must be a number"));
            };
            Ok(match delete_store.remove(id) {
                Some(_) => HttpResponse::new(HttpStatusCode::NoContent),
                None => HttpResponse::not_found(),
            })
        })
        .operation("DeleteWidget")
        .doc("Removes a widget from the inventory")
        .param(Parameter::path("id", "Id returned by CreateWidget").data_type("u32"))
        .param(
            Parameter::header("X-Reason", "Why the widget is removed")
                .allowable_values([("sold", "The widget was sold"), ("broken", "The widget broke")])
                .default_value("sold"),
        )
        .returns(400, "id must be a number")
        .returns(404, "no such widget");

    service
        .try_route(list)?
        .try_route(create)?
        .try_route(get)?
        .try_route(delete)?;
    Ok(service)
}
