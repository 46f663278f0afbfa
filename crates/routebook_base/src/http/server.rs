use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use crate::RoutebookResult;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/* 📖 # Why a polling accept loop?
tiny_http is synchronous. Polling with `recv_timeout` lets the loop observe the shutdown flag
of the HttpServerHandle without a second wake-up channel.
*/

/// Serve `service` over HTTP on a background thread.
///
/// The returned handle reports the bound port; dropping it stops the server.
pub fn serve(
    service: Arc<dyn HttpService>,
    config: HttpServerConfig,
) -> RoutebookResult<HttpServerHandle> {
    let address = config.address();
    let server = tiny_http::Server::http(&address)
        .map_err(|e| crate::err!("Failed to bind HTTP server on {}: {}", address, e))?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .unwrap_or_default();

    let handle = HttpServerHandle::new(port);
    let shutdown = handle.shutdown_flag();
    let server_name = config.server_name.clone();
    std::thread::Builder::new()
        .name("routebook-http".to_string())
        .spawn(move || accept_loop(server, service, server_name, shutdown))
        .map_err(|e| crate::err!("Failed to spawn HTTP server thread: {}", e))?;

    info!(host = %config.host, port, "HTTP server listening");
    Ok(handle)
}

fn accept_loop(
    server: tiny_http::Server,
    service: Arc<dyn HttpService>,
    server_name: String,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => respond(service.as_ref(), request, &server_name),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to receive HTTP request"),
        }
    }
    debug!("HTTP server loop stopped");
}

fn respond(service: &dyn HttpService, mut request: tiny_http::Request, server_name: &str) {
    let method_name = request.method().to_string();
    let url = request.url().to_string();

    let response = match HttpMethod::parse(&method_name) {
        Some(method) => {
            let mut body = Vec::new();
            if let Err(e) = request.as_reader().read_to_end(&mut body) {
                warn!(url = %url, error = %e, "Failed to read request body");
            }
            let mut converted = HttpRequest::new(method, url.clone()).with_body(body);
            for header in request.headers() {
                converted = converted.with_header(header.field.to_string(), header.value.to_string());
            }
            match service.handle_request(converted) {
                Ok(response) => response,
                Err(e) => {
                    warn!(method = %method_name, url = %url, error = %e, "Request handler failed");
                    HttpResponse::new(HttpStatusCode::NetworkConnectTimeoutError)
                        .with_content_type("text/plain")
                        .with_body(e.to_string())
                }
            }
        }
        None => HttpResponse::method_not_allowed(),
    };

    debug!(method = %method_name, url = %url, status = response.status().as_u16(), "Handled request");

    let status = tiny_http::StatusCode(response.status().as_u16());
    let mut headers = vec![(String::from("Server"), server_name.to_string())];
    headers.extend(
        response
            .headers()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    let mut outgoing = tiny_http::Response::from_data(response.into_body().into_bytes())
        .with_status_code(status);
    for (key, value) in headers {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => outgoing = outgoing.with_header(header),
            Err(()) => warn!(header = %key, "Dropping invalid response header"),
        }
    }

    if let Err(e) = request.respond(outgoing) {
        warn!(url = %url, error = %e, "Failed to send HTTP response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    struct HealthService;

    impl HttpService for HealthService {
        fn handle_request(&self, request: HttpRequest) -> RoutebookResult<HttpResponse> {
            match request.path_without_query() {
                "/health" => Ok(HttpResponse::text("OK")),
                "/boom" => Err(crate::err!("handler exploded")),
                _ => Ok(HttpResponse::not_found()),
            }
        }
    }

    fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            stream,
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serve_round_trip() {
        let handle = serve(Arc::new(HealthService), HttpServerConfig::default()).unwrap();
        assert_ne!(handle.port(), 0);

        let response = get(handle.port(), "/health");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
        assert!(response.contains("Server: routebook"));

        let missing = get(handle.port(), "/nope");
        assert!(missing.starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn test_handler_error_becomes_599() {
        let handle = serve(Arc::new(HealthService), HttpServerConfig::default()).unwrap();

        let response = get(handle.port(), "/boom");
        assert!(response.starts_with("HTTP/1.1 599"));
        assert!(response.ends_with("handler exploded"));
    }
}
