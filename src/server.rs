//! HTTP boundary: a blocking request loop serving scan snapshots.
//!
//! Each `GET /ports` runs one fresh scan on the handling thread; nothing is
//! cached between requests. `OPTIONS /ports` answers CORS preflights without
//! scanning at all.

use tiny_http::{Header, Method, Response, Server};

use crate::error::{Result, ScanError, ServerError};
use crate::scanner::PortScanner;

/// What a request resolves to, decided before any scanning happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Ports,
    Preflight,
    MethodNotAllowed,
    NotFound,
}

fn route(method: &Method, url: &str) -> Route {
    if url != "/ports" {
        return Route::NotFound;
    }
    match method {
        Method::Options => Route::Preflight,
        Method::Get => Route::Ports,
        _ => Route::MethodNotAllowed,
    }
}

fn cors_headers() -> Vec<Header> {
    [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ]
    .iter()
    .map(|(field, value)| {
        Header::from_bytes(field.as_bytes(), value.as_bytes()).expect("valid static header")
    })
    .collect()
}

fn with_cors<R: std::io::Read>(mut response: Response<R>) -> Response<R> {
    for header in cors_headers() {
        response.add_header(header);
    }
    response
}

/// Runs one scan and encodes the snapshot as a JSON array.
fn scan_body(scanner: &PortScanner) -> std::result::Result<String, ScanError> {
    let records = scanner.scan()?;
    Ok(serde_json::to_string(&records).expect("Failed to serialize to JSON"))
}

/// Binds `addr` and serves requests until the process exits.
pub fn serve(addr: &str, scanner: &PortScanner) -> Result<()> {
    let server = Server::http(addr).map_err(|e| ServerError::BindFailed {
        addr: addr.to_string(),
        reason: e.to_string(),
    })?;
    log::info!("Listening on http://{addr}");

    for request in server.incoming_requests() {
        let decision = route(request.method(), request.url());
        log::debug!("{} {} -> {:?}", request.method(), request.url(), decision);

        let sent = match decision {
            Route::Preflight => request.respond(with_cors(Response::empty(200))),

            Route::MethodNotAllowed => request.respond(with_cors(
                Response::from_string("Method not allowed\n").with_status_code(405),
            )),

            Route::NotFound => {
                request.respond(Response::from_string("404 page not found\n").with_status_code(404))
            }

            Route::Ports => match scan_body(scanner) {
                Ok(body) => {
                    let content_type =
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .expect("valid static header");
                    request
                        .respond(with_cors(Response::from_string(body).with_header(content_type)))
                }
                Err(e) => {
                    log::warn!("scan failed: {e}");
                    request.respond(with_cors(
                        Response::from_string("Failed to scan ports\n").with_status_code(500),
                    ))
                }
            },
        };

        if let Err(e) = sent {
            log::warn!("failed to write response: {e}");
        }
    }

    Ok(())
}
