//! HTTP surface for the EDV server
//!
//! Thin router mapping HTTP verbs and path segments onto the operation
//! engine. Path variables are handed to the engine still percent-encoded;
//! the engine owns unescaping so its error texts stay authoritative.

use bytes::Bytes;
use edv_core::operation::{EdvResponse, EnabledExtensions, Operation};
use http::{header, Method, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// The EDV HTTP server.
pub struct EdvServer {
    operation: Arc<Operation>,
}

impl EdvServer {
    pub fn new(operation: Arc<Operation>) -> Self {
        Self { operation }
    }

    /// Accepts connections forever, serving each on its own task.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("EDV server listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let operation = self.operation.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |request: Request<Incoming>| {
                            let operation = operation.clone();
                            async move {
                                Ok::<_, Infallible>(handle_request(operation, request).await)
                            }
                        });

                        if let Err(e) = auto::Builder::new(TokioExecutor::new())
                            .serve_connection(io, service)
                            .await
                        {
                            // Best effort: a response that cannot be
                            // written back is logged and dropped.
                            warn!(peer = %peer_addr, error = %e, "HTTP connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Resolved route for one request. Path variables stay percent-encoded.
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    CreateVault,
    QueryVault { vault_id: &'a str },
    CreateDocument { vault_id: &'a str },
    ReadAllDocuments { vault_id: &'a str },
    ReadDocument { vault_id: &'a str, doc_id: &'a str },
    UpdateDocument { vault_id: &'a str, doc_id: &'a str },
    DeleteDocument { vault_id: &'a str, doc_id: &'a str },
    Batch { vault_id: &'a str },
    NotFound,
}

/// Maps method + path onto a route. Routes for disabled extensions are not
/// registered, so requests to them resolve to `NotFound`.
fn route<'a>(method: &Method, path: &'a str, extensions: EnabledExtensions) -> Route<'a> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["encrypted-data-vaults"] if method == Method::POST => Route::CreateVault,
        ["encrypted-data-vaults", vault_id, "query"] if method == Method::POST => {
            Route::QueryVault { vault_id }
        }
        ["encrypted-data-vaults", vault_id, "batch"]
            if method == Method::POST && extensions.batch =>
        {
            Route::Batch { vault_id }
        }
        ["encrypted-data-vaults", vault_id, "documents"] if method == Method::POST => {
            Route::CreateDocument { vault_id }
        }
        ["encrypted-data-vaults", vault_id, "documents"]
            if method == Method::GET && extensions.read_all_documents_endpoint =>
        {
            Route::ReadAllDocuments { vault_id }
        }
        ["encrypted-data-vaults", vault_id, "documents", doc_id] if method == Method::GET => {
            Route::ReadDocument { vault_id, doc_id }
        }
        ["encrypted-data-vaults", vault_id, "documents", doc_id] if method == Method::POST => {
            Route::UpdateDocument { vault_id, doc_id }
        }
        ["encrypted-data-vaults", vault_id, "documents", doc_id] if method == Method::DELETE => {
            Route::DeleteDocument { vault_id, doc_id }
        }
        _ => Route::NotFound,
    }
}

async fn handle_request(
    operation: Arc<Operation>,
    request: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "Failed to read request body");
            return plain_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let response = match route(&method, &path, operation.enabled_extensions()) {
        Route::CreateVault => operation.create_data_vault(&body),
        Route::QueryVault { vault_id } => operation.query_vault(vault_id, &body),
        Route::CreateDocument { vault_id } => operation.create_document(vault_id, &body),
        Route::ReadAllDocuments { vault_id } => operation.read_all_documents(vault_id),
        Route::ReadDocument { vault_id, doc_id } => operation.read_document(vault_id, doc_id),
        Route::UpdateDocument { vault_id, doc_id } => {
            operation.update_document(vault_id, doc_id, &body)
        }
        Route::DeleteDocument { vault_id, doc_id } => {
            operation.delete_document(vault_id, doc_id)
        }
        Route::Batch { vault_id } => operation.batch(vault_id, &body),
        Route::NotFound => return plain_response(StatusCode::NOT_FOUND),
    };

    into_http_response(response)
}

fn into_http_response(response: EdvResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    if let Some(location) = &response.location {
        builder = builder.header(header::LOCATION, location.as_str());
    }

    match builder.body(Full::new(Bytes::from(response.body))) {
        Ok(http_response) => http_response,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP response");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn plain_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EXTENSIONS: EnabledExtensions = EnabledExtensions {
        return_full_documents_on_query: true,
        read_all_documents_endpoint: true,
        batch: true,
    };

    #[test]
    fn test_route_vault_and_document_endpoints() {
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults", ALL_EXTENSIONS),
            Route::CreateVault
        );
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults/abc/query", ALL_EXTENSIONS),
            Route::QueryVault { vault_id: "abc" }
        );
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults/abc/documents", ALL_EXTENSIONS),
            Route::CreateDocument { vault_id: "abc" }
        );
        assert_eq!(
            route(&Method::GET, "/encrypted-data-vaults/abc/documents", ALL_EXTENSIONS),
            Route::ReadAllDocuments { vault_id: "abc" }
        );
        assert_eq!(
            route(&Method::GET, "/encrypted-data-vaults/abc/documents/doc1", ALL_EXTENSIONS),
            Route::ReadDocument {
                vault_id: "abc",
                doc_id: "doc1"
            }
        );
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults/abc/documents/doc1", ALL_EXTENSIONS),
            Route::UpdateDocument {
                vault_id: "abc",
                doc_id: "doc1"
            }
        );
        assert_eq!(
            route(&Method::DELETE, "/encrypted-data-vaults/abc/documents/doc1", ALL_EXTENSIONS),
            Route::DeleteDocument {
                vault_id: "abc",
                doc_id: "doc1"
            }
        );
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults/abc/batch", ALL_EXTENSIONS),
            Route::Batch { vault_id: "abc" }
        );
    }

    #[test]
    fn test_route_disabled_extensions_are_not_registered() {
        let no_extensions = EnabledExtensions::default();

        assert_eq!(
            route(&Method::GET, "/encrypted-data-vaults/abc/documents", no_extensions),
            Route::NotFound
        );
        assert_eq!(
            route(&Method::POST, "/encrypted-data-vaults/abc/batch", no_extensions),
            Route::NotFound
        );
    }

    #[test]
    fn test_route_unknown_paths() {
        assert_eq!(
            route(&Method::GET, "/encrypted-data-vaults", ALL_EXTENSIONS),
            Route::NotFound
        );
        assert_eq!(route(&Method::GET, "/", ALL_EXTENSIONS), Route::NotFound);
        assert_eq!(
            route(&Method::POST, "/other/abc/documents", ALL_EXTENSIONS),
            Route::NotFound
        );
        assert_eq!(
            route(
                &Method::PUT,
                "/encrypted-data-vaults/abc/documents/doc1",
                ALL_EXTENSIONS
            ),
            Route::NotFound
        );
    }

    #[test]
    fn test_route_keeps_path_variables_escaped() {
        assert_eq!(
            route(
                &Method::GET,
                "/encrypted-data-vaults/vault%2Fid/documents/doc%20id",
                ALL_EXTENSIONS
            ),
            Route::ReadDocument {
                vault_id: "vault%2Fid",
                doc_id: "doc%20id"
            }
        );
    }
}
