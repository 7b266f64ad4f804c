//! Development server with on-demand derived images.
//!
//! The accept loop hands each request to a rayon pool, so one large decode
//! never blocks accepting or answering other requests. Each request is
//! routed through the [`Middleware`] first; whatever it passes through is
//! served as a static file from the collection root (when enabled) or
//! answered 404.
//!
//! Only `GET` and `HEAD` are served.

mod middleware;
mod response;
mod static_files;

pub use middleware::{
    CacheMode, DeriveFailure, DerivedImage, Handled, JPEG_CONTENT_TYPE, Middleware,
};
pub use response::Reply;

use crate::imaging::{ImageBackend, RustBackend};
use crate::sizes::SizePolicy;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tiny_http::{Method, Request, Server};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: SocketAddr, message: String },
    #[error("failed to create request pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub interface: IpAddr,
    pub port: u16,
    pub cache: CacheMode,
    /// Serve passed-through requests from the collection root.
    pub static_files: bool,
    /// Request handler threads.
    pub threads: usize,
}

impl ServeOptions {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }
}

/// Bind and run the server until the process exits.
pub fn serve(root: &Path, policy: SizePolicy, options: &ServeOptions) -> Result<(), ServeError> {
    let addr = options.addr();
    let server = Server::http(addr).map_err(|e| ServeError::Bind {
        addr,
        message: e.to_string(),
    })?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()?;

    let middleware = Arc::new(Middleware::new(
        root,
        policy,
        options.cache,
        RustBackend::new(),
    ));
    let static_root = options.static_files.then(|| root.to_path_buf());

    info!(
        "serving {} on http://{} ({:?} caching)",
        root.display(),
        addr,
        options.cache
    );

    for request in server.incoming_requests() {
        let middleware = Arc::clone(&middleware);
        let static_root = static_root.clone();
        pool.spawn(move || handle_request(request, &middleware, static_root.as_deref()));
    }
    Ok(())
}

fn handle_request<B: ImageBackend>(
    request: Request,
    middleware: &Middleware<B>,
    static_root: Option<&Path>,
) {
    let started = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = route(middleware, &method, &url, static_root);
    let status = reply.status;

    if let Err(e) = response::send(request, reply) {
        warn!(%method, %url, error = %e, "failed to send response");
        return;
    }
    info!(
        %method,
        %url,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
}

/// Decide the reply for one request.
pub fn route<B: ImageBackend>(
    middleware: &Middleware<B>,
    method: &Method,
    url: &str,
    static_root: Option<&Path>,
) -> Reply {
    if !matches!(method, Method::Get | Method::Head) {
        return Reply::method_not_allowed();
    }

    match middleware.handle(url) {
        Handled::Derived(Ok(image)) => Reply::derived(Ok(image)),
        Handled::Derived(Err(failure)) => {
            match failure.status() {
                500 => error!(%url, error = %failure, "derivation failed"),
                _ => debug!(%url, error = %failure, "derivation refused"),
            }
            Reply::failure(&failure)
        }
        Handled::PassThrough => serve_static(url, static_root),
    }
}

fn serve_static(url: &str, static_root: Option<&Path>) -> Reply {
    let Some(path) = static_root.and_then(|root| static_files::resolve_path(url, root)) else {
        return Reply::not_found();
    };
    match Reply::file(&path) {
        Ok(reply) => reply,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read static file");
            Reply::internal_error()
        }
    }
}
