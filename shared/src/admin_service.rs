use crate::http::make_boxed_error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::{Ready, ready};

/// Liveness and readiness probes.
///
/// `/health` answers as long as the process is serving. `/ready` consults
/// the readiness check on every request, so it follows reconfiguration.
pub struct AdminService<F> {
    is_ready: F,
}

impl<F> AdminService<F>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self { is_ready }
    }
}

impl<F> Service<Request<Incoming>> for AdminService<F>
where
    F: Fn() -> bool,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let ok_body = || Full::new(Bytes::from("ok\n")).boxed();

        let res = match (req.method(), req.uri().path()) {
            (&Method::GET, "/health") => Response::new(ok_body()),
            (&Method::GET, "/ready") => {
                if (self.is_ready)() {
                    Response::new(ok_body())
                } else {
                    tracing::debug!("readiness probe failed");
                    make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE)
                }
            }
            (_, "/health" | "/ready") => make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED),
            _ => make_boxed_error_response(StatusCode::NOT_FOUND),
        };
        ready(Ok(res))
    }
}
