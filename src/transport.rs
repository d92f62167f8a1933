//! Outbound HTTP transports and their traced wrapper.
//!
//! # Responsibilities
//! - Define the boxed transport type facilities wrap
//! - Start and end one span per outbound request
//! - Propagate the correlation ID as a request header
//!
//! # Design Decisions
//! - A transport is a tower service, so any stack of layers can be a base
//! - The caller's `Context` travels in the request extensions
//! - Transport failures end the span with status 0 and the error

use std::error::Error;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{header::HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower::util::BoxCloneService;
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::context::{correlation_id, Context, CORRELATION_ID_KEY};
use crate::metrics;
use crate::registry::Facility;

/// Boxed HTTP client service a facility can wrap.
pub type Transport = BoxCloneService<Request<Body>, Response<Body>, BoxError>;

/// Box any clonable HTTP service as a [`Transport`].
pub fn boxed<S>(service: S) -> Transport
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    BoxCloneService::new(service.map_err(Into::into))
}

/// The default base transport: a pooled hyper client.
pub fn hyper_transport() -> Transport {
    let client: Client<HttpConnector, Body> =
        Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    boxed(client.map_response(|response: Response<Incoming>| response.map(Body::new)))
}

/// Layer producing [`TracedTransport`]s that report to `facility`.
#[derive(Clone)]
pub struct TracedTransportLayer<F> {
    facility: F,
}

impl<F> TracedTransportLayer<F> {
    pub fn new(facility: F) -> Self {
        Self { facility }
    }
}

impl<S, F: Clone> Layer<S> for TracedTransportLayer<F> {
    type Service = TracedTransport<S, F>;

    fn layer(&self, inner: S) -> Self::Service {
        TracedTransport::new(inner, self.facility.clone())
    }
}

/// Transport wrapper that traces each request through a facility.
#[derive(Clone)]
pub struct TracedTransport<S, F> {
    inner: S,
    facility: F,
}

impl<S, F> TracedTransport<S, F> {
    pub fn new(inner: S, facility: F) -> Self {
        Self { inner, facility }
    }
}

impl<S, F> Service<Request<Body>> for TracedTransport<S, F>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    F: Facility + Clone + 'static,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response<Body>, BoxError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let parent = request.extensions().get::<Context>().cloned().unwrap_or_default();
        let name = format!("HTTP {}", request.method());
        let ctx = self.facility.start_span(parent, &name);

        if let Some(id) = correlation_id(&ctx) {
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                request.headers_mut().insert(CORRELATION_ID_KEY, value);
            }
        }
        request.extensions_mut().insert(ctx.clone());

        // The ready service is the one `poll_ready` was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let facility = self.facility.clone();
        let started = Instant::now();

        Box::pin(async move {
            let result: Result<Response<Body>, BoxError> =
                inner.call(request).await.map_err(Into::into);
            match &result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    metrics::record_transport_request(status, started);
                    facility.end_span(&ctx, status, None);
                }
                Err(e) => {
                    metrics::record_transport_request(0, started);
                    let err: &(dyn Error + 'static) = &**e;
                    facility.end_span(&ctx, 0, Some(err));
                }
            }
            result
        })
    }
}
