use crate::retrier::Retrier;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// A Tower [`Layer`] that runs every request through a [`Retrier`].
///
/// The wrapped service is cloned for each attempt and driven to readiness
/// before the request is sent, so one request never observes a half-used
/// service from a failed attempt. The final error is returned unchanged.
///
/// # Examples
///
/// ```
/// use holdfast_retry::{Retrier, RetryLayer, RetryPolicy};
/// use tower::ServiceBuilder;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// # impl std::fmt::Display for MyError {
/// #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "my error") }
/// # }
/// let retrier = Retrier::builder(RetryPolicy::<MyError>::operation())
///     .name("orders")
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(RetryLayer::new(retrier))
///     .service(tower::service_fn(|req: String| async move {
///         Ok::<_, MyError>(req)
///     }));
/// # let _ = service;
/// ```
pub struct RetryLayer<E> {
    retrier: Arc<Retrier<E>>,
}

impl<E> RetryLayer<E> {
    /// Creates a layer from a configured retrier.
    pub fn new(retrier: Retrier<E>) -> Self {
        Self {
            retrier: Arc::new(retrier),
        }
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            retrier: Arc::clone(&self.retrier),
        }
    }
}

impl<E> fmt::Debug for RetryLayer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLayer")
            .field("retrier", &self.retrier)
            .finish()
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            inner,
            retrier: Arc::clone(&self.retrier),
        }
    }
}

/// A Tower [`Service`] that retries failed requests.
pub struct Retry<S, E> {
    inner: S,
    retrier: Arc<Retrier<E>>,
}

impl<S, E> Retry<S, E> {
    /// Wraps `inner` with `retrier`.
    pub fn new(inner: S, retrier: Arc<Retrier<E>>) -> Self {
        Self { inner, retrier }
    }

    /// Borrows the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: Clone, E> Clone for Retry<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            retrier: Arc::clone(&self.retrier),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let retrier = Arc::clone(&self.retrier);

        Box::pin(async move {
            retrier
                .run(move |_| service.clone().oneshot(req.clone()))
                .await
                .map_err(|err| err.into_cause())
        })
    }
}
