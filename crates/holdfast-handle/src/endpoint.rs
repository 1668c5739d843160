//! The external dependency as seen by a handle.

use futures::future::BoxFuture;

/// A unit of work handed to [`Endpoint::unit_of_work`].
///
/// The closure receives the endpoint for the duration of one attempt.
pub type Work<'a, H, T> =
    Box<dyn FnOnce(&'a H) -> BoxFuture<'a, Result<T, <H as Endpoint>::Error>> + Send + 'a>;

/// Capability exposed by an external dependency (a database client, a
/// broker connection, ...).
///
/// Building an endpoint value must not touch the network; connectivity is
/// established by [`open`](Endpoint::open), which the connector retries.
///
/// # Examples
///
/// ```
/// use futures::future::{BoxFuture, FutureExt};
/// use holdfast_handle::Endpoint;
///
/// struct Database {
///     url: String,
/// }
///
/// impl Endpoint for Database {
///     type Error = std::io::Error;
///
///     fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
///         async move { Ok(()) }.boxed()
///     }
///
///     fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
///         async move { Ok(()) }.boxed()
///     }
/// }
/// ```
pub trait Endpoint: Send + Sync + 'static {
    /// Error produced by the dependency.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens the connection.
    fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>>;

    /// Closes the connection.
    fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>>;

    /// Runs `work` inside the endpoint's atomic boundary.
    ///
    /// Endpoints with native transactions override this so that a failed
    /// attempt is rolled back before the caller retries. The default runs
    /// the work directly and offers no isolation.
    fn unit_of_work<'a, T>(&'a self, work: Work<'a, Self, T>) -> BoxFuture<'a, Result<T, Self::Error>>
    where
        Self: Sized,
        T: Send + 'a,
    {
        work(self)
    }
}
