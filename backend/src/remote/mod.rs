//! Remote imagery service access.
//!
//! The relay never touches pixels. Everything it asks of the remote service
//! goes through the [`ImageryService`] trait, with two implementations:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  services/ (region resolver, query builder)              │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │  Arc<dyn ImageryService>
//!     ┌───────────────┴──────────────────┐
//!     │                                  │
//! ┌───▼──────────────────┐   ┌───────────▼───────────────────┐
//! │ LocalImageryService  │   │ HttpImageryService            │
//! │ (seeded, in-memory)  │   │ (service account + JSON/HTTPS)│
//! └──────────────────────┘   └───────────────────────────────┘
//! ```
//!
//! Use [`ServiceFactory`] to build the one selected by configuration.

pub mod credentials;
pub mod error;
pub mod factory;
#[cfg(feature = "remote-service")]
pub mod http;
pub mod local;
pub mod service;

pub use credentials::ServiceAccountKey;
pub use error::{ErrorContext, RemoteError, RemoteResult};
pub use factory::{ServiceFactory, ServiceType};
#[cfg(feature = "remote-service")]
pub use http::HttpImageryService;
pub use local::LocalImageryService;
pub use service::ImageryService;

use std::future::Future;
use std::time::Duration;

/// Await a remote call, failing with a retryable timeout error once `limit`
/// elapses.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::timeout(format!(
            "{} did not complete within {}s",
            operation,
            limit.as_secs_f64()
        ))
        .with_operation(operation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded("noop", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = bounded::<(), _>("fail", Duration::from_secs(1), async {
            Err(RemoteError::query("rejected"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RemoteError::Query { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let err = bounded::<(), _>("get_map", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, RemoteError::Timeout { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.context().operation.as_deref(), Some("get_map"));
    }
}
