//! Platform-specific info lookup
//! Runs a getter only on the platforms it supports, falls back to a default
//! everywhere else, and optionally memoizes the result under a string key.

use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

pub mod dispatcher;
pub mod memo;

pub use dispatcher::{resolve_getter, InfoFuture, InfoOptions, PlatformInfo, PlatformInfoFunctions};
pub use memo::{InfoValue, MemoCache, MemoPolicy, Truthy};
pub use platform::Platform;

/// Boxed error produced by a failing getter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Platform info errors
#[derive(Debug, Error)]
pub enum PlatformInfoError {
    #[error("Getter failed: {0}")]
    GetterFailed(#[source] BoxError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Memo entry {key:?} holds a value of a different type")]
    MemoTypeMismatch { key: String },

    #[error("Platform error: {0}")]
    Platform(#[from] platform::PlatformError),
}

impl PlatformInfoError {
    /// The getter's own error, if this failure came from a getter of that type.
    pub fn getter_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            PlatformInfoError::GetterFailed(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformInfoError>;

/// Synchronous getter. Implemented for any `Fn() -> Result<T, E>` closure.
pub trait Getter<T>: Send + Sync {
    fn get(&self) -> std::result::Result<T, BoxError>;
}

impl<T, E, F> Getter<T> for F
where
    F: Fn() -> std::result::Result<T, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn get(&self) -> std::result::Result<T, BoxError> {
        self().map_err(Into::into)
    }
}

/// Asynchronous getter. Implemented for any closure returning a `Send` future.
#[async_trait]
pub trait AsyncGetter<T>: Send + Sync {
    async fn get_async(&self) -> std::result::Result<T, BoxError>;
}

#[async_trait]
impl<T, E, F, Fut> AsyncGetter<T> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    async fn get_async(&self) -> std::result::Result<T, BoxError> {
        self().await.map_err(Into::into)
    }
}
