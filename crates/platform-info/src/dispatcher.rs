//! Platform dispatcher: picks the supported getter or the default for the
//! running platform, invokes it, and memoizes the result.

use platform::Platform;
use std::convert::Infallible;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::memo::{InfoValue, MemoCache, MemoPolicy};
use crate::{AsyncGetter, Getter, PlatformInfoError, Result};

/// Boxed future returned by the async half of [`PlatformInfoFunctions::into_pair`].
pub type InfoFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Options shared by every lookup.
#[derive(Debug, Clone)]
pub struct InfoOptions<T> {
    pub supported_platforms: Vec<Platform>,
    /// Returned on unsupported platforms. `None` turns that case into an
    /// `InvalidConfiguration` error.
    pub default_value: Option<T>,
    /// Enables memoization. An empty key disables it.
    pub memo_key: Option<String>,
    pub memo_policy: MemoPolicy,
}

impl<T> Default for InfoOptions<T> {
    fn default() -> Self {
        Self {
            supported_platforms: Vec::new(),
            default_value: None,
            memo_key: None,
            memo_policy: MemoPolicy::default(),
        }
    }
}

impl<T> InfoOptions<T> {
    pub fn new(supported_platforms: impl IntoIterator<Item = Platform>, default_value: T) -> Self {
        Self {
            supported_platforms: supported_platforms.into_iter().collect(),
            default_value: Some(default_value),
            ..Default::default()
        }
    }

    pub fn with_memo_key(mut self, memo_key: impl Into<String>) -> Self {
        self.memo_key = Some(memo_key.into());
        self
    }

    pub fn with_memo_policy(mut self, memo_policy: MemoPolicy) -> Self {
        self.memo_policy = memo_policy;
        self
    }

    fn active_memo_key(&self) -> Option<&str> {
        self.memo_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Select `getter` if `platform` is listed in `supported_platforms`,
/// otherwise `default_getter`. Nothing is invoked.
pub fn resolve_getter<'a, G: ?Sized>(
    platform: Platform,
    supported_platforms: &[Platform],
    getter: &'a G,
    default_getter: Option<&'a G>,
) -> Result<&'a G> {
    let entries = supported_platforms.iter().map(|supported| (*supported, getter));
    platform.select(entries, default_getter).ok_or_else(|| {
        warn!("No getter for platform {} and no default configured", platform);
        PlatformInfoError::InvalidConfiguration(format!(
            "platform {} is not in {:?} and no default was provided",
            platform, supported_platforms
        ))
    })
}

/// Dispatcher bound to one platform and one memo cache.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    platform: Platform,
    memo: MemoCache,
}

impl PlatformInfo {
    /// Dispatcher for `platform` backed by the process-wide cache.
    pub fn new(platform: Platform) -> Self {
        Self::with_cache(platform, MemoCache::global().clone())
    }

    pub fn with_cache(platform: Platform, memo: MemoCache) -> Self {
        Self { platform, memo }
    }

    /// Dispatcher for the detected platform backed by the process-wide cache.
    pub fn detect() -> Result<Self> {
        Ok(Self::new(Platform::current()?))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn memo(&self) -> &MemoCache {
        &self.memo
    }

    fn memo_hit<T: InfoValue>(&self, options: &InfoOptions<T>) -> Result<Option<T>> {
        let Some(key) = options.active_memo_key() else {
            return Ok(None);
        };

        let hit = self.memo.lookup::<T>(key, options.memo_policy)?;
        if hit.is_some() {
            debug!("Memo hit for {:?}", key);
        }
        Ok(hit)
    }

    fn memoize<T: InfoValue>(&self, options: &InfoOptions<T>, output: &T) {
        if let Some(key) = options.active_memo_key() {
            if self.memo.store(key, output, options.memo_policy) {
                debug!("Memoized result for {:?}", key);
            } else {
                debug!("Result for {:?} is falsy, not memoized", key);
            }
        }
    }

    /// Run `getter` if this platform is supported, otherwise return the default.
    pub fn get_sync<T: InfoValue>(
        &self,
        getter: &dyn Getter<T>,
        options: &InfoOptions<T>,
    ) -> Result<T> {
        if let Some(hit) = self.memo_hit(options)? {
            return Ok(hit);
        }

        let fallback = options
            .default_value
            .as_ref()
            .map(|value| move || Ok::<T, Infallible>(value.clone()));
        let selected = resolve_getter(
            self.platform,
            &options.supported_platforms,
            getter,
            fallback.as_ref().map(|f| f as &dyn Getter<T>),
        )?;

        let output = selected.get().map_err(PlatformInfoError::GetterFailed)?;
        self.memoize(options, &output);
        Ok(output)
    }

    /// Async counterpart of [`get_sync`](Self::get_sync). Concurrent calls with
    /// the same memo key may both run the getter; the last result stored wins.
    pub async fn get_async<T: InfoValue>(
        &self,
        getter: &dyn AsyncGetter<T>,
        options: &InfoOptions<T>,
    ) -> Result<T> {
        if let Some(hit) = self.memo_hit(options)? {
            return Ok(hit);
        }

        let fallback = options
            .default_value
            .as_ref()
            .map(|value| move || future::ready(Ok::<T, Infallible>(value.clone())));
        let selected = resolve_getter(
            self.platform,
            &options.supported_platforms,
            getter,
            fallback.as_ref().map(|f| f as &dyn AsyncGetter<T>),
        )?;

        let output = selected
            .get_async()
            .await
            .map_err(PlatformInfoError::GetterFailed)?;
        self.memoize(options, &output);
        Ok(output)
    }

    /// Bundle an async and a sync getter that share `options` and this
    /// dispatcher's cache. Nothing runs until one of them is called.
    pub fn functions<T: InfoValue>(
        &self,
        async_getter: impl AsyncGetter<T> + 'static,
        sync_getter: impl Getter<T> + 'static,
        options: InfoOptions<T>,
    ) -> PlatformInfoFunctions<T> {
        PlatformInfoFunctions {
            info: self.clone(),
            async_getter: Arc::new(async_getter),
            sync_getter: Arc::new(sync_getter),
            options,
        }
    }
}

/// Async and sync lookups over the same options and memo key.
pub struct PlatformInfoFunctions<T> {
    info: PlatformInfo,
    async_getter: Arc<dyn AsyncGetter<T>>,
    sync_getter: Arc<dyn Getter<T>>,
    options: InfoOptions<T>,
}

impl<T: InfoValue> PlatformInfoFunctions<T> {
    pub async fn get_async(&self) -> Result<T> {
        self.info
            .get_async(self.async_getter.as_ref(), &self.options)
            .await
    }

    pub fn get_sync(&self) -> Result<T> {
        self.info.get_sync(self.sync_getter.as_ref(), &self.options)
    }

    pub fn options(&self) -> &InfoOptions<T> {
        &self.options
    }

    /// Split into an `(async_fn, sync_fn)` pair of zero-argument closures.
    pub fn into_pair(
        self,
    ) -> (
        impl Fn() -> InfoFuture<T> + Send + Sync,
        impl Fn() -> Result<T> + Send + Sync,
    ) {
        let shared = Arc::new(self);
        let for_async = Arc::clone(&shared);

        let async_fn = move || -> InfoFuture<T> {
            let functions = Arc::clone(&for_async);
            Box::pin(async move { functions.get_async().await })
        };
        let sync_fn = move || shared.get_sync();

        (async_fn, sync_fn)
    }
}
