//! Mock data providers.
//!
//! Each provider answers with a coverage sized to `request.target`, or
//! fails in one specific way.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ogc_common::{Coverage, DataProvider, FetchRequest, ProviderError};
use tokio::sync::Notify;

/// Every cell holds the same value.
pub struct ConstantProvider {
    pub value: f32,
    calls: AtomicUsize,
}

impl ConstantProvider {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for ConstantProvider {
    async fn fetch(&self, _layer: &str, request: &FetchRequest) -> Result<Coverage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Coverage::filled(
            request.target.width(),
            request.target.height(),
            self.value,
        ))
    }
}

/// West-to-east ramp over the layer footprint.
///
/// A cell whose centre falls at native x `min_x + t * width` gets
/// `low + t * (high - low)`. Cells outside the footprint are `NaN`. The
/// target cell centres are mapped linearly into `request_native`, which is
/// exact for requests in the layer CRS.
pub struct GradientProvider {
    pub low: f32,
    pub high: f32,
}

impl GradientProvider {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

#[async_trait]
impl DataProvider for GradientProvider {
    async fn fetch(&self, _layer: &str, request: &FetchRequest) -> Result<Coverage, ProviderError> {
        let width = request.target.width();
        let height = request.target.height();
        let native = &request.overlap.request_native;
        let footprint = &request.overlap.footprint;

        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            let y = native.max_y - (row as f64 + 0.5) * native.height() / height as f64;
            for col in 0..width {
                let x = native.min_x + (col as f64 + 0.5) * native.width() / width as f64;
                if !footprint.contains_point(x, y) {
                    values.push(f32::NAN);
                    continue;
                }
                let t = ((x - footprint.min_x) / footprint.width()).clamp(0.0, 1.0) as f32;
                values.push(self.low + t * (self.high - self.low));
            }
        }
        Coverage::new(width, height, values)
    }
}

/// Always fails with a backend error carrying `message`.
pub struct FailingProvider {
    pub message: String,
}

impl FailingProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DataProvider for FailingProvider {
    async fn fetch(&self, _layer: &str, _request: &FetchRequest) -> Result<Coverage, ProviderError> {
        Err(ProviderError::backend(self.message.clone()))
    }
}

/// Reports that nothing exists for any request.
pub struct NoDataProvider;

#[async_trait]
impl DataProvider for NoDataProvider {
    async fn fetch(&self, layer: &str, _request: &FetchRequest) -> Result<Coverage, ProviderError> {
        Err(ProviderError::NoData(format!("nothing stored for {}", layer)))
    }
}

/// Never completes. Records when a fetch starts and when its future is
/// dropped.
#[derive(Default)]
pub struct HangingProvider {
    started: Notify,
    in_flight: AtomicUsize,
    dropped: AtomicBool,
}

impl HangingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once a fetch is waiting.
    pub async fn wait_started(&self) {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return;
        }
        self.started.notified().await;
    }

    /// True once a pending fetch future has been dropped.
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag<'a>(&'a HangingProvider);

impl Drop for DropFlag<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataProvider for HangingProvider {
    async fn fetch(&self, _layer: &str, _request: &FetchRequest) -> Result<Coverage, ProviderError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(self);
        self.started.notify_one();
        std::future::pending::<()>().await;
        Err(ProviderError::NoData("unreachable".into()))
    }
}
