//! Scan → fetch → image pipeline driving a `ProductView`.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::FoodscanConfig;
use crate::error::ScanError;
use crate::http::HttpClient;
use crate::image::{load_image, ImageAsset};
use crate::pipeline::runner::TaskRunner;
use crate::product::{fetch_product, ProductRecord};
use crate::scanner::{BarcodeScanner, ScanOptions, ScanResult};
use crate::view::{scanned_status, ProductCard, ProductView, STATUS_CANCELLED};

/// Pipeline states, in the order a scan can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning,
    Cancelled,
    Fetching,
    FetchError,
    Fetched,
    LoadingImage,
    ImageError,
    ImageLoaded,
    /// A newer scan (or teardown) took over; nothing more reached the view.
    Superseded,
}

/// Everything one pass through the pipeline produced.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub code: Option<String>,
    pub record: Option<ProductRecord>,
    pub image: Option<ImageAsset>,
    pub error: Option<String>,
    /// States visited, starting and ending with `Idle`.
    pub states: Vec<ScanState>,
}

impl ScanReport {
    fn new() -> Self {
        Self {
            code: None,
            record: None,
            image: None,
            error: None,
            states: vec![ScanState::Idle],
        }
    }

    fn enter(&mut self, state: ScanState) {
        tracing::debug!(?state, "scan state");
        self.states.push(state);
    }

    fn finish(mut self) -> Self {
        self.enter(ScanState::Idle);
        self
    }

    /// Last state before returning to `Idle`.
    pub fn outcome(&self) -> ScanState {
        self.states
            .iter()
            .rev()
            .copied()
            .find(|s| *s != ScanState::Idle)
            .unwrap_or(ScanState::Idle)
    }
}

#[derive(Default)]
struct ActiveScan {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Owns the HTTP client, the task runner and the view, and runs scans
/// against them.
///
/// A new scan supersedes any scan still in flight: the old one is cancelled
/// and can no longer update the view. `shutdown` does the same for all of
/// them and is meant for view teardown.
#[derive(Clone)]
pub struct ScanController {
    client: Arc<dyn HttpClient>,
    api_base_url: String,
    runner: TaskRunner,
    view: Arc<dyn ProductView>,
    active: Arc<Mutex<ActiveScan>>,
}

impl ScanController {
    pub fn new(
        client: Arc<dyn HttpClient>,
        config: &FoodscanConfig,
        view: Arc<dyn ProductView>,
    ) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.clone(),
            runner: TaskRunner::new(config.max_concurrent),
            view,
            active: Arc::new(Mutex::new(ActiveScan::default())),
        }
    }

    /// Invoke the scanner, then look up whatever it produced.
    pub async fn scan<S: BarcodeScanner + ?Sized>(
        &self,
        scanner: &mut S,
        options: &ScanOptions,
    ) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::new();
        report.enter(ScanState::Scanning);

        match scanner.scan(options).await? {
            ScanResult::Cancelled => {
                tracing::info!("scan cancelled");
                self.view.set_status(STATUS_CANCELLED);
                report.enter(ScanState::Cancelled);
                Ok(report.finish())
            }
            ScanResult::Code(code) => Ok(self.run_lookup(report, code).await),
        }
    }

    /// Look up a code that was obtained some other way (typed, or from a file).
    pub async fn lookup(&self, code: &str) -> ScanReport {
        let mut report = ScanReport::new();
        report.enter(ScanState::Scanning);
        match ScanResult::from_raw(Some(code)) {
            ScanResult::Code(code) => self.run_lookup(report, code).await,
            ScanResult::Cancelled => {
                self.view.set_status(STATUS_CANCELLED);
                report.enter(ScanState::Cancelled);
                report.finish()
            }
        }
    }

    /// Start a lookup in the background, superseding any lookup in flight.
    pub fn submit(&self, code: String) -> tokio::task::JoinHandle<ScanReport> {
        let controller = self.clone();
        tokio::spawn(async move { controller.lookup(&code).await })
    }

    /// Cancel everything in flight. Returns without waiting for the view;
    /// view updates from those scans that have not started yet are dropped.
    pub fn shutdown(&self) {
        self.runner.shutdown();
        if let Ok(mut active) = self.active.lock() {
            active.generation += 1;
            active.token = None;
        }
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let token = self.runner.group_token();
        let mut active = match self.active.lock() {
            Ok(a) => a,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = active.token.replace(token.clone()) {
            tracing::debug!("superseding in-flight scan");
            previous.cancel();
        }
        active.generation += 1;
        (active.generation, token)
    }

    fn is_current(&self, generation: u64) -> bool {
        let active = match self.active.lock() {
            Ok(a) => a,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.generation == generation && !self.runner.is_shut_down()
    }

    /// Apply `update` to the view only if scan `generation` is still current.
    ///
    /// The lock is released before the view runs, so a slow view cannot hold
    /// up `shutdown` or a newer scan, and a view may call back into the
    /// controller. An update that already started when the scan was
    /// superseded still finishes; the return value reports whether the scan
    /// was still current afterwards.
    fn deliver<F: FnOnce(&dyn ProductView)>(&self, generation: u64, update: F) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        update(self.view.as_ref());
        self.is_current(generation)
    }

    async fn run_lookup(&self, mut report: ScanReport, code: String) -> ScanReport {
        let (generation, token) = self.begin();
        report.code = Some(code.clone());

        if !self.deliver(generation, |v| v.set_status(&scanned_status(&code))) {
            report.enter(ScanState::Superseded);
            return report.finish();
        }

        report.enter(ScanState::Fetching);
        let client = Arc::clone(&self.client);
        let base = self.api_base_url.clone();
        let fetch_code = code.clone();
        let fetched = self
            .runner
            .spawn("fetch_product", &token, async move {
                fetch_product(client.as_ref(), &base, &fetch_code).await
            })
            .join()
            .await;

        let record = match fetched {
            None => {
                report.enter(ScanState::Superseded);
                return report.finish();
            }
            Some(Err(e)) => {
                tracing::warn!(code = %code, error = %e, "product fetch failed");
                report.error = Some(e.to_string());
                let shown = self.deliver(generation, |v| {
                    v.show_product(&ProductCard::fetch_failed());
                    v.show_image(&ImageAsset::Placeholder);
                });
                if shown {
                    report.enter(ScanState::FetchError);
                    report.image = Some(ImageAsset::Placeholder);
                } else {
                    report.enter(ScanState::Superseded);
                }
                return report.finish();
            }
            Some(Ok(record)) => record,
        };

        tracing::info!(code = %code, brand = ?record.brand, "product fetched");
        report.record = Some(record.clone());
        let image_url = record.image_url().map(str::to_string);

        let shown = self.deliver(generation, |v| {
            v.show_product(&ProductCard::from_record(&record));
            v.play_entrance();
            if image_url.is_none() {
                v.show_image(&ImageAsset::Placeholder);
            }
        });
        if !shown {
            report.enter(ScanState::Superseded);
            return report.finish();
        }
        report.enter(ScanState::Fetched);

        let url = match image_url {
            Some(url) => url,
            None => {
                report.image = Some(ImageAsset::Placeholder);
                return report.finish();
            }
        };

        report.enter(ScanState::LoadingImage);
        let client = Arc::clone(&self.client);
        let loaded = self
            .runner
            .spawn("load_image", &token, async move {
                load_image(client.as_ref(), Some(url.as_str())).await
            })
            .join()
            .await;

        let image = match loaded {
            Some(image) => image,
            None => {
                report.enter(ScanState::Superseded);
                return report.finish();
            }
        };

        if !self.deliver(generation, |v| v.show_image(&image)) {
            report.enter(ScanState::Superseded);
            return report.finish();
        }

        report.enter(if image.is_placeholder() {
            ScanState::ImageError
        } else {
            ScanState::ImageLoaded
        });
        report.image = Some(image);
        report.finish()
    }
}
