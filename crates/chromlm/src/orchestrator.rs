//! Sequencing of analysis requests per surface.
//!
//! Each surface moves `Idle -> Checking -> Idle` on a cache hit and
//! `Idle -> Checking -> Requesting -> Idle` otherwise. A second request on a
//! surface that is not `Idle` is refused. Surfaces do not exclude each other;
//! two of them may analyze the same post at once, and the later ledger write
//! wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chromlm_client::{Analyzer, HttpAnalysisClient};
use chromlm_core::{AnalysisResult, PostUrl, Settings};
use chromlm_error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::context::AppContext;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Panel attached to the post page.
    Widget,
    /// Standalone window opened by the user.
    #[default]
    Popup,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Surface::Widget => "widget",
            Surface::Popup => "popup",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Checking,
    Requesting,
}

/// How a request ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Fresh verdict from the service, now stored in the history.
    Analyzed(AnalysisResult),
    /// Verdict served from the history without a network call.
    Cached(AnalysisResult),
    /// The surface already has a request in progress.
    Busy,
    /// Same post requested within the cooldown and nothing cached.
    Throttled,
    /// Automatic analysis is off; the user has to ask.
    AwaitingUser,
    /// The widget is switched off.
    Disabled,
}

impl RequestOutcome {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            RequestOutcome::Analyzed(r) | RequestOutcome::Cached(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, RequestOutcome::Cached(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// The user asked.
    Manual,
    /// A post page was opened.
    Automatic,
}

#[derive(Debug, Default)]
struct SurfaceState {
    phase: Phase,
    /// Post and start time of the last network request that succeeded.
    last_request: Option<(PostUrl, Instant)>,
}

type SurfaceMap = Mutex<HashMap<Surface, SurfaceState>>;

fn lock(surfaces: &SurfaceMap) -> MutexGuard<'_, HashMap<Surface, SurfaceState>> {
    surfaces.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a surface out of `Idle` and puts it back when dropped, whichever
/// way the request ends.
struct PhaseGuard<'a> {
    surfaces: &'a SurfaceMap,
    surface: Surface,
}

impl PhaseGuard<'_> {
    fn set(&self, phase: Phase) {
        lock(self.surfaces).entry(self.surface).or_default().phase = phase;
    }

    fn recently_requested(&self, url: &PostUrl, cooldown: Duration) -> bool {
        lock(self.surfaces)
            .get(&self.surface)
            .and_then(|state| state.last_request.as_ref())
            .is_some_and(|(last, at)| last == url && at.elapsed() < cooldown)
    }

    fn record_request(&self, url: &PostUrl, started: Instant) {
        lock(self.surfaces).entry(self.surface).or_default().last_request =
            Some((url.clone(), started));
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.set(Phase::Idle);
    }
}

/// Runs analysis requests for every surface of one process.
pub struct Orchestrator<A = HttpAnalysisClient> {
    ctx: Arc<AppContext>,
    analyzer: A,
    surfaces: SurfaceMap,
}

impl Orchestrator<HttpAnalysisClient> {
    /// Orchestrator talking to the configured analysis endpoint.
    pub fn with_http(ctx: Arc<AppContext>) -> Result<Self> {
        let client = ctx.http_client()?;
        Ok(Self::new(ctx, client))
    }
}

impl<A: Analyzer> Orchestrator<A> {
    pub fn new(ctx: Arc<AppContext>, analyzer: A) -> Self {
        Self {
            ctx,
            analyzer,
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn phase(&self, surface: Surface) -> Phase {
        lock(&self.surfaces)
            .get(&surface)
            .map(|state| state.phase)
            .unwrap_or_default()
    }

    /// Analysis asked for by the user. Uses the history first and only goes
    /// to the network on a miss.
    pub async fn request(&self, surface: Surface, url: &str) -> Result<RequestOutcome> {
        self.run(surface, url, Trigger::Manual).await
    }

    /// Analysis triggered by opening a post. Like [`Self::request`], except
    /// a disabled widget does nothing and, with `autoAnalyze` off, a cache
    /// miss waits for the user instead of calling the service.
    pub async fn visit(&self, surface: Surface, url: &str) -> Result<RequestOutcome> {
        self.run(surface, url, Trigger::Automatic).await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.ctx.update_settings(settings).await
    }

    #[instrument(skip(self))]
    async fn run(&self, surface: Surface, url: &str, trigger: Trigger) -> Result<RequestOutcome> {
        let url = PostUrl::parse(url).inspect_err(|_| warn!("not an Instagram post, ignoring"))?;

        let settings = self.ctx.settings().await;
        if trigger == Trigger::Automatic && surface == Surface::Widget && !settings.widget_enabled {
            debug!("widget disabled");
            return Ok(RequestOutcome::Disabled);
        }

        let Some(guard) = self.begin(surface) else {
            debug!("request already in progress");
            return Ok(RequestOutcome::Busy);
        };
        let throttled = guard.recently_requested(&url, self.ctx.cooldown());

        if let Some(result) = self.ctx.ledger().lookup(&url).await? {
            debug!(post_id = %url.post_id(), "history hit");
            return Ok(RequestOutcome::Cached(result));
        }
        if throttled {
            debug!("requested within cooldown");
            return Ok(RequestOutcome::Throttled);
        }
        if trigger == Trigger::Automatic && !settings.auto_analyze {
            debug!("automatic analysis off");
            return Ok(RequestOutcome::AwaitingUser);
        }

        guard.set(Phase::Requesting);
        let started = Instant::now();
        let mut result = self.analyzer.analyze(&url).await.map_err(|e| {
            let err = Error::from(e);
            warn!(severity = ?err.severity(), diagnostic = %err.diagnostic(), "analysis failed");
            err
        })?;
        if let Some(message) = result.error.take() {
            warn!(%message, "service declined to analyze");
            return Err(Error::BackendReported(message));
        }

        let record = self.ctx.ledger().upsert(&url, result.clone()).await?;
        guard.record_request(&url, started);
        info!(
            post_id = %record.post_id,
            mlm = result.is_mlm(),
            certainty = result.certainty_percent(),
            "analysis stored"
        );
        Ok(RequestOutcome::Analyzed(result))
    }

    /// Moves `surface` to `Checking`, or returns `None` if it is not idle.
    fn begin(&self, surface: Surface) -> Option<PhaseGuard<'_>> {
        let mut surfaces = lock(&self.surfaces);
        let state = surfaces.entry(surface).or_default();
        if state.phase != Phase::Idle {
            return None;
        }
        state.phase = Phase::Checking;
        Some(PhaseGuard {
            surfaces: &self.surfaces,
            surface,
        })
    }
}
