//! Render-pass pipeline
//!
//! Sequences one region through extract → mount → frame barrier → layout,
//! then keeps the layout current across geometry-invalidating events.
//!
//! # Stages
//!
//! - `begin_pass`: tears down the previous pass and extracts markers.
//! - `mark_mounted`: the host committed the rewritten markup; panels are
//!   built and a [`FrameRequest`] is handed out.
//! - `frame_ready`: the host answers the request from its next-frame
//!   callback, when glyph geometry is readable. The first layout runs here.
//! - `trigger`: scroll/resize/re-render recompute the full layout.
//!
//! A view that renders several regions (sections of one note, embeds) runs
//! one [`Session`] per region. Pass ids are unique across the process and
//! are stamped on every glyph and panel, so selectors of one region never
//! match another region's elements.
//!
//! Nothing here surfaces an error to the host: failures are logged and the
//! pass degrades to glyphs without positioned panels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::{FrameStrategy, SidenoteConfig};
use crate::error::{Result, SidenoteError};
use crate::extract::{ExtractionResult, Extractor};
use crate::glyph::GlyphKey;
use crate::layout::{GeometrySource, Layout, LayoutEngine};
use crate::panel::{render_container, AnnotationPanel};
use crate::registry::PassRegistry;

static NEXT_PASS: AtomicU32 = AtomicU32::new(1);

/// Process-wide pass id; 0 is reserved for extraction outside a session
fn next_pass_id() -> u32 {
    loop {
        let id = NEXT_PASS.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
    }
}

/// Geometry-invalidating host events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scroll,
    Resize,
    /// Same content re-rendered in place (layout change, pane switch)
    Rerender,
}

impl FromStr for Trigger {
    type Err = SidenoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scroll" => Ok(Trigger::Scroll),
            "resize" => Ok(Trigger::Resize),
            "rerender" | "render" => Ok(Trigger::Rerender),
            other => Err(SidenoteError::InvalidConfig(format!("unknown trigger: {}", other))),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Scroll => "scroll",
            Trigger::Resize => "resize",
            Trigger::Rerender => "rerender",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Markers replaced; markup not yet committed by the host
    Extracted,
    /// Markup committed; waiting for the next frame
    Mounted,
    /// Geometry readable; layout may run
    Ready,
}

/// Barrier token: layout may run once the host answers it on the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRequest {
    pass: u32,
}

impl FrameRequest {
    pub fn pass(&self) -> u32 {
        self.pass
    }

    /// Rebuild a token handed across an FFI boundary
    pub(crate) fn from_raw(pass: u32) -> Self {
        Self { pass }
    }
}

/// Rate limit for high-frequency triggers; the host supplies the clock
#[derive(Debug, Clone)]
pub struct RelayoutThrottle {
    interval_ms: f64,
    last_run: Option<f64>,
    pending: bool,
}

impl RelayoutThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_run: None,
            pending: false,
        }
    }

    /// Whether a re-layout may run at `now_ms`; a refusal is remembered
    pub fn admit(&mut self, now_ms: f64) -> bool {
        match self.last_run {
            Some(last) if now_ms - last < self.interval_ms => {
                self.pending = true;
                false
            }
            _ => {
                self.last_run = Some(now_ms);
                self.pending = false;
                true
            }
        }
    }

    /// Admit a previously refused re-layout once the interval has passed
    pub fn admit_pending(&mut self, now_ms: f64) -> bool {
        self.pending && self.admit(now_ms)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn reset(&mut self) {
        self.last_run = None;
        self.pending = false;
    }
}

/// One region's render pass
#[derive(Debug)]
pub struct RenderPass {
    id: u32,
    region: String,
    markup: String,
    registry: PassRegistry,
    stage: Stage,
    layout: Option<Layout>,
}

impl RenderPass {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Rewritten markup the host mounts
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn registry(&self) -> &PassRegistry {
        &self.registry
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }
}

/// Owns at most one live render pass for one region and everything needed
/// to lay it out
#[derive(Debug)]
pub struct Session {
    config: SidenoteConfig,
    extractor: Extractor,
    engine: LayoutEngine,
    throttle: RelayoutThrottle,
    pass: Option<RenderPass>,
}

impl Session {
    pub fn new(config: SidenoteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: Extractor::new(&config)?,
            engine: LayoutEngine::new(&config.layout),
            throttle: RelayoutThrottle::new(config.layout.relayout_interval_ms),
            config,
            pass: None,
        })
    }

    pub fn config(&self) -> &SidenoteConfig {
        &self.config
    }

    pub fn pass(&self) -> Option<&RenderPass> {
        self.pass.as_ref()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.pass.as_ref().map(|p| p.stage)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.pass.as_ref().and_then(|p| p.layout.as_ref())
    }

    pub fn panels(&self) -> &[AnnotationPanel] {
        self.pass
            .as_ref()
            .map(|p| p.registry.panels())
            .unwrap_or(&[])
    }

    /// CSS selector for the glyph `key` of the current pass
    pub fn glyph_selector(&self, key: GlyphKey) -> Option<String> {
        self.pass
            .as_ref()
            .map(|p| self.extractor.glyph().selector(p.id, key))
    }

    /// Start a new pass for `region`, discarding the previous one first
    pub fn begin_pass(&mut self, region: &str, markup: &str) -> ExtractionResult {
        self.teardown();

        let id = next_pass_id();
        let extraction = self.extractor.extract_for_pass(markup, id);

        tracing::debug!(
            pass = id,
            region = region,
            annotations = extraction.annotations.len(),
            "Began sidenote render pass"
        );

        self.pass = Some(RenderPass {
            id,
            region: region.to_string(),
            markup: extraction.markup.clone(),
            registry: PassRegistry::new(extraction.annotations.clone()),
            stage: Stage::Extracted,
            layout: None,
        });

        extraction
    }

    /// The host committed the rewritten markup
    ///
    /// Returns the frame request to answer from the next-frame callback, or
    /// `None` when there is nothing to lay out.
    pub fn mark_mounted(&mut self) -> Option<FrameRequest> {
        let pass = self.pass.as_mut()?;
        if pass.stage != Stage::Extracted {
            tracing::debug!(pass = pass.id, stage = ?pass.stage, "Pass already mounted");
            return None;
        }
        if pass.registry.is_empty() {
            return None;
        }

        pass.registry.mount_panels();
        pass.stage = Stage::Mounted;
        Some(FrameRequest { pass: pass.id })
    }

    /// Markup for the panel container of the current pass
    pub fn render_panels(&self) -> Result<String> {
        render_container(self.panels(), &self.config)
    }

    /// Next-frame callback: geometry is readable, run the first layout
    pub fn frame_ready<G: GeometrySource + ?Sized>(
        &mut self,
        request: FrameRequest,
        geometry: &G,
    ) -> Option<&Layout> {
        let pass = self.pass.as_mut()?;
        if pass.id != request.pass {
            tracing::warn!(
                requested = request.pass,
                current = pass.id,
                "Ignoring frame request from a discarded pass"
            );
            return None;
        }
        if pass.stage == Stage::Extracted {
            tracing::warn!(pass = pass.id, "Frame request answered before mount");
            return None;
        }

        pass.stage = Stage::Ready;
        self.throttle.reset();
        self.relayout(geometry)
    }

    /// Recompute after a geometry-invalidating event
    ///
    /// Returns the new layout, or `None` when the event was skipped, throttled
    /// or arrived before the first frame.
    pub fn trigger<G: GeometrySource + ?Sized>(
        &mut self,
        trigger: Trigger,
        geometry: &G,
        now_ms: f64,
    ) -> Option<&Layout> {
        if self.stage() != Some(Stage::Ready) {
            tracing::trace!(%trigger, "Layout not ready, ignoring trigger");
            return None;
        }

        match trigger {
            Trigger::Scroll if self.config.layout.frame == FrameStrategy::ViewportFixed => {
                return None;
            }
            Trigger::Scroll | Trigger::Resize => {
                if !self.throttle.admit(now_ms) {
                    return None;
                }
            }
            Trigger::Rerender => self.throttle.reset(),
        }

        self.relayout(geometry)
    }

    /// Run a re-layout the throttle postponed, once its interval has passed
    pub fn flush<G: GeometrySource + ?Sized>(
        &mut self,
        geometry: &G,
        now_ms: f64,
    ) -> Option<&Layout> {
        if self.stage() != Some(Stage::Ready) || !self.throttle.admit_pending(now_ms) {
            return None;
        }
        self.relayout(geometry)
    }

    /// Discard the current pass and all of its panels
    pub fn teardown(&mut self) -> usize {
        self.throttle.reset();
        match self.pass.take() {
            Some(mut pass) => {
                let discarded = pass.registry.clear_panels();
                tracing::debug!(pass = pass.id, panels = discarded, "Tore down sidenote pass");
                discarded
            }
            None => 0,
        }
    }

    fn relayout<G: GeometrySource + ?Sized>(&mut self, geometry: &G) -> Option<&Layout> {
        let pass = self.pass.as_mut()?;

        match self
            .engine
            .compute(&pass.region, pass.registry.annotations(), geometry)
        {
            Ok(layout) => {
                pass.registry.apply(&layout);
                pass.layout = Some(layout);
                pass.layout.as_ref()
            }
            Err(e) => {
                tracing::warn!(pass = pass.id, error = %e, "Sidenote layout aborted");
                pass.layout = None;
                None
            }
        }
    }
}
