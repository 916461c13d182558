//! WASM surface for the host plugin
//!
//! The host owns the document: it mounts the rewritten markup, schedules the
//! next-frame callback, reads glyph rects and applies the returned offsets.
//! Geometry crosses the boundary as a [`GeometrySnapshot`] object.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::SidenoteConfig;
use crate::glyph::GlyphKey;
use crate::layout::{GeometrySnapshot, Layout};
use crate::pipeline::{FrameRequest, Session, Trigger};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_error(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(to_js_error)
}

fn layout_to_js(layout: Option<&Layout>) -> Result<JsValue, JsValue> {
    match layout {
        Some(layout) => to_js(layout),
        None => Ok(JsValue::NULL),
    }
}

/// Sidenote processor - one per rendered region
#[wasm_bindgen]
pub struct SidenoteProcessor {
    session: Session,
}

#[wasm_bindgen]
impl SidenoteProcessor {
    /// Create a processor; `config` may be `undefined` for defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<SidenoteProcessor, JsValue> {
        let config: SidenoteConfig = if config.is_undefined() || config.is_null() {
            SidenoteConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(to_js_error)?
        };

        let session = Session::new(config).map_err(to_js_error)?;
        Ok(Self { session })
    }

    /// Extract markers from a region's markup
    /// Returns `{ pass, markup, annotations }`
    #[wasm_bindgen(js_name = "beginPass")]
    pub fn begin_pass(&mut self, region: &str, markup: &str) -> Result<JsValue, JsValue> {
        let extraction = self.session.begin_pass(region, markup);
        to_js(&extraction)
    }

    /// CSS selector for the glyph with `key` in the current pass
    #[wasm_bindgen(js_name = "glyphSelector")]
    pub fn glyph_selector(&self, key: usize) -> Option<String> {
        self.session.glyph_selector(GlyphKey(key))
    }

    /// Signal that the rewritten markup is committed
    /// Returns the pass id to hand back from the next-frame callback
    #[wasm_bindgen(js_name = "markMounted")]
    pub fn mark_mounted(&mut self) -> Option<u32> {
        self.session.mark_mounted().map(|request| request.pass())
    }

    /// Markup for the panel container of the current pass
    #[wasm_bindgen(js_name = "panelsHtml")]
    pub fn panels_html(&self) -> Result<String, JsValue> {
        self.session.render_panels().map_err(to_js_error)
    }

    /// Next-frame callback; returns the layout or `null`
    #[wasm_bindgen(js_name = "frameReady")]
    pub fn frame_ready(&mut self, pass: u32, geometry: JsValue) -> Result<JsValue, JsValue> {
        let geometry: GeometrySnapshot =
            serde_wasm_bindgen::from_value(geometry).map_err(to_js_error)?;
        layout_to_js(
            self.session
                .frame_ready(FrameRequest::from_raw(pass), &geometry),
        )
    }

    /// `kind` is `scroll`, `resize` or `rerender`; returns the layout or `null`
    pub fn trigger(&mut self, kind: &str, geometry: JsValue, now_ms: f64) -> Result<JsValue, JsValue> {
        let trigger: Trigger = kind.parse().map_err(to_js_error)?;
        let geometry: GeometrySnapshot =
            serde_wasm_bindgen::from_value(geometry).map_err(to_js_error)?;
        layout_to_js(self.session.trigger(trigger, &geometry, now_ms))
    }

    /// Run a throttled re-layout that is still pending
    pub fn flush(&mut self, geometry: JsValue, now_ms: f64) -> Result<JsValue, JsValue> {
        let geometry: GeometrySnapshot =
            serde_wasm_bindgen::from_value(geometry).map_err(to_js_error)?;
        layout_to_js(self.session.flush(&geometry, now_ms))
    }

    /// Discard the current pass; returns the number of panels dropped
    pub fn teardown(&mut self) -> usize {
        self.session.teardown()
    }
}
