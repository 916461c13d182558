//! Sidenotes
//!
//! Inline sidenote annotations for rendered notes:
//! - Extraction of `^<id>[<content>]` markers into numbered reference glyphs
//! - Collision-free vertical layout of annotation panels beside the text
//! - A render-pass pipeline that sequences extraction, mount and layout
//!
//! The crate builds both as a WASM module for the host plugin and as a
//! native library used by the `sidenotes` command-line tool.

pub mod bindings;
pub mod config;
pub mod error;
pub mod extract;
pub mod glyph;
pub mod layout;
pub mod markup;
pub mod panel;
pub mod pipeline;
pub mod registry;

// Re-export common types
pub use config::{
    ExtractConfig, FrameStrategy, LayoutConfig, PanelConfig, ScanStrategy, SidenoteConfig,
};
pub use error::{Result, SidenoteError};
pub use extract::{Annotation, ExclusionPredicate, ExclusionRules, ExtractionResult, Extractor};
pub use glyph::{GlyphKey, GlyphRenderer};
pub use layout::{GeometrySnapshot, GeometrySource, Layout, LayoutEngine, PanelPlacement, Rect};
pub use panel::AnnotationPanel;
pub use pipeline::{FrameRequest, RelayoutThrottle, RenderPass, Session, Stage, Trigger};
pub use registry::PassRegistry;
