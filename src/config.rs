//! Configuration management for sidenote processing

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::{Result, SidenoteError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidenoteConfig {
    pub extract: ExtractConfig,
    pub layout: LayoutConfig,
    pub panel: PanelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractConfig {
    pub strategy: ScanStrategy,
    /// Element name used for reference glyphs
    pub glyph_tag: String,
    pub glyph_class: String,
    /// Attribute carrying the author-supplied id
    pub id_attribute: String,
    /// Attribute carrying the per-pass glyph key
    pub key_attribute: String,
    /// Attribute carrying the render pass that produced the glyph
    pub pass_attribute: String,
    /// Elements whose content is never scanned
    pub excluded_tags: Vec<String>,
    /// Classes whose elements are never scanned (panel classes are always added)
    pub excluded_classes: Vec<String>,
}

/// How marker syntax is located in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanStrategy {
    /// Character scan over serialized markup with nested brackets
    #[default]
    RawMarkup,
    /// Single pattern over plain text runs, first `]` closes
    TextNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Distance the panel top sits above its glyph
    pub lead: f64,
    /// Estimated panel height used by the collision sweep
    pub panel_height: f64,
    pub min_spacing: f64,
    pub frame: FrameStrategy,
    /// Prefer rendered panel heights over `panel_height` when the host reports them
    pub measure_panels: bool,
    /// Minimum time between two scroll/resize re-layouts
    pub relayout_interval_ms: f64,
}

impl FromStr for ScanStrategy {
    type Err = SidenoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rawmarkup" | "raw-markup" | "raw" => Ok(ScanStrategy::RawMarkup),
            "textnode" | "text-node" | "text" => Ok(ScanStrategy::TextNode),
            other => Err(SidenoteError::InvalidConfig(format!(
                "unknown scan strategy: {}",
                other
            ))),
        }
    }
}

/// Coordinate frame panel offsets are expressed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameStrategy {
    /// Offsets relative to the positioning container; every scroll re-lays out
    #[default]
    ContainerRelative,
    /// Frame pinned to the viewport; scrolling is left to the frame itself
    ViewportFixed,
}

impl FromStr for FrameStrategy {
    type Err = SidenoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" | "containerrelative" | "container-relative" => {
                Ok(FrameStrategy::ContainerRelative)
            }
            "viewport" | "viewportfixed" | "viewport-fixed" => Ok(FrameStrategy::ViewportFixed),
            other => Err(SidenoteError::InvalidConfig(format!(
                "unknown frame strategy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelConfig {
    pub container_class: String,
    pub panel_class: String,
    pub number_class: String,
    pub content_class: String,
    pub internal_link_class: String,
    /// Strip scripts and event handlers from panel content
    pub sanitize: bool,
    /// Show content as escaped plain text instead of markup
    pub plain_text: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategy: ScanStrategy::RawMarkup,
            glyph_tag: "sup".to_string(),
            glyph_class: "sidenote-ref".to_string(),
            id_attribute: "data-sidenote-id".to_string(),
            key_attribute: "data-sidenote-key".to_string(),
            pass_attribute: "data-sidenote-pass".to_string(),
            excluded_tags: vec!["code".to_string(), "pre".to_string()],
            excluded_classes: vec![],
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lead: 20.0,
            panel_height: 80.0,
            min_spacing: 20.0,
            frame: FrameStrategy::ContainerRelative,
            measure_panels: false,
            relayout_interval_ms: 16.0,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            container_class: "sidenote-container".to_string(),
            panel_class: "sidenote".to_string(),
            number_class: "sidenote-number".to_string(),
            content_class: "sidenote-content".to_string(),
            internal_link_class: "internal-link".to_string(),
            sanitize: true,
            plain_text: false,
        }
    }
}

impl SidenoteConfig {
    /// Parse host-supplied settings; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SidenoteConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load overrides from `SIDENOTE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = SidenoteConfig::default();

        if let Ok(strategy) = env::var("SIDENOTE_STRATEGY") {
            config.extract.strategy = strategy.parse()?;
        }
        if let Ok(tags) = env::var("SIDENOTE_EXCLUDED_TAGS") {
            config.extract.excluded_tags = tags
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Ok(frame) = env::var("SIDENOTE_FRAME") {
            config.layout.frame = frame.parse()?;
        }
        config.layout.lead = env_f64("SIDENOTE_LEAD", config.layout.lead)?;
        config.layout.panel_height = env_f64("SIDENOTE_PANEL_HEIGHT", config.layout.panel_height)?;
        config.layout.min_spacing = env_f64("SIDENOTE_MIN_SPACING", config.layout.min_spacing)?;
        config.layout.relayout_interval_ms =
            env_f64("SIDENOTE_RELAYOUT_INTERVAL_MS", config.layout.relayout_interval_ms)?;
        config.layout.measure_panels = env::var("SIDENOTE_MEASURE_PANELS")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(config.layout.measure_panels);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let constants = [
            ("lead", self.layout.lead),
            ("panelHeight", self.layout.panel_height),
            ("minSpacing", self.layout.min_spacing),
            ("relayoutIntervalMs", self.layout.relayout_interval_ms),
        ];
        for (name, value) in constants {
            if !value.is_finite() || value < 0.0 {
                return Err(SidenoteError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let names = [
            ("glyphTag", &self.extract.glyph_tag),
            ("glyphClass", &self.extract.glyph_class),
            ("idAttribute", &self.extract.id_attribute),
            ("keyAttribute", &self.extract.key_attribute),
            ("passAttribute", &self.extract.pass_attribute),
            ("containerClass", &self.panel.container_class),
            ("panelClass", &self.panel.panel_class),
            ("numberClass", &self.panel.number_class),
            ("contentClass", &self.panel.content_class),
            ("internalLinkClass", &self.panel.internal_link_class),
        ];
        for (name, value) in names {
            if value.trim().is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"') {
                return Err(SidenoteError::InvalidConfig(format!(
                    "{} must be a single non-empty name",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn env_f64(key: &str, fallback: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SidenoteError::InvalidConfig(format!("{} is not a number: {}", key, raw))),
        Err(_) => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_plugin_constants() {
        let config = SidenoteConfig::default();
        assert_eq!(config.layout.lead, 20.0);
        assert_eq!(config.layout.panel_height, 80.0);
        assert_eq!(config.layout.min_spacing, 20.0);
        assert_eq!(config.extract.strategy, ScanStrategy::RawMarkup);
        assert_eq!(config.extract.excluded_tags, vec!["code", "pre"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SidenoteConfig::from_json(
            r#"{"layout": {"panelHeight": 120, "frame": "viewportFixed"}, "extract": {"strategy": "textNode"}}"#,
        )
        .unwrap();

        assert_eq!(config.layout.panel_height, 120.0);
        assert_eq!(config.layout.lead, 20.0);
        assert_eq!(config.layout.frame, FrameStrategy::ViewportFixed);
        assert_eq!(config.extract.strategy, ScanStrategy::TextNode);
        assert_eq!(config.panel.panel_class, "sidenote");
    }

    #[test]
    fn test_from_json_rejects_negative_spacing() {
        let err = SidenoteConfig::from_json(r#"{"layout": {"minSpacing": -4}}"#).unwrap_err();
        assert!(matches!(err, SidenoteError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_quote_in_panel_classes() {
        for field in ["number", "content", "link"] {
            let mut config = SidenoteConfig::default();
            let broken = r#"x" onmouseover="y"#.to_string();
            match field {
                "number" => config.panel.number_class = broken,
                "content" => config.panel.content_class = broken,
                _ => config.panel.internal_link_class = broken,
            }
            let err = config.validate().unwrap_err();
            assert!(matches!(err, SidenoteError::InvalidConfig(_)), "{}", field);
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("textNode".parse::<ScanStrategy>().unwrap(), ScanStrategy::TextNode);
        assert_eq!(" raw ".parse::<ScanStrategy>().unwrap(), ScanStrategy::RawMarkup);
        assert!("regexp".parse::<ScanStrategy>().is_err());

        assert_eq!("viewport".parse::<FrameStrategy>().unwrap(), FrameStrategy::ViewportFixed);
        assert_eq!(
            "containerRelative".parse::<FrameStrategy>().unwrap(),
            FrameStrategy::ContainerRelative
        );
        assert!("page".parse::<FrameStrategy>().is_err());
    }

    #[test]
    fn test_from_env_rejects_unknown_strategy() {
        env::set_var("SIDENOTE_STRATEGY", "regexp");
        let result = SidenoteConfig::from_env();
        env::remove_var("SIDENOTE_STRATEGY");
        assert!(matches!(result, Err(SidenoteError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_blank_class() {
        let mut config = SidenoteConfig::default();
        config.panel.panel_class = "two words".to_string();
        assert!(config.validate().is_err());
    }
}
