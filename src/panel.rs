//! Annotation panels
//!
//! A panel shows one annotation next to the document: a number label and the
//! annotation content. Panels are built fresh for every render pass from the
//! extracted annotations and only their vertical offset changes afterwards.
//!
//! Content markup goes through lol_html before it is rendered: links are
//! rewired for in-app navigation and, unless disabled, scripts and event
//! handlers are stripped.

use lol_html::{element, rewrite_str, RewriteStrSettings};
use serde::{Deserialize, Serialize};

use crate::config::{PanelConfig, SidenoteConfig};
use crate::error::{Result, SidenoteError};
use crate::extract::Annotation;
use crate::glyph::GlyphKey;

/// Floating block showing one annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPanel {
    /// Key of the glyph this panel belongs to
    pub key: GlyphKey,
    pub pass: u32,
    pub id: String,
    pub content: String,
    /// Assigned by layout; `None` until the first layout run
    pub vertical_offset: Option<f64>,
}

impl AnnotationPanel {
    pub fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            key: annotation.key,
            pass: annotation.pass,
            id: annotation.id.clone(),
            content: annotation.content.clone(),
            vertical_offset: None,
        }
    }

    /// Inline style positioning the panel, once laid out
    pub fn style(&self) -> Option<String> {
        self.vertical_offset.map(|top| format!("top: {}px;", top))
    }

    /// Panel markup with processed content
    pub fn render(&self, config: &SidenoteConfig) -> Result<String> {
        let panel = &config.panel;
        let content = if panel.plain_text {
            html_escape::encode_text(&self.content).into_owned()
        } else {
            let content = if panel.sanitize {
                sanitize_content(&self.content)?
            } else {
                self.content.clone()
            };
            rewire_links(&content, panel)?
        };

        let style = self
            .style()
            .map(|s| format!(" style=\"{}\"", s))
            .unwrap_or_default();

        Ok(format!(
            "<div class=\"{panel_class}\" {id_attr}=\"{id}\" {pass_attr}=\"{pass}\" {key_attr}=\"{key}\"{style}>\
             <span class=\"{number_class}\">{id}. </span>\
             <span class=\"{content_class}\">{content}</span></div>",
            panel_class = panel.panel_class,
            id_attr = config.extract.id_attribute,
            pass_attr = config.extract.pass_attribute,
            pass = self.pass,
            key_attr = config.extract.key_attribute,
            id = self.id,
            key = self.key,
            style = style,
            number_class = panel.number_class,
            content_class = panel.content_class,
            content = content,
        ))
    }
}

/// All panels of a pass inside the single per-region container
pub fn render_container(panels: &[AnnotationPanel], config: &SidenoteConfig) -> Result<String> {
    let mut out = format!("<div class=\"{}\">", config.panel.container_class);
    for panel in panels {
        out.push_str(&panel.render(config)?);
    }
    out.push_str("</div>");
    Ok(out)
}

fn is_external(href: &str) -> bool {
    let href = href.trim().to_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
}

/// Point links at in-app navigation instead of the browser
///
/// Relative links become internal links (`data-href` plus the internal link
/// class); external links open in a new context. Fragment links are kept.
pub fn rewire_links(html: &str, config: &PanelConfig) -> Result<String> {
    let internal_class = config.internal_link_class.as_str();

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                let Some(href) = el.get_attribute("href") else {
                    return Ok(());
                };

                if is_external(&href) {
                    el.set_attribute("target", "_blank")?;
                    el.set_attribute("rel", "noopener")?;
                } else if !href.starts_with('#') {
                    el.set_attribute("data-href", &href)?;
                    let class = match el.get_attribute("class") {
                        Some(existing)
                            if existing.split_ascii_whitespace().any(|c| c == internal_class) =>
                        {
                            existing
                        }
                        Some(existing) if !existing.trim().is_empty() => {
                            format!("{} {}", existing.trim(), internal_class)
                        }
                        _ => internal_class.to_string(),
                    };
                    el.set_attribute("class", &class)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| SidenoteError::Rewrite(e.to_string()))?;

    Ok(result)
}

/// Strip scripts, styles, event handlers and `javascript:` URLs
pub fn sanitize_content(html: &str) -> Result<String> {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }

                    for attr in ["href", "src"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if value.trim().to_lowercase().starts_with("javascript:") {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| SidenoteError::Rewrite(e.to_string()))?;

    Ok(result)
}
