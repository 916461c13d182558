//! Sidenotes CLI
//!
//! Runs the extraction and layout pipeline over a markup file, for checking
//! how a note will be annotated without loading it in the host.
//!
//! ```text
//! sidenotes extract <markup-file|->
//! sidenotes layout <markup-file|-> <geometry.json>
//! ```

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sidenotes::{
    Annotation, GeometrySnapshot, Layout, Session, SidenoteConfig,
};

const USAGE: &str = "usage:\n  sidenotes extract <markup-file|->\n  sidenotes layout <markup-file|-> <geometry.json>";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport<'a> {
    markup: &'a str,
    annotations: &'a [Annotation],
    layout: Option<&'a Layout>,
    panels_html: String,
}

fn read_markup(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read markup from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read markup file {}", path))
}

fn extract(config: SidenoteConfig, path: &str) -> Result<()> {
    let markup = read_markup(path)?;
    let mut session = Session::new(config)?;
    let extraction = session.begin_pass(path, &markup);

    tracing::info!(annotations = extraction.annotations.len(), "Extraction complete");
    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

fn layout(config: SidenoteConfig, path: &str, geometry_path: &str) -> Result<()> {
    let markup = read_markup(path)?;
    let geometry_json = std::fs::read_to_string(geometry_path)
        .with_context(|| format!("Failed to read geometry file {}", geometry_path))?;
    let geometry: GeometrySnapshot =
        serde_json::from_str(&geometry_json).context("Invalid geometry snapshot")?;

    let mut session = Session::new(config)?;
    let extraction = session.begin_pass(path, &markup);

    if let Some(request) = session.mark_mounted() {
        session.frame_ready(request, &geometry);
    }

    let report = LayoutReport {
        markup: &extraction.markup,
        annotations: &extraction.annotations,
        layout: session.layout(),
        panels_html: session.render_panels()?,
    };

    if let Some(layout) = report.layout {
        tracing::info!(
            placed = layout.placements.len(),
            skipped = layout.skipped.len(),
            "Layout complete"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sidenotes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = SidenoteConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        SidenoteConfig::default()
    });

    tracing::info!("Starting sidenotes v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [command, path] if command == "extract" => extract(config, path),
        [command, path, geometry] if command == "layout" => layout(config, path, geometry),
        _ => bail!("{}", USAGE),
    }
}
