use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use plotters::prelude::*;

use crate::config::ChartConfig;
use crate::domain::email::{ChartArtifact, DailyCounts};
use crate::error::ChartError;

/// URL prefix under which the static directory is served.
pub const STATIC_URL_PREFIX: &str = "/static";
pub const FIXED_CHART_NAME: &str = "plot.svg";
const UNIQUE_CHART_PREFIX: &str = "plot-";

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub static_dir: PathBuf,
    pub unique_names: bool,
    pub width: u32,
    pub height: u32,
    /// Per-request charts kept on disk, the newest one included.
    pub keep_charts: usize,
}

impl From<&ChartConfig> for ChartSettings {
    fn from(cfg: &ChartConfig) -> Self {
        Self {
            static_dir: cfg.static_dir.clone(),
            unique_names: cfg.unique_names,
            width: cfg.width,
            height: cfg.height,
            keep_charts: cfg.keep_charts,
        }
    }
}

impl ChartSettings {
    /// File name for the next chart: per-request unless fixed naming is configured.
    fn next_file_name(&self) -> String {
        if self.unique_names {
            format!("{UNIQUE_CHART_PREFIX}{}.svg", uuid::Uuid::new_v4().simple())
        } else {
            FIXED_CHART_NAME.to_string()
        }
    }
}

fn is_unique_chart(name: &str) -> bool {
    name.starts_with(UNIQUE_CHART_PREFIX) && name.ends_with(".svg")
}

/// Deletes per-request charts in `dir` so that at most `keep` remain,
/// oldest first. `current` is never deleted. Returns how many were removed.
pub fn prune_charts(dir: &Path, current: &Path, keep: usize) -> io::Result<usize> {
    let mut others: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_chart = entry.file_name().to_str().is_some_and(is_unique_chart);
        if !is_chart || path == current || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        others.push((modified, path));
    }

    let allowed = keep.saturating_sub(1);
    if others.len() <= allowed {
        return Ok(0);
    }

    // newest first
    others.sort_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for (_, path) in others.drain(allowed..) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

fn draw_err(e: impl std::fmt::Display) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Draws a bar chart of messages per day.
///
/// Returns `Ok(None)` without touching the filesystem when there is nothing
/// to plot. Otherwise the static directory is created if needed and any
/// file with the same name is overwritten.
pub fn render_daily_counts(
    counts: &DailyCounts,
    search: &str,
    settings: &ChartSettings,
) -> Result<Option<ChartArtifact>, ChartError> {
    if counts.is_empty() {
        log::info!("No data to plot for \"{search}\"");
        return Ok(None);
    }

    fs::create_dir_all(&settings.static_dir)?;
    let file_name = settings.next_file_name();
    let path = settings.static_dir.join(&file_name);

    let labels: Vec<String> = counts
        .keys()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let max = counts.values().copied().max().unwrap_or(0);

    {
        let root = SVGBackend::new(&path, (settings.width, settings.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Messages per day ({search})"), ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(110)
            .y_label_area_size(60)
            .build_cartesian_2d((0..labels.len()).into_segmented(), 0..max + 1)
            .map_err(draw_err)?;

        let label_of = |v: &SegmentValue<usize>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                labels.get(*i).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&label_of)
            .x_label_style(
                ("sans-serif", 14)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_desc("Date")
            .y_desc("Messages")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.filled())
                    .margin(6)
                    .data(counts.values().enumerate().map(|(i, n)| (i, *n))),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    log::info!("Wrote chart for \"{search}\" to {}", path.display());

    if settings.unique_names {
        match prune_charts(&settings.static_dir, &path, settings.keep_charts) {
            Ok(0) => {}
            Ok(n) => log::debug!("Removed {n} old charts"),
            Err(e) => log::warn!("Could not prune old charts: {e}"),
        }
    }
    Ok(Some(ChartArtifact {
        url: format!("{STATIC_URL_PREFIX}/{file_name}"),
        path,
    }))
}
