//! PNG chart rendering with `plotters`.
//!
//! Each chart is split into a pure data-preparation step (tested below) and a
//! drawing step that writes a bitmap. Drawing failures are reported as
//! [`AnalyzerError::Chart`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use defi_core::config::ChartConfig;
use defi_core::error::{AnalyzerError, Result};
use defi_core::formatting::{format_compact_currency, percentage};
use defi_core::models::{CategoryAggregate, ProtocolRecord};
use defi_core::statistics::{mean, median};
use defi_data::aggregator::CategoryAggregator;
use plotters::prelude::*;
use tracing::{debug, info};

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Fixed TVL bands: `(lower bound, label)`. Each band runs up to the next
/// lower bound; the last is open-ended.
pub const TVL_BANDS: [(f64, &str); 8] = [
    (0.0, "$0-10K"),
    (1e4, "$10K-100K"),
    (1e5, "$100K-1M"),
    (1e6, "$1M-10M"),
    (1e7, "$10M-100M"),
    (1e8, "$100M-1B"),
    (1e9, "$1B-10B"),
    (1e10, "$10B+"),
];

const HISTOGRAM_COLOR: RGBColor = RGBColor(0x2e, 0xcc, 0x71);

const PALETTE: [RGBColor; 10] = [
    RGBColor(0xFF, 0x9B, 0x9B),
    RGBColor(0xC4, 0xA4, 0x84),
    RGBColor(0x90, 0xBE, 0x6D),
    RGBColor(0x43, 0xAA, 0x8B),
    RGBColor(0x4D, 0x90, 0x8E),
    RGBColor(0x57, 0x75, 0x90),
    RGBColor(0x27, 0x7D, 0xA1),
    RGBColor(0xF9, 0x41, 0x44),
    RGBColor(0xF3, 0x72, 0x2C),
    RGBColor(0xF8, 0x96, 0x1E),
];

// ── Data preparation ──────────────────────────────────────────────────────────

/// Index into [`TVL_BANDS`] for a positive TVL.
pub fn band_index(tvl: f64) -> usize {
    TVL_BANDS
        .iter()
        .rposition(|(lower, _)| tvl >= *lower)
        .unwrap_or(0)
}

/// Count protocols per TVL band. Zero (and coerced) TVL values are left out.
pub fn bucket_tvl(values: &[f64]) -> [usize; TVL_BANDS.len()] {
    let mut counts = [0usize; TVL_BANDS.len()];
    for &tvl in values.iter().filter(|v| **v > 0.0) {
        counts[band_index(tvl)] += 1;
    }
    counts
}

/// Summary shown in the corner of the TVL histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct TvlSummary {
    /// Protocols with non-zero TVL.
    pub protocols: usize,
    pub median: f64,
    pub mean: f64,
}

impl TvlSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let non_zero: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
        Self {
            protocols: non_zero.len(),
            median: median(&non_zero),
            mean: mean(&non_zero),
        }
    }

    fn lines(&self) -> [String; 3] {
        [
            format!("Total Protocols: {}", self.protocols),
            format!("Median TVL: {}", format_compact_currency(self.median)),
            format!("Mean TVL: {}", format_compact_currency(self.mean)),
        ]
    }
}

/// Protocol count per category, most common first (ties by name).
pub fn category_counts(records: &[ProtocolRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.category.as_str()).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(category, n)| (category.to_string(), n))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
}

/// `(protocol, tvl)` bars for the `n` largest protocols.
pub fn top_protocol_bars(records: &[ProtocolRecord], n: usize) -> Vec<(String, f64)> {
    CategoryAggregator::top_protocols(records, n)
        .into_iter()
        .map(|r| (r.protocol, r.tvl))
        .collect()
}

/// One point on the composability landscape.
#[derive(Debug, Clone, PartialEq)]
pub struct LandscapePoint {
    pub label: String,
    pub total_tvl: f64,
    pub protocol_count: usize,
    /// Marker radius in pixels.
    pub radius: u32,
}

const MIN_RADIUS: f64 = 4.0;
const MAX_RADIUS: f64 = 24.0;

/// Scatter points for groups with positive TVL. Marker radius scales with
/// yield potential relative to the largest group.
pub fn landscape_points(aggregates: &[CategoryAggregate]) -> Vec<LandscapePoint> {
    let max_yield = aggregates
        .iter()
        .map(|a| a.yield_potential)
        .fold(0.0_f64, f64::max);

    aggregates
        .iter()
        .filter(|a| a.total_tvl > 0.0)
        .map(|a| {
            let scale = if max_yield > 0.0 {
                (a.yield_potential / max_yield).clamp(0.0, 1.0)
            } else {
                0.0
            };
            LandscapePoint {
                label: format!("{} / {}", a.category, a.subcategory),
                total_tvl: a.total_tvl,
                protocol_count: a.protocol_count,
                radius: (MIN_RADIUS + scale * (MAX_RADIUS - MIN_RADIUS)).round() as u32,
            }
        })
        .collect()
}

// ── ChartRenderer ─────────────────────────────────────────────────────────────

/// A rendered chart: display title and PNG location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub title: String,
    pub path: PathBuf,
}

/// Draws every chart into one directory.
pub struct ChartRenderer<'a> {
    config: &'a ChartConfig,
    output_dir: &'a Path,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(config: &'a ChartConfig, output_dir: &'a Path) -> Self {
        Self { config, output_dir }
    }

    /// Render all charts, returning them in report order.
    pub fn render_all(
        &self,
        records: &[ProtocolRecord],
        aggregates: &[CategoryAggregate],
    ) -> Result<Vec<RenderedChart>> {
        let tvl: Vec<f64> = records.iter().map(|r| r.tvl).collect();

        let charts = vec![
            self.render(
                "TVL Distribution",
                "tvl_distribution.png",
                |path, size| draw_tvl_distribution(path, size, &tvl),
            )?,
            self.render("Top Protocols", "top_protocols.png", |path, size| {
                draw_top_protocols(path, size, &top_protocol_bars(records, self.config.top_n))
            })?,
            self.render(
                "Category Distribution",
                "category_distribution.png",
                |path, size| draw_category_distribution(path, size, &category_counts(records)),
            )?,
            self.render(
                "Composability Landscape",
                "composability_landscape.png",
                |path, size| draw_landscape(path, size, &landscape_points(aggregates)),
            )?,
        ];

        info!("Generated {} charts in {}", charts.len(), self.output_dir.display());
        Ok(charts)
    }

    fn render<F>(&self, title: &str, file_name: &str, draw: F) -> Result<RenderedChart>
    where
        F: FnOnce(&Path, (u32, u32)) -> DrawResult,
    {
        let path = self.output_dir.join(file_name);
        draw(&path, (self.config.width, self.config.height)).map_err(|e| {
            AnalyzerError::Chart(format!("{} ({}): {}", title, path.display(), e))
        })?;
        debug!("Chart saved: {}", path.display());
        Ok(RenderedChart {
            title: title.to_string(),
            path,
        })
    }
}

// ── Drawing ───────────────────────────────────────────────────────────────────

fn draw_tvl_distribution(path: &Path, size: (u32, u32), tvl: &[f64]) -> DrawResult {
    let counts = bucket_tvl(tvl);
    let summary = TvlSummary::from_values(tvl);
    let y_max = counts.iter().copied().max().unwrap_or(0) as f64 * 1.2 + 1.0;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Distribution of Total Value Locked (TVL) Across Protocols",
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..TVL_BANDS.len() as u32).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Total Value Locked")
        .y_desc("Number of Protocols")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => TVL_BANDS
                .get(*i as usize)
                .map(|(_, label)| label.to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(HISTOGRAM_COLOR.filled())
            .margin(8)
            .data(counts.iter().enumerate().map(|(i, c)| (i as u32, *c as f64))),
    )?;

    chart.draw_series(
        counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, c)| {
                let pct = percentage(*c as f64, summary.protocols as f64, 1);
                Text::new(
                    format!("{} ({:.1}%)", c, pct),
                    (SegmentValue::CenterOf(i as u32), *c as f64 + y_max * 0.02),
                    ("sans-serif", 16).into_font(),
                )
            }),
    )?;

    let (width, _) = size;
    let box_left = width as i32 - 300;
    root.draw(&Rectangle::new(
        [(box_left, 60), (width as i32 - 40, 150)],
        WHITE.mix(0.8).filled(),
    ))?;
    for (row, line) in summary.lines().iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (box_left + 12, 70 + row as i32 * 26),
            ("sans-serif", 18).into_font(),
        ))?;
    }

    root.present()?;
    Ok(())
}

fn draw_top_protocols(path: &Path, size: (u32, u32), bars: &[(String, f64)]) -> DrawResult {
    let y_max = bars.iter().map(|(_, tvl)| *tvl).fold(0.0_f64, f64::max) * 1.15 + 1.0;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Top {} Protocols by Total Value Locked (TVL)", bars.len()),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..bars.len().max(1) as u32).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Protocol")
        .y_desc("Total Value Locked")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => bars
                .get(*i as usize)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .y_label_formatter(&|v| format_compact_currency(*v))
        .draw()?;

    for (i, _) in bars.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(10)
                .data(std::iter::once((i as u32, bars[i].1))),
        )?;
    }

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, tvl))| {
        Text::new(
            format_compact_currency(*tvl),
            (SegmentValue::CenterOf(i as u32), tvl * 1.02),
            ("sans-serif", 16).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_category_distribution(
    path: &Path,
    size: (u32, u32),
    counts: &[(String, usize)],
) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Distribution of Protocols by Category", ("sans-serif", 28))?;

    if counts.is_empty() {
        root.present()?;
        return Ok(());
    }

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;
    let sizes: Vec<f64> = counts.iter().map(|(_, n)| *n as f64).collect();
    let labels: Vec<String> = counts.iter().map(|(category, _)| category.clone()).collect();
    let colors: Vec<RGBColor> = (0..counts.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 16).into_font());
    pie.percentages(("sans-serif", 14).into_font().color(&BLACK));
    root.draw(&pie)?;

    root.present()?;
    Ok(())
}

fn draw_landscape(path: &Path, size: (u32, u32), points: &[LandscapePoint]) -> DrawResult {
    let x_min = points
        .iter()
        .map(|p| p.total_tvl)
        .fold(f64::INFINITY, f64::min)
        .min(1.0);
    let x_max = points
        .iter()
        .map(|p| p.total_tvl)
        .fold(10.0_f64, f64::max)
        * 10.0;
    let y_max = points.iter().map(|p| p.protocol_count).max().unwrap_or(0) as f64 + 2.0;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Composability Landscape", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((x_min..x_max).log_scale(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Total Value Locked (Log Scale)")
        .y_desc("Number of Protocols")
        .x_label_formatter(&|v| format_compact_currency(*v))
        .draw()?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        let color = PALETTE[i % PALETTE.len()];
        EmptyElement::at((p.total_tvl, p.protocol_count as f64))
            + Circle::new((0, 0), p.radius, color.mix(0.6).filled())
            + Text::new(
                p.label.clone(),
                (p.radius as i32 + 4, -8),
                ("sans-serif", 14).into_font(),
            )
    }))?;

    root.present()?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
