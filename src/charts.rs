//! Static figures.
//!
//! Each figure has fixed bindings. The backend is chosen from the output
//! extension: `.svg` is drawn as SVG, anything else as a bitmap (PNG).

use crate::affiliations::AffiliationRow;
use crate::citations::CitationRow;
use crate::datasets::GrowthPoint;
use crate::error::{MetricsError, Result};
use crate::mriqc::MriqcSeries;
use chrono::{Days, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

const CITATION_SIZE: (u32, u32) = (1200, 700);
/// 800x400 at scale 2
const MAP_SIZE: (u32, u32) = (1600, 800);
const GROWTH_SIZE: (u32, u32) = (1500, 900);

fn chart_err<E: std::fmt::Display>(e: E) -> MetricsError {
    MetricsError::Chart(e.to_string())
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// Dispatch a generic drawing function to the backend matching `$path`.
macro_rules! render {
    ($path:expr, $size:expr, $draw:ident ( $($arg:expr),* )) => {{
        let path: &Path = $path;
        let result = if is_svg(path) {
            $draw(&SVGBackend::new(path, $size).into_drawing_area(), $($arg),*)
        } else {
            $draw(&BitMapBackend::new(path, $size).into_drawing_area(), $($arg),*)
        };
        if result.is_ok() {
            info!(path = %path.display(), "Saved figure");
        }
        result
    }};
}

/// Date range covering `dates`, widened to at least one day
fn date_span(dates: impl Iterator<Item = NaiveDate>) -> Result<(NaiveDate, NaiveDate)> {
    let (mut first, mut last) = (None::<NaiveDate>, None::<NaiveDate>);
    for date in dates {
        first = Some(first.map_or(date, |f| f.min(date)));
        last = Some(last.map_or(date, |l| l.max(date)));
    }
    match (first, last) {
        (Some(first), Some(last)) if first == last => Ok((first, last + Days::new(1))),
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(MetricsError::Validation("nothing to plot".to_string())),
    }
}

/// Citations per year, stacked by paper.
pub fn citation_bars(rows: &[CitationRow], path: &Path) -> Result<()> {
    render!(path, CITATION_SIZE, draw_citation_bars(rows))
}

fn draw_citation_bars<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, rows: &[CitationRow]) -> Result<()> {
    if rows.is_empty() {
        return Err(MetricsError::Validation("no citation rows to plot".to_string()));
    }

    let mut papers: Vec<&str> = Vec::new();
    let mut totals: BTreeMap<i32, u32> = BTreeMap::new();
    for row in rows {
        if !papers.contains(&row.papers.as_str()) {
            papers.push(&row.papers);
        }
        *totals.entry(row.years).or_insert(0) += row.nb_citations;
    }
    let years: BTreeSet<i32> = totals.keys().copied().collect();
    let (first, last) = match (years.first(), years.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(MetricsError::Validation("no citation years".to_string())),
    };
    let max_total = totals.values().copied().max().unwrap_or(0);

    root.fill(&WHITE).map_err(chart_err)?;
    let mut chart = ChartBuilder::on(root)
        .caption("Citation count per year", ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d((first..last + 1).into_segmented(), 0u32..max_total + 1)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Year")
        .y_desc("Number of citations")
        .draw()
        .map_err(chart_err)?;

    let mut stacked: BTreeMap<i32, u32> = BTreeMap::new();
    for (idx, paper) in papers.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.9);
        let bars: Vec<_> = rows
            .iter()
            .filter(|r| r.papers == *paper)
            .map(|r| {
                let bottom = stacked.entry(r.years).or_insert(0);
                let bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(r.years), *bottom),
                        (SegmentValue::Exact(r.years + 1), *bottom + r.nb_citations),
                    ],
                    color.filled(),
                );
                *bottom += r.nb_citations;
                bar
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(chart_err)?
            .label(*paper)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Located affiliations on a longitude/latitude world frame.
pub fn affiliation_map(rows: &[AffiliationRow], path: &Path) -> Result<()> {
    render!(path, MAP_SIZE, draw_affiliation_map(rows))
}

/// `(longitude, latitude)` of every located row
fn located_points(rows: &[AffiliationRow]) -> Vec<(f64, f64)> {
    rows.iter()
        .filter(|r| r.is_located())
        .filter_map(AffiliationRow::coordinates)
        .collect()
}

fn draw_affiliation_map<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, rows: &[AffiliationRow]) -> Result<()> {
    let points = located_points(rows);

    root.fill(&WHITE).map_err(chart_err)?;
    let mut chart = ChartBuilder::on(root)
        .caption("Author affiliations", ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-180f64..180f64, -90f64..90f64)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_labels(13)
        .y_labels(7)
        .x_desc("Longitude")
        .y_desc("Latitude")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(lon, lat)| Circle::new((*lon, *lat), 6, BLUE.mix(0.7).filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Cumulative datasets (left axis) and subjects (right axis) over time.
pub fn growth_lines(points: &[GrowthPoint], path: &Path) -> Result<()> {
    render!(path, GROWTH_SIZE, draw_growth_lines(points))
}

fn draw_growth_lines<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, points: &[GrowthPoint]) -> Result<()> {
    let (start, end) = date_span(points.iter().map(|p| p.date))?;
    let max_datasets = points.iter().map(|p| p.cumsum_datasets).max().unwrap_or(0) + 1;
    let max_subjects = points.iter().map(|p| p.cumsum_subjects).max().unwrap_or(0) + 1;

    root.fill(&WHITE).map_err(chart_err)?;
    let mut chart = ChartBuilder::on(root)
        .caption("Openneuro data growth", ("sans-serif", 36).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .right_y_label_area_size(90)
        .build_cartesian_2d(start..end, 0u64..max_datasets)
        .map_err(chart_err)?
        .set_secondary_coord(start..end, 0u64..max_subjects);

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Cumulative datasets")
        .draw()
        .map_err(chart_err)?;
    chart
        .configure_secondary_axes()
        .y_desc("Cumulative subjects")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.date, p.cumsum_datasets)),
            GREEN.stroke_width(3),
        ))
        .map_err(chart_err)?
        .label("Datasets")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.stroke_width(3)));

    chart
        .draw_secondary_series(LineSeries::new(
            points.iter().map(|p| (p.date, p.cumsum_subjects)),
            RED.stroke_width(3),
        ))
        .map_err(chart_err)?
        .label("Subjects")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(3)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// MRIQC results over time, one line per data type.
pub fn mriqc_lines(series: &[MriqcSeries], path: &Path) -> Result<()> {
    render!(path, GROWTH_SIZE, draw_mriqc_lines(series))
}

fn draw_mriqc_lines<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, series: &[MriqcSeries]) -> Result<()> {
    let (start, end) = date_span(series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d)))?;
    let max_results = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, n)| *n))
        .fold(0f64, f64::max)
        * 1.05
        + 1.0;

    root.fill(&WHITE).map_err(chart_err)?;
    let mut chart = ChartBuilder::on(root)
        .caption("MRIQC API data growth", ("sans-serif", 36).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(start..end, 0f64..max_results)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Cumulative datasets")
        .draw()
        .map_err(chart_err)?;

    let palette = [RED, GREEN];
    for (idx, s) in series.iter().enumerate() {
        let color = palette[idx % palette.len()];
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(3)))
            .map_err(chart_err)?
            .label(s.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
