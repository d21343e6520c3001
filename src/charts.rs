// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PNG charts of weekly log volume and pending logs per server.

use crate::stats::StatsReport;
use anyhow::{Context, Result};
use camino::Utf8Path;
use plotters::prelude::*;

const CHART_WIDTH: u32 = 1600;
const CHART_HEIGHT: u32 = 900;

const FONT_FAMILY: &str = "Inter";
const TITLE_SIZE: i32 = 24;
const AXIS_SIZE: i32 = 14;

const BACKGROUND: RGBColor = RGBColor(250, 250, 252); // Off-white
const TEXT_PRIMARY: RGBColor = RGBColor(15, 23, 42); // Slate 900
const TEXT_SECONDARY: RGBColor = RGBColor(100, 116, 139); // Slate 500
const GRID_COLOR: RGBColor = RGBColor(226, 232, 240); // Slate 200
const ACCENT_BLUE: RGBColor = RGBColor(59, 130, 246); // Blue 500
const ACCENT_RED: RGBColor = RGBColor(232, 68, 68);

/// Render the charts for a stats report. `previous_week` is the bucket the
/// report's totals were taken from.
///
/// Returns the names of the files written; charts without data are skipped.
pub fn generate_all_charts(
    report: &StatsReport,
    previous_week: u32,
    output_dir: &Utf8Path,
) -> Result<Vec<String>> {
    std::fs::create_dir_all(output_dir.as_std_path())
        .with_context(|| format!("failed to create output directory at {}", output_dir))?;

    println!("\nGenerating charts...");
    let mut written = Vec::new();

    if draw_bar_chart(
        &output_dir.join("weekly-trend.png"),
        "Logs per Week",
        &trend_bars(report),
        ACCENT_BLUE,
    )? {
        written.push("weekly-trend.png".to_string());
    }

    if draw_bar_chart(
        &output_dir.join("pending-by-server.png"),
        &format!("Unprocessed Logs by Server - Week {previous_week:02}"),
        &server_bars(report),
        ACCENT_RED,
    )? {
        written.push("pending-by-server.png".to_string());
    }

    for name in &written {
        println!("  • {name}");
    }
    println!("  Charts saved to {}", output_dir);
    Ok(written)
}

/// Draw a labelled bar chart. Returns `false` without writing a file when
/// there is nothing to plot.
fn draw_bar_chart(
    output_path: &Utf8Path,
    title: &str,
    bars: &[(String, u64)],
    color: RGBColor,
) -> Result<bool> {
    if bars.is_empty() {
        return Ok(false);
    }

    let root = BitMapBackend::new(output_path.as_std_path(), (CHART_WIDTH, CHART_HEIGHT))
        .into_drawing_area();
    root.fill(&BACKGROUND)?;

    let max_count = bars.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let y_max = (max_count + max_count / 10 + 1) as i64;
    let labels: Vec<&str> = bars.iter().map(|(label, _)| label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, TITLE_SIZE).into_font().color(&TEXT_PRIMARY))
        .margin(60)
        .x_label_area_size(70)
        .y_label_area_size(100)
        .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0i64..y_max)?;

    chart
        .configure_mesh()
        .bold_line_style(&GRID_COLOR.mix(0.3))
        .light_line_style(&TRANSPARENT)
        .disable_x_mesh()
        .x_labels(bars.len())
        .y_labels(6)
        .x_label_style((FONT_FAMILY, AXIS_SIZE).into_font().color(&TEXT_SECONDARY))
        .y_label_style((FONT_FAMILY, AXIS_SIZE).into_font().color(&TEXT_SECONDARY))
        .x_label_formatter(&|value| segment_label(value, &labels))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.mix(0.8).filled())
            .margin(20)
            .data(
                bars.iter()
                    .enumerate()
                    .map(|(i, (_, count))| (i as i32, *count as i64)),
            ),
    )?;

    root.present()
        .with_context(|| format!("failed to write chart to {}", output_path))?;
    Ok(true)
}

fn trend_bars(report: &StatsReport) -> Vec<(String, u64)> {
    report
        .weekly_trend
        .iter()
        .map(|week| (week.week.clone(), week.count))
        .collect()
}

fn server_bars(report: &StatsReport) -> Vec<(String, u64)> {
    report
        .logs_by_server
        .iter()
        .map(|entry| (entry.server_type.to_uppercase(), entry.count))
        .collect()
}

fn segment_label(value: &SegmentValue<i32>, labels: &[&str]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| labels.get(i))
            .map(|label| label.to_string())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}
