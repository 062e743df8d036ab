//! Rendering of the shortage distribution figure
//!
//! This module draws one fan chart per (structure, design) panel using the [`plotters`] crate.
//! Structures are laid out as rows and designs as columns, with a shared legend explaining
//! the shading of the percentile bands underneath the grid.

use crate::panels::Panel;
use plotters::coord::Shift;
use plotters::prelude::*;
use shortage_distributions::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Colour of every ensemble band (`#000292`).
const BAND_COLOR: RGBColor = RGBColor(0x00, 0x02, 0x92);

/// Opacity of a single shaded band. Overlapping bands stack towards the median.
const BAND_FILL_ALPHA: f64 = 0.1;

/// Opacity of the envelope line drawn on top of each band.
const BAND_LINE_ALPHA: f64 = 0.3;

/// Share of the figure height reserved for the legend.
const LEGEND_FRACTION: f64 = 0.22;

/// Number of legend entries per row.
const LEGEND_COLUMNS: usize = 6;

/// Opacity of the legend swatch of the `index`-th band when `index + 1` layers of
/// opacity `base` are stacked on top of each other.
///
/// Each layer maps the accumulated opacity `x` to `x + base - x * base`.
pub fn band_alpha(index: usize, base: f64) -> f64 {
    let layer = |x: f64| x + base - x * base;
    (0..index).fold(layer(0.0), |alpha, _| layer(alpha))
}

/// Formats axis values without decimals, switching to thousands for large volumes.
fn format_axis_value(value: f64) -> String {
    if value.abs() >= 10_000.0 {
        format!("{:.0}k", value / 1000.0)
    } else {
        format!("{:.0}", value)
    }
}

/// Splits a curve into runs of consecutive positions where both edges are present.
///
/// Returns `(rank, lower, upper)` triples. Missing values break the curve instead of
/// being bridged.
fn present_segments(
    ranks: &[f64],
    lower: &[Option<f64>],
    upper: &[Option<f64>],
) -> Vec<Vec<(f64, f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for ((&rank, &low), &high) in ranks.iter().zip(lower).zip(upper) {
        match (low, high) {
            (Some(low), Some(high)) => current.push((rank, low, high)),
            _ => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Upper limit of a panel's y axis: the configured one, else the largest plotted value.
fn panel_y_max(panel: &Panel) -> f64 {
    if let Some(y_max) = panel.y_max {
        return y_max;
    }

    let data_max = panel
        .distribution()
        .map(|distribution| {
            let historical = distribution.historical.values.iter();
            let bands = distribution.bands.bands.iter().flat_map(|band| band.values.iter());
            historical
                .chain(bands)
                .flatten()
                .fold(0.0_f64, |max, &value| max.max(value))
        })
        .unwrap_or(0.0);

    if data_max > 0.0 {
        data_max * 1.05
    } else {
        1.0
    }
}

/// Renders the complete figure and saves it as a PNG file
///
/// # Arguments
/// * `panels` - One panel per (structure, design) pair, structures first
/// * `config` - Supplies the grid layout, figure size and axis labels
/// * `output_path` - Path where the PNG file should be saved
///
/// Failed panels are drawn as empty axes labelled "no data".
pub fn render_figure(panels: &[Panel], config: &ExperimentConfig, output_path: &Path) -> Result<()> {
    let rows = config.structures.len();
    let columns = config.designs.len();
    if panels.is_empty() {
        return Err(PlotError::InvalidData("No panels to draw".to_string()));
    }

    if panels.len() != rows * columns {
        return Err(PlotError::InvalidData(format!(
            "Expected {} panels for a {}x{} grid, got {}",
            rows * columns,
            rows,
            columns,
            panels.len()
        )));
    }

    let figure = &config.figure;
    let root = BitMapBackend::new(output_path, (figure.width, figure.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let legend_height = (figure.height as f64 * LEGEND_FRACTION) as u32;
    let (grid_area, legend_area) = root.split_vertically(figure.height - legend_height);
    let cells = grid_area.split_evenly((rows, columns));

    for (index, (panel, cell)) in panels.iter().zip(cells.iter()).enumerate() {
        let position = GridPosition {
            row: index / columns,
            column: index % columns,
            last_row: rows - 1,
        };
        draw_panel(cell, panel, position, config)?;
    }

    // Every panel shares the same levels, so any computed one can label the legend.
    if let Some(distribution) = panels.iter().find_map(Panel::distribution) {
        let labels: Vec<String> = distribution
            .bands
            .bands
            .iter()
            .map(PercentileBand::frequency_label)
            .collect();
        draw_legend(&legend_area, &labels, &figure.legend_title)?;
    }

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct GridPosition {
    row: usize,
    column: usize,
    last_row: usize,
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    panel: &Panel,
    position: GridPosition,
    config: &ExperimentConfig,
) -> Result<()> {
    let y_max = panel_y_max(panel);
    let bottom = position.row == position.last_row;
    let left = position.column == 0;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(if bottom { 45 } else { 5 })
        .y_label_area_size(if left { 85 } else { 5 });

    // Titles only on the top row; lower rows repeat the same designs.
    if position.row == 0 {
        builder.caption(&panel.title, ("sans-serif", 22));
    }

    let mut chart = builder
        .build_cartesian_2d(0.0..100.0, 0.0..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    let hidden = |_: &f64| String::new();
    let x_formatter = |x: &f64| format!("{:.0}", x);
    let y_formatter = |y: &f64| format_axis_value(*y);

    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_labels(6)
        .y_labels(6)
        .label_style(("sans-serif", 16));

    if bottom {
        mesh.x_desc(config.figure.x_label.as_str())
            .x_label_formatter(&x_formatter);
    } else {
        mesh.x_label_formatter(&hidden);
    }

    if left {
        mesh.y_desc(config.figure.y_label.as_str())
            .y_label_formatter(&y_formatter);
    } else {
        mesh.y_label_formatter(&hidden);
    }

    mesh.draw().map_err(|e| PlotError::Drawing(e.to_string()))?;

    let distribution = match panel.distribution() {
        Some(distribution) => distribution,
        None => {
            chart
                .draw_series(std::iter::once(Text::new(
                    "no data",
                    (42.0, y_max / 2.0),
                    ("sans-serif", 20),
                )))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
            return Ok(());
        }
    };

    let bands = &distribution.bands;
    for band in &bands.bands {
        for segment in present_segments(&bands.ranks, &bands.minimum, &band.values) {
            let upper = segment.iter().map(|&(rank, _, high)| (rank, high));
            let lower = segment.iter().rev().map(|&(rank, low, _)| (rank, low));
            chart
                .draw_series(std::iter::once(Polygon::new(
                    upper.chain(lower).collect::<Vec<_>>(),
                    BAND_COLOR.mix(BAND_FILL_ALPHA).filled(),
                )))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;

            chart
                .draw_series(LineSeries::new(
                    segment.iter().map(|&(rank, _, high)| (rank, high)),
                    BAND_COLOR.mix(BAND_LINE_ALPHA).stroke_width(1),
                ))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
        }
    }

    let historical = &distribution.historical;
    for segment in present_segments(&historical.ranks, &historical.values, &historical.values) {
        chart
            .draw_series(LineSeries::new(
                segment.into_iter().map(|(rank, value, _)| (rank, value)),
                BLACK.stroke_width(2),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    Ok(())
}

fn draw_legend(
    area: &DrawingArea<BitMapBackend, Shift>,
    labels: &[String],
    title: &str,
) -> Result<()> {
    const ENTRY_WIDTH: i32 = 130;
    const ROW_HEIGHT: i32 = 34;
    const SWATCH: i32 = 22;

    let (width, _) = area.dim_in_pixel();
    let columns = labels.len().clamp(1, LEGEND_COLUMNS) as i32;
    let left = (width as i32 - columns * ENTRY_WIDTH) / 2;

    area.draw(&Text::new(
        title.to_string(),
        (left, 20),
        ("sans-serif", 20),
    ))
    .map_err(|e| PlotError::Drawing(e.to_string()))?;

    for (index, label) in labels.iter().enumerate() {
        let x = left + (index % LEGEND_COLUMNS) as i32 * ENTRY_WIDTH;
        let y = 55 + (index / LEGEND_COLUMNS) as i32 * ROW_HEIGHT;

        area.draw(&Rectangle::new(
            [(x, y), (x + SWATCH, y + SWATCH)],
            BAND_COLOR.mix(band_alpha(index, BAND_FILL_ALPHA)).filled(),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

        area.draw(&Text::new(
            label.clone(),
            (x + SWATCH + 8, y + 2),
            ("sans-serif", 18),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::PanelError;
    use ndarray::array;
    use rstest::rstest;
    use shortage_distributions::analysis::percentile_bands::ensemble_percentile_bands;
    use shortage_distributions::analysis::rank_curve::sorted_rank_curve;
    use shortage_distributions::io::historical::ParsingError;
    use std::sync::Arc;

    #[rstest]
    #[case(0, 0.1, 0.1)]
    #[case(1, 0.1, 0.19)]
    #[case(2, 0.1, 0.271)]
    #[case(0, 0.2, 0.2)]
    fn stacks_band_alpha(#[case] index: usize, #[case] base: f64, #[case] expected: f64) {
        assert!((band_alpha(index, base) - expected).abs() < 1e-12);
    }

    #[test]
    fn band_alpha_matches_closed_form() {
        for index in 0..11 {
            let closed = 1.0 - 0.9_f64.powi(index as i32 + 1);
            assert!((band_alpha(index, 0.1) - closed).abs() < 1e-12);
        }
    }

    #[rstest]
    #[case(0.0, "0")]
    #[case(4999.6, "5000")]
    #[case(260000.0, "260k")]
    fn formats_axis_values(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_axis_value(value), expected);
    }

    #[test]
    fn missing_values_split_segments() {
        let ranks = [25.0, 50.0, 75.0, 100.0];
        let lower = [Some(0.0), Some(1.0), None, Some(3.0)];
        let upper = [Some(5.0), Some(6.0), Some(7.0), Some(8.0)];

        let segments = present_segments(&ranks, &lower, &upper);
        assert_eq!(
            segments,
            vec![
                vec![(25.0, 0.0, 5.0), (50.0, 1.0, 6.0)],
                vec![(100.0, 3.0, 8.0)]
            ]
        );
        assert!(present_segments(&ranks, &[None; 4], &upper).is_empty());
    }

    fn computed_panel(y_max: Option<f64>) -> Panel {
        let totals = array![[Some(10.0), Some(20.0)], [Some(30.0), Some(50.0)]];
        let bands = ensemble_percentile_bands(totals.view(), &[100.0, 50.0, 0.0]).unwrap();
        Panel {
            structure: "S1".to_string(),
            design: "D1".to_string(),
            title: "Design One".to_string(),
            y_max,
            historical_runs: vec![2],
            outcome: Ok(ShortageDistribution {
                historical: sorted_rank_curve(&[Some(40.0), Some(60.0)]),
                bands,
                historical_rank_in_ensemble: vec![Some(100.0), Some(100.0)],
                members: 2,
                missing_historical_years: 0,
                missing_synthetic_years: 0,
            }),
        }
    }

    #[test]
    fn y_max_prefers_configured_limit() {
        assert_eq!(panel_y_max(&computed_panel(Some(5000.0))), 5000.0);
        assert!((panel_y_max(&computed_panel(None)) - 63.0).abs() < 1e-9);

        let failed = Panel {
            outcome: Err(PanelError::Historical(Arc::new(ParsingError::InvalidNumber {
                line: 1,
                token: "x".to_string(),
            }))),
            ..computed_panel(None)
        };
        assert_eq!(panel_y_max(&failed), 1.0);
    }

    #[test]
    fn rejects_mismatched_grid() {
        let config = ExperimentConfig::default();
        let dir = tempfile::TempDir::new().unwrap();
        let result = render_figure(&[computed_panel(None)], &config, &dir.path().join("out.png"));
        assert!(matches!(result, Err(PlotError::InvalidData(_))));

        let result = render_figure(&[], &config, &dir.path().join("out.png"));
        assert!(matches!(result, Err(PlotError::InvalidData(_))));
    }

    #[test]
    #[ignore = "Requires system fonts for text rendering"]
    fn renders_figure_to_png() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            [[designs]]
            name = "D1"
            title = "Design One"
            samples = 2

            [[structures]]
            id = "S1"
            "#,
        )
        .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("figure.png");
        render_figure(&[computed_panel(None)], &config, &path).unwrap();
        assert!(path.exists());
    }
}
