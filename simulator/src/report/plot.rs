use anyhow::Context;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::Path;
use trialcore::visual::DensityChart;

pub const CHART_SIZE: (u32, u32) = (1200, 700);
const FILL_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => Ok(ChartFormat::Png),
            Some("svg") => Ok(ChartFormat::Svg),
            other => anyhow::bail!(
                "unsupported chart format {:?} for {} (expected .png or .svg)",
                other.unwrap_or(""),
                path.display()
            ),
        }
    }
}

/// Writes the overlaid density curves to `path`, picking the backend from
/// the file extension.
pub fn render_density_chart(chart: &DensityChart, path: &Path) -> anyhow::Result<()> {
    let format = ChartFormat::from_path(path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating chart directory {}", parent.display()))?;
        }
    }

    let rendered = match format {
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(chart, root)
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(chart, root)
        }
    };
    rendered.with_context(|| format!("rendering density chart {}", path.display()))
}

/// Upper bound of the y-axis with headroom above the tallest curve.
pub fn y_axis_limit(chart: &DensityChart) -> f64 {
    if chart.y_max > 0.0 {
        chart.y_max * 1.1
    } else {
        1.0
    }
}

fn draw_chart<DB>(chart: &DensityChart, root: DrawingArea<DB, Shift>) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (x_lower, x_upper) = chart.x_range;

    let mut context = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lower..x_upper, 0.0..y_axis_limit(chart))?;

    context
        .configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()?;

    for (idx, curve) in chart.series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        context
            .draw_series(
                AreaSeries::new(curve.points.iter().copied(), 0.0, color.mix(FILL_ALPHA))
                    .border_style(color.stroke_width(2)),
            )?
            .label(curve.label.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.6).filled())
            });
    }

    context
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
