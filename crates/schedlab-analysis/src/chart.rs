//! Chart model and PNG rendering.
//!
//! A [`Canvas`] is a plain value: reports build one, render it, and hand it
//! back. Nothing is kept between reports.

use crate::error::ReportError;
use crate::report::MetricGroups;
use crate::style::{assign_styles, SeriesStyle};
use plotters::prelude::*;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartOptions {
    /// When false, reports skip the PNG and only write CSV and LaTeX.
    pub render: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            render: true,
            width: 1280,
            height: 960,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub style: SeriesStyle,
    /// (rank within the sorted group, value)
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Canvas {
    pub fn blank() -> Self {
        Canvas::default()
    }

    pub fn reset(self) -> Self {
        Canvas::blank()
    }

    pub fn is_blank(&self) -> bool {
        self.series.is_empty() && self.x_label.is_empty() && self.y_label.is_empty()
    }

    pub fn labelled(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    /// Adds one series per group, x being the rank of the value inside its
    /// sorted group. Styles continue after any series already on the canvas.
    pub fn plot_groups(mut self, groups: &MetricGroups) -> Result<Self, ReportError> {
        let existing = self.series.len();
        let styles = assign_styles(existing + groups.len())?;
        for ((label, values), style) in groups.iter().zip(styles.into_iter().skip(existing)) {
            self.series.push(Series {
                label: label.to_string(),
                style,
                points: values
                    .iter()
                    .enumerate()
                    .map(|(rank, v)| (rank as f64, *v))
                    .collect(),
            });
        }
        Ok(self)
    }

    /// Axis ranges covering every point: `(x_max, y_min, y_max)`.
    pub fn bounds(&self) -> (f64, f64, f64) {
        let longest = self.series.iter().map(|s| s.points.len()).max().unwrap_or(0);
        let x_max = (longest.max(2) - 1) as f64;
        let mut values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let first = match values.next() {
            Some(v) => v,
            None => return (x_max, 0.0, 1.0),
        };
        let (lo, hi) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if hi > lo {
            let pad = (hi - lo) * 0.05;
            (x_max, lo - pad, hi + pad)
        } else {
            (x_max, lo - 1.0, hi + 1.0)
        }
    }

    pub fn render_png(&self, path: &Path, options: &ChartOptions) -> Result<(), ReportError> {
        let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let (x_max, y_min, y_max) = self.bounds();
        let mut chart = ChartBuilder::on(&root)
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(80)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()
            .map_err(render_err)?;

        for series in &self.series {
            let color = Palette99::pick(series.style.color_index).to_rgba();
            let stroke = color.stroke_width(series.style.line.width);
            let points = series.points.clone();
            let anno = match series.style.line.dash.pattern() {
                None => chart.draw_series(LineSeries::new(points, stroke)),
                Some((dash, gap)) => {
                    chart.draw_series(DashedLineSeries::new(points, dash, gap, stroke))
                }
            }
            .map_err(render_err)?;
            anno.label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));

            let outline = series.style.marker.outline(4);
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| EmptyElement::at(p) + Polygon::new(outline.clone(), color.filled())),
                )
                .map_err(render_err)?;
        }

        if !self.series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_err)?;
        }
        root.present().map_err(render_err)?;
        Ok(())
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{group_by_algorithm, Metric};
    use crate::style::{Marker, LINE_STYLES};
    use schedlab_core::{Outcome, RunRecord};

    fn run(algorithm: &str, time: f64) -> RunRecord {
        RunRecord {
            algorithm: algorithm.to_string(),
            system: "S1".to_string(),
            instance: 1,
            time,
            conf: 1,
            outcome: Outcome::Solved(10),
            found_solution: true,
            error_text: None,
        }
    }

    #[test]
    fn series_are_plotted_against_sorted_rank() {
        let records = vec![run("B", 3.0), run("A", 9.0), run("B", 1.0), run("A", 2.0), run("B", 2.0)];
        let groups = group_by_algorithm(&records, Metric::Time);
        let canvas = Canvas::blank()
            .labelled("Index", "Time (seconds)")
            .plot_groups(&groups)
            .expect("two groups");
        assert_eq!(canvas.series.len(), 2);
        assert_eq!(canvas.series[0].label, "A");
        assert_eq!(canvas.series[0].points, vec![(0.0, 2.0), (1.0, 9.0)]);
        assert_eq!(canvas.series[1].label, "B");
        assert_eq!(
            canvas.series[1].points,
            vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]
        );
        assert_eq!(canvas.series[0].style.marker, Marker::Circle);
        assert_eq!(canvas.series[1].style.marker, Marker::Square);
        assert_eq!(canvas.series[1].style.line, LINE_STYLES[0]);
    }

    #[test]
    fn too_many_groups_fail_before_anything_is_drawn() {
        let records: Vec<RunRecord> = (0..120).map(|i| run(&format!("alg{:03}", i), 1.0)).collect();
        let groups = group_by_algorithm(&records, Metric::Time);
        let err = Canvas::blank().plot_groups(&groups).expect_err("120 > 110");
        assert!(matches!(
            err,
            ReportError::StyleExhausted {
                requested: 120,
                available: 110
            }
        ));
    }

    #[test]
    fn bounds_pad_flat_and_empty_canvases() {
        assert_eq!(Canvas::blank().bounds(), (1.0, 0.0, 1.0));
        let groups = group_by_algorithm(&[run("A", 5.0)], Metric::Time);
        let canvas = Canvas::blank().plot_groups(&groups).unwrap();
        assert_eq!(canvas.bounds(), (1.0, 4.0, 6.0));
    }

    #[test]
    fn renders_grouped_and_blank_canvases_to_png() {
        let root = schedlab_core::scratch_dir("chart_png");
        std::fs::create_dir_all(&root).unwrap();
        let options = ChartOptions {
            render: true,
            width: 480,
            height: 360,
        };

        // twelve groups so the last one is drawn dashed
        let mut records = vec![run("A", 1.0), run("A", 4.0), run("B", 2.0), run("B", 3.0)];
        records.extend((0..10).map(|i| run(&format!("C{:02}", i), 1.0 + i as f64)));
        let groups = group_by_algorithm(&records, Metric::Time);
        let canvas = Canvas::blank()
            .labelled("Index", "Time (seconds)")
            .plot_groups(&groups)
            .unwrap();
        assert!(canvas.series[11].style.line.dash.pattern().is_some());

        let grouped = root.join("grouped.png");
        canvas.render_png(&grouped, &options).expect("render grouped");
        let blank = root.join("blank.png");
        Canvas::blank().render_png(&blank, &options).expect("render blank");

        for path in [&grouped, &blank] {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(&bytes[..4], b"\x89PNG", "{} is not a PNG", path.display());
        }
        let _ = std::fs::remove_dir_all(root);
    }
}
