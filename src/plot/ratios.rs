//! Strip plots of log2 recovery ratios: one panel per generator parameter,
//! one jittered column per feature family, with guide lines at ratios of
//! 1/3, 1/2, 1, 2, and 3.

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use ndarray::Array2;
use plotters::coord::combinators::{BindKeyPoints, WithKeyPoints};
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::PARAM_LABELS;

const PANEL_W: u32 = 420;
const PANEL_H: u32 = 420;
const JITTER: f64 = 0.1;

/// Guide ratios drawn as dashed horizontal lines and used as y ticks.
const GUIDES: [f64; 5] = [1.0 / 3.0, 0.5, 1.0, 2.0, 3.0];
const GUIDE_LABELS: [&str; 5] = ["1/3", "1/2", "1", "2", "3"];

/// Axis wrapper delegating to `WithKeyPoints<RangedCoordf64>`; plotters 0.3
/// provides no `ValueFormatter` impl for that type, which `configure_mesh`
/// requires. Formatting delegates to `RangedCoordf64`'s own formatter.
struct GuideAxis(WithKeyPoints<RangedCoordf64>);

impl Ranged for GuideAxis {
    type ValueType = f64;
    type FormatOption = NoDefaultFormatting;

    fn range(&self) -> Range<f64> {
        self.0.range()
    }

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

impl ValueFormatter<f64> for GuideAxis {
    fn format(value: &f64) -> String {
        RangedCoordf64::format(value)
    }
}

fn guide_label(y: &f64) -> String {
    for (g, label) in GUIDES.iter().zip(GUIDE_LABELS) {
        if (g.log2() - y).abs() < 1e-9 {
            return label.to_string();
        }
    }
    format!("{y:.1}")
}

/// Render the per-family ratio tables to `path`. Each table in `families` is
/// (n_sigs, n_params); panels share the family ordering on the x axis.
pub fn plot_knn_regression(
    path: &Path,
    families: &[(String, Array2<f64>)],
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    let n_fam = families.len();
    if n_fam == 0 {
        return Ok(());
    }
    let n_params = families[0].1.ncols();
    info!(path = %path.display(), n_families = n_fam, "rendering knn regression");

    let root =
        BitMapBackend::new(path, (PANEL_W * n_params as u32, PANEL_H)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, n_params));

    // Shared y range over all panels, clipped past the outermost guides.
    let mut y_abs = 3.0f64.log2();
    for (_, table) in families {
        for v in table.iter() {
            if v.is_finite() && *v > 0.0 {
                y_abs = y_abs.max(v.log2().abs());
            }
        }
    }
    let y_lim = (y_abs * 1.1).max(2.0);

    let guide_ys: Vec<f64> = GUIDES.iter().map(|g| g.log2()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    for (p, panel) in panels.iter().enumerate() {
        let mut chart = ChartBuilder::on(panel)
            .margin(12)
            .caption(
                format!("neighbor ratio — {}", PARAM_LABELS[p.min(2)]),
                ("sans-serif", 18),
            )
            .set_label_area_size(LabelAreaPosition::Left, 40)
            .set_label_area_size(LabelAreaPosition::Bottom, 28)
            .build_cartesian_2d(
                -0.5f64..(n_fam as f64 - 0.5),
                GuideAxis((-y_lim..y_lim).with_key_points(guide_ys.clone())),
            )?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_x_axis()
            .y_desc("ratio")
            .y_label_formatter(&guide_label)
            .draw()?;

        for g in GUIDES {
            let y = g.log2();
            chart.draw_series(std::iter::once(DashedPathElement::new(
                vec![(-0.5, y), (n_fam as f64 - 0.5, y)],
                6,
                4,
                BLACK.mix(0.25).stroke_width(1),
            )))?;
        }

        for (fi, (name, table)) in families.iter().enumerate() {
            let x0 = fi as f64;
            chart.draw_series(table.column(p).iter().filter_map(|&v| {
                if v.is_finite() && v > 0.0 {
                    let x = x0 + rng.random_range(-JITTER..JITTER);
                    Some(Circle::new((x, v.log2()), 2, BLUE.mix(0.4).filled()))
                } else {
                    None
                }
            }))?;
            chart.draw_series(std::iter::once(Text::new(
                name.clone(),
                (x0 - 0.2, -y_lim * 0.95),
                ("sans-serif", 16),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}
