//! Three-panel 3-D scatter of an Isomap embedding, one panel per generator
//! parameter, points colored by the log of that parameter.

use std::error::Error;
use std::path::Path;

use ndarray::Array2;
use plotters::prelude::*;
use tracing::info;

use super::{bwr_color, PARAM_LABELS};

const PANEL_W: u32 = 480;
const PANEL_H: u32 = 480;

fn axis_range(coords: &Array2<f64>, axis: usize) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..coords.nrows() {
        lo = lo.min(coords[(i, axis)]);
        hi = hi.max(coords[(i, axis)]);
    }
    if !(lo.is_finite() && hi.is_finite()) || lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad, hi + pad)
}

/// Render `coords` (n_sigs, 3) to `path`, one panel per row of `param_map`
/// (n_params, n_sigs). `title` names the feature family.
pub fn plot_isomap(
    path: &Path,
    title: &str,
    coords: &Array2<f64>,
    param_map: &Array2<f64>,
) -> Result<(), Box<dyn Error>> {
    let n_params = param_map.nrows();
    let n = coords.nrows();
    info!(path = %path.display(), family = title, "rendering isomap scatter");

    let root = BitMapBackend::new(path, (PANEL_W * n_params as u32, PANEL_H)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, n_params));

    let (x_lo, x_hi) = axis_range(coords, 0);
    let (y_lo, y_hi) = axis_range(coords, 1);
    let (z_lo, z_hi) = axis_range(coords, 2);

    for (p, panel) in panels.iter().enumerate() {
        // Color by log parameter, rescaled to the ramp.
        let logs: Vec<f64> = (0..n).map(|i| param_map[(p, i)].ln()).collect();
        let lo = logs.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = logs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let span = (hi - lo).max(1e-12);

        let mut chart = ChartBuilder::on(panel)
            .margin(12)
            .caption(
                format!("{title} — colored by {}", PARAM_LABELS[p.min(2)]),
                ("sans-serif", 20),
            )
            .build_cartesian_3d(x_lo..x_hi, y_lo..y_hi, z_lo..z_hi)?;
        chart.with_projection(|mut pb| {
            pb.pitch = 0.3;
            pb.yaw = 0.7;
            pb.scale = 0.85;
            pb.into_matrix()
        });
        chart
            .configure_axes()
            .light_grid_style(BLACK.mix(0.10))
            .max_light_lines(3)
            .draw()?;

        chart.draw_series((0..n).map(|i| {
            let t = (logs[i] - lo) / span;
            Circle::new(
                (coords[(i, 0)], coords[(i, 1)], coords[(i, 2)]),
                3,
                bwr_color(t).filled(),
            )
        }))?;
    }

    root.present()?;
    Ok(())
}
