//! Figure rendering with plotters: 3-D Isomap scatters colored by generator
//! parameter, and the neighbor-regression strip plots of log2 recovery ratios.

mod ratios;
mod scatter3;

use plotters::style::RGBColor;

pub use ratios::plot_knn_regression;
pub use scatter3::plot_isomap;

/// Axis labels for the three generator parameters, in param-map row order.
pub const PARAM_LABELS: [&str; 3] = ["f0", "fm", "gamma"];

/// Blue-white-red ramp over t in [0, 1].
pub(crate) fn bwr_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        let u = t * 2.0;
        RGBColor((255.0 * u) as u8, (255.0 * u) as u8, 255)
    } else {
        let u = (1.0 - t) * 2.0;
        RGBColor(255, (255.0 * u) as u8, (255.0 * u) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_and_midpoint() {
        assert_eq!(bwr_color(0.0), RGBColor(0, 0, 255));
        assert_eq!(bwr_color(1.0), RGBColor(255, 0, 0));
        let mid = bwr_color(0.5);
        assert_eq!(mid.0, 255);
        assert!(mid.1 >= 254);
    }
}
