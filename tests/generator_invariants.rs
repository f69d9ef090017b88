//! Invariants of the chirp grid generator: flat ordering, log spacing, unit
//! energy, and the param-map layout every downstream table relies on.

use chirpmap::config::SweepConfig;
use chirpmap::synth::{generate_audio, generate_chirp, ParamGrid};

fn small_grid() -> ParamGrid {
    ParamGrid::log_spaced(3, (512.0, 1024.0), (4.0, 16.0), (0.5, 4.0))
}

#[test]
fn flat_order_is_row_major_f0_fm_gamma() {
    let grid = small_grid();
    // gamma varies fastest, f0 slowest.
    let (f0_a, fm_a, g_a) = grid.params_at(0);
    let (f0_b, fm_b, g_b) = grid.params_at(1);
    assert_eq!((f0_a, fm_a), (f0_b, fm_b));
    assert!(g_b > g_a);

    let (f0_c, fm_c, _) = grid.params_at(3);
    assert_eq!(f0_c, f0_a);
    assert!(fm_c > fm_a);

    let (f0_d, _, _) = grid.params_at(9);
    assert!(f0_d > f0_a);
}

#[test]
fn param_map_matches_params_at() {
    let grid = small_grid();
    let pm = grid.param_map();
    assert_eq!(pm.dim(), (3, 27));
    for flat in 0..27 {
        let (f0, fm, gamma) = grid.params_at(flat);
        assert_eq!(pm[(0, flat)], f0);
        assert_eq!(pm[(1, flat)], fm);
        assert_eq!(pm[(2, flat)], gamma);
    }
}

#[test]
fn grid_endpoints_hit_the_requested_ranges() {
    let grid = small_grid();
    assert!((grid.f0s[0] - 512.0).abs() < 1e-9);
    assert!((grid.f0s[2] - 1024.0).abs() < 1e-9);
    assert!((grid.gammas[0] - 0.5).abs() < 1e-9);
    assert!((grid.gammas[2] - 4.0).abs() < 1e-9);
    // Log spacing: the midpoint is the geometric mean of the endpoints.
    assert!((grid.fms[1] - 8.0).abs() < 1e-9);
}

#[test]
fn every_signal_has_unit_energy() {
    let grid = small_grid();
    let batch = generate_audio(&grid, 2.0, 0.5, 4096);
    assert_eq!(batch.n_sigs(), 27);
    assert_eq!(batch.sig_len(), 2048);
    for i in 0..batch.n_sigs() {
        let sig = batch.signal(i);
        let energy: f32 = sig.iter().map(|v| v * v).sum();
        assert!((energy - 1.0).abs() < 1e-3, "signal {i} energy {energy}");
    }
}

#[test]
fn chirp_length_follows_duration_and_rate() {
    let cfg = SweepConfig::default();
    let sig = generate_chirp(512.0, 4.0, 1.0, cfg.bw, 0.25, 8192);
    assert_eq!(sig.len(), 2048);
}
