use cyclone_sim_core::environment::Environment;
use cyclone_sim_core::stats::{
    ArCoefficients, CdfTable, CellStatistics, EmpiricalCdf, InitialDistributions, ModelStatistics, SizeDistribution,
};
use cyclone_sim_core::track::{GenesisPoint, TrackGenerator};
use cyclone_sim_core::{CellGrid, GridLimit, GridSpace, TrackRng};

fn domain() -> GridLimit {
    GridLimit::new(140.0, 160.0, -20.0, -10.0)
}

/// Generator with the same coefficients in every cell
fn generator(dt: f64, max_steps: usize) -> TrackGenerator {
    let grid = CellGrid::new(domain(), GridSpace::default());
    let uniform = |mu: f64, sigma: f64| {
        CellStatistics::uniform(
            grid.nx,
            grid.ny,
            ArCoefficients {
                mu,
                sigma,
                alpha: 0.9,
                phi: (1.0f64 - 0.81).sqrt(),
                min: 900.0,
            },
        )
    };
    let stats = ModelStatistics {
        speed: uniform(20.0, 2.0),
        bearing: uniform(90.0, 3.0),
        pressure: uniform(975.0, 4.0),
        pressure_rate: uniform(0.0, 0.2),
        size_rate: None,
    };
    let table = |v: &[f64]| CdfTable::from_samples(v.iter().map(|&x| (0, x))).unwrap();
    let initial = InitialDistributions {
        bearing: table(&[85.0, 90.0, 95.0]),
        speed: table(&[18.0, 20.0, 22.0]),
        pressure: table(&[970.0, 975.0, 985.0]),
        size: SizeDistribution::LogNormal(EmpiricalCdf::lognormal_size(57.0, 0.6, 120.0)),
    };
    TrackGenerator::new(grid, dt, max_steps, initial, stats, Environment::default())
}

#[test]
fn test_jump_ahead_reproduces_later_batch() {
    let g = generator(1.0, 36);
    let genesis = GenesisPoint::at(150.0, -15.0);

    // Two consecutive batches on one stream
    let mut rng = TrackRng::new(2024);
    let first = g.generate_tracks(4, genesis, &mut rng).unwrap();
    let second = g.generate_tracks(3, genesis, &mut rng).unwrap();

    // The second batch alone, reached by jumping over the first
    let mut jumped = TrackRng::new(2024);
    jumped.jump_ahead(g.batch_draws(4));
    let alone = g.generate_tracks(3, genesis, &mut jumped).unwrap();

    assert!(!first.is_empty());
    assert_eq!(second, alone);
    assert_ne!(first, second);
}

#[test]
fn test_genesis_projecting_out_of_domain_yields_nothing() {
    let genesis = GenesisPoint::at(150.0, -15.0).with_motion(90.0, 20.0);

    // 60 h at 20 km/h is 1200 km, well past 160°E
    let far = generator(60.0, 20).generate_tracks(10, genesis, &mut TrackRng::new(5)).unwrap();
    assert!(far.is_empty());

    let near = generator(1.0, 20).generate_tracks(10, genesis, &mut TrackRng::new(5)).unwrap();
    assert!(!near.is_empty());
    for track in &near {
        assert_eq!(track.points[0].lon, 150.0);
        assert_eq!(track.points[0].bearing, 90.0);
    }
}

#[test]
fn test_generated_tracks_are_physical() {
    let g = generator(1.0, 72);
    for seed in 0..5 {
        let tracks = g
            .generate_tracks(8, GenesisPoint::at(148.0, -14.0), &mut TrackRng::new(seed))
            .unwrap();
        for track in &tracks {
            assert_eq!(track.points[0].age, 0.0);
            assert!(track.points.windows(2).all(|w| w[1].age > w[0].age));
            for p in &track.points {
                assert!(p.central_pressure < p.env_pressure);
                assert!((0.0..360.0).contains(&p.bearing), "bearing {}", p.bearing);
                assert!(p.rmax > 1.0);
                assert!(domain().contains(p.lon, p.lat));
            }
            assert_eq!(track.id.count, 8);
        }
    }
}
