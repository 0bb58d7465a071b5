use cyclone_sim_core::config::WindfieldConfig;
use cyclone_sim_core::track::write_tracks;
use cyclone_sim_core::wind::{GustFile, ProfileType, WindFieldType, WindfieldGenerator};
use cyclone_sim_core::{GridLimit, Track, TrackPoint};

fn point(age: f64, lon: f64, lat: f64, pc: f64) -> TrackPoint {
    TrackPoint {
        age,
        lon,
        lat,
        speed: 18.0,
        bearing: 250.0,
        central_pressure: pc,
        env_pressure: 1008.0,
        rmax: 35.0,
    }
}

fn generator() -> WindfieldGenerator {
    WindfieldGenerator::new(WindfieldConfig {
        profile_type: ProfileType::Holland,
        wind_field_type: WindFieldType::Kepert,
        margin: 1.0,
        resolution: 0.1,
        ..Default::default()
    })
    .with_region(Some(GridLimit::new(148.0, 152.0, -17.0, -13.0)))
}

#[test]
fn test_aggregation_is_order_independent() {
    let a = Track::new(1, vec![point(0.0, 151.0, -14.0, 960.0), point(1.0, 150.8, -14.1, 958.0)]);
    let b = Track::new(2, vec![point(0.0, 149.0, -16.0, 975.0), point(1.0, 149.2, -15.9, 970.0)]);
    let c = Track::new(3, vec![point(0.0, 150.0, -15.0, 940.0)]);

    let g = generator();
    let forward = g.calculate_extremes_from_tracks(&[a.clone(), b.clone(), c.clone()]).unwrap().unwrap();
    let backward = g.calculate_extremes_from_tracks(&[c, b, a]).unwrap().unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn test_split_track_matches_whole_track() {
    let whole = Track::new(
        1,
        vec![
            point(0.0, 151.0, -14.0, 960.0),
            point(1.0, 150.8, -14.1, 958.0),
            point(2.0, 150.6, -14.2, 955.0),
            point(3.0, 150.4, -14.3, 953.0),
        ],
    );
    let head = Track::new(1, whole.points[..2].to_vec());
    let tail = Track::new(2, whole.points[2..].to_vec());

    let g = generator();
    let one = g.calculate_extremes_from_track(&whole).unwrap().unwrap();
    let parts = g.calculate_extremes_from_tracks(&[tail, head]).unwrap().unwrap();
    assert_eq!(one.gust, parts.gust);
    assert_eq!(one.pressure, parts.pressure);
    assert_eq!(one.bearing, parts.bearing);
}

#[test]
fn test_partial_fields_merge_in_either_order() {
    // Disjoint step sets of one storm: [A, B] and [C, D]
    let steps = [
        point(0.0, 151.0, -14.0, 962.0),
        point(1.0, 150.7, -14.2, 950.0),
        point(2.0, 150.4, -14.4, 956.0),
        point(3.0, 150.1, -14.6, 944.0),
    ];
    let g = generator();
    let ab = g
        .calculate_extremes_from_track(&Track::new(1, steps[..2].to_vec()))
        .unwrap()
        .unwrap();
    let cd = g
        .calculate_extremes_from_track(&Track::new(1, steps[2..].to_vec()))
        .unwrap()
        .unwrap();

    let mut forward = ab.clone();
    forward.merge(&cd).unwrap();
    let mut backward = cd.clone();
    backward.merge(&ab).unwrap();
    assert_eq!(forward, backward);

    let whole = g.calculate_extremes_from_track(&Track::new(1, steps.to_vec())).unwrap().unwrap();
    assert_eq!(forward.gust, whole.gust);
    assert_eq!(forward.pressure, whole.pressure);

    // The same storm twice ties every gust; either order keeps the same node
    let mut twice = ab.clone();
    twice.merge(&ab).unwrap();
    assert_eq!(twice, ab);
}

#[test]
fn test_stronger_storm_dominates() {
    let weak = Track::new(1, vec![point(0.0, 150.0, -15.0, 990.0)]);
    let strong = Track::new(2, vec![point(0.0, 150.0, -15.0, 930.0)]);

    let g = generator();
    let w = g.calculate_extremes_from_track(&weak).unwrap().unwrap();
    let both = g.calculate_extremes_from_tracks(&[weak, strong]).unwrap().unwrap();
    assert!(both.peak_gust() > w.peak_gust());
    assert!(both.pressure.min() < w.pressure.min());
    for (x, y) in both.gust.iter().zip(w.gust.iter()) {
        assert!(x >= y);
    }
}

#[test]
fn test_dump_writes_one_gust_file_per_track_file() {
    let dir = tempfile::tempdir().unwrap();
    let tracks_dir = dir.path().join("tracks");
    let out = dir.path().join("windfield");
    std::fs::create_dir_all(&tracks_dir).unwrap();

    let files: Vec<_> = (0..2)
        .map(|i| {
            let path = tracks_dir.join(format!("tracks.{i:04}.csv"));
            let lon = 149.5 + f64::from(i);
            write_tracks(
                &path,
                &[Track::new(1, vec![point(0.0, lon, -15.0, 950.0), point(1.0, lon - 0.2, -15.1, 948.0)])],
            )
            .unwrap();
            path
        })
        .collect();

    let written = generator().dump_gusts_from_trackfiles(&files, &out).unwrap();
    assert_eq!(written, vec![out.join("gust.0000.json"), out.join("gust.0001.json")]);

    let gust = GustFile::read(&written[1]).unwrap();
    assert_eq!(gust.lon.values.len(), 61);
    assert_eq!(gust.lat.values.len(), 61);
    assert_eq!(gust.attributes.radial_profile, "holland");
    assert_eq!(gust.attributes.boundary_layer, "kepert");
    assert!(gust.attributes.track_file.ends_with("tracks.0001.csv"));
    let (lo, hi) = gust.vmax.actual_range.unwrap();
    assert_eq!(lo, 0.0);
    assert!(hi > 20.0 && hi < gust.vmax.valid_range.1);
    let (p_lo, p_hi) = gust.slp.actual_range.unwrap();
    assert!(p_lo >= 94800.0 - 1e-6 && p_hi <= 100800.0 + 1e-6);
}

#[test]
fn test_envelope_region_without_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracks.0000.csv");
    write_tracks(&path, &[Track::new(1, vec![point(0.0, 150.3, -15.2, 960.0)])]).unwrap();

    let g = WindfieldGenerator::new(WindfieldConfig {
        margin: 0.5,
        resolution: 0.25,
        ..Default::default()
    });
    let field = g.calculate_extremes_from_trackfile(&path).unwrap().unwrap();
    // [150, 151] x [-16, -15] widened by the margin
    assert_eq!(field.grid.lon(0), 149.5);
    assert_eq!(field.grid.lat(0), -16.5);
    assert_eq!(field.grid.nx(), 9);

    let empty = dir.path().join("tracks.0001.csv");
    write_tracks(&empty, &[]).unwrap();
    assert!(g.calculate_extremes_from_trackfile(&empty).unwrap().is_none());
}
