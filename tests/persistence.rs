//! Saving search results and reading them back.

use tempfile::tempdir;

use mt_search::domain::{GridPreset, SyntheticConfig};
use mt_search::io::container::load_container;
use mt_search::results::{MISFIT_KEY, ResultArray, ResultStore};

#[test]
fn pipeline_output_round_trips_through_npz_and_json() {
    let dir = tempdir().unwrap();
    for name in ["run.npz", "run.json"] {
        let path = dir.path().join(name);
        let config = SyntheticConfig {
            npts: Some(3),
            true_index: 13,
            stations: 2,
            output: Some(path.clone()),
            ..SyntheticConfig::default()
        };
        let run = mt_search::app::pipeline::run_synthetic(&config).unwrap();

        let container = load_container(&path).unwrap();
        assert_eq!(container.size, 27);
        assert!(container.is_structured());
        assert_eq!(container.axes, run.grid.axis_names().to_vec());
        assert_eq!(container.get(MISFIT_KEY), Some(run.misfit.as_slice()));
        assert_eq!(container.axis("kappa"), Some(&[60.0, 180.0, 300.0][..]));

        let saved = ResultArray::from_vec(container.get(MISFIT_KEY).unwrap().to_vec());
        assert_eq!(saved.argmin(), Some(run.best.index));
    }
}

#[test]
fn random_grid_saves_every_point() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("random.npz");
    let grid = GridPreset::FmtRandom.build(5.0, Some(40), 8).unwrap();
    let misfit = ResultArray::from_vec((0..40).map(|i| (40 - i) as f64).collect());
    ResultStore::new(&grid, misfit).unwrap().save(&path).unwrap();

    let container = load_container(&path).unwrap();
    assert!(!container.is_structured());
    assert_eq!(container.size, 40);
    for name in ["rho", "v", "w", "kappa", "sigma", "h"] {
        assert_eq!(container.axis(name).map(<[f64]>::len), Some(40));
    }
    let coords = container.coordinates(39).unwrap();
    let point = grid.get(39).unwrap();
    for (name, value) in coords {
        assert_eq!(point.coords.get(&name), Some(value));
    }
}
