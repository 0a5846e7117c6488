//! Formatted terminal output.
//!
//! Formatting lives here so the search code stays free of presentation and
//! output changes stay local.

use std::fmt::Write as _;

use crate::app::pipeline::RunOutput;
use crate::domain::SyntheticConfig;
use crate::error::AppError;
use crate::io::container::Container;
use crate::results::{MISFIT_KEY, ResultArray};
use crate::tensor::MomentTensor;

fn tensor_line(mt: &MomentTensor) -> String {
    let [rr, tt, pp, rt, rp, tp] = *mt.components();
    format!(
        "Mrr={rr:+.4e} Mtt={tt:+.4e} Mpp={pp:+.4e} Mrt={rt:+.4e} Mrp={rp:+.4e} Mtp={tp:+.4e}"
    )
}

/// Summary of a synthetic search: grid, best point, per-category misfit.
pub fn format_search_summary(run: &RunOutput, config: &SyntheticConfig) -> String {
    let mut out = String::new();

    out.push_str("=== mtsearch - synthetic grid search ===\n");
    let _ = writeln!(
        out,
        "Grid: {} | {} points | axes [{}]",
        config.preset,
        run.grid.size(),
        run.grid.axis_names().join(", ")
    );
    let _ = writeln!(
        out,
        "Data: {} stations | noise={} | workers={} | strategy={:?}",
        config.stations, config.noise, config.workers, config.strategy
    );
    let _ = writeln!(out, "Elapsed: {:.3}s", run.elapsed.as_secs_f64());

    out.push_str("\nTrue point:\n");
    let _ = writeln!(out, "  index {}", run.true_index);
    let _ = writeln!(out, "  {}", tensor_line(&run.truth));

    out.push_str("\nBest fit:\n");
    let _ = writeln!(out, "  index {} | misfit {:.6e}", run.best.index, run.best.misfit);
    let coords: Vec<String> = run
        .best
        .point
        .coords
        .iter()
        .map(|(name, value)| format!("{name}={value:.4}"))
        .collect();
    let _ = writeln!(out, "  {}", coords.join(" "));
    if let Some(mt) = &run.best.point.tensor {
        let _ = writeln!(out, "  {}", tensor_line(mt));
    }
    let _ = writeln!(
        out,
        "  recovered: {}",
        if run.recovered() { "yes" } else { "no" }
    );

    out.push_str("\nMisfit by category:\n");
    for (name, category) in &run.breakdown {
        let _ = writeln!(out, "  {name:<14} {:.6e}", category.total);
        for station in &category.stations {
            let shifts: Vec<String> = station
                .shifts
                .iter()
                .map(|g| {
                    let comps: String = g.components.iter().map(|c| c.letter()).collect();
                    format!("{comps}:{:+.2}s", g.shift)
                })
                .collect();
            let _ = writeln!(
                out,
                "    {:<10} {:.6e}  {}",
                station.station,
                station.misfit,
                shifts.join(" ")
            );
        }
    }

    if !run.removed.is_empty() {
        out.push_str("\nStations without weights:\n");
        for (name, ids) in &run.removed {
            let _ = writeln!(out, "  {name}: {}", ids.join(", "));
        }
    }

    if let Some(path) = &config.output {
        let _ = writeln!(out, "\nSaved: {}", path.display());
    }
    out
}

/// Keys of a saved container plus its best-fit point when it holds misfits.
pub fn format_container_summary(container: &Container) -> Result<String, AppError> {
    let mut out = String::new();
    out.push_str("=== mtsearch - container ===\n");
    let _ = writeln!(
        out,
        "Kind: {} | {} points | axes [{}]",
        container.kind,
        container.size,
        container.axes.join(", ")
    );
    if let Some(transform) = &container.transform {
        let _ = writeln!(out, "Transform: {transform}");
    }
    if let Some(created) = container.created {
        let _ = writeln!(out, "Created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    out.push_str("\nArrays:\n");
    for key in container.keys() {
        let len = container.get(key).map_or(0, <[f64]>::len);
        let _ = writeln!(out, "  {key:<16} {len}");
    }

    if let Some(values) = container.get(MISFIT_KEY) {
        let misfit = ResultArray::from_vec(values.to_vec());
        if let Some(index) = misfit.argmin() {
            let coords = container.coordinates(index)?;
            let coords: Vec<String> = coords
                .iter()
                .map(|(name, value)| format!("{name}={value:.4}"))
                .collect();
            let _ = writeln!(out, "\nBest fit: index {index} | misfit {:.6e}", values[index]);
            let _ = writeln!(out, "  {}", coords.join(" "));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    fn container() -> Container {
        let mut arrays = BTreeMap::new();
        arrays.insert("axis/x".to_string(), vec![0.0, 1.0, 2.0]);
        arrays.insert("misfit".to_string(), vec![5.0, 0.5, 3.0]);
        Container {
            tool: "mtsearch".into(),
            created: None,
            kind: "structured".into(),
            size: 3,
            axes: vec!["x".into()],
            transform: None,
            arrays,
        }
    }

    #[test]
    fn container_summary_reports_best_point() {
        let text = format_container_summary(&container()).unwrap();
        assert!(text.contains("Best fit: index 1"));
        assert!(text.contains("x=1.0000"));
        assert!(text.contains("misfit"));
    }

    #[test]
    fn container_without_misfit_has_no_best_fit() {
        let mut c = container();
        c.arrays.remove("misfit");
        let text = format_container_summary(&c).unwrap();
        assert!(!text.contains("Best fit"));
    }

    #[test]
    fn tensor_line_lists_all_components() {
        let line = tensor_line(&MomentTensor::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        for key in ["Mrr", "Mtt", "Mpp", "Mrt", "Mrp", "Mtp"] {
            assert!(line.contains(key));
        }
    }
}
