use crate::{DensityField, QuadratureField};
use femesh::{CellId, DiscretizationLayout};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum CheckpointError {
    InvalidRunId(String),
    Io(std::io::Error),
    Format(serde_json::Error),
    LayoutMismatch {
        stored: DiscretizationLayout,
        expected: DiscretizationLayout,
    },
    Corrupt(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CheckpointError::InvalidRunId(id) => write!(f, "invalid run id '{}'", id),
            CheckpointError::Io(e) => write!(f, "checkpoint i/o: {}", e),
            CheckpointError::Format(e) => write!(f, "checkpoint format: {}", e),
            CheckpointError::LayoutMismatch { stored, expected } => write!(
                f,
                "stored layout {:?} does not match discretization {:?}",
                stored, expected
            ),
            CheckpointError::Corrupt(s) => write!(f, "corrupt checkpoint: {}", s),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        CheckpointError::Format(e)
    }
}

/// Density persistence keyed by run identifier.
pub trait Checkpoint: Send + Sync {
    fn save(
        &self,
        run_id: &str,
        density: &DensityField,
        layout: DiscretizationLayout,
    ) -> Result<(), CheckpointError>;

    /// Loads the density stored under `run_id`; fails unless it was
    /// written for `expected`.
    fn load(
        &self,
        run_id: &str,
        expected: DiscretizationLayout,
    ) -> Result<DensityField, CheckpointError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDensity {
    layout: DiscretizationLayout,
    cells: Vec<usize>,
    channels: Vec<Vec<f64>>,
}

impl StoredDensity {
    fn from_density(density: &DensityField, layout: DiscretizationLayout) -> Self {
        let cells = density.channel(0).iter().map(|(c, _)| c.0).collect();

        let channels = match density {
            DensityField::NonSpin(rho) => vec![rho.flatten()],
            DensityField::Spin(up, dn) => vec![up.flatten(), dn.flatten()],
        };

        StoredDensity {
            layout,
            cells,
            channels,
        }
    }

    fn into_density(self) -> Result<DensityField, CheckpointError> {
        let nq = self.layout.n_q_points;

        let build = |flat: &[f64]| -> Result<QuadratureField, CheckpointError> {
            if flat.len() != self.cells.len() * nq {
                return Err(CheckpointError::Corrupt(format!(
                    "{} values for {} cells of {} points",
                    flat.len(),
                    self.cells.len(),
                    nq
                )));
            }

            let mut field = QuadratureField::new();
            for (i, c) in self.cells.iter().enumerate() {
                field.insert(CellId(*c), flat[i * nq..(i + 1) * nq].to_vec());
            }

            Ok(field)
        };

        match self.channels.as_slice() {
            [rho] => Ok(DensityField::NonSpin(build(rho)?)),
            [up, dn] => Ok(DensityField::Spin(build(up)?, build(dn)?)),
            _ => Err(CheckpointError::Corrupt(format!(
                "{} spin channels stored",
                self.channels.len()
            ))),
        }
    }
}

/// One JSON file per run under a directory; floats round-trip exactly.
#[derive(Debug, Clone)]
pub struct JsonCheckpoint {
    dir: PathBuf,
}

impl JsonCheckpoint {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        JsonCheckpoint {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, run_id: &str) -> Result<PathBuf, CheckpointError> {
        let valid = !run_id.is_empty()
            && run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !run_id.starts_with('.');

        if !valid {
            return Err(CheckpointError::InvalidRunId(run_id.to_string()));
        }

        Ok(self.dir.join(format!("{}.rho.json", run_id)))
    }
}

impl Checkpoint for JsonCheckpoint {
    fn save(
        &self,
        run_id: &str,
        density: &DensityField,
        layout: DiscretizationLayout,
    ) -> Result<(), CheckpointError> {
        let path = self.path_for(run_id)?;

        fs::create_dir_all(&self.dir)?;

        let stored = StoredDensity::from_density(density, layout);
        fs::write(&path, serde_json::to_vec(&stored)?)?;

        info!("density checkpoint written to {}", path.display());

        Ok(())
    }

    fn load(
        &self,
        run_id: &str,
        expected: DiscretizationLayout,
    ) -> Result<DensityField, CheckpointError> {
        let path = self.path_for(run_id)?;

        let bytes = fs::read(&path)?;
        let stored: StoredDensity = serde_json::from_slice(&bytes)?;

        if stored.layout != expected {
            return Err(CheckpointError::LayoutMismatch {
                stored: stored.layout,
                expected,
            });
        }

        stored.into_density()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use femesh::{Boundary, Discretization, Line1D};

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dfttypes-ckpt-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn test_json_checkpoint_is_bit_exact() {
        let mesh = Line1D::new(3.0, 5, Boundary::Dirichlet).unwrap();

        let rho = DensityField::Spin(
            QuadratureField::from_fn(&mesh, |x| (x[0] * 1.234567).sin() / 3.0),
            QuadratureField::from_fn(&mesh, |x| 0.1 + x[0] * 1e-17),
        );

        let dir = scratch_dir("exact");
        let ckpt = JsonCheckpoint::new(&dir);

        ckpt.save("run-1", &rho, mesh.layout()).unwrap();
        let back = ckpt.load("run-1", mesh.layout()).unwrap();

        assert_eq!(back, rho);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_checkpoint_rejects_other_layout() {
        let mesh = Line1D::new(1.0, 4, Boundary::Periodic).unwrap();
        let finer = Line1D::new(1.0, 8, Boundary::Periodic).unwrap();

        let rho = DensityField::NonSpin(QuadratureField::constant(&mesh, 2.0));

        let dir = scratch_dir("layout");
        let ckpt = JsonCheckpoint::new(&dir);

        ckpt.save("coarse", &rho, mesh.layout()).unwrap();

        assert!(matches!(
            ckpt.load("coarse", finer.layout()),
            Err(CheckpointError::LayoutMismatch { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_id_must_be_a_plain_name() {
        let ckpt = JsonCheckpoint::new(scratch_dir("ids"));

        assert!(matches!(
            ckpt.path_for("../escape"),
            Err(CheckpointError::InvalidRunId(_))
        ));
        assert!(ckpt.path_for("scf_01").is_ok());
    }
}
