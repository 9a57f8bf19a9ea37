use crate::prelude::{Samples, Shape, StageError, StageResult};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

/// Dimension sizes of a raw capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeLayout {
    pub frames: usize,
    pub tx_antennas: usize,
    pub rx_antennas: usize,
    pub ramps: usize,
    pub samples: usize,
}

impl CubeLayout {
    /// `(frames, tx_antennas, rx_antennas, ramps, samples)`.
    pub fn shape(&self) -> Shape {
        Shape::from([
            self.frames,
            self.tx_antennas,
            self.rx_antennas,
            self.ramps,
            self.samples,
        ])
    }

    pub fn sample_count(&self) -> usize {
        self.shape().len()
    }
}

/// Raw capture in row-major order, as handed over by a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarCube {
    pub layout: CubeLayout,
    pub samples: Vec<f32>,
}

impl RadarCube {
    pub fn new(layout: CubeLayout, samples: Vec<f32>) -> StageResult<Self> {
        if samples.len() != layout.sample_count() {
            return Err(StageError::ShapeMismatch {
                stage: "radar-cube".to_string(),
                expected: layout.shape(),
                found: Shape::from([samples.len()]),
            });
        }
        Ok(Self { layout, samples })
    }

    pub fn into_samples(self) -> StageResult<Samples> {
        let shape = self.layout.shape();
        let data = ArrayD::from_shape_vec(IxDyn(shape.dims()), self.samples)?;
        Ok(Samples::Real(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> CubeLayout {
        CubeLayout {
            frames: 2,
            tx_antennas: 1,
            rx_antennas: 1,
            ramps: 4,
            samples: 8,
        }
    }

    #[test]
    fn cube_converts_to_five_dimensional_samples() {
        let cube = RadarCube::new(layout(), vec![0.5; 64]).unwrap();
        let samples = cube.into_samples().unwrap();
        assert_eq!(samples.shape(), Shape::from([2, 1, 1, 4, 8]));
    }

    #[test]
    fn sample_count_must_match_layout() {
        assert!(RadarCube::new(layout(), vec![0.0; 63]).is_err());
    }
}
