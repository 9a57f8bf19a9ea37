use ndarray::ArrayD;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tuple of dimension sizes identifying a sample array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the dimension `offset` positions from the end (1 = last axis).
    pub fn dim_from_end(&self, offset: usize) -> Option<usize> {
        self.0.len().checked_sub(offset).map(|idx| self.0[idx])
    }

    /// Resolves a possibly negative axis index against this shape.
    pub fn resolve_axis(&self, axis: isize) -> Option<usize> {
        let ndim = self.0.len() as isize;
        let resolved = if axis < 0 { ndim + axis } else { axis };
        (0..ndim).contains(&resolved).then_some(resolved as usize)
    }

    /// Copy of this shape with the last axis replaced by `size`.
    pub fn with_last(&self, size: usize) -> Self {
        let mut dims = self.0.clone();
        if let Some(last) = dims.last_mut() {
            *last = size;
        }
        Self(dims)
    }

    /// Copy of this shape with a trailing axis of `size` appended.
    pub fn push(&self, size: usize) -> Self {
        let mut dims = self.0.clone();
        dims.push(size);
        Self(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, dim) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, ")")
    }
}

/// Element kind carried by a [`Samples`] array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Real,
    Complex,
    Mask,
    Labels,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleKind::Real => "real",
            SampleKind::Complex => "complex",
            SampleKind::Mask => "mask",
            SampleKind::Labels => "labels",
        };
        f.write_str(name)
    }
}

/// n-dimensional array flowing between stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Real(ArrayD<f32>),
    Complex(ArrayD<Complex32>),
    /// Boolean detection mask.
    Mask(ArrayD<bool>),
    /// Cluster labels: -1 no detection, 0 noise, 1.. cluster id.
    Labels(ArrayD<i32>),
}

impl Samples {
    pub fn shape(&self) -> Shape {
        let dims = match self {
            Samples::Real(data) => data.shape(),
            Samples::Complex(data) => data.shape(),
            Samples::Mask(data) => data.shape(),
            Samples::Labels(data) => data.shape(),
        };
        Shape::from(dims)
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            Samples::Real(_) => SampleKind::Real,
            Samples::Complex(_) => SampleKind::Complex,
            Samples::Mask(_) => SampleKind::Mask,
            Samples::Labels(_) => SampleKind::Labels,
        }
    }

    pub fn as_real(&self) -> Option<&ArrayD<f32>> {
        match self {
            Samples::Real(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ArrayD<Complex32>> {
        match self {
            Samples::Complex(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_mask(&self) -> Option<&ArrayD<bool>> {
        match self {
            Samples::Mask(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_labels(&self) -> Option<&ArrayD<i32>> {
        match self {
            Samples::Labels(data) => Some(data),
            _ => None,
        }
    }
}

impl From<ArrayD<f32>> for Samples {
    fn from(data: ArrayD<f32>) -> Self {
        Samples::Real(data)
    }
}

impl From<ArrayD<Complex32>> for Samples {
    fn from(data: ArrayD<Complex32>) -> Self {
        Samples::Complex(data)
    }
}

impl From<ArrayD<bool>> for Samples {
    fn from(data: ArrayD<bool>) -> Self {
        Samples::Mask(data)
    }
}

/// Common error type for stage construction, composition, and execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("{stage}: expected shape {expected}, found {found}")]
    ShapeMismatch {
        stage: String,
        expected: Shape,
        found: Shape,
    },
    #[error("cannot append {stage}: input shape {found} does not follow {expected}")]
    IncompatibleShape {
        stage: String,
        expected: Shape,
        found: Shape,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{stage}: expected {expected} samples, found {found}")]
    UnsupportedSamples {
        stage: String,
        expected: &'static str,
        found: SampleKind,
    },
    #[error("array layout: {0}")]
    Layout(#[from] ndarray::ShapeError),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// Input/output shape pair fixed when a stage is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeContract {
    pub in_shape: Shape,
    pub out_shape: Shape,
}

impl ShapeContract {
    pub fn new(in_shape: Shape, out_shape: Shape) -> Self {
        Self {
            in_shape,
            out_shape,
        }
    }

    /// Contract for stages that do not alter dimensionality.
    pub fn preserving(in_shape: Shape) -> Self {
        Self {
            out_shape: in_shape.clone(),
            in_shape,
        }
    }
}

/// Contract every processing stage implements.
///
/// `transform` computes the result; `invoke` wraps it with the input and
/// output shape checks and is what callers should use.
pub trait Transform {
    fn name(&self) -> &'static str;

    fn contract(&self) -> &ShapeContract;

    fn transform(&self, input: &Samples) -> StageResult<Samples>;

    fn in_shape(&self) -> &Shape {
        &self.contract().in_shape
    }

    fn out_shape(&self) -> &Shape {
        &self.contract().out_shape
    }

    fn invoke(&self, input: &Samples) -> StageResult<Samples> {
        let found = input.shape();
        if &found != self.in_shape() {
            return Err(StageError::ShapeMismatch {
                stage: self.name().to_string(),
                expected: self.in_shape().clone(),
                found,
            });
        }

        let output = self.transform(input)?;
        let produced = output.shape();
        if &produced != self.out_shape() {
            return Err(StageError::ShapeMismatch {
                stage: self.name().to_string(),
                expected: self.out_shape().clone(),
                found: produced,
            });
        }
        Ok(output)
    }
}

pub(crate) fn unsupported(stage: &str, expected: &'static str, input: &Samples) -> StageError {
    StageError::UnsupportedSamples {
        stage: stage.to_string(),
        expected,
        found: input.kind(),
    }
}
