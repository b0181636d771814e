use anyhow::Result;
use ndarray::{Array, IxDyn};

/// Model tensor, wrapper over [`Array<f32, IxDyn>`].
///
/// Inputs are converted to the element type the session expects right before a run and
/// every output is widened back to `f32`, so pre- and post-processing only ever see this.
#[derive(Debug, Clone, Default)]
pub struct X(pub Array<f32, IxDyn>);

/// Ordered model inputs or outputs.
pub type Xs = Vec<X>;

impl From<Array<f32, IxDyn>> for X {
    fn from(x: Array<f32, IxDyn>) -> Self {
        Self(x)
    }
}

impl std::ops::Deref for X {
    type Target = Array<f32, IxDyn>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl X {
    pub fn from_shape_vec(shape: &[usize], xs: Vec<f32>) -> Result<Self> {
        Ok(Self::from(Array::from_shape_vec(shape, xs)?))
    }

    /// Shape with the leading batch axis of size one removed.
    pub fn unbatched_shape(&self) -> &[usize] {
        match self.0.shape() {
            [1, rest @ ..] => rest,
            shape => shape,
        }
    }
}
