//! In-memory gridded datasets.

use std::collections::BTreeSet;

use dial_core::FloatType;
use ndarray::{ArrayD, Axis};
use thiserror::Error;

/// The values of a variable, in their stored element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
}

impl Values {
    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(a) => a.len(),
            Self::Float64(a) => a.len(),
            Self::Int32(a) => a.len(),
            Self::Int64(a) => a.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float32(a) => a.shape(),
            Self::Float64(a) => a.shape(),
            Self::Int32(a) => a.shape(),
            Self::Int64(a) => a.shape(),
        }
    }

    /// Returns `true` for floating-point values, the only kind that can be
    /// compressed lossily.
    #[must_use]
    pub fn is_float(&self) -> bool {
        self.float_type().is_some()
    }

    /// Returns the floating-point type the values are stored as, or `None`
    /// for integers.
    #[must_use]
    pub fn float_type(&self) -> Option<FloatType> {
        match self {
            Self::Float32(_) => Some(FloatType::F32),
            Self::Float64(_) => Some(FloatType::F64),
            Self::Int32(_) | Self::Int64(_) => None,
        }
    }

    /// Converts the values to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Self::Float32(a) => a.mapv(f64::from),
            Self::Float64(a) => a.clone(),
            Self::Int32(a) => a.mapv(f64::from),
            Self::Int64(a) => a.mapv(|v| v as f64),
        }
    }

    /// Replaces NaN with `value` in floating-point data.
    #[allow(clippy::cast_possible_truncation)]
    fn fill_missing(&mut self, value: f64) {
        match self {
            Self::Float32(a) => a.mapv_inplace(|v| if v.is_nan() { value as f32 } else { v }),
            Self::Float64(a) => a.mapv_inplace(|v| if v.is_nan() { value } else { v }),
            Self::Int32(_) | Self::Int64(_) => {}
        }
    }
}

impl From<ArrayD<f32>> for Values {
    fn from(array: ArrayD<f32>) -> Self {
        Self::Float32(array)
    }
}

impl From<ArrayD<f64>> for Values {
    fn from(array: ArrayD<f64>) -> Self {
        Self::Float64(array)
    }
}

impl From<ArrayD<i32>> for Values {
    fn from(array: ArrayD<i32>) -> Self {
        Self::Int32(array)
    }
}

impl From<ArrayD<i64>> for Values {
    fn from(array: ArrayD<i64>) -> Self {
        Self::Int64(array)
    }
}

/// Errors that can occur when building a dataset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("{name} has {dims} dimension names for {ndim}-dimensional data")]
    DimensionMismatch {
        name: String,
        dims: usize,
        ndim: usize,
    },
}

/// A named, dimensioned array.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    dims: Vec<String>,
    values: Values,
}

impl Variable {
    /// Creates a variable with one name per dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of names does not match the data.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        dims: impl IntoIterator<Item = S>,
        values: impl Into<Values>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        let values = values.into();

        let ndim = values.shape().len();
        if dims.len() != ndim {
            return Err(DatasetError::DimensionMismatch {
                name,
                dims: dims.len(),
                ndim,
            });
        }

        Ok(Self { name, dims, values })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Returns the total number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Returns the data as `f64`, restricted to the last step along `dim`
    /// when the variable has that dimension.
    #[must_use]
    pub fn last_step(&self, dim: &str) -> ArrayD<f64> {
        let data = self.values.to_f64();
        match self.dims.iter().position(|d| d == dim) {
            Some(axis) if data.len_of(Axis(axis)) > 0 => {
                let last = data.len_of(Axis(axis)) - 1;
                data.index_axis(Axis(axis), last).to_owned()
            }
            _ => data,
        }
    }
}

/// A collection of variables, some of which are coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    variables: Vec<Variable>,
    coordinates: BTreeSet<String>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a data variable, replacing any variable with the same name.
    pub fn insert(&mut self, variable: Variable) {
        self.coordinates.remove(variable.name());
        self.upsert(variable);
    }

    /// Adds a coordinate variable, replacing any variable with the same name.
    pub fn insert_coordinate(&mut self, variable: Variable) {
        self.coordinates.insert(variable.name().to_string());
        self.upsert(variable);
    }

    /// Builder form of [`Dataset::insert`].
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.insert(variable);
        self
    }

    /// Builder form of [`Dataset::insert_coordinate`].
    #[must_use]
    pub fn with_coordinate(mut self, variable: Variable) -> Self {
        self.insert_coordinate(variable);
        self
    }

    fn upsert(&mut self, variable: Variable) {
        match self
            .variables
            .iter_mut()
            .find(|v| v.name() == variable.name())
        {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    /// Iterates over every variable, coordinates included, in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    #[must_use]
    pub fn is_coordinate(&self, name: &str) -> bool {
        self.coordinates.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Drops every data variable not named in `names`. Coordinates are kept.
    pub fn retain_variables<S: AsRef<str>>(&mut self, names: &[S]) {
        let coordinates = &self.coordinates;
        self.variables.retain(|v| {
            coordinates.contains(v.name()) || names.iter().any(|n| n.as_ref() == v.name())
        });
    }

    /// Replaces NaN with `value` in every floating-point variable.
    pub fn fill_missing(&mut self, value: f64) {
        for variable in &mut self.variables {
            variable.values.fill_missing(value);
        }
    }
}
