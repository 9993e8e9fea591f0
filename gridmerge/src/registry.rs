use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::{
    dataset::Dataset,
    errors::{Error, Result},
    odometer::Odometer,
    storage::{DimId, Length, VarId},
    value::{TypeCode, Value},
};

/// The merged state of one output axis
#[derive(Clone, Debug)]
pub struct Axis {
    /// Dimension name shared by every input that has this axis
    pub name: String,

    /// The output dimension
    pub dimension: DimId,

    /// The output coordinate variable and its kind, once defined
    pub coordinate: Option<(VarId, TypeCode)>,

    /// Coordinate values on the output axis, in on-disk order. No two are equal.
    pub values: Vec<Value>,
}

/// Result of `CoordinateRegistry::lookup_or_append`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub position: usize,

    /// Whether the value was new and had to be appended to the axis
    pub appended: bool,
}

/// Maps each dimension name to its output dimension and the deduplicated coordinate values
/// written to it so far.
///
/// Values are matched by exact equality (see `Value`'s `PartialEq`) using a linear scan, so a
/// lookup costs O(n) in the length of the axis.
///
#[derive(Clone, Debug, Default)]
pub struct CoordinateRegistry {
    axes: Vec<Axis>,
}

impl CoordinateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    fn axis_mut(&mut self, name: &str) -> Option<&mut Axis> {
        self.axes.iter_mut().find(|axis| axis.name == name)
    }

    /// Make sure the output has a dimension called `name`, defining it as unlimited the first
    /// time it is seen. Returns the output dimension.
    ///
    pub fn ensure_dimension(
        &mut self,
        output: &mut Dataset,
        name: &str,
        candidate_length: usize,
    ) -> Result<DimId> {
        if let Some(axis) = self.axis(name) {
            return Ok(axis.dimension);
        }

        let dimension = match output.get_dimension(name) {
            Some(dim) => dim.id,
            None => output.define_dimension(name, Length::Unlimited)?,
        };
        debug!("Defined dimension {name} (input length {candidate_length})");

        self.axes.push(Axis {
            name: name.to_string(),
            dimension,
            coordinate: None,
            values: vec![],
        });

        Ok(dimension)
    }

    /// Bind the output coordinate variable of an axis defined with `ensure_dimension`.
    pub fn attach_coordinate(
        &mut self,
        output: &Dataset,
        name: &str,
        var: VarId,
        type_code: TypeCode,
    ) -> Result<()> {
        match self.axis_mut(name) {
            Some(axis) => {
                axis.coordinate = Some((var, type_code));
                Ok(())
            }
            None => Err(Error::NotFound {
                path: output.path().to_string(),
                variable: name.to_string(),
                axis: 0,
                dimension: name.to_string(),
            }),
        }
    }

    /// Position of `value` on the axis, if it is there.
    pub fn position_of(&self, name: &str, value: &Value) -> Option<usize> {
        self.axis(name)?
            .values
            .iter()
            .position(|existing| existing == value)
    }

    /// Find `value` on the named axis, appending it to the end of the output coordinate variable
    /// if it isn't there yet.
    ///
    pub fn lookup_or_append(
        &mut self,
        output: &Dataset,
        name: &str,
        value: &Value,
    ) -> Result<Lookup> {
        let axis = match self.axis_mut(name) {
            Some(axis) => axis,
            None => {
                return Err(Error::NotFound {
                    path: output.path().to_string(),
                    variable: name.to_string(),
                    axis: 0,
                    dimension: name.to_string(),
                })
            }
        };
        let (var, type_code) = match axis.coordinate {
            Some(coordinate) => coordinate,
            None => {
                return Err(Error::NotFound {
                    path: output.path().to_string(),
                    variable: name.to_string(),
                    axis: 0,
                    dimension: name.to_string(),
                })
            }
        };
        if value.type_code() != type_code {
            return Err(Error::mismatch(
                output.path(),
                name,
                format!(
                    "coordinate value {value} is {} but the axis holds {type_code}",
                    value.type_code()
                ),
            ));
        }

        if let Some(position) = axis.values.iter().position(|existing| existing == value) {
            return Ok(Lookup {
                position,
                appended: false,
            });
        }

        let index = Odometer::append_index(&[axis.values.len()]);
        output
            .storage()
            .write_scalar(output.handle(), var, &index, value)?;
        axis.values.push(value.clone());

        Ok(Lookup {
            position: index[0],
            appended: true,
        })
    }

    /// Sort the named axis ascending, on disk and in memory. Returns whether any value moved.
    ///
    /// Axes without a coordinate variable have nothing to sort. Sorting an already sorted axis
    /// writes nothing.
    ///
    pub fn finalize_order(&mut self, output: &Dataset, name: &str) -> Result<bool> {
        let axis = match self.axis_mut(name) {
            Some(axis) => axis,
            None => return Ok(false),
        };
        let (var, type_code) = match axis.coordinate {
            Some(coordinate) => coordinate,
            None => return Ok(false),
        };

        let storage = output.storage();
        let len = storage.dimension_length(output.handle(), axis.dimension)?;
        let current = storage
            .read_block(output.handle(), var, &[0], &[len], type_code)?
            .into_raw_vec();

        let mut sorted = current.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let moved = sorted != current;

        if moved {
            let block = ArrayD::from_shape_vec(IxDyn(&[len]), sorted.clone())
                .map_err(|err| Error::storage(output.path(), err.to_string()))?;
            storage.write_block(output.handle(), var, &[0], block.view())?;
        }
        axis.values = sorted;

        Ok(moved)
    }
}
