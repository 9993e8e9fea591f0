use std::fmt;

use log::{debug, warn};

use crate::{
    errors::{Error, Result},
    storage::{CreateMode, DimId, Handle, Length, OpenMode, Storage, VarId},
    value::{TypeCode, Value},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub id: DimId,

    /// Unique within a dataset, e.g. "time"
    pub name: String,

    /// Length when the dataset was opened or the dimension was defined. Unlimited dimensions can
    /// grow after that, use `Dataset::dimension_length` for the current length.
    pub len: usize,

    pub unlimited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub id: VarId,

    /// Name of the variable, e.g. "precipitation"
    pub name: String,

    /// The kind of scalar stored in this variable
    pub type_code: TypeCode,

    /// The dimensions of each axis, in axis order
    pub dimensions: Vec<DimId>,

    /// Names of the dimensions of each axis, in axis order
    pub dimension_names: Vec<String>,

    /// Number of attributes attached to this variable
    pub attributes: usize,

    /// Extent of each axis as of the last `Dataset::refresh`
    pub shape: Vec<usize>,
}

impl Variable {
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// A coordinate variable is rank 1 over the dimension that has its name.
    pub fn is_coordinate(&self) -> bool {
        self.dimension_names.len() == 1 && self.dimension_names[0] == self.name
    }
}

/// One open dataset: an input being merged, or the output being merged into.
///
/// The storage handle is closed when the dataset is dropped, unless `close` was already called.
/// A failure to close during drop can only be logged, so the success path should call `close`
/// explicitly.
///
pub struct Dataset<'s> {
    path: String,
    handle: Handle,
    storage: &'s dyn Storage,
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    attributes: usize,
    closed: bool,
}

impl<'s> Dataset<'s> {
    /// Open an existing dataset read only and load its dimensions and variables.
    ///
    /// Fails with `Error::Type` if any variable has an unrecognized type code.
    ///
    pub fn open(storage: &'s dyn Storage, path: &str) -> Result<Self> {
        let handle = storage.open(path, OpenMode::Read)?;
        let mut dataset = Self::new(storage, path, handle);
        dataset.load()?;
        debug!(
            "Opened {}: {} dimensions, {} variables, {} global attributes",
            path,
            dataset.dimensions.len(),
            dataset.variables.len(),
            dataset.attributes
        );

        Ok(dataset)
    }

    /// Create a new, empty dataset, replacing anything already at `path`.
    ///
    pub fn create(storage: &'s dyn Storage, path: &str) -> Result<Self> {
        let handle = storage.create(path, CreateMode::Clobber)?;
        let mut dataset = Self::new(storage, path, handle);
        dataset.load()?;

        Ok(dataset)
    }

    fn new(storage: &'s dyn Storage, path: &str, handle: Handle) -> Self {
        Self {
            path: path.to_string(),
            handle,
            storage,
            dimensions: vec![],
            variables: vec![],
            attributes: 0,
            closed: false,
        }
    }

    fn load(&mut self) -> Result<()> {
        let inquiry = self.storage.inquire(self.handle)?;
        self.attributes = inquiry.attributes;

        for i in 0..inquiry.dimensions {
            let id = DimId(i);
            let info = self.storage.dimension(self.handle, id)?;
            self.dimensions.push(Dimension {
                id,
                name: info.name,
                len: info.len,
                unlimited: info.unlimited,
            });
        }

        for i in 0..inquiry.variables {
            let id = VarId(i);
            let metadata = self.storage.variable_metadata(self.handle, id)?;
            let type_code = TypeCode::resolve(
                metadata.type_code,
                format!("{}: variable '{}'", self.path, metadata.name),
            )?;
            let mut variable = Variable {
                id,
                name: metadata.name,
                type_code,
                dimension_names: metadata
                    .dimensions
                    .iter()
                    .map(|&dim| self.dimension_name(dim))
                    .collect::<Result<Vec<String>>>()?,
                dimensions: metadata.dimensions,
                attributes: metadata.attributes,
                shape: vec![],
            };
            variable.shape = self.shape_of(&variable)?;
            self.variables.push(variable);
        }

        Ok(())
    }

    fn dimension_name(&self, id: DimId) -> Result<String> {
        match self.dimensions.iter().find(|dim| dim.id == id) {
            Some(dim) => Ok(dim.name.clone()),
            None => Err(Error::storage(
                &self.path,
                format!("Invalid dimension ID: {}", id.0),
            )),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn storage(&self) -> &'s dyn Storage {
        self.storage
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of global attributes
    pub fn attributes(&self) -> usize {
        self.attributes
    }

    pub fn get_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|var| var.name == name)
    }

    /// The coordinate variable for a dimension, if the dataset has one.
    pub fn coordinate_variable(&self, dimension: &str) -> Option<&Variable> {
        self.get_variable(dimension)
            .filter(|variable| variable.is_coordinate())
    }

    pub fn define_dimension(&mut self, name: &str, length: Length) -> Result<DimId> {
        let id = self.storage.define_dimension(self.handle, name, length)?;
        let info = self.storage.dimension(self.handle, id)?;
        self.dimensions.push(Dimension {
            id,
            name: info.name,
            len: info.len,
            unlimited: info.unlimited,
        });

        Ok(id)
    }

    /// Define a variable over already defined dimensions, named in axis order.
    ///
    pub fn define_variable(
        &mut self,
        name: &str,
        type_code: TypeCode,
        dimension_names: &[String],
    ) -> Result<Variable> {
        let dimensions = dimension_names
            .iter()
            .map(|dim_name| match self.get_dimension(dim_name) {
                Some(dim) => Ok(dim.id),
                None => Err(Error::storage(
                    &self.path,
                    format!("{name}: dimension '{dim_name}' is not defined"),
                )),
            })
            .collect::<Result<Vec<DimId>>>()?;
        let id = self
            .storage
            .define_variable(self.handle, name, type_code, &dimensions)?;
        let mut variable = Variable {
            id,
            name: name.to_string(),
            type_code,
            dimensions,
            dimension_names: dimension_names.to_vec(),
            attributes: 0,
            shape: vec![],
        };
        variable.shape = self.shape_of(&variable)?;
        self.variables.push(variable.clone());

        Ok(variable)
    }

    /// Current length of a dimension, straight from storage
    pub fn dimension_length(&self, dim: DimId) -> Result<usize> {
        self.storage.dimension_length(self.handle, dim)
    }

    /// Shape of a variable computed from current dimension lengths.
    ///
    pub fn shape_of(&self, variable: &Variable) -> Result<Vec<usize>> {
        variable
            .dimensions
            .iter()
            .map(|&dim| self.dimension_length(dim))
            .collect()
    }

    /// A copy of `variable` with its shape recomputed. Unlimited dimensions may have grown since
    /// the shape was last computed, so call this before any traversal.
    ///
    pub fn refresh(&self, variable: &Variable) -> Result<Variable> {
        let shape = self.shape_of(variable)?;

        Ok(Variable {
            shape,
            ..variable.clone()
        })
    }

    pub fn read(&self, variable: &Variable, index: &[usize], type_code: TypeCode) -> Result<Value> {
        self.storage
            .read_scalar(self.handle, variable.id, index, type_code)
    }

    pub fn write(&self, variable: &Variable, index: &[usize], value: &Value) -> Result<()> {
        self.storage
            .write_scalar(self.handle, variable.id, index, value)
    }

    /// Release the storage handle.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.storage.close(self.handle)
    }
}

impl Drop for Dataset<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(err) = self.storage.close(self.handle) {
                warn!("Failed to close {}: {}", self.path, err);
            }
        }
    }
}

impl fmt::Debug for Dataset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("dimensions", &self.dimensions)
            .field("variables", &self.variables)
            .field("attributes", &self.attributes)
            .finish()
    }
}
