use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    odometer::Odometer,
    value::{TypeCode, Value},
};

/// An open dataset container in some `Storage`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub usize);

/// A dimension within one container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DimId(pub usize);

/// A variable within one container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateMode {
    /// Replace any existing container at the same path
    Clobber,

    /// Fail if a container already exists at the path
    NoClobber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Length {
    Fixed(usize),
    Unlimited,
}

/// Counts of the top level objects in a container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inquiry {
    pub dimensions: usize,
    pub variables: usize,
    pub attributes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableMetadata {
    pub name: String,

    /// The raw type code, as stored. Not guaranteed to be one of the recognized kinds.
    pub type_code: i32,

    pub dimensions: Vec<DimId>,
    pub attributes: usize,
}

/// What an attribute is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeTarget {
    Global,
    Variable(VarId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,

    /// The raw type code, as stored. Not guaranteed to be one of the recognized kinds.
    pub type_code: i32,

    pub len: usize,
}

/// A named, typed list of values attached to a variable or to a whole container.
///
/// Text attributes are stored as a list of `Char` values, one per byte.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub type_code: TypeCode,
    pub values: Vec<Value>,
}

impl Attribute {
    pub fn new<S: Into<String>>(name: S, type_code: TypeCode, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            type_code,
            values,
        }
    }

    pub fn text<S: Into<String>>(name: S, text: &str) -> Self {
        let values = text.bytes().map(Value::Char).collect();
        Self::new(name, TypeCode::Char, values)
    }

    /// The attribute's content as a string, if it is a text attribute
    pub fn as_text(&self) -> Option<String> {
        if self.type_code != TypeCode::Char {
            return None;
        }

        let bytes = self
            .values
            .iter()
            .map(|value| value.as_char())
            .collect::<Option<Vec<u8>>>()?;

        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The storage collaborator: everything the merge needs from an array store.
///
/// Implementations guard their own state, so every method takes `&self`. Calls are blocking
/// and are never issued concurrently by the merge.
///
pub trait Storage: Send + Sync {
    /// Open an existing container.
    ///
    fn open(&self, path: &str, mode: OpenMode) -> Result<Handle>;

    /// Create a new, empty container. The returned handle is writable.
    ///
    fn create(&self, path: &str, mode: CreateMode) -> Result<Handle>;

    /// Release a handle. For writable handles this is where changes are made durable.
    ///
    fn close(&self, handle: Handle) -> Result<()>;

    /// The path a handle was opened or created with
    fn path_of(&self, handle: Handle) -> Result<String>;

    fn inquire(&self, handle: Handle) -> Result<Inquiry>;

    fn define_dimension(&self, handle: Handle, name: &str, length: Length) -> Result<DimId>;

    /// Find a dimension by name. Returns `Option::None` if there is no such dimension.
    ///
    fn find_dimension(&self, handle: Handle, name: &str) -> Result<Option<DimId>>;

    fn dimension(&self, handle: Handle, dim: DimId) -> Result<DimensionInfo>;

    /// The current length of a dimension. Unlimited dimensions grow as data is written to them.
    ///
    fn dimension_length(&self, handle: Handle, dim: DimId) -> Result<usize> {
        Ok(self.dimension(handle, dim)?.len)
    }

    fn define_variable(
        &self,
        handle: Handle,
        name: &str,
        type_code: TypeCode,
        dimensions: &[DimId],
    ) -> Result<VarId>;

    /// Find a variable by name. Returns `Option::None` if there is no such variable.
    ///
    fn find_variable(&self, handle: Handle, name: &str) -> Result<Option<VarId>>;

    fn variable_metadata(&self, handle: Handle, var: VarId) -> Result<VariableMetadata>;

    /// Read one element, converted to `type_code`.
    ///
    /// Cells inside the variable's shape that were never written read as the fill value of the
    /// variable's kind.
    ///
    fn read_scalar(
        &self,
        handle: Handle,
        var: VarId,
        index: &[usize],
        type_code: TypeCode,
    ) -> Result<Value>;

    /// Write one element. Writing past the end of an unlimited dimension grows it.
    ///
    fn write_scalar(&self, handle: Handle, var: VarId, index: &[usize], value: &Value)
        -> Result<()>;

    /// Read the rectangular block of `count` elements per axis starting at `start`.
    ///
    fn read_block(
        &self,
        handle: Handle,
        var: VarId,
        start: &[usize],
        count: &[usize],
        type_code: TypeCode,
    ) -> Result<ArrayD<Value>> {
        if start.len() != count.len() {
            return Err(Error::storage(
                self.path_of(handle)?,
                format!(
                    "block start has {} axes but count has {}",
                    start.len(),
                    count.len()
                ),
            ));
        }

        let mut index = start.to_vec();
        let mut values = Vec::with_capacity(count.iter().product());
        for offset in Odometer::new(count) {
            for (axis, i) in offset.iter().enumerate() {
                index[axis] = start[axis] + i;
            }
            values.push(self.read_scalar(handle, var, &index, type_code)?);
        }

        match ArrayD::from_shape_vec(IxDyn(count), values) {
            Ok(block) => Ok(block),
            Err(err) => Err(Error::storage(self.path_of(handle)?, err.to_string())),
        }
    }

    /// Write a rectangular block of elements with its first element at `start`.
    ///
    fn write_block(
        &self,
        handle: Handle,
        var: VarId,
        start: &[usize],
        block: ArrayViewD<'_, Value>,
    ) -> Result<()> {
        if start.len() != block.ndim() {
            return Err(Error::storage(
                self.path_of(handle)?,
                format!(
                    "block start has {} axes but block has {}",
                    start.len(),
                    block.ndim()
                ),
            ));
        }

        let mut index = start.to_vec();
        for offset in Odometer::new(block.shape()) {
            for (axis, i) in offset.iter().enumerate() {
                index[axis] = start[axis] + i;
            }
            self.write_scalar(handle, var, &index, &block[IxDyn(&offset)])?;
        }

        Ok(())
    }

    /// Describe the attribute at position `index` of `target`.
    ///
    fn attribute_info(
        &self,
        handle: Handle,
        target: AttributeTarget,
        index: usize,
    ) -> Result<AttributeInfo>;

    /// Read a named attribute. Fails with `Error::Type` if the stored type code isn't a
    /// recognized kind.
    ///
    fn read_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        name: &str,
    ) -> Result<Attribute>;

    /// Write an attribute, replacing any attribute of the same name on `target`.
    ///
    fn write_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        attribute: &Attribute,
    ) -> Result<()>;

    fn copy_attribute(
        &self,
        src: Handle,
        src_target: AttributeTarget,
        dst: Handle,
        dst_target: AttributeTarget,
        name: &str,
    ) -> Result<()> {
        let attribute = self.read_attribute(src, src_target, name)?;
        self.write_attribute(dst, dst_target, &attribute)
    }
}
