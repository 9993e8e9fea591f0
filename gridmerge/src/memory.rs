//! An implementation of `Storage` that keeps every container in RAM.
//!
//! Containers are keyed by path. Opening a path works on a private copy of its container; when
//! a writable handle is closed its copy replaces the stored container. This gives the same
//! visibility rules as a file based store: changes made through a handle become visible to new
//! handles only after `close`.
//!
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    storage::{
        Attribute, AttributeInfo, AttributeTarget, CreateMode, DimId, DimensionInfo, Handle,
        Inquiry, Length, OpenMode, Storage, VarId, VariableMetadata,
    },
    value::{TypeCode, Value},
};

/// Everything stored under one path
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub dimensions: Vec<StoredDimension>,
    pub variables: Vec<StoredVariable>,
    pub attributes: Vec<StoredAttribute>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredVariable {
    pub name: String,

    /// Raw type code. Kept raw so a container can hold a code this crate doesn't recognize;
    /// such variables fail with `Error::Type` when their metadata is resolved.
    pub type_code: i32,

    /// Indexes into `Container::dimensions`
    pub dimensions: Vec<usize>,

    pub attributes: Vec<StoredAttribute>,

    /// Written cells, keyed by index tuple. Cells not present read as the fill value.
    #[serde(with = "cells")]
    pub cells: BTreeMap<Vec<usize>, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredAttribute {
    pub name: String,
    pub type_code: i32,
    pub values: Vec<Value>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(&self, name: &str) -> Option<&StoredDimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&StoredVariable> {
        self.variables.iter().find(|var| var.name == name)
    }
}

/// JSON object keys must be strings, so the cell map is stored as a list of `[index, value]`
/// pairs.
mod cells {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::value::Value;

    pub fn serialize<S>(cells: &BTreeMap<Vec<usize>, Value>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(cells.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<Vec<usize>, Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs: Vec<(Vec<usize>, Value)> = Vec::deserialize(deserializer)?;

        Ok(pairs.into_iter().collect())
    }
}

struct Session {
    path: String,
    writable: bool,
    container: Container,
}

#[derive(Default)]
struct State {
    containers: HashMap<String, Container>,
    sessions: Vec<Option<Session>>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Store a container at `path`, replacing whatever was there.
    pub fn insert<S: Into<String>>(&self, path: S, container: Container) {
        self.state.lock().containers.insert(path.into(), container);
    }

    /// A copy of the container most recently closed (or inserted) at `path`.
    pub fn get(&self, path: &str) -> Option<Container> {
        self.state.lock().containers.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().containers.contains_key(path)
    }

    /// Number of handles that have been opened or created and not yet closed
    pub fn open_handles(&self) -> usize {
        self.state
            .lock()
            .sessions
            .iter()
            .filter(|session| session.is_some())
            .count()
    }

    fn session<T>(&self, handle: Handle, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        match state.sessions.get(handle.0) {
            Some(Some(session)) => f(session),
            _ => Err(bad_handle(handle)),
        }
    }

    fn session_mut<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        match state.sessions.get_mut(handle.0) {
            Some(Some(session)) => {
                if !session.writable {
                    return Err(Error::storage(&session.path, "Write to read only"));
                }
                f(session)
            }
            _ => Err(bad_handle(handle)),
        }
    }

    fn start_session(&self, state: &mut State, session: Session) -> Handle {
        state.sessions.push(Some(session));

        Handle(state.sessions.len() - 1)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored variable that refers to a dimension the container doesn't have
fn invalid_dimension(path: &str, variable: &StoredVariable, dim: usize) -> Error {
    Error::storage(
        path,
        format!("{}: Invalid dimension ID: {dim}", variable.name),
    )
}

fn bad_handle(handle: Handle) -> Error {
    Error::storage(format!("<handle {}>", handle.0), "Not a valid ID")
}

impl Session {
    fn variable(&self, var: VarId) -> Result<&StoredVariable> {
        self.container
            .variables
            .get(var.0)
            .ok_or_else(|| Error::storage(&self.path, format!("Variable not found: {}", var.0)))
    }

    fn attributes(&self, target: AttributeTarget) -> Result<&Vec<StoredAttribute>> {
        match target {
            AttributeTarget::Global => Ok(&self.container.attributes),
            AttributeTarget::Variable(var) => Ok(&self.variable(var)?.attributes),
        }
    }

    fn attributes_mut(&mut self, target: AttributeTarget) -> Result<&mut Vec<StoredAttribute>> {
        match target {
            AttributeTarget::Global => Ok(&mut self.container.attributes),
            AttributeTarget::Variable(var) => {
                let path = &self.path;
                self.container
                    .variables
                    .get_mut(var.0)
                    .map(|variable| &mut variable.attributes)
                    .ok_or_else(|| Error::storage(path, format!("Variable not found: {}", var.0)))
            }
        }
    }

    fn target_name(&self, target: AttributeTarget) -> String {
        match target {
            AttributeTarget::Global => "global attributes".to_string(),
            AttributeTarget::Variable(var) => match self.container.variables.get(var.0) {
                Some(variable) => format!("variable '{}'", variable.name),
                None => format!("variable {}", var.0),
            },
        }
    }

    /// Check that `index` addresses a cell of `var`, without growing anything.
    fn check_index(&self, variable: &StoredVariable, index: &[usize]) -> Result<()> {
        if index.len() != variable.dimensions.len() {
            return Err(Error::storage(
                &self.path,
                format!(
                    "{}: index has {} axes, variable has {}",
                    variable.name,
                    index.len(),
                    variable.dimensions.len()
                ),
            ));
        }

        for (axis, (&i, &dim)) in index.iter().zip(&variable.dimensions).enumerate() {
            let len = self
                .container
                .dimensions
                .get(dim)
                .ok_or_else(|| invalid_dimension(&self.path, variable, dim))?
                .len;
            if i >= len {
                return Err(Error::storage(
                    &self.path,
                    format!(
                        "{}: Index exceeds dimension bound: axis {axis}, index {i}, length {len}",
                        variable.name
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl Storage for MemoryStore {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Handle> {
        let mut state = self.state.lock();
        let container = state
            .containers
            .get(path)
            .cloned()
            .ok_or_else(|| Error::storage(path, "No such file or directory"))?;
        let session = Session {
            path: path.to_string(),
            writable: mode == OpenMode::Write,
            container,
        };

        Ok(self.start_session(&mut state, session))
    }

    fn create(&self, path: &str, mode: CreateMode) -> Result<Handle> {
        let mut state = self.state.lock();
        if mode == CreateMode::NoClobber && state.containers.contains_key(path) {
            return Err(Error::storage(path, "File exists && NC_NOCLOBBER"));
        }
        state.containers.insert(path.to_string(), Container::new());
        let session = Session {
            path: path.to_string(),
            writable: true,
            container: Container::new(),
        };

        Ok(self.start_session(&mut state, session))
    }

    fn close(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or_else(|| bad_handle(handle))?;
        if session.writable {
            state.containers.insert(session.path, session.container);
        }

        Ok(())
    }

    fn path_of(&self, handle: Handle) -> Result<String> {
        self.session(handle, |session| Ok(session.path.clone()))
    }

    fn inquire(&self, handle: Handle) -> Result<Inquiry> {
        self.session(handle, |session| {
            Ok(Inquiry {
                dimensions: session.container.dimensions.len(),
                variables: session.container.variables.len(),
                attributes: session.container.attributes.len(),
            })
        })
    }

    fn define_dimension(&self, handle: Handle, name: &str, length: Length) -> Result<DimId> {
        self.session_mut(handle, |session| {
            if session.container.dimension(name).is_some() {
                return Err(Error::storage(
                    &session.path,
                    format!("{name}: String match to name in use"),
                ));
            }
            let (len, unlimited) = match length {
                Length::Fixed(len) => (len, false),
                Length::Unlimited => (0, true),
            };
            session.container.dimensions.push(StoredDimension {
                name: name.to_string(),
                len,
                unlimited,
            });

            Ok(DimId(session.container.dimensions.len() - 1))
        })
    }

    fn find_dimension(&self, handle: Handle, name: &str) -> Result<Option<DimId>> {
        self.session(handle, |session| {
            Ok(session
                .container
                .dimensions
                .iter()
                .position(|dim| dim.name == name)
                .map(DimId))
        })
    }

    fn dimension(&self, handle: Handle, dim: DimId) -> Result<DimensionInfo> {
        self.session(handle, |session| {
            let stored = session.container.dimensions.get(dim.0).ok_or_else(|| {
                Error::storage(&session.path, format!("Invalid dimension ID: {}", dim.0))
            })?;

            Ok(DimensionInfo {
                name: stored.name.clone(),
                len: stored.len,
                unlimited: stored.unlimited,
            })
        })
    }

    fn define_variable(
        &self,
        handle: Handle,
        name: &str,
        type_code: TypeCode,
        dimensions: &[DimId],
    ) -> Result<VarId> {
        self.session_mut(handle, |session| {
            if session.container.variable(name).is_some() {
                return Err(Error::storage(
                    &session.path,
                    format!("{name}: String match to name in use"),
                ));
            }
            for dim in dimensions {
                if dim.0 >= session.container.dimensions.len() {
                    return Err(Error::storage(
                        &session.path,
                        format!("{name}: Invalid dimension ID: {}", dim.0),
                    ));
                }
            }
            session.container.variables.push(StoredVariable {
                name: name.to_string(),
                type_code: type_code.code(),
                dimensions: dimensions.iter().map(|dim| dim.0).collect(),
                attributes: vec![],
                cells: BTreeMap::new(),
            });

            Ok(VarId(session.container.variables.len() - 1))
        })
    }

    fn find_variable(&self, handle: Handle, name: &str) -> Result<Option<VarId>> {
        self.session(handle, |session| {
            Ok(session
                .container
                .variables
                .iter()
                .position(|var| var.name == name)
                .map(VarId))
        })
    }

    fn variable_metadata(&self, handle: Handle, var: VarId) -> Result<VariableMetadata> {
        self.session(handle, |session| {
            let variable = session.variable(var)?;

            Ok(VariableMetadata {
                name: variable.name.clone(),
                type_code: variable.type_code,
                dimensions: variable.dimensions.iter().map(|&dim| DimId(dim)).collect(),
                attributes: variable.attributes.len(),
            })
        })
    }

    fn read_scalar(
        &self,
        handle: Handle,
        var: VarId,
        index: &[usize],
        type_code: TypeCode,
    ) -> Result<Value> {
        self.session(handle, |session| {
            let variable = session.variable(var)?;
            session.check_index(variable, index)?;
            let stored_type = TypeCode::resolve(
                variable.type_code,
                format!("{}: variable '{}'", session.path, variable.name),
            )?;
            let value = match variable.cells.get(index) {
                Some(value) => value.clone(),
                None => Value::fill(stored_type),
            };

            value.cast(type_code).ok_or_else(|| {
                Error::storage(
                    &session.path,
                    format!(
                        "{}: Numeric conversion not representable: {value} as {type_code}",
                        variable.name
                    ),
                )
            })
        })
    }

    fn write_scalar(
        &self,
        handle: Handle,
        var: VarId,
        index: &[usize],
        value: &Value,
    ) -> Result<()> {
        self.session_mut(handle, |session| {
            let Session {
                path, container, ..
            } = session;
            let variable = container
                .variables
                .get_mut(var.0)
                .ok_or_else(|| Error::storage(&*path, format!("Variable not found: {}", var.0)))?;
            if index.len() != variable.dimensions.len() {
                return Err(Error::storage(
                    &*path,
                    format!(
                        "{}: index has {} axes, variable has {}",
                        variable.name,
                        index.len(),
                        variable.dimensions.len()
                    ),
                ));
            }
            let stored_type = TypeCode::resolve(
                variable.type_code,
                format!("{path}: variable '{}'", variable.name),
            )?;
            let value = value.cast(stored_type).ok_or_else(|| {
                Error::storage(
                    &*path,
                    format!(
                        "{}: Numeric conversion not representable: {value} as {stored_type}",
                        variable.name
                    ),
                )
            })?;

            // Check every axis before growing any of them
            for (axis, (&i, &dim)) in index.iter().zip(&variable.dimensions).enumerate() {
                let dimension = container
                    .dimensions
                    .get(dim)
                    .ok_or_else(|| invalid_dimension(&*path, variable, dim))?;
                if i >= dimension.len && !dimension.unlimited {
                    return Err(Error::storage(
                        &*path,
                        format!(
                            "{}: Index exceeds dimension bound: axis {axis}, index {i}, \
                             length {}",
                            variable.name, dimension.len
                        ),
                    ));
                }
            }
            for (&i, &dim) in index.iter().zip(&variable.dimensions) {
                if let Some(dimension) = container.dimensions.get_mut(dim) {
                    if i >= dimension.len {
                        dimension.len = i + 1;
                    }
                }
            }
            variable.cells.insert(index.to_vec(), value);

            Ok(())
        })
    }

    fn attribute_info(
        &self,
        handle: Handle,
        target: AttributeTarget,
        index: usize,
    ) -> Result<AttributeInfo> {
        self.session(handle, |session| {
            let attribute = session.attributes(target)?.get(index).ok_or_else(|| {
                Error::storage(
                    &session.path,
                    format!(
                        "{}: Attribute not found: {index}",
                        session.target_name(target)
                    ),
                )
            })?;

            Ok(AttributeInfo {
                name: attribute.name.clone(),
                type_code: attribute.type_code,
                len: attribute.values.len(),
            })
        })
    }

    fn read_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        name: &str,
    ) -> Result<Attribute> {
        self.session(handle, |session| {
            let attribute = session
                .attributes(target)?
                .iter()
                .find(|attribute| attribute.name == name)
                .ok_or_else(|| {
                    Error::storage(
                        &session.path,
                        format!(
                            "{}: Attribute not found: {name}",
                            session.target_name(target)
                        ),
                    )
                })?;
            let type_code = TypeCode::resolve(
                attribute.type_code,
                format!(
                    "{}: {}: attribute '{name}'",
                    session.path,
                    session.target_name(target)
                ),
            )?;

            Ok(Attribute::new(name, type_code, attribute.values.clone()))
        })
    }

    fn write_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        attribute: &Attribute,
    ) -> Result<()> {
        self.session_mut(handle, |session| {
            let stored = StoredAttribute {
                name: attribute.name.clone(),
                type_code: attribute.type_code.code(),
                values: attribute.values.clone(),
            };
            let attributes = session.attributes_mut(target)?;
            match attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = stored,
                None => attributes.push(stored),
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr2, IxDyn};

    use super::*;

    fn store_with_grid() -> Result<(MemoryStore, Handle, VarId)> {
        let store = MemoryStore::new();
        let handle = store.create("grid.nc", CreateMode::Clobber)?;
        let time = store.define_dimension(handle, "time", Length::Unlimited)?;
        let lat = store.define_dimension(handle, "lat", Length::Fixed(2))?;
        let var = store.define_variable(handle, "t2m", TypeCode::Float, &[time, lat])?;

        Ok((store, handle, var))
    }

    #[test]
    fn test_unlimited_dimension_grows() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        let time = store.find_dimension(handle, "time")?.unwrap();
        assert_eq!(store.dimension_length(handle, time)?, 0);

        store.write_scalar(handle, var, &[3, 1], &Value::Float(1.5))?;
        assert_eq!(store.dimension_length(handle, time)?, 4);
        assert_eq!(
            store.read_scalar(handle, var, &[3, 1], TypeCode::Float)?,
            Value::Float(1.5)
        );

        // Never written, reads as fill
        assert_eq!(
            store.read_scalar(handle, var, &[0, 0], TypeCode::Float)?,
            Value::fill(TypeCode::Float)
        );

        Ok(())
    }

    #[test]
    fn test_fixed_dimension_bound() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        let result = store.write_scalar(handle, var, &[0, 2], &Value::Float(1.0));
        assert!(matches!(result, Err(Error::Storage { .. })));

        // Failed write didn't grow the unlimited axis
        let time = store.find_dimension(handle, "time")?.unwrap();
        assert_eq!(store.dimension_length(handle, time)?, 0);

        let result = store.read_scalar(handle, var, &[0, 0], TypeCode::Float);
        assert!(matches!(result, Err(Error::Storage { .. })));

        Ok(())
    }

    #[test]
    fn test_converting_read_and_write() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        store.write_scalar(handle, var, &[0, 0], &Value::Int(3))?;
        assert_eq!(
            store.read_scalar(handle, var, &[0, 0], TypeCode::Float)?,
            Value::Float(3.0)
        );
        assert_eq!(
            store.read_scalar(handle, var, &[0, 0], TypeCode::Short)?,
            Value::Short(3)
        );

        store.write_scalar(handle, var, &[0, 1], &Value::Float(1e10))?;
        let result = store.read_scalar(handle, var, &[0, 1], TypeCode::Short);
        assert!(matches!(result, Err(Error::Storage { .. })));

        let result = store.write_scalar(handle, var, &[0, 1], &Value::from("text"));
        assert!(matches!(result, Err(Error::Storage { .. })));

        Ok(())
    }

    #[test]
    fn test_blocks() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        let block = arr2(&[
            [Value::Float(1.0), Value::Float(2.0)],
            [Value::Float(3.0), Value::Float(4.0)],
        ])
        .into_dyn();
        store.write_block(handle, var, &[1, 0], block.view())?;

        let read = store.read_block(handle, var, &[1, 0], &[2, 2], TypeCode::Float)?;
        assert_eq!(read, block);

        let column = store.read_block(handle, var, &[1, 1], &[2, 1], TypeCode::Double)?;
        assert_eq!(column.shape(), &[2, 1]);
        assert_eq!(column[IxDyn(&[0, 0])], Value::Double(2.0));
        assert_eq!(column[IxDyn(&[1, 0])], Value::Double(4.0));

        // Block errors name the dataset path, not the handle
        let result = store.read_block(handle, var, &[0], &[1, 1], TypeCode::Float);
        assert!(matches!(result, Err(Error::Storage { ref path, .. }) if path == "grid.nc"));
        let result = store.write_block(handle, var, &[0], block.view());
        assert!(matches!(result, Err(Error::Storage { ref path, .. }) if path == "grid.nc"));

        Ok(())
    }

    #[test]
    fn test_scalar_variable() -> Result<()> {
        let store = MemoryStore::new();
        let handle = store.create("scalar.nc", CreateMode::Clobber)?;
        let var = store.define_variable(handle, "answer", TypeCode::Int64, &[])?;
        store.write_scalar(handle, var, &[], &Value::Int64(42))?;
        assert_eq!(
            store.read_scalar(handle, var, &[], TypeCode::Int64)?,
            Value::Int64(42)
        );

        let block = store.read_block(handle, var, &[], &[], TypeCode::Int64)?;
        assert_eq!(block.ndim(), 0);
        assert_eq!(block.into_raw_vec(), vec![Value::Int64(42)]);

        Ok(())
    }

    #[test]
    fn test_close_publishes_changes() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        store.write_scalar(handle, var, &[0, 0], &Value::Float(9.0))?;

        // Only the empty container from `create` is visible before close
        assert_eq!(store.get("grid.nc"), Some(Container::new()));
        assert_eq!(store.open_handles(), 1);

        store.close(handle)?;
        assert_eq!(store.open_handles(), 0);
        let container = store.get("grid.nc").unwrap();
        assert_eq!(container.variable("t2m").unwrap().cells.len(), 1);
        assert_eq!(container.dimension("time").unwrap().len, 1);

        // Handle is gone
        assert!(matches!(store.close(handle), Err(Error::Storage { .. })));
        assert!(matches!(store.inquire(handle), Err(Error::Storage { .. })));

        Ok(())
    }

    #[test]
    fn test_read_only_handle() -> Result<()> {
        let (store, handle, _) = store_with_grid()?;
        store.close(handle)?;

        let handle = store.open("grid.nc", OpenMode::Read)?;
        let result = store.define_dimension(handle, "lon", Length::Fixed(3));
        assert!(matches!(result, Err(Error::Storage { .. })));
        assert_eq!(
            store.inquire(handle)?,
            Inquiry {
                dimensions: 2,
                variables: 1,
                attributes: 0
            }
        );

        assert!(matches!(
            store.open("missing.nc", OpenMode::Read),
            Err(Error::Storage { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_no_clobber() -> Result<()> {
        let store = MemoryStore::new();
        store.insert("a.nc", Container::new());
        assert!(matches!(
            store.create("a.nc", CreateMode::NoClobber),
            Err(Error::Storage { .. })
        ));
        assert!(store.create("a.nc", CreateMode::Clobber).is_ok());

        Ok(())
    }

    #[test]
    fn test_malformed_dimension_index() -> Result<()> {
        let mut container = Container::new();
        container.dimensions.push(StoredDimension {
            name: "x".to_string(),
            len: 1,
            unlimited: false,
        });
        container.variables.push(StoredVariable {
            name: "v".to_string(),
            type_code: TypeCode::Int.code(),
            dimensions: vec![5],
            attributes: vec![],
            cells: BTreeMap::new(),
        });
        let store = MemoryStore::new();
        store.insert("bad.nc", container);

        let handle = store.open("bad.nc", OpenMode::Write)?;
        match store.read_scalar(handle, VarId(0), &[0], TypeCode::Int) {
            Err(Error::Storage { path, message }) => {
                assert_eq!(path, "bad.nc");
                assert!(message.contains("Invalid dimension ID: 5"));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
        let result = store.write_scalar(handle, VarId(0), &[0], &Value::Int(1));
        assert!(matches!(result, Err(Error::Storage { .. })));
        store.close(handle)?;

        // Nothing grew
        assert_eq!(store.get("bad.nc").unwrap().dimensions[0].len, 1);

        Ok(())
    }

    #[test]
    fn test_duplicate_names() -> Result<()> {
        let (store, handle, _) = store_with_grid()?;
        assert!(store.define_dimension(handle, "lat", Length::Unlimited).is_err());
        assert!(store
            .define_variable(handle, "t2m", TypeCode::Int, &[])
            .is_err());

        Ok(())
    }

    #[test]
    fn test_attributes() -> Result<()> {
        let (store, handle, var) = store_with_grid()?;
        let units = Attribute::text("units", "K");
        let valid = Attribute::new(
            "valid_range",
            TypeCode::Float,
            vec![Value::Float(180.0), Value::Float(330.0)],
        );
        store.write_attribute(handle, AttributeTarget::Variable(var), &units)?;
        store.write_attribute(handle, AttributeTarget::Variable(var), &valid)?;
        store.write_attribute(handle, AttributeTarget::Global, &Attribute::text("title", "x"))?;

        let info = store.attribute_info(handle, AttributeTarget::Variable(var), 1)?;
        assert_eq!(info.name, "valid_range");
        assert_eq!(info.type_code, 5);
        assert_eq!(info.len, 2);

        let read = store.read_attribute(handle, AttributeTarget::Variable(var), "units")?;
        assert_eq!(read.as_text(), Some("K".to_string()));
        assert_eq!(store.variable_metadata(handle, var)?.attributes, 2);
        assert_eq!(store.inquire(handle)?.attributes, 1);

        // Replace
        store.write_attribute(
            handle,
            AttributeTarget::Variable(var),
            &Attribute::text("units", "degC"),
        )?;
        let read = store.read_attribute(handle, AttributeTarget::Variable(var), "units")?;
        assert_eq!(read.as_text(), Some("degC".to_string()));
        assert_eq!(store.variable_metadata(handle, var)?.attributes, 2);

        assert!(store
            .attribute_info(handle, AttributeTarget::Variable(var), 2)
            .is_err());

        Ok(())
    }

    #[test]
    fn test_unrecognized_attribute_type() -> Result<()> {
        let mut container = Container::new();
        container.attributes.push(StoredAttribute {
            name: "weird".to_string(),
            type_code: 13,
            values: vec![],
        });
        let store = MemoryStore::new();
        store.insert("weird.nc", container);

        let handle = store.open("weird.nc", OpenMode::Read)?;
        let result = store.read_attribute(handle, AttributeTarget::Global, "weird");
        assert!(matches!(result, Err(Error::Type { code: 13, .. })));

        Ok(())
    }

    #[test]
    fn test_text_attribute() {
        let attribute = Attribute::text("title", "hello");
        assert_eq!(attribute.type_code, TypeCode::Char);
        assert_eq!(attribute.values.len(), 5);
        assert_eq!(attribute.as_text(), Some("hello".to_string()));

        let numbers = Attribute::new("n", TypeCode::Int, vec![Value::Int(1)]);
        assert_eq!(numbers.as_text(), None);
    }
}
