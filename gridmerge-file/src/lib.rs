//! A concrete implementation of the `gridmerge::Storage` interface backed by the local
//! filesystem.
//!
//! Each container is stored as one JSON document at its path. Containers are loaded into a
//! `gridmerge::MemoryStore` the first time they are opened and written back to disk when a
//! writable handle is closed.
//!
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use parking_lot::Mutex;

use gridmerge::{
    Attribute, AttributeInfo, AttributeTarget, Container, CreateMode, DimId, DimensionInfo,
    Handle, Inquiry, Length, MemoryStore, OpenMode, Storage, TypeCode, Value, VarId,
    VariableMetadata,
};

pub struct FileStore {
    memory: MemoryStore,

    /// Path of each writable handle, to persist on close
    writable: Mutex<HashMap<Handle, String>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            memory: MemoryStore::new(),
            writable: Mutex::new(HashMap::new()),
        }
    }

    fn load(&self, path: &str) -> gridmerge::Result<()> {
        if self.memory.contains(path) {
            return Ok(());
        }

        let text = fs::read_to_string(path).map_err(|err| storage_error(path, err))?;
        let container: Container =
            serde_json::from_str(&text).map_err(|err| storage_error(path, err))?;
        debug!(
            "Loaded {path}: {} dimensions, {} variables",
            container.dimensions.len(),
            container.variables.len()
        );
        self.memory.insert(path, container);

        Ok(())
    }

    fn persist(&self, path: &str) -> gridmerge::Result<()> {
        let container = self.memory.get(path).ok_or_else(|| gridmerge::Error::Storage {
            path: path.to_string(),
            message: "Container not found".to_string(),
        })?;
        let text = serde_json::to_string(&container).map_err(|err| storage_error(path, err))?;
        fs::write(path, text).map_err(|err| storage_error(path, err))?;
        debug!("Wrote {path}");

        Ok(())
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_error<E: ToString>(path: &str, err: E) -> gridmerge::Error {
    gridmerge::Error::Storage {
        path: path.to_string(),
        message: err.to_string(),
    }
}

impl Storage for FileStore {
    fn open(&self, path: &str, mode: OpenMode) -> gridmerge::Result<Handle> {
        self.load(path)?;
        let handle = self.memory.open(path, mode)?;
        if mode == OpenMode::Write {
            self.writable.lock().insert(handle, path.to_string());
        }

        Ok(handle)
    }

    fn create(&self, path: &str, mode: CreateMode) -> gridmerge::Result<Handle> {
        if mode == CreateMode::NoClobber && Path::new(path).exists() {
            return Err(storage_error(path, "File exists && NC_NOCLOBBER"));
        }
        let handle = self.memory.create(path, CreateMode::Clobber)?;
        self.writable.lock().insert(handle, path.to_string());

        Ok(handle)
    }

    /// Release a handle, writing the container to disk if the handle was writable.
    ///
    fn close(&self, handle: Handle) -> gridmerge::Result<()> {
        self.memory.close(handle)?;
        let path = self.writable.lock().remove(&handle);
        match path {
            Some(path) => self.persist(&path),
            None => Ok(()),
        }
    }

    fn path_of(&self, handle: Handle) -> gridmerge::Result<String> {
        self.memory.path_of(handle)
    }

    fn inquire(&self, handle: Handle) -> gridmerge::Result<Inquiry> {
        self.memory.inquire(handle)
    }

    fn define_dimension(
        &self,
        handle: Handle,
        name: &str,
        length: Length,
    ) -> gridmerge::Result<DimId> {
        self.memory.define_dimension(handle, name, length)
    }

    fn find_dimension(&self, handle: Handle, name: &str) -> gridmerge::Result<Option<DimId>> {
        self.memory.find_dimension(handle, name)
    }

    fn dimension(&self, handle: Handle, dim: DimId) -> gridmerge::Result<DimensionInfo> {
        self.memory.dimension(handle, dim)
    }

    fn define_variable(
        &self,
        handle: Handle,
        name: &str,
        type_code: TypeCode,
        dimensions: &[DimId],
    ) -> gridmerge::Result<VarId> {
        self.memory
            .define_variable(handle, name, type_code, dimensions)
    }

    fn find_variable(&self, handle: Handle, name: &str) -> gridmerge::Result<Option<VarId>> {
        self.memory.find_variable(handle, name)
    }

    fn variable_metadata(&self, handle: Handle, var: VarId) -> gridmerge::Result<VariableMetadata> {
        self.memory.variable_metadata(handle, var)
    }

    fn read_scalar(
        &self,
        handle: Handle,
        var: VarId,
        index: &[usize],
        type_code: TypeCode,
    ) -> gridmerge::Result<Value> {
        self.memory.read_scalar(handle, var, index, type_code)
    }

    fn write_scalar(
        &self,
        handle: Handle,
        var: VarId,
        index: &[usize],
        value: &Value,
    ) -> gridmerge::Result<()> {
        self.memory.write_scalar(handle, var, index, value)
    }

    fn attribute_info(
        &self,
        handle: Handle,
        target: AttributeTarget,
        index: usize,
    ) -> gridmerge::Result<AttributeInfo> {
        self.memory.attribute_info(handle, target, index)
    }

    fn read_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        name: &str,
    ) -> gridmerge::Result<Attribute> {
        self.memory.read_attribute(handle, target, name)
    }

    fn write_attribute(
        &self,
        handle: Handle,
        target: AttributeTarget,
        attribute: &Attribute,
    ) -> gridmerge::Result<()> {
        self.memory.write_attribute(handle, target, attribute)
    }
}
