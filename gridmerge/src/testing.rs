use ndarray::{ArrayD, IxDyn};

use crate::{
    dataset::{Dataset, Variable},
    errors::Result,
    memory::MemoryStore,
    storage::{Length, Storage},
    value::{TypeCode, Value},
};

/// Create a dataset at `path`, let `f` fill it in, and close it.
pub(crate) fn build<F>(store: &MemoryStore, path: &str, f: F) -> Result<()>
where
    F: FnOnce(&mut Dataset) -> Result<()>,
{
    let mut dataset = Dataset::create(store, path)?;
    f(&mut dataset)?;

    dataset.close()
}

/// Define a variable over existing fixed dimensions and write `values` to it in row major order.
pub(crate) fn variable(
    dataset: &mut Dataset,
    name: &str,
    type_code: TypeCode,
    dimensions: &[&str],
    values: Vec<Value>,
) -> Result<Variable> {
    let dimensions: Vec<String> = dimensions.iter().map(|name| name.to_string()).collect();
    let variable = dataset.define_variable(name, type_code, &dimensions)?;
    let block = ArrayD::from_shape_vec(IxDyn(&variable.shape), values)
        .expect("values should fill the variable");
    dataset.storage().write_block(
        dataset.handle(),
        variable.id,
        &vec![0; variable.rank()],
        block.view(),
    )?;

    Ok(variable)
}

/// A dataset with one `time` axis of Int coordinates and an Int `precip` variable over it
pub(crate) fn grid(store: &MemoryStore, path: &str, time: &[i32], precip: &[i32]) -> Result<()> {
    build(store, path, |dataset| {
        dataset.define_dimension("time", Length::Fixed(time.len()))?;
        variable(dataset, "time", TypeCode::Int, &["time"], ints(time))?;
        variable(dataset, "precip", TypeCode::Int, &["time"], ints(precip))?;

        Ok(())
    })
}

/// Every value of a variable, in row major order
pub(crate) fn read_all(store: &MemoryStore, path: &str, name: &str) -> Result<Vec<Value>> {
    let dataset = Dataset::open(store, path)?;
    let variable = dataset
        .get_variable(name)
        .expect("variable should exist")
        .clone();
    let block = store.read_block(
        dataset.handle(),
        variable.id,
        &vec![0; variable.rank()],
        &variable.shape,
        variable.type_code,
    )?;
    dataset.close()?;

    Ok(block.into_raw_vec())
}

pub(crate) fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().map(|&value| Value::Int(value)).collect()
}

pub(crate) fn doubles(values: &[f64]) -> Vec<Value> {
    values.iter().map(|&value| Value::Double(value)).collect()
}
