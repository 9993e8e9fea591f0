//! Copying attributes from inputs to the output, and the provenance attributes the merge adds
//! to the output.
//!
use crate::{
    dataset::Dataset,
    errors::Result,
    merge::MergeOptions,
    storage::{Attribute, AttributeTarget},
    value::TypeCode,
};

pub const FILE_DESCRIPTION: &str = "File description";
pub const FILES_LIST: &str = "Files list";

/// Check that every attribute of `dataset`, global or on a variable, has a recognized type code.
///
/// Returns the number of attributes checked.
///
pub fn check_attributes(dataset: &Dataset) -> Result<usize> {
    let mut checked = check_target(dataset, AttributeTarget::Global, dataset.attributes())?;
    for variable in dataset.variables() {
        checked += check_target(
            dataset,
            AttributeTarget::Variable(variable.id),
            variable.attributes,
        )?;
    }

    Ok(checked)
}

fn check_target(dataset: &Dataset, target: AttributeTarget, count: usize) -> Result<usize> {
    for index in 0..count {
        let info = dataset
            .storage()
            .attribute_info(dataset.handle(), target, index)?;
        TypeCode::resolve(
            info.type_code,
            format!("{}: attribute '{}'", dataset.path(), info.name),
        )?;
    }

    Ok(count)
}

/// Copy the first `count` attributes of `src_target` in `input` to `dst_target` in `output`.
///
pub fn copy_attributes(
    input: &Dataset,
    src_target: AttributeTarget,
    count: usize,
    output: &Dataset,
    dst_target: AttributeTarget,
) -> Result<usize> {
    let storage = input.storage();
    for index in 0..count {
        let info = storage.attribute_info(input.handle(), src_target, index)?;
        TypeCode::resolve(
            info.type_code,
            format!("{}: attribute '{}'", input.path(), info.name),
        )?;
        storage.copy_attribute(
            input.handle(),
            src_target,
            output.handle(),
            dst_target,
            &info.name,
        )?;
    }

    Ok(count)
}

/// Write the output's global attributes: those of the first input, if configured, then the
/// description and list of source files.
///
pub fn write_global_attributes(
    output: &Dataset,
    inputs: &[Dataset],
    options: &MergeOptions,
) -> Result<()> {
    if options.copy_global_attributes {
        if let Some(first) = inputs.first() {
            copy_attributes(
                first,
                AttributeTarget::Global,
                first.attributes(),
                output,
                AttributeTarget::Global,
            )?;
        }
    }

    let storage = output.storage();
    storage.write_attribute(
        output.handle(),
        AttributeTarget::Global,
        &Attribute::text(FILE_DESCRIPTION, &options.description),
    )?;

    if options.record_sources {
        let paths: Vec<&str> = inputs.iter().map(|input| input.path()).collect();
        storage.write_attribute(
            output.handle(),
            AttributeTarget::Global,
            &Attribute::text(FILES_LIST, &paths.join(", ")),
        )?;
    }

    Ok(())
}
