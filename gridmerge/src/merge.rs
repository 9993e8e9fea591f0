use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use log::{debug, info};

use crate::{
    attributes,
    dataset::{Dataset, Variable},
    errors::{Error, Result},
    odometer::Odometer,
    registry::CoordinateRegistry,
    storage::{AttributeTarget, Storage},
    translate::Translator,
};

/// Settings for a merge job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// Written to the output's "File description" attribute
    pub description: String,

    /// Write the list of input paths to the output's "Files list" attribute
    pub record_sources: bool,

    /// Copy the global attributes of the first input to the output
    pub copy_global_attributes: bool,

    /// Sort every coordinate axis ascending once all coordinate values are merged. Otherwise
    /// values stay in the order they were first seen.
    pub sort_coordinates: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            description: "This file was generated by gridmerge from several gridded datasets."
                .to_string(),
            record_sources: true,
            copy_global_attributes: true,
            sort_coordinates: true,
        }
    }
}

/// What the merge did with one input
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub path: String,
    pub dimensions_merged: usize,

    /// Variables this input was the first to define in the output
    pub variables_defined: usize,

    /// Coordinate values not seen before, appended to an output axis
    pub coordinate_values_appended: usize,

    /// Coordinate values already on the output axis
    pub coordinate_values_deduplicated: usize,

    pub data_values_copied: usize,

    /// Data values not copied because an earlier input already wrote that output cell
    pub data_values_skipped: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub inputs: Vec<InputSummary>,

    /// Final length of each output axis, in order of definition
    pub axes: Vec<(String, usize)>,
}

impl Summary {
    pub fn variables_defined(&self) -> usize {
        self.inputs.iter().map(|input| input.variables_defined).sum()
    }

    pub fn coordinate_values_appended(&self) -> usize {
        self.inputs
            .iter()
            .map(|input| input.coordinate_values_appended)
            .sum()
    }

    pub fn data_values_copied(&self) -> usize {
        self.inputs.iter().map(|input| input.data_values_copied).sum()
    }

    pub fn data_values_skipped(&self) -> usize {
        self.inputs
            .iter()
            .map(|input| input.data_values_skipped)
            .sum()
    }

    pub fn axis_length(&self, name: &str) -> Option<usize> {
        self.axes
            .iter()
            .find(|(axis, _)| axis == name)
            .map(|(_, len)| *len)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Open,
    MergeDimensions,
    DefineVariables,
    MergeCoordinateData,
    FinalizeOrder,
    MergeDataVariables,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::MergeDimensions => "merge dimensions",
            Stage::DefineVariables => "define variables",
            Stage::MergeCoordinateData => "merge coordinate data",
            Stage::FinalizeOrder => "finalize order",
            Stage::MergeDataVariables => "merge data variables",
            Stage::Close => "close",
        };

        write!(f, "{name}")
    }
}

/// Merge the datasets at `input_paths` into a new dataset at `output_path`, using default
/// options.
///
/// See `merge_with`.
///
pub fn merge<P: AsRef<str>>(
    storage: &dyn Storage,
    output_path: &str,
    input_paths: &[P],
) -> Result<Summary> {
    merge_with(storage, output_path, input_paths, &MergeOptions::default())
}

/// Merge the datasets at `input_paths` into a new dataset at `output_path`.
///
/// Every dimension name becomes one unlimited output dimension. Coordinate values are
/// deduplicated by exact equality, so each output axis holds the union of the values found on
/// that axis in the inputs. Each data value is then copied to the output cell whose
/// coordinates match its own. When more than one input has a value for the same output cell,
/// the first input listed wins.
///
/// Any existing dataset at `output_path` is replaced. Every dataset opened is closed before
/// this function returns, whether or not the merge succeeded. On failure the output may be
/// left partially written.
///
pub fn merge_with<P: AsRef<str>>(
    storage: &dyn Storage,
    output_path: &str,
    input_paths: &[P],
    options: &MergeOptions,
) -> Result<Summary> {
    let input_paths: Vec<&str> = input_paths.iter().map(AsRef::as_ref).collect();

    let mut merger = Merger::open(storage, output_path, &input_paths, options)?;
    merger.merge_dimensions()?;
    merger.define_variables()?;
    merger.merge_coordinate_data()?;
    if options.sort_coordinates {
        merger.finalize_order()?;
    }
    merger.merge_data_variables()?;

    merger.close()
}

/// State of one merge job. Dropping it closes every dataset it holds.
struct Merger<'s> {
    stage: Stage,
    output: Dataset<'s>,
    inputs: Vec<Dataset<'s>>,
    registry: CoordinateRegistry,

    /// Output cells written so far, per output variable
    written: HashMap<String, HashSet<Vec<usize>>>,

    summary: Summary,
}

impl<'s> Merger<'s> {
    fn open(
        storage: &'s dyn Storage,
        output_path: &str,
        input_paths: &[&str],
        options: &MergeOptions,
    ) -> Result<Self> {
        info!(
            "Merging {} inputs into {output_path}: {}",
            input_paths.len(),
            Stage::Open
        );

        let mut inputs = Vec::with_capacity(input_paths.len());
        for path in input_paths {
            let input = Dataset::open(storage, path)?;
            attributes::check_attributes(&input)?;
            inputs.push(input);
        }

        let output = Dataset::create(storage, output_path)?;
        attributes::write_global_attributes(&output, &inputs, options)?;

        let summary = Summary {
            inputs: inputs
                .iter()
                .map(|input| InputSummary {
                    path: input.path().to_string(),
                    ..InputSummary::default()
                })
                .collect(),
            axes: vec![],
        };

        Ok(Self {
            stage: Stage::Open,
            output,
            inputs,
            registry: CoordinateRegistry::new(),
            written: HashMap::new(),
            summary,
        })
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage, "{stage} after {}", self.stage);
        info!("{}: {stage}", self.output.path());
        self.stage = stage;
    }

    fn merge_dimensions(&mut self) -> Result<()> {
        self.enter(Stage::MergeDimensions);
        for (input, summary) in self.inputs.iter().zip(&mut self.summary.inputs) {
            for dimension in input.dimensions() {
                let len = input.dimension_length(dimension.id)?;
                self.registry
                    .ensure_dimension(&mut self.output, &dimension.name, len)?;
                summary.dimensions_merged += 1;
            }
        }

        Ok(())
    }

    fn define_variables(&mut self) -> Result<()> {
        self.enter(Stage::DefineVariables);
        for (input, summary) in self.inputs.iter().zip(&mut self.summary.inputs) {
            for variable in input.variables() {
                if let Some(existing) = self.output.get_variable(&variable.name) {
                    check_schema(input, variable, existing)?;
                    continue;
                }

                let defined = self.output.define_variable(
                    &variable.name,
                    variable.type_code,
                    &variable.dimension_names,
                )?;
                attributes::copy_attributes(
                    input,
                    AttributeTarget::Variable(variable.id),
                    variable.attributes,
                    &self.output,
                    AttributeTarget::Variable(defined.id),
                )?;
                if defined.is_coordinate() {
                    self.registry.attach_coordinate(
                        &self.output,
                        &defined.name,
                        defined.id,
                        defined.type_code,
                    )?;
                }
                info!(
                    "Defined {} {}({}) from {}",
                    defined.type_code,
                    defined.name,
                    defined.dimension_names.join(", "),
                    input.path()
                );
                summary.variables_defined += 1;
            }
        }

        // A coordinate present on only one side of an axis fails here, before any data is written
        for input in &self.inputs {
            for variable in input.variables() {
                let output_var = output_variable(&self.output, &variable.name)?;
                Translator::new(&self.registry, input, variable, &self.output, &output_var)?;
            }
        }

        Ok(())
    }

    fn merge_coordinate_data(&mut self) -> Result<()> {
        self.enter(Stage::MergeCoordinateData);
        for (input, summary) in self.inputs.iter().zip(&mut self.summary.inputs) {
            for variable in input.variables().iter().filter(|var| var.is_coordinate()) {
                let variable = input.refresh(variable)?;
                let output_var = output_variable(&self.output, &variable.name)?;
                let translator = Translator::new(
                    &self.registry,
                    input,
                    &variable,
                    &self.output,
                    &output_var,
                )?;

                let before = axis_length(&self.registry, &variable.name);
                for index in Odometer::new(&variable.shape) {
                    translator.translate(&mut self.registry, &index)?;
                }
                let appended = axis_length(&self.registry, &variable.name) - before;

                summary.coordinate_values_appended += appended;
                summary.coordinate_values_deduplicated += variable.element_count() - appended;
                debug!(
                    "{}: {}: {appended} of {} values appended",
                    input.path(),
                    variable.name,
                    variable.element_count()
                );
            }
        }

        Ok(())
    }

    fn finalize_order(&mut self) -> Result<()> {
        self.enter(Stage::FinalizeOrder);
        let names: Vec<String> = self
            .registry
            .axes()
            .iter()
            .map(|axis| axis.name.clone())
            .collect();
        for name in names {
            if self.registry.finalize_order(&self.output, &name)? {
                info!("Sorted {name}");
            }
        }

        Ok(())
    }

    fn merge_data_variables(&mut self) -> Result<()> {
        self.enter(Stage::MergeDataVariables);
        for (input, summary) in self.inputs.iter().zip(&mut self.summary.inputs) {
            for variable in input.variables().iter().filter(|var| !var.is_coordinate()) {
                let variable = input.refresh(variable)?;
                let output_var = output_variable(&self.output, &variable.name)?;
                let translator = Translator::new(
                    &self.registry,
                    input,
                    &variable,
                    &self.output,
                    &output_var,
                )?;
                let written = self.written.entry(variable.name.clone()).or_default();

                let mut copied = 0;
                let mut skipped = 0;
                for index in Odometer::new(&variable.shape) {
                    let target = translator.translate(&mut self.registry, &index)?;
                    if written.contains(&target) {
                        skipped += 1;
                        continue;
                    }

                    let value = input.read(&variable, &index, output_var.type_code)?;
                    self.output.write(&output_var, &target, &value)?;
                    written.insert(target);
                    copied += 1;
                }

                summary.data_values_copied += copied;
                summary.data_values_skipped += skipped;
                info!(
                    "Filled {} from {}: {copied} values copied, {skipped} skipped",
                    variable.name,
                    input.path()
                );
            }
        }

        Ok(())
    }

    fn close(mut self) -> Result<Summary> {
        self.enter(Stage::Close);
        let Merger {
            output,
            inputs,
            registry,
            mut summary,
            ..
        } = self;

        for axis in registry.axes() {
            let len = output.dimension_length(axis.dimension)?;
            summary.axes.push((axis.name.clone(), len));
        }

        output.close()?;
        for input in inputs {
            input.close()?;
        }

        info!(
            "Merged {} inputs: {} variables, {} values copied, {} skipped, axes: {}",
            summary.inputs.len(),
            summary.variables_defined(),
            summary.data_values_copied(),
            summary.data_values_skipped(),
            summary
                .axes
                .iter()
                .map(|(name, len)| format!("{name}={len}"))
                .collect::<Vec<String>>()
                .join(", ")
        );

        Ok(summary)
    }
}

fn output_variable(output: &Dataset, name: &str) -> Result<Variable> {
    match output.get_variable(name) {
        Some(variable) => output.refresh(variable),
        None => Err(Error::storage(
            output.path(),
            format!("{name}: variable is not defined"),
        )),
    }
}

fn axis_length(registry: &CoordinateRegistry, name: &str) -> usize {
    registry.axis(name).map_or(0, |axis| axis.values.len())
}

/// A variable that more than one input has must have the same layout in all of them.
fn check_schema(input: &Dataset, variable: &Variable, existing: &Variable) -> Result<()> {
    let mismatch = |reason: String| Err(Error::mismatch(input.path(), &variable.name, reason));

    if variable.rank() != existing.rank() {
        return mismatch(format!(
            "rank {} but already defined with rank {}",
            variable.rank(),
            existing.rank()
        ));
    }
    if variable.type_code != existing.type_code {
        return mismatch(format!(
            "type {} but already defined with type {}",
            variable.type_code, existing.type_code
        ));
    }
    if variable.dimension_names != existing.dimension_names {
        return mismatch(format!(
            "dimensions ({}) but already defined with ({})",
            variable.dimension_names.join(", "),
            existing.dimension_names.join(", ")
        ));
    }

    Ok(())
}
