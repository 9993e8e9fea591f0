use crate::{
    dataset::{Dataset, Variable},
    errors::{Error, Result},
    registry::CoordinateRegistry,
    value::TypeCode,
};

/// How one axis of an input variable maps onto the output
#[derive(Clone, Debug)]
enum AxisPlan {
    /// The variable being translated is the coordinate variable of this axis, so its own value
    /// at the index is the coordinate.
    SelfCoordinate { dimension: String, type_code: TypeCode },

    /// Look up the input's coordinate value for this position on the output axis.
    ByValue {
        dimension: String,
        coordinate: Variable,
        type_code: TypeCode,
    },

    /// No coordinate variable on either side, positions carry over unchanged.
    ByPosition,
}

/// Maps index tuples of one input variable to index tuples of the matching output variable.
///
/// The plan for each axis is worked out once, in `new`, so that a missing coordinate variable
/// is reported before any value is read or written.
///
pub struct Translator<'a> {
    input: &'a Dataset<'a>,
    output: &'a Dataset<'a>,
    variable: Variable,
    plans: Vec<AxisPlan>,
}

impl<'a> Translator<'a> {
    pub fn new(
        registry: &CoordinateRegistry,
        input: &'a Dataset<'a>,
        input_var: &Variable,
        output: &'a Dataset<'a>,
        output_var: &Variable,
    ) -> Result<Self> {
        if input_var.rank() != output_var.rank() {
            return Err(Error::mismatch(
                input.path(),
                &input_var.name,
                format!(
                    "rank {} in input but rank {} in output",
                    input_var.rank(),
                    output_var.rank()
                ),
            ));
        }
        if input_var.dimension_names != output_var.dimension_names {
            return Err(Error::mismatch(
                input.path(),
                &input_var.name,
                format!(
                    "dimensions ({}) in input but ({}) in output",
                    input_var.dimension_names.join(", "),
                    output_var.dimension_names.join(", ")
                ),
            ));
        }

        let not_found = |axis: usize, dimension: &str| Error::NotFound {
            path: input.path().to_string(),
            variable: input_var.name.clone(),
            axis,
            dimension: dimension.to_string(),
        };

        let mut plans = Vec::with_capacity(input_var.rank());
        for (axis, dimension) in input_var.dimension_names.iter().enumerate() {
            let output_coordinate = registry.axis(dimension).and_then(|entry| entry.coordinate);
            let plan = if input_var.is_coordinate() {
                match output_coordinate {
                    Some((_, type_code)) => AxisPlan::SelfCoordinate {
                        dimension: dimension.clone(),
                        type_code,
                    },
                    None => return Err(not_found(axis, dimension)),
                }
            } else {
                match (input.coordinate_variable(dimension), output_coordinate) {
                    (Some(coordinate), Some((_, type_code))) => AxisPlan::ByValue {
                        dimension: dimension.clone(),
                        coordinate: coordinate.clone(),
                        type_code,
                    },
                    (None, None) => AxisPlan::ByPosition,
                    _ => return Err(not_found(axis, dimension)),
                }
            };
            plans.push(plan);
        }

        Ok(Self {
            input,
            output,
            variable: input_var.clone(),
            plans,
        })
    }

    /// Output position of the input element at `index`.
    ///
    /// Coordinate values not yet on an output axis are appended to it, so translating every
    /// index of a coordinate variable is how that variable's values get merged.
    ///
    pub fn translate(
        &self,
        registry: &mut CoordinateRegistry,
        index: &[usize],
    ) -> Result<Vec<usize>> {
        if index.len() != self.plans.len() {
            return Err(Error::mismatch(
                self.input.path(),
                &self.variable.name,
                format!(
                    "index has {} axes but the variable has {}",
                    index.len(),
                    self.plans.len()
                ),
            ));
        }

        let mut translated = Vec::with_capacity(index.len());
        for (axis, plan) in self.plans.iter().enumerate() {
            let position = match plan {
                AxisPlan::ByPosition => index[axis],
                AxisPlan::SelfCoordinate {
                    dimension,
                    type_code,
                } => {
                    let value = self.input.read(&self.variable, index, *type_code)?;
                    registry
                        .lookup_or_append(self.output, dimension, &value)?
                        .position
                }
                AxisPlan::ByValue {
                    dimension,
                    coordinate,
                    type_code,
                } => {
                    let value = self.input.read(coordinate, &[index[axis]], *type_code)?;
                    registry
                        .lookup_or_append(self.output, dimension, &value)?
                        .position
                }
            };
            translated.push(position);
        }

        Ok(translated)
    }
}

/// Output position of the element of `input_var` at `index`.
///
/// Resolves the axis plans on every call. Use a `Translator` to translate many indexes of the
/// same variable.
///
pub fn translate(
    registry: &mut CoordinateRegistry,
    input: &Dataset,
    input_var: &Variable,
    index: &[usize],
    output: &Dataset,
    output_var: &Variable,
) -> Result<Vec<usize>> {
    Translator::new(registry, input, input_var, output, output_var)?.translate(registry, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MemoryStore,
        odometer::Odometer,
        storage::Length,
        testing::{self, doubles, ints},
        value::Value,
    };

    /// Input with time [30, 10, 20] and lat [1.5, 0.5], and a 3x2 data variable over both
    fn input(store: &MemoryStore) -> Result<()> {
        testing::build(store, "in.nc", |dataset| {
            dataset.define_dimension("time", Length::Fixed(3))?;
            dataset.define_dimension("lat", Length::Fixed(2))?;
            testing::variable(dataset, "time", TypeCode::Int, &["time"], ints(&[30, 10, 20]))?;
            testing::variable(dataset, "lat", TypeCode::Double, &["lat"], doubles(&[1.5, 0.5]))?;
            testing::variable(
                dataset,
                "temp",
                TypeCode::Double,
                &["time", "lat"],
                doubles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            )?;
            Ok(())
        })
    }

    /// Define the output counterpart of each input variable and register coordinates
    fn prepare<'s>(
        registry: &mut CoordinateRegistry,
        input: &Dataset,
        output: &mut Dataset<'s>,
    ) -> Result<()> {
        for dimension in input.dimensions() {
            registry.ensure_dimension(output, &dimension.name, dimension.len)?;
        }
        for variable in input.variables() {
            let defined =
                output.define_variable(&variable.name, variable.type_code, &variable.dimension_names)?;
            if defined.is_coordinate() {
                registry.attach_coordinate(output, &defined.name, defined.id, defined.type_code)?;
            }
        }

        Ok(())
    }

    #[test]
    fn test_translation_correctness() -> Result<()> {
        let store = MemoryStore::new();
        input(&store)?;
        let input = Dataset::open(&store, "in.nc")?;
        let mut output = Dataset::create(&store, "out.nc")?;
        let mut registry = CoordinateRegistry::new();
        prepare(&mut registry, &input, &mut output)?;

        for name in ["time", "lat"] {
            let input_var = input.get_variable(name).unwrap();
            let output_var = output.get_variable(name).unwrap();
            let translator = Translator::new(&registry, &input, input_var, &output, output_var)?;
            for index in Odometer::new(&input_var.shape) {
                translator.translate(&mut registry, &index)?;
            }
            registry.finalize_order(&output, name)?;
        }
        assert_eq!(registry.axis("time").unwrap().values, ints(&[10, 20, 30]));
        assert_eq!(registry.axis("lat").unwrap().values, doubles(&[0.5, 1.5]));

        let input_var = input.get_variable("temp").unwrap();
        let output_var = output.get_variable("temp").unwrap();
        let translator = Translator::new(&registry, &input, input_var, &output, output_var)?;
        for index in Odometer::new(&input_var.shape) {
            let translated = translator.translate(&mut registry, &index)?;
            assert_eq!(translated.len(), 2);

            // Output coordinates at the translated position are the input coordinates at the
            // input position
            let time = input.read(input.get_variable("time").unwrap(), &[index[0]], TypeCode::Int)?;
            let lat =
                input.read(input.get_variable("lat").unwrap(), &[index[1]], TypeCode::Double)?;
            assert_eq!(registry.axis("time").unwrap().values[translated[0]], time);
            assert_eq!(registry.axis("lat").unwrap().values[translated[1]], lat);
        }

        assert_eq!(
            translate(&mut registry, &input, input_var, &[0, 0], &output, output_var)?,
            vec![2, 1]
        );

        Ok(())
    }

    #[test]
    fn test_positional_axis() -> Result<()> {
        let store = MemoryStore::new();
        testing::build(&store, "in.nc", |dataset| {
            dataset.define_dimension("x", Length::Fixed(3))?;
            testing::variable(dataset, "v", TypeCode::Int, &["x"], ints(&[7, 8, 9]))?;
            Ok(())
        })?;
        let input = Dataset::open(&store, "in.nc")?;
        let mut output = Dataset::create(&store, "out.nc")?;
        let mut registry = CoordinateRegistry::new();
        prepare(&mut registry, &input, &mut output)?;

        let input_var = input.get_variable("v").unwrap();
        let output_var = output.get_variable("v").unwrap();
        for i in 0..3 {
            let translated = translate(&mut registry, &input, input_var, &[i], &output, output_var)?;
            assert_eq!(translated, vec![i]);
        }

        Ok(())
    }

    #[test]
    fn test_rank_zero() -> Result<()> {
        let store = MemoryStore::new();
        testing::build(&store, "in.nc", |dataset| {
            testing::variable(dataset, "scale", TypeCode::Float, &[], vec![Value::Float(0.5)])?;
            Ok(())
        })?;
        let input = Dataset::open(&store, "in.nc")?;
        let mut output = Dataset::create(&store, "out.nc")?;
        let mut registry = CoordinateRegistry::new();
        prepare(&mut registry, &input, &mut output)?;

        let input_var = input.get_variable("scale").unwrap();
        let output_var = output.get_variable("scale").unwrap();
        let translated = translate(&mut registry, &input, input_var, &[], &output, output_var)?;
        assert!(translated.is_empty());

        Ok(())
    }

    #[test]
    fn test_missing_coordinate() -> Result<()> {
        let store = MemoryStore::new();
        input(&store)?;
        let input = Dataset::open(&store, "in.nc")?;
        let mut output = Dataset::create(&store, "out.nc")?;
        let mut registry = CoordinateRegistry::new();
        for dimension in input.dimensions() {
            registry.ensure_dimension(&mut output, &dimension.name, dimension.len)?;
        }
        let temp = input.get_variable("temp").unwrap();
        let defined = output.define_variable("temp", temp.type_code, &temp.dimension_names)?;

        // Input has coordinates for time and lat but the output axes have none
        match Translator::new(&registry, &input, temp, &output, &defined) {
            Err(Error::NotFound {
                path,
                variable,
                axis,
                dimension,
            }) => {
                assert_eq!(path, "in.nc");
                assert_eq!(variable, "temp");
                assert_eq!(axis, 0);
                assert_eq!(dimension, "time");
            }
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("expected an error"),
        }

        Ok(())
    }

    #[test]
    fn test_rank_mismatch() -> Result<()> {
        let store = MemoryStore::new();
        input(&store)?;
        let input = Dataset::open(&store, "in.nc")?;
        let mut output = Dataset::create(&store, "out.nc")?;
        let mut registry = CoordinateRegistry::new();
        prepare(&mut registry, &input, &mut output)?;

        let temp = input.get_variable("temp").unwrap();
        let time = output.get_variable("time").unwrap();
        let result = Translator::new(&registry, &input, temp, &output, time);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));

        let output_temp = output.get_variable("temp").unwrap();
        let translator = Translator::new(&registry, &input, temp, &output, output_temp)?;
        let result = translator.translate(&mut registry, &[0]);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));

        Ok(())
    }
}
