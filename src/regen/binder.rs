use crate::ast::{CompilationUnit, ParameterId, VariableId, VariableRef};
use crate::cil::{MethodDefinition, Operand};
use crate::regen::Error;

/// Physical slots of the variables and parameters of a compilation unit
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    /// Local index, by [`VariableId`]
    locals: Vec<u16>,

    /// Argument index, by [`ParameterId`]
    arguments: Vec<u16>,
}

impl Bindings {
    /// Bind every variable and parameter of the unit to the method
    ///
    /// Each variable gets a new local. Each parameter is bound to the physical parameter with
    /// the same ordinal, and the physical parameter's type is replaced by the recovered type
    /// (except for the implicit `this`).
    pub fn bind<'g>(
        unit: &CompilationUnit<'g>,
        method: &mut MethodDefinition<'g>,
    ) -> Result<Bindings, Error> {
        let mut bindings = Bindings::default();

        for variable in unit.variables() {
            let index = method.add_local(variable.variable_type)?;
            log::trace!("{} bound to local {}", variable.name, index);
            bindings.locals.push(index);
        }

        let available = method.parameters.len();
        for (ordinal, parameter) in unit.parameters().iter().enumerate() {
            let physical = method.parameters.get_mut(ordinal).ok_or(
                Error::MissingPhysicalParameter {
                    parameter: ParameterId(ordinal),
                    available,
                },
            )?;
            if !physical.is_hidden_this {
                physical.parameter_type = parameter.parameter_type;
            }
            log::trace!("{} bound to argument {}", parameter.name, physical.index);
            bindings.arguments.push(physical.index);
        }

        Ok(bindings)
    }

    pub fn local(&self, variable: VariableId) -> Option<u16> {
        self.locals.get(variable.0).copied()
    }

    pub fn argument(&self, parameter: ParameterId) -> Option<u16> {
        self.arguments.get(parameter.0).copied()
    }

    /// Operand naming the slot a variable is bound to
    pub fn operand<'g>(&self, variable: VariableRef) -> Result<Operand<'g>, Error> {
        match variable {
            VariableRef::Local(id) => self.local(id).map(Operand::Local),
            VariableRef::Parameter(id) => self.argument(id).map(Operand::Argument),
        }
        .ok_or(Error::UnboundVariable(variable))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::ControlFlowGraph;
    use crate::cil::metadata::*;

    #[test]
    fn parameters_are_retyped() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let core = metadata.core_types();
        let int32 = metadata.import_type("System.Int32", true);
        let owner = metadata.import_type("Protected.Owner", false);

        let mut unit = CompilationUnit::new(ControlFlowGraph::new());
        let this = unit.declare_parameter("this", core.object);
        let value = unit.declare_parameter("value", int32);
        let temp = unit.declare_variable("temp", core.string);

        let mut method = MethodDefinition::new("Run", owner, true, vec![core.object], None);
        let bindings = Bindings::bind(&unit, &mut method).unwrap();

        assert_eq!(method.parameters[0].parameter_type, owner);
        assert_eq!(method.parameters[1].parameter_type, int32);
        assert_eq!(method.locals.len(), 1);
        assert_eq!(bindings.operand(this).unwrap(), Operand::Argument(0));
        assert_eq!(bindings.operand(value).unwrap(), Operand::Argument(1));
        assert_eq!(bindings.operand(temp).unwrap(), Operand::Local(0));
        assert!(matches!(
            bindings.operand(VariableRef::Local(VariableId(1))),
            Err(Error::UnboundVariable(_))
        ));
    }

    #[test]
    fn missing_physical_parameter() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let core = metadata.core_types();

        let mut unit = CompilationUnit::new(ControlFlowGraph::new());
        unit.declare_parameter("a", core.object);
        unit.declare_parameter("b", core.object);

        let mut method = MethodDefinition::new("Run", core.object, false, vec![core.string], None);
        assert!(matches!(
            Bindings::bind(&unit, &mut method),
            Err(Error::MissingPhysicalParameter { parameter: ParameterId(1), available: 1 })
        ));
    }
}
