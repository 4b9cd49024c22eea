use crate::ast::ControlFlowGraph;
use crate::cil::metadata::TypeId;

/// Index of a variable declared in a [`CompilationUnit`]
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableId(pub usize);

/// Index of a parameter declared in a [`CompilationUnit`]
///
/// This is also the ordinal of the physical parameter it gets bound to (counting the implicit
/// `this` of instance methods).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParameterId(pub usize);

/// Reference to something that can be loaded, stored or have its address taken
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum VariableRef {
    Local(VariableId),
    Parameter(ParameterId),
}

impl VariableRef {
    pub fn is_parameter(&self) -> bool {
        matches!(self, VariableRef::Parameter(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable<'g> {
    pub name: String,
    pub variable_type: TypeId<'g>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter<'g> {
    pub name: String,
    pub parameter_type: TypeId<'g>,
}

/// Recovered body of one method
pub struct CompilationUnit<'g> {
    variables: Vec<Variable<'g>>,
    parameters: Vec<Parameter<'g>>,
    pub graph: ControlFlowGraph<'g>,
}

impl<'g> CompilationUnit<'g> {
    pub fn new(graph: ControlFlowGraph<'g>) -> CompilationUnit<'g> {
        CompilationUnit {
            variables: vec![],
            parameters: vec![],
            graph,
        }
    }

    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        variable_type: TypeId<'g>,
    ) -> VariableRef {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            variable_type,
        });
        VariableRef::Local(id)
    }

    /// Declare the next parameter
    ///
    /// Parameters must be declared in order, starting with `this` for instance methods.
    pub fn declare_parameter(
        &mut self,
        name: impl Into<String>,
        parameter_type: TypeId<'g>,
    ) -> VariableRef {
        let id = ParameterId(self.parameters.len());
        self.parameters.push(Parameter {
            name: name.into(),
            parameter_type,
        });
        VariableRef::Parameter(id)
    }

    pub fn variables(&self) -> &[Variable<'g>] {
        &self.variables
    }

    pub fn parameters(&self) -> &[Parameter<'g>] {
        &self.parameters
    }
}
