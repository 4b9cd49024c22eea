use crate::cil::metadata::TypeId;
use crate::cil::Error;

/// Physical method whose body is being regenerated
///
/// Unlike the members of [`crate::cil::metadata::Metadata`], this is mutable: binding adds local
/// variables and refines parameter types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDefinition<'g> {
    pub name: String,

    pub declaring_type: TypeId<'g>,

    /// Parameters, including the implicit `this` (at index 0) for instance methods
    pub parameters: Vec<PhysicalParameter<'g>>,

    /// Return type (`None` for `void`)
    pub return_type: Option<TypeId<'g>>,

    /// Local variables of the body
    pub locals: Vec<LocalVariable<'g>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalParameter<'g> {
    /// Argument index (as used by `ldarg` and friends)
    pub index: u16,

    pub parameter_type: TypeId<'g>,

    /// Is this the implicit `this` of an instance method?
    pub is_hidden_this: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable<'g> {
    /// Local index (as used by `ldloc` and friends)
    pub index: u16,

    pub local_type: TypeId<'g>,
}

impl<'g> MethodDefinition<'g> {
    /// New method without locals
    ///
    /// Instance methods get an implicit `this` parameter typed as the declaring type.
    pub fn new(
        name: impl Into<String>,
        declaring_type: TypeId<'g>,
        has_this: bool,
        parameter_types: Vec<TypeId<'g>>,
        return_type: Option<TypeId<'g>>,
    ) -> MethodDefinition<'g> {
        let this_parameter = Some(declaring_type).filter(|_| has_this);
        let parameters = this_parameter
            .into_iter()
            .map(|this_type| (this_type, true))
            .chain(parameter_types.into_iter().map(|ty| (ty, false)))
            .enumerate()
            .map(|(index, (parameter_type, is_hidden_this))| PhysicalParameter {
                index: index as u16,
                parameter_type,
                is_hidden_this,
            })
            .collect();

        MethodDefinition {
            name: name.into(),
            declaring_type,
            parameters,
            return_type,
            locals: vec![],
        }
    }

    pub fn has_this(&self) -> bool {
        self.parameters.first().map_or(false, |p| p.is_hidden_this)
    }

    pub fn returns_value(&self) -> bool {
        self.return_type.is_some()
    }

    /// Add a local variable, returning its index
    pub fn add_local(&mut self, local_type: TypeId<'g>) -> Result<u16, Error> {
        let index = u16::try_from(self.locals.len()).map_err(|_| Error::LocalsOverflow)?;
        if index == u16::MAX {
            return Err(Error::LocalsOverflow);
        }
        self.locals.push(LocalVariable { index, local_type });
        Ok(index)
    }
}
