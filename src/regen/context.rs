use crate::cil::InsnIdGenerator;
use crate::regen::{Bindings, FlagsExpressionBuilder, Settings};

/// Tables used while generating the code of one compilation unit
pub struct GenerationContext<'a, 'g> {
    pub settings: &'a Settings<'g>,

    /// Slots the unit's variables and parameters are bound to
    pub bindings: &'a Bindings,

    /// Does the method being generated return a value?
    pub method_returns_value: bool,

    /// Source of identities for every instruction that isn't a node anchor
    pub ids: InsnIdGenerator,

    pub flags_builder: &'a mut dyn FlagsExpressionBuilder<'g>,
}
