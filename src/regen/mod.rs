//! Regenerate a CIL method body from a recovered compilation unit
//!
//! Generation goes through these stages, in order:
//!
//!   1. bind the unit's variables and parameters to physical locals and parameters
//!   2. lower every node of the control-flow graph and concatenate the results
//!   3. widen short branches that turned out to be out of range
//!   4. lay out the instructions, assigning offsets
//!   5. resolve exception regions into exception handlers
//!   6. compute the maximum stack depth
//!
//! No stage revisits the decisions of an earlier one. Any failure aborts the whole method: the
//! physical method is only updated (new locals, refined parameter types) once every stage has
//! succeeded.

mod binder;
mod blocks;
mod context;
mod emitter;
mod errors;
mod flags;
mod regions;
mod settings;
mod validate;

pub use binder::*;
pub use blocks::*;
pub use context::*;
pub use errors::*;
pub use flags::*;
pub use regions::*;
pub use settings::*;
pub use validate::*;

use crate::ast::CompilationUnit;
use crate::cil::jump_encoding::widen_short_branches;
use crate::cil::{max_stack_depth, MethodBody, MethodDefinition};

/// Result of regenerating one method
#[derive(Debug)]
pub struct GeneratedMethod<'g> {
    pub body: MethodBody<'g>,

    /// Code of each node, indexed by [`crate::ast::NodeId`]
    pub node_code: Vec<NodeCode>,

    pub bindings: Bindings,
}

/// Generator of method bodies
///
/// One generator can be used for many methods. Each call to [`MethodGenerator::generate`] uses
/// fresh tables.
pub struct MethodGenerator<'a, 'g> {
    settings: &'a Settings<'g>,
}

impl<'a, 'g> MethodGenerator<'a, 'g> {
    pub fn new(settings: &'a Settings<'g>) -> MethodGenerator<'a, 'g> {
        MethodGenerator { settings }
    }

    /// Generate the body of `method` from `unit`
    ///
    /// On success, `method` has gained the locals of the unit and its parameters have the types
    /// recovered in the unit. On failure, `method` is left untouched.
    pub fn generate(
        &self,
        unit: &CompilationUnit<'g>,
        method: &mut MethodDefinition<'g>,
        flags_builder: &mut dyn FlagsExpressionBuilder<'g>,
    ) -> Result<GeneratedMethod<'g>, Error> {
        let mut bound_method = method.clone();
        let bindings = Bindings::bind(unit, &mut bound_method)?;
        log::debug!(
            "bound {} variables and {} parameters of {}",
            unit.variables().len(),
            unit.parameters().len(),
            bound_method.name
        );

        let mut context = GenerationContext {
            settings: self.settings,
            bindings: &bindings,
            method_returns_value: bound_method.returns_value(),
            ids: unit.graph.instruction_ids(),
            flags_builder,
        };
        let FlattenedCode {
            mut instructions,
            node_code,
        } = context.flatten(&unit.graph)?;
        log::debug!(
            "flattened {} nodes into {} instructions",
            node_code.len(),
            instructions.len()
        );

        if self.settings.widen_short_branches {
            let widened = widen_short_branches(&mut instructions);
            log::debug!("widened {} short branches", widened);
        }

        let mut body = MethodBody::new(instructions);
        body.exception_handlers =
            build_exception_handlers(&unit.graph, &node_code, &body, self.settings)?;
        log::debug!(
            "resolved {} exception handlers",
            body.exception_handlers.len()
        );

        if self.settings.compute_max_stack {
            body.max_stack = max_stack_depth(&body, bound_method.returns_value())?;
            log::debug!("max stack is {}", body.max_stack);
        }

        *method = bound_method;
        Ok(GeneratedMethod {
            body,
            node_code,
            bindings,
        })
    }
}
