use crate::cil::metadata::{CoreTypes, Metadata, MethodData, MethodId, MethodSignature};
use crate::vm::VmConstants;

pub struct Settings<'g> {
    /// Flag layout and region tags of the VM
    pub vm_constants: VmConstants,

    /// Helpers used to convert VM values into host values
    pub runtime_helpers: RuntimeHelpers<'g>,

    /// Rewrite short branches that don't fit into their long forms
    ///
    /// Only turn this off if the AST never uses short branches.
    pub widen_short_branches: bool,

    /// Compute the maximum stack depth of the generated body
    ///
    /// When off, `max_stack` of the generated body is left at zero.
    pub compute_max_stack: bool,

    /// Reject exception regions whose nodes aren't laid out next to each other
    pub check_region_contiguity: bool,
}

impl<'g> Settings<'g> {
    pub fn new(runtime_helpers: RuntimeHelpers<'g>) -> Settings<'g> {
        Settings {
            vm_constants: VmConstants::new(),
            runtime_helpers,
            widen_short_branches: true,
            compute_max_stack: true,
            check_region_contiguity: true,
        }
    }
}

/// Methods called when converting values out of the VM representation
pub struct RuntimeHelpers<'g> {
    /// `object ToObject(object)`
    pub to_object: MethodId<'g>,

    /// `object ToType(object, System.Type)`
    pub to_type: MethodId<'g>,

    /// `System.Type System.Type::GetTypeFromHandle(System.RuntimeTypeHandle)`
    pub get_type_from_handle: MethodId<'g>,
}

impl<'g> RuntimeHelpers<'g> {
    pub const TO_OBJECT: &'static str = "ToObject";
    pub const TO_TYPE: &'static str = "ToType";
    pub const GET_TYPE_FROM_HANDLE: &'static str = "GetTypeFromHandle";

    /// Import the helpers, with the conversion helpers being static methods on `helper_type_name`
    pub fn import(metadata: &Metadata<'g>, helper_type_name: &str) -> RuntimeHelpers<'g> {
        let core: &CoreTypes<'g> = metadata.core_types();
        let helper_type = metadata.import_type(helper_type_name, false);

        RuntimeHelpers {
            to_object: metadata.import_method(MethodData::new(
                helper_type,
                Self::TO_OBJECT,
                MethodSignature::new_static(vec![core.object], Some(core.object)),
            )),
            to_type: metadata.import_method(MethodData::new(
                helper_type,
                Self::TO_TYPE,
                MethodSignature::new_static(vec![core.object, core.system_type], Some(core.object)),
            )),
            get_type_from_handle: metadata.import_method(MethodData::new(
                core.system_type,
                Self::GET_TYPE_FROM_HANDLE,
                MethodSignature::new_static(
                    vec![core.runtime_type_handle],
                    Some(core.system_type),
                ),
            )),
        }
    }
}
