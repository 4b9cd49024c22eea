//! Metadata references imported into the module being rewritten
//!
//! Instructions refer to types, methods, fields and standalone signatures. Rather than carrying
//! around raw tokens, we intern everything into one [`Metadata`] graph that hands out references
//! (`&'g TypeData<'g>` and friends) into arenas. This way references are cheap to copy and
//! compare, and the token for each reference is only assigned once no matter how many
//! instructions mention it.
//!
//! ```
//! use vm2cil::cil::metadata::*;
//!
//! let arenas = MetadataArenas::new();
//! let metadata = Metadata::new(&arenas);
//! let core = metadata.core_types();
//!
//! let int32 = metadata.import_type("System.Int32", true);
//! let parse = metadata.import_method(MethodData::new(
//!     int32,
//!     "Parse",
//!     MethodSignature::new_static(vec![metadata.import_type("System.String", false)], Some(int32)),
//! ));
//!
//! assert_eq!(metadata.import_type("System.Int32", true), int32);
//! assert_eq!(parse.signature.parameters.len(), 1);
//! assert!(core.object != int32);
//! ```

use elsa::FrozenVec;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

/// Token table for type references
pub const TYPE_REF_TABLE: u32 = 0x01;

/// Token table for method and field references
pub const MEMBER_REF_TABLE: u32 = 0x0A;

/// Token table for standalone signatures
pub const STANDALONE_SIG_TABLE: u32 = 0x11;

pub type TypeId<'g> = &'g TypeData<'g>;
pub type MethodId<'g> = &'g MethodData<'g>;
pub type FieldId<'g> = &'g FieldData<'g>;
pub type SignatureId<'g> = &'g SignatureData<'g>;

pub struct MetadataArenas<'g> {
    type_arena: Arena<TypeData<'g>>,
    method_arena: Arena<MethodData<'g>>,
    field_arena: Arena<FieldData<'g>>,
    signature_arena: Arena<SignatureData<'g>>,
}

impl<'g> MetadataArenas<'g> {
    pub fn new() -> Self {
        MetadataArenas {
            type_arena: Arena::new(),
            method_arena: Arena::new(),
            field_arena: Arena::new(),
            signature_arena: Arena::new(),
        }
    }
}

impl<'g> Default for MetadataArenas<'g> {
    fn default() -> Self {
        MetadataArenas::new()
    }
}

/// Reference import service
///
/// Importing the same type twice returns the same reference. Methods and fields are deduplicated
/// on their declaring type, name and signature.
pub struct Metadata<'g> {
    arenas: &'g MetadataArenas<'g>,
    types: RefCell<HashMap<String, TypeId<'g>>>,
    signatures: RefCell<Vec<SignatureId<'g>>>,
    next_type_rid: Cell<u32>,
    next_member_rid: Cell<u32>,
    core: CoreTypes<'g>,
}

impl<'g> Metadata<'g> {
    /// New import service, pre-populated with [`CoreTypes`]
    pub fn new(arenas: &'g MetadataArenas<'g>) -> Self {
        let mut types = HashMap::new();
        let mut next_type_rid = 1;
        let mut core_type = |name: &str, is_value_type: bool| -> TypeId<'g> {
            let data = &*arenas.type_arena.alloc(TypeData::new(
                name,
                is_value_type,
                token(TYPE_REF_TABLE, next_type_rid),
            ));
            next_type_rid += 1;
            types.insert(name.to_owned(), data);
            data
        };
        let core = CoreTypes {
            object: core_type(CoreTypes::OBJECT, false),
            string: core_type(CoreTypes::STRING, false),
            system_type: core_type(CoreTypes::TYPE, false),
            runtime_type_handle: core_type(CoreTypes::RUNTIME_TYPE_HANDLE, true),
            exception: core_type(CoreTypes::EXCEPTION, false),
        };

        Metadata {
            arenas,
            types: RefCell::new(types),
            signatures: RefCell::new(vec![]),
            next_type_rid: Cell::new(next_type_rid),
            next_member_rid: Cell::new(1),
            core,
        }
    }

    /// Types every generated body may need to refer to
    pub fn core_types(&self) -> &CoreTypes<'g> {
        &self.core
    }

    /// Find a type that has already been imported
    pub fn lookup_type(&self, full_name: &str) -> Option<TypeId<'g>> {
        self.types.borrow().get(full_name).copied()
    }

    /// Import a type by its full name (eg. `System.Int32`)
    ///
    /// Note: if the type has been imported before, `is_value_type` is ignored
    pub fn import_type(&self, full_name: &str, is_value_type: bool) -> TypeId<'g> {
        if let Some(existing) = self.lookup_type(full_name) {
            return existing;
        }
        let rid = self.next_type_rid.replace(self.next_type_rid.get() + 1);
        let data = &*self.arenas.type_arena.alloc(TypeData::new(
            full_name,
            is_value_type,
            token(TYPE_REF_TABLE, rid),
        ));
        self.types.borrow_mut().insert(full_name.to_owned(), data);
        data
    }

    /// Import a method and register it on its declaring type
    ///
    /// The token of `method` is ignored and replaced with a fresh member reference token.
    pub fn import_method(&self, method: MethodData<'g>) -> MethodId<'g> {
        let declaring_type: TypeId<'g> = method.declaring_type;
        if let Some(existing) = declaring_type
            .methods
            .iter()
            .find(|m| m.name == method.name && m.signature == method.signature)
        {
            existing
        } else {
            let mut method = method;
            method.token = self.fresh_member_token();
            let data = &*self.arenas.method_arena.alloc(method);
            declaring_type.methods.push(data);
            data
        }
    }

    /// Import a field and register it on its declaring type
    pub fn import_field(&self, field: FieldData<'g>) -> FieldId<'g> {
        let declaring_type: TypeId<'g> = field.declaring_type;
        if let Some(existing) = declaring_type
            .fields
            .iter()
            .find(|f| f.name == field.name && f.field_type == field.field_type)
        {
            existing
        } else {
            let mut field = field;
            field.token = self.fresh_member_token();
            let data = &*self.arenas.field_arena.alloc(field);
            declaring_type.fields.push(data);
            data
        }
    }

    /// Import a standalone signature (as used by `calli`)
    pub fn import_signature(&self, signature: MethodSignature<'g>) -> SignatureId<'g> {
        if let Some(existing) = self
            .signatures
            .borrow()
            .iter()
            .find(|s| s.signature == signature)
            .copied()
        {
            return existing;
        }
        let rid = self.signatures.borrow().len() as u32 + 1;
        let data = &*self.arenas.signature_arena.alloc(SignatureData {
            signature,
            token: token(STANDALONE_SIG_TABLE, rid),
        });
        self.signatures.borrow_mut().push(data);
        data
    }

    fn fresh_member_token(&self) -> u32 {
        let rid = self.next_member_rid.replace(self.next_member_rid.get() + 1);
        token(MEMBER_REF_TABLE, rid)
    }
}

fn token(table: u32, rid: u32) -> u32 {
    (table << 24) | rid
}

/// Well-known types of the base class library
pub struct CoreTypes<'g> {
    pub object: TypeId<'g>,
    pub string: TypeId<'g>,
    pub system_type: TypeId<'g>,
    pub runtime_type_handle: TypeId<'g>,
    pub exception: TypeId<'g>,
}

impl<'g> CoreTypes<'g> {
    pub const OBJECT: &'static str = "System.Object";
    pub const STRING: &'static str = "System.String";
    pub const TYPE: &'static str = "System.Type";
    pub const RUNTIME_TYPE_HANDLE: &'static str = "System.RuntimeTypeHandle";
    pub const EXCEPTION: &'static str = "System.Exception";
}

pub struct TypeData<'g> {
    /// Namespace-qualified name of the type
    pub full_name: String,

    pub is_value_type: bool,

    /// Metadata token
    pub token: u32,

    /// Methods imported so far
    pub methods: FrozenVec<MethodId<'g>>,

    /// Fields imported so far
    pub fields: FrozenVec<FieldId<'g>>,
}

impl<'g> TypeData<'g> {
    fn new(full_name: &str, is_value_type: bool, token: u32) -> TypeData<'g> {
        TypeData {
            full_name: full_name.to_owned(),
            is_value_type,
            token,
            methods: FrozenVec::new(),
            fields: FrozenVec::new(),
        }
    }
}

impl<'g> PartialEq for TypeData<'g> {
    fn eq(&self, other: &TypeData<'g>) -> bool {
        self.full_name == other.full_name
    }
}

impl<'g> Eq for TypeData<'g> {}

impl<'g> Debug for TypeData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

impl<'g> fmt::Display for TypeData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Calling convention and types of a method
#[derive(Clone, PartialEq, Eq)]
pub struct MethodSignature<'g> {
    /// Does the method take an implicit `this` argument?
    pub has_this: bool,

    /// Explicit parameters
    pub parameters: Vec<TypeId<'g>>,

    /// Return type (`None` for `void`)
    pub return_type: Option<TypeId<'g>>,
}

impl<'g> MethodSignature<'g> {
    pub fn new_static(
        parameters: Vec<TypeId<'g>>,
        return_type: Option<TypeId<'g>>,
    ) -> MethodSignature<'g> {
        MethodSignature {
            has_this: false,
            parameters,
            return_type,
        }
    }

    pub fn new_instance(
        parameters: Vec<TypeId<'g>>,
        return_type: Option<TypeId<'g>>,
    ) -> MethodSignature<'g> {
        MethodSignature {
            has_this: true,
            parameters,
            return_type,
        }
    }
}

impl<'g> Debug for MethodSignature<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_this {
            f.write_str("instance ")?;
        }
        match self.return_type {
            Some(return_type) => write!(f, "{} (", return_type)?,
            None => f.write_str("void (")?,
        }
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        f.write_str(")")
    }
}

#[derive(PartialEq, Eq)]
pub struct MethodData<'g> {
    pub declaring_type: TypeId<'g>,
    pub name: String,
    pub signature: MethodSignature<'g>,

    /// Metadata token (assigned on import)
    pub token: u32,
}

impl<'g> MethodData<'g> {
    pub fn new(
        declaring_type: TypeId<'g>,
        name: impl Into<String>,
        signature: MethodSignature<'g>,
    ) -> MethodData<'g> {
        MethodData {
            declaring_type,
            name: name.into(),
            signature,
            token: 0,
        }
    }
}

impl<'g> Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}:{:?}",
            self.declaring_type, self.name, self.signature
        )
    }
}

#[derive(PartialEq, Eq)]
pub struct FieldData<'g> {
    pub declaring_type: TypeId<'g>,
    pub name: String,
    pub field_type: TypeId<'g>,
    pub is_static: bool,

    /// Metadata token (assigned on import)
    pub token: u32,
}

impl<'g> FieldData<'g> {
    pub fn new(
        declaring_type: TypeId<'g>,
        name: impl Into<String>,
        field_type: TypeId<'g>,
        is_static: bool,
    ) -> FieldData<'g> {
        FieldData {
            declaring_type,
            name: name.into(),
            field_type,
            is_static,
            token: 0,
        }
    }
}

impl<'g> Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}::{}",
            self.field_type, self.declaring_type, self.name
        )
    }
}

#[derive(PartialEq, Eq)]
pub struct SignatureData<'g> {
    pub signature: MethodSignature<'g>,
    pub token: u32,
}

impl<'g> Debug for SignatureData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.signature.fmt(f)
    }
}

/// Operand of instructions that refer to a type, method or field
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum MemberRef<'g> {
    Type(TypeId<'g>),
    Method(MethodId<'g>),
    Field(FieldId<'g>),
}

impl<'g> MemberRef<'g> {
    pub fn token(&self) -> u32 {
        match self {
            MemberRef::Type(type_id) => type_id.token,
            MemberRef::Method(method) => method.token,
            MemberRef::Field(field) => field.token,
        }
    }
}

impl<'g> Debug for MemberRef<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRef::Type(type_id) => type_id.fmt(f),
            MemberRef::Method(method) => method.fmt(f),
            MemberRef::Field(field) => field.fmt(f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn types_are_interned() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);

        let int32 = metadata.import_type("System.Int32", true);
        let again = metadata.import_type("System.Int32", true);
        assert!(std::ptr::eq(int32, again));
        assert_eq!(int32.token >> 24, TYPE_REF_TABLE);
        assert!(std::ptr::eq(
            metadata.lookup_type(CoreTypes::OBJECT).unwrap(),
            metadata.core_types().object
        ));
    }

    #[test]
    fn members_are_deduplicated() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let core = metadata.core_types();

        let to_string = || {
            MethodData::new(
                core.object,
                "ToString",
                MethodSignature::new_instance(vec![], Some(core.string)),
            )
        };
        let first = metadata.import_method(to_string());
        let second = metadata.import_method(to_string());
        assert!(std::ptr::eq(first, second));
        assert_eq!(core.object.methods.len(), 1);
        assert_eq!(first.token >> 24, MEMBER_REF_TABLE);

        let field = metadata.import_field(FieldData::new(core.string, "Empty", core.string, true));
        assert_ne!(field.token, first.token);
    }

    #[test]
    fn standalone_signatures() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let int32 = metadata.import_type("System.Int32", true);

        let sig1 = metadata.import_signature(MethodSignature::new_static(vec![int32], None));
        let sig2 = metadata.import_signature(MethodSignature::new_static(vec![int32], None));
        let sig3 = metadata.import_signature(MethodSignature::new_static(vec![], Some(int32)));
        assert!(std::ptr::eq(sig1, sig2));
        assert_eq!(sig1.token, 0x1100_0001);
        assert_eq!(sig3.token, 0x1100_0002);
    }
}
