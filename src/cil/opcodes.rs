//! This module contains the table of CIL opcodes (ECMA-335, partition III). Every opcode knows
//! its encoding, its mnemonic, the shape of operand it carries, how it affects the evaluation
//! stack and how it affects control flow.
//!
//! Some stack behaviours can't be known from the opcode alone (eg. `call` depends on the
//! signature of the callee, `ret` on the signature of the enclosing method). Those are marked as
//! [`StackBehaviour::Variable`] and resolved in [`crate::cil::Instruction::stack_usage`].

use std::fmt;

/// Kind of operand an opcode expects
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandType {
    InlineNone,
    InlineBrTarget,
    ShortInlineBrTarget,
    InlineField,
    InlineMethod,
    InlineType,
    InlineTok,
    InlineSig,
    InlineI,
    InlineI8,
    ShortInlineI,
    InlineR,
    ShortInlineR,
    InlineString,
    InlineSwitch,
    InlineVar,
    ShortInlineVar,
    InlineArg,
    ShortInlineArg,
}

impl OperandType {
    /// Encoded size of the operand, in bytes
    ///
    /// Switch tables are the only variable-width operand: this is the width of the count that
    /// prefixes the jump table.
    pub fn fixed_width(self) -> usize {
        match self {
            OperandType::InlineNone => 0,
            OperandType::ShortInlineBrTarget
            | OperandType::ShortInlineI
            | OperandType::ShortInlineVar
            | OperandType::ShortInlineArg => 1,
            OperandType::InlineVar | OperandType::InlineArg => 2,
            OperandType::InlineBrTarget
            | OperandType::InlineField
            | OperandType::InlineMethod
            | OperandType::InlineType
            | OperandType::InlineTok
            | OperandType::InlineSig
            | OperandType::InlineI
            | OperandType::ShortInlineR
            | OperandType::InlineString
            | OperandType::InlineSwitch => 4,
            OperandType::InlineI8 | OperandType::InlineR => 8,
        }
    }
}

/// Effect of an opcode on one side (pops or pushes) of the evaluation stack
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackBehaviour {
    /// Always this many stack slots
    Fixed(usize),

    /// Depends on a signature (the callee's or the enclosing method's)
    Variable,

    /// Empties the evaluation stack (`leave` and `endfinally`)
    All,
}

/// How an opcode affects the flow of control
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowControl {
    /// Execution continues to the next instruction
    Next,
    /// Unconditional branch
    Branch,
    /// Conditional branch (falls through when not taken)
    CondBranch,
    /// Method call (falls through)
    Call,
    /// Debugger break (falls through)
    Break,
    /// Prefix to the next instruction
    Meta,
    /// Leaves the method, a filter or a finally/fault handler
    Return,
    /// Throws an exception
    Throw,
}

impl FlowControl {
    /// Can execution reach the next instruction after one with this flow control?
    pub fn falls_through(self) -> bool {
        !matches!(
            self,
            FlowControl::Branch | FlowControl::Return | FlowControl::Throw
        )
    }
}

macro_rules! stack {
    (var) => {
        StackBehaviour::Variable
    };
    (all) => {
        StackBehaviour::All
    };
    ($n:literal) => {
        StackBehaviour::Fixed($n)
    };
}

macro_rules! opcodes {
    ($( $variant:ident = ($value:literal, $name:literal, $operand:ident, $pop:tt, $push:tt, $flow:ident), )*) => {
        /// CIL opcode
        #[derive(Copy, Clone, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $( $variant, )*
        }

        impl OpCode {
            /// Every opcode, in encoding order
            pub const ALL: &'static [OpCode] = &[ $( OpCode::$variant, )* ];

            /// Encoded value (two-byte opcodes have a `0xFE` high byte)
            pub fn value(self) -> u16 {
                match self {
                    $( OpCode::$variant => $value, )*
                }
            }

            /// Mnemonic, as it appears in disassembly
            pub fn name(self) -> &'static str {
                match self {
                    $( OpCode::$variant => $name, )*
                }
            }

            /// Shape of operand the opcode expects
            pub fn operand_type(self) -> OperandType {
                match self {
                    $( OpCode::$variant => OperandType::$operand, )*
                }
            }

            /// Number of stack slots consumed
            pub fn stack_pop(self) -> StackBehaviour {
                match self {
                    $( OpCode::$variant => stack!($pop), )*
                }
            }

            /// Number of stack slots produced
            pub fn stack_push(self) -> StackBehaviour {
                match self {
                    $( OpCode::$variant => stack!($push), )*
                }
            }

            pub fn flow_control(self) -> FlowControl {
                match self {
                    $( OpCode::$variant => FlowControl::$flow, )*
                }
            }
        }
    };
}

opcodes! {
    Nop = (0x00, "nop", InlineNone, 0, 0, Next),
    Break = (0x01, "break", InlineNone, 0, 0, Break),
    Ldarg0 = (0x02, "ldarg.0", InlineNone, 0, 1, Next),
    Ldarg1 = (0x03, "ldarg.1", InlineNone, 0, 1, Next),
    Ldarg2 = (0x04, "ldarg.2", InlineNone, 0, 1, Next),
    Ldarg3 = (0x05, "ldarg.3", InlineNone, 0, 1, Next),
    Ldloc0 = (0x06, "ldloc.0", InlineNone, 0, 1, Next),
    Ldloc1 = (0x07, "ldloc.1", InlineNone, 0, 1, Next),
    Ldloc2 = (0x08, "ldloc.2", InlineNone, 0, 1, Next),
    Ldloc3 = (0x09, "ldloc.3", InlineNone, 0, 1, Next),
    Stloc0 = (0x0A, "stloc.0", InlineNone, 1, 0, Next),
    Stloc1 = (0x0B, "stloc.1", InlineNone, 1, 0, Next),
    Stloc2 = (0x0C, "stloc.2", InlineNone, 1, 0, Next),
    Stloc3 = (0x0D, "stloc.3", InlineNone, 1, 0, Next),
    LdargS = (0x0E, "ldarg.s", ShortInlineArg, 0, 1, Next),
    LdargaS = (0x0F, "ldarga.s", ShortInlineArg, 0, 1, Next),
    StargS = (0x10, "starg.s", ShortInlineArg, 1, 0, Next),
    LdlocS = (0x11, "ldloc.s", ShortInlineVar, 0, 1, Next),
    LdlocaS = (0x12, "ldloca.s", ShortInlineVar, 0, 1, Next),
    StlocS = (0x13, "stloc.s", ShortInlineVar, 1, 0, Next),
    Ldnull = (0x14, "ldnull", InlineNone, 0, 1, Next),
    LdcI4M1 = (0x15, "ldc.i4.m1", InlineNone, 0, 1, Next),
    LdcI40 = (0x16, "ldc.i4.0", InlineNone, 0, 1, Next),
    LdcI41 = (0x17, "ldc.i4.1", InlineNone, 0, 1, Next),
    LdcI42 = (0x18, "ldc.i4.2", InlineNone, 0, 1, Next),
    LdcI43 = (0x19, "ldc.i4.3", InlineNone, 0, 1, Next),
    LdcI44 = (0x1A, "ldc.i4.4", InlineNone, 0, 1, Next),
    LdcI45 = (0x1B, "ldc.i4.5", InlineNone, 0, 1, Next),
    LdcI46 = (0x1C, "ldc.i4.6", InlineNone, 0, 1, Next),
    LdcI47 = (0x1D, "ldc.i4.7", InlineNone, 0, 1, Next),
    LdcI48 = (0x1E, "ldc.i4.8", InlineNone, 0, 1, Next),
    LdcI4S = (0x1F, "ldc.i4.s", ShortInlineI, 0, 1, Next),
    LdcI4 = (0x20, "ldc.i4", InlineI, 0, 1, Next),
    LdcI8 = (0x21, "ldc.i8", InlineI8, 0, 1, Next),
    LdcR4 = (0x22, "ldc.r4", ShortInlineR, 0, 1, Next),
    LdcR8 = (0x23, "ldc.r8", InlineR, 0, 1, Next),
    Dup = (0x25, "dup", InlineNone, 1, 2, Next),
    Pop = (0x26, "pop", InlineNone, 1, 0, Next),
    Jmp = (0x27, "jmp", InlineMethod, 0, 0, Call),
    Call = (0x28, "call", InlineMethod, var, var, Call),
    Calli = (0x29, "calli", InlineSig, var, var, Call),
    Ret = (0x2A, "ret", InlineNone, var, 0, Return),
    BrS = (0x2B, "br.s", ShortInlineBrTarget, 0, 0, Branch),
    BrfalseS = (0x2C, "brfalse.s", ShortInlineBrTarget, 1, 0, CondBranch),
    BrtrueS = (0x2D, "brtrue.s", ShortInlineBrTarget, 1, 0, CondBranch),
    BeqS = (0x2E, "beq.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BgeS = (0x2F, "bge.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BgtS = (0x30, "bgt.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BleS = (0x31, "ble.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BltS = (0x32, "blt.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BneUnS = (0x33, "bne.un.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BgeUnS = (0x34, "bge.un.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BgtUnS = (0x35, "bgt.un.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BleUnS = (0x36, "ble.un.s", ShortInlineBrTarget, 2, 0, CondBranch),
    BltUnS = (0x37, "blt.un.s", ShortInlineBrTarget, 2, 0, CondBranch),
    Br = (0x38, "br", InlineBrTarget, 0, 0, Branch),
    Brfalse = (0x39, "brfalse", InlineBrTarget, 1, 0, CondBranch),
    Brtrue = (0x3A, "brtrue", InlineBrTarget, 1, 0, CondBranch),
    Beq = (0x3B, "beq", InlineBrTarget, 2, 0, CondBranch),
    Bge = (0x3C, "bge", InlineBrTarget, 2, 0, CondBranch),
    Bgt = (0x3D, "bgt", InlineBrTarget, 2, 0, CondBranch),
    Ble = (0x3E, "ble", InlineBrTarget, 2, 0, CondBranch),
    Blt = (0x3F, "blt", InlineBrTarget, 2, 0, CondBranch),
    BneUn = (0x40, "bne.un", InlineBrTarget, 2, 0, CondBranch),
    BgeUn = (0x41, "bge.un", InlineBrTarget, 2, 0, CondBranch),
    BgtUn = (0x42, "bgt.un", InlineBrTarget, 2, 0, CondBranch),
    BleUn = (0x43, "ble.un", InlineBrTarget, 2, 0, CondBranch),
    BltUn = (0x44, "blt.un", InlineBrTarget, 2, 0, CondBranch),
    Switch = (0x45, "switch", InlineSwitch, 1, 0, CondBranch),
    LdindI1 = (0x46, "ldind.i1", InlineNone, 1, 1, Next),
    LdindU1 = (0x47, "ldind.u1", InlineNone, 1, 1, Next),
    LdindI2 = (0x48, "ldind.i2", InlineNone, 1, 1, Next),
    LdindU2 = (0x49, "ldind.u2", InlineNone, 1, 1, Next),
    LdindI4 = (0x4A, "ldind.i4", InlineNone, 1, 1, Next),
    LdindU4 = (0x4B, "ldind.u4", InlineNone, 1, 1, Next),
    LdindI8 = (0x4C, "ldind.i8", InlineNone, 1, 1, Next),
    LdindI = (0x4D, "ldind.i", InlineNone, 1, 1, Next),
    LdindR4 = (0x4E, "ldind.r4", InlineNone, 1, 1, Next),
    LdindR8 = (0x4F, "ldind.r8", InlineNone, 1, 1, Next),
    LdindRef = (0x50, "ldind.ref", InlineNone, 1, 1, Next),
    StindRef = (0x51, "stind.ref", InlineNone, 2, 0, Next),
    StindI1 = (0x52, "stind.i1", InlineNone, 2, 0, Next),
    StindI2 = (0x53, "stind.i2", InlineNone, 2, 0, Next),
    StindI4 = (0x54, "stind.i4", InlineNone, 2, 0, Next),
    StindI8 = (0x55, "stind.i8", InlineNone, 2, 0, Next),
    StindR4 = (0x56, "stind.r4", InlineNone, 2, 0, Next),
    StindR8 = (0x57, "stind.r8", InlineNone, 2, 0, Next),
    Add = (0x58, "add", InlineNone, 2, 1, Next),
    Sub = (0x59, "sub", InlineNone, 2, 1, Next),
    Mul = (0x5A, "mul", InlineNone, 2, 1, Next),
    Div = (0x5B, "div", InlineNone, 2, 1, Next),
    DivUn = (0x5C, "div.un", InlineNone, 2, 1, Next),
    Rem = (0x5D, "rem", InlineNone, 2, 1, Next),
    RemUn = (0x5E, "rem.un", InlineNone, 2, 1, Next),
    And = (0x5F, "and", InlineNone, 2, 1, Next),
    Or = (0x60, "or", InlineNone, 2, 1, Next),
    Xor = (0x61, "xor", InlineNone, 2, 1, Next),
    Shl = (0x62, "shl", InlineNone, 2, 1, Next),
    Shr = (0x63, "shr", InlineNone, 2, 1, Next),
    ShrUn = (0x64, "shr.un", InlineNone, 2, 1, Next),
    Neg = (0x65, "neg", InlineNone, 1, 1, Next),
    Not = (0x66, "not", InlineNone, 1, 1, Next),
    ConvI1 = (0x67, "conv.i1", InlineNone, 1, 1, Next),
    ConvI2 = (0x68, "conv.i2", InlineNone, 1, 1, Next),
    ConvI4 = (0x69, "conv.i4", InlineNone, 1, 1, Next),
    ConvI8 = (0x6A, "conv.i8", InlineNone, 1, 1, Next),
    ConvR4 = (0x6B, "conv.r4", InlineNone, 1, 1, Next),
    ConvR8 = (0x6C, "conv.r8", InlineNone, 1, 1, Next),
    ConvU4 = (0x6D, "conv.u4", InlineNone, 1, 1, Next),
    ConvU8 = (0x6E, "conv.u8", InlineNone, 1, 1, Next),
    Callvirt = (0x6F, "callvirt", InlineMethod, var, var, Call),
    Cpobj = (0x70, "cpobj", InlineType, 2, 0, Next),
    Ldobj = (0x71, "ldobj", InlineType, 1, 1, Next),
    Ldstr = (0x72, "ldstr", InlineString, 0, 1, Next),
    Newobj = (0x73, "newobj", InlineMethod, var, 1, Call),
    Castclass = (0x74, "castclass", InlineType, 1, 1, Next),
    Isinst = (0x75, "isinst", InlineType, 1, 1, Next),
    ConvRUn = (0x76, "conv.r.un", InlineNone, 1, 1, Next),
    Unbox = (0x79, "unbox", InlineType, 1, 1, Next),
    Throw = (0x7A, "throw", InlineNone, 1, 0, Throw),
    Ldfld = (0x7B, "ldfld", InlineField, 1, 1, Next),
    Ldflda = (0x7C, "ldflda", InlineField, 1, 1, Next),
    Stfld = (0x7D, "stfld", InlineField, 2, 0, Next),
    Ldsfld = (0x7E, "ldsfld", InlineField, 0, 1, Next),
    Ldsflda = (0x7F, "ldsflda", InlineField, 0, 1, Next),
    Stsfld = (0x80, "stsfld", InlineField, 1, 0, Next),
    Stobj = (0x81, "stobj", InlineType, 2, 0, Next),
    ConvOvfI1Un = (0x82, "conv.ovf.i1.un", InlineNone, 1, 1, Next),
    ConvOvfI2Un = (0x83, "conv.ovf.i2.un", InlineNone, 1, 1, Next),
    ConvOvfI4Un = (0x84, "conv.ovf.i4.un", InlineNone, 1, 1, Next),
    ConvOvfI8Un = (0x85, "conv.ovf.i8.un", InlineNone, 1, 1, Next),
    ConvOvfU1Un = (0x86, "conv.ovf.u1.un", InlineNone, 1, 1, Next),
    ConvOvfU2Un = (0x87, "conv.ovf.u2.un", InlineNone, 1, 1, Next),
    ConvOvfU4Un = (0x88, "conv.ovf.u4.un", InlineNone, 1, 1, Next),
    ConvOvfU8Un = (0x89, "conv.ovf.u8.un", InlineNone, 1, 1, Next),
    ConvOvfIUn = (0x8A, "conv.ovf.i.un", InlineNone, 1, 1, Next),
    ConvOvfUUn = (0x8B, "conv.ovf.u.un", InlineNone, 1, 1, Next),
    Box = (0x8C, "box", InlineType, 1, 1, Next),
    Newarr = (0x8D, "newarr", InlineType, 1, 1, Next),
    Ldlen = (0x8E, "ldlen", InlineNone, 1, 1, Next),
    Ldelema = (0x8F, "ldelema", InlineType, 2, 1, Next),
    LdelemI1 = (0x90, "ldelem.i1", InlineNone, 2, 1, Next),
    LdelemU1 = (0x91, "ldelem.u1", InlineNone, 2, 1, Next),
    LdelemI2 = (0x92, "ldelem.i2", InlineNone, 2, 1, Next),
    LdelemU2 = (0x93, "ldelem.u2", InlineNone, 2, 1, Next),
    LdelemI4 = (0x94, "ldelem.i4", InlineNone, 2, 1, Next),
    LdelemU4 = (0x95, "ldelem.u4", InlineNone, 2, 1, Next),
    LdelemI8 = (0x96, "ldelem.i8", InlineNone, 2, 1, Next),
    LdelemI = (0x97, "ldelem.i", InlineNone, 2, 1, Next),
    LdelemR4 = (0x98, "ldelem.r4", InlineNone, 2, 1, Next),
    LdelemR8 = (0x99, "ldelem.r8", InlineNone, 2, 1, Next),
    LdelemRef = (0x9A, "ldelem.ref", InlineNone, 2, 1, Next),
    StelemI = (0x9B, "stelem.i", InlineNone, 3, 0, Next),
    StelemI1 = (0x9C, "stelem.i1", InlineNone, 3, 0, Next),
    StelemI2 = (0x9D, "stelem.i2", InlineNone, 3, 0, Next),
    StelemI4 = (0x9E, "stelem.i4", InlineNone, 3, 0, Next),
    StelemI8 = (0x9F, "stelem.i8", InlineNone, 3, 0, Next),
    StelemR4 = (0xA0, "stelem.r4", InlineNone, 3, 0, Next),
    StelemR8 = (0xA1, "stelem.r8", InlineNone, 3, 0, Next),
    StelemRef = (0xA2, "stelem.ref", InlineNone, 3, 0, Next),
    Ldelem = (0xA3, "ldelem", InlineType, 2, 1, Next),
    Stelem = (0xA4, "stelem", InlineType, 3, 0, Next),
    UnboxAny = (0xA5, "unbox.any", InlineType, 1, 1, Next),
    ConvOvfI1 = (0xB3, "conv.ovf.i1", InlineNone, 1, 1, Next),
    ConvOvfU1 = (0xB4, "conv.ovf.u1", InlineNone, 1, 1, Next),
    ConvOvfI2 = (0xB5, "conv.ovf.i2", InlineNone, 1, 1, Next),
    ConvOvfU2 = (0xB6, "conv.ovf.u2", InlineNone, 1, 1, Next),
    ConvOvfI4 = (0xB7, "conv.ovf.i4", InlineNone, 1, 1, Next),
    ConvOvfU4 = (0xB8, "conv.ovf.u4", InlineNone, 1, 1, Next),
    ConvOvfI8 = (0xB9, "conv.ovf.i8", InlineNone, 1, 1, Next),
    ConvOvfU8 = (0xBA, "conv.ovf.u8", InlineNone, 1, 1, Next),
    Refanyval = (0xC2, "refanyval", InlineType, 1, 1, Next),
    Ckfinite = (0xC3, "ckfinite", InlineNone, 1, 1, Next),
    Mkrefany = (0xC6, "mkrefany", InlineType, 1, 1, Next),
    Ldtoken = (0xD0, "ldtoken", InlineTok, 0, 1, Next),
    ConvU2 = (0xD1, "conv.u2", InlineNone, 1, 1, Next),
    ConvU1 = (0xD2, "conv.u1", InlineNone, 1, 1, Next),
    ConvI = (0xD3, "conv.i", InlineNone, 1, 1, Next),
    ConvOvfI = (0xD4, "conv.ovf.i", InlineNone, 1, 1, Next),
    ConvOvfU = (0xD5, "conv.ovf.u", InlineNone, 1, 1, Next),
    AddOvf = (0xD6, "add.ovf", InlineNone, 2, 1, Next),
    AddOvfUn = (0xD7, "add.ovf.un", InlineNone, 2, 1, Next),
    MulOvf = (0xD8, "mul.ovf", InlineNone, 2, 1, Next),
    MulOvfUn = (0xD9, "mul.ovf.un", InlineNone, 2, 1, Next),
    SubOvf = (0xDA, "sub.ovf", InlineNone, 2, 1, Next),
    SubOvfUn = (0xDB, "sub.ovf.un", InlineNone, 2, 1, Next),
    Endfinally = (0xDC, "endfinally", InlineNone, all, 0, Return),
    Leave = (0xDD, "leave", InlineBrTarget, all, 0, Branch),
    LeaveS = (0xDE, "leave.s", ShortInlineBrTarget, all, 0, Branch),
    StindI = (0xDF, "stind.i", InlineNone, 2, 0, Next),
    ConvU = (0xE0, "conv.u", InlineNone, 1, 1, Next),
    Arglist = (0xFE00, "arglist", InlineNone, 0, 1, Next),
    Ceq = (0xFE01, "ceq", InlineNone, 2, 1, Next),
    Cgt = (0xFE02, "cgt", InlineNone, 2, 1, Next),
    CgtUn = (0xFE03, "cgt.un", InlineNone, 2, 1, Next),
    Clt = (0xFE04, "clt", InlineNone, 2, 1, Next),
    CltUn = (0xFE05, "clt.un", InlineNone, 2, 1, Next),
    Ldftn = (0xFE06, "ldftn", InlineMethod, 0, 1, Next),
    Ldvirtftn = (0xFE07, "ldvirtftn", InlineMethod, 1, 1, Next),
    Ldarg = (0xFE09, "ldarg", InlineArg, 0, 1, Next),
    Ldarga = (0xFE0A, "ldarga", InlineArg, 0, 1, Next),
    Starg = (0xFE0B, "starg", InlineArg, 1, 0, Next),
    Ldloc = (0xFE0C, "ldloc", InlineVar, 0, 1, Next),
    Ldloca = (0xFE0D, "ldloca", InlineVar, 0, 1, Next),
    Stloc = (0xFE0E, "stloc", InlineVar, 1, 0, Next),
    Localloc = (0xFE0F, "localloc", InlineNone, 1, 1, Next),
    Endfilter = (0xFE11, "endfilter", InlineNone, 1, 0, Return),
    Unaligned = (0xFE12, "unaligned.", ShortInlineI, 0, 0, Meta),
    Volatile = (0xFE13, "volatile.", InlineNone, 0, 0, Meta),
    Tailcall = (0xFE14, "tail.", InlineNone, 0, 0, Meta),
    Initobj = (0xFE15, "initobj", InlineType, 1, 0, Next),
    Constrained = (0xFE16, "constrained.", InlineType, 0, 0, Meta),
    Cpblk = (0xFE17, "cpblk", InlineNone, 3, 0, Next),
    Initblk = (0xFE18, "initblk", InlineNone, 3, 0, Next),
    No = (0xFE19, "no.", ShortInlineI, 0, 0, Meta),
    Rethrow = (0xFE1A, "rethrow", InlineNone, 0, 0, Throw),
    Sizeof = (0xFE1C, "sizeof", InlineType, 0, 1, Next),
    Refanytype = (0xFE1D, "refanytype", InlineNone, 1, 1, Next),
    Readonly = (0xFE1E, "readonly.", InlineNone, 0, 0, Meta),
}

impl OpCode {
    /// Encoded size of the opcode itself (not including the operand)
    pub fn size(self) -> usize {
        if self.value() > 0xFF {
            2
        } else {
            1
        }
    }

    /// Long form of a short branch (eg. `br` for `br.s`)
    pub fn long_branch_form(self) -> Option<OpCode> {
        use OpCode::*;
        Some(match self {
            BrS => Br,
            BrfalseS => Brfalse,
            BrtrueS => Brtrue,
            BeqS => Beq,
            BgeS => Bge,
            BgtS => Bgt,
            BleS => Ble,
            BltS => Blt,
            BneUnS => BneUn,
            BgeUnS => BgeUn,
            BgtUnS => BgtUn,
            BleUnS => BleUn,
            BltUnS => BltUn,
            LeaveS => Leave,
            _ => return None,
        })
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn encodings_are_unique() {
        let mut seen = HashSet::new();
        for opcode in OpCode::ALL {
            assert!(seen.insert(opcode.value()), "duplicate encoding for {}", opcode);
        }
        assert_eq!(OpCode::ALL.len(), 219);
    }

    #[test]
    fn two_byte_opcodes() {
        assert_eq!(OpCode::Nop.size(), 1);
        assert_eq!(OpCode::ConvU.size(), 1);
        assert_eq!(OpCode::Ceq.size(), 2);
        assert_eq!(OpCode::Ldloc.size(), 2);
    }

    #[test]
    fn short_branches_have_long_forms() {
        for opcode in OpCode::ALL {
            match opcode.operand_type() {
                OperandType::ShortInlineBrTarget => {
                    let long = opcode.long_branch_form().unwrap();
                    assert_eq!(long.operand_type(), OperandType::InlineBrTarget);
                    assert_eq!(long.stack_pop(), opcode.stack_pop());
                    assert_eq!(long.flow_control(), opcode.flow_control());
                }
                _ => assert_eq!(opcode.long_branch_form(), None),
            }
        }
    }
}
