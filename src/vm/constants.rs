use crate::cil::HandlerKind;
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Abstract flags of the virtual processor
    ///
    /// These name flags independently of where a particular VM instance stores them in its flags
    /// register. Use [`VmConstants::flag_mask`] to get the concrete mask.
    pub struct VmFlags: u8 {
        const OVERFLOW = 0x01;
        const CARRY = 0x02;
        const ZERO = 0x04;
        const SIGN = 0x08;
        const UNSIGNED = 0x10;
        const BEHAV1 = 0x20;
        const BEHAV2 = 0x40;
        const BEHAV3 = 0x80;
    }
}

impl VmFlags {
    /// Each of the individual flags
    pub const EACH: [VmFlags; 8] = [
        VmFlags::OVERFLOW,
        VmFlags::CARRY,
        VmFlags::ZERO,
        VmFlags::SIGN,
        VmFlags::UNSIGNED,
        VmFlags::BEHAV1,
        VmFlags::BEHAV2,
        VmFlags::BEHAV3,
    ];
}

/// Constants of one VM instance
///
/// Protected VMs shuffle their constants per build, so these can't be hardcoded: the flag bit
/// positions and the exception region tags are recovered alongside the control-flow graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmConstants {
    /// Bit position of each flag in [`VmFlags::EACH`] order
    flag_bits: [u8; 8],

    /// Handler kind of each exception region tag
    handler_tags: HashMap<u8, HandlerKind>,
}

impl VmConstants {
    /// Constants where every flag is stored at its [`VmFlags`] bit and region tags `0..=3` are
    /// catch, filter, fault and finally
    pub fn new() -> VmConstants {
        let mut flag_bits = [0; 8];
        for (bit, slot) in flag_bits.iter_mut().enumerate() {
            *slot = bit as u8;
        }
        let handler_tags = [
            (0, HandlerKind::Catch),
            (1, HandlerKind::Filter),
            (2, HandlerKind::Fault),
            (3, HandlerKind::Finally),
        ]
        .into_iter()
        .collect();

        VmConstants {
            flag_bits,
            handler_tags,
        }
    }

    /// Set the bit position for every flag in `flags`
    ///
    /// Only the low three bits of `bit` are used.
    pub fn set_flag_bit(&mut self, flags: VmFlags, bit: u8) {
        for (idx, flag) in VmFlags::EACH.iter().enumerate() {
            if flags.contains(*flag) {
                self.flag_bits[idx] = bit & 0x7;
            }
        }
    }

    /// Bit position of a single flag
    pub fn flag_bit(&self, flag: VmFlags) -> Option<u8> {
        VmFlags::EACH
            .iter()
            .position(|each| *each == flag)
            .map(|idx| self.flag_bits[idx])
    }

    /// Concrete mask of a set of flags
    pub fn flag_mask(&self, flags: VmFlags) -> u8 {
        VmFlags::EACH
            .iter()
            .zip(self.flag_bits.iter())
            .filter(|(flag, _)| flags.contains(**flag))
            .fold(0u8, |mask, (_, bit)| mask | (1u8 << *bit))
    }

    /// Map an exception region tag to a handler kind
    ///
    /// A tag can only map to one kind, but several tags may map to the same kind.
    pub fn set_handler_tag(&mut self, tag: u8, kind: HandlerKind) {
        self.handler_tags.insert(tag, kind);
    }

    pub fn handler_kind(&self, tag: u8) -> Option<HandlerKind> {
        self.handler_tags.get(&tag).copied()
    }
}

impl Default for VmConstants {
    fn default() -> VmConstants {
        VmConstants::new()
    }
}
