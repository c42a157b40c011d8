//! Capability flags that relax individual validation rules.
//!
//! Capabilities are an explicit, immutable value threaded through every
//! validation call. There is no ambient or global capability state.

/// Bitflags of validation capabilities.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct Capabilities(u32);

impl Capabilities {
    /// The default, strictest rule set.
    pub const NONE: Self = Self(0);
    /// Permit reference types in the module.
    pub const ALLOW_REF_TYPES: Self = Self(1);
    /// Permit 8-bit integer scalars.
    pub const ALLOW_8BIT_INTEGERS: Self = Self(1 << 1);
    /// Permit 64-bit integer scalars.
    pub const ALLOW_64BIT_INTEGERS: Self = Self(1 << 2);
    /// Permit pointers as struct members.
    pub const ALLOW_POINTERS_IN_STRUCTURES: Self = Self(1 << 3);
    /// Permit `let` declarations in the module root block.
    pub const ALLOW_MODULE_SCOPE_LETS: Self = Self(1 << 4);
    /// Permit `override` declarations.
    pub const ALLOW_OVERRIDES: Self = Self(1 << 5);
    /// Permit two resource variables sharing a binding point.
    pub const ALLOW_DUPLICATE_BINDINGS: Self = Self(1 << 6);
    /// Permit `phony` instructions.
    pub const ALLOW_PHONY_INSTRUCTIONS: Self = Self(1 << 7);
    /// Permit handle-space variables without a binding point.
    pub const ALLOW_HANDLE_VARS_WITHOUT_BINDINGS: Self = Self(1 << 8);
    /// Permit `clip_distances` to be a bare f32 instead of an array.
    pub const ALLOW_CLIP_DISTANCES_ON_F32: Self = Self(1 << 9);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bit representation.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a capability set from raw bits; unknown bits are dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0x3FF)
    }

    /// Parses one capability by its command-line name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ref-types" => Self::ALLOW_REF_TYPES,
            "8bit-integers" => Self::ALLOW_8BIT_INTEGERS,
            "64bit-integers" => Self::ALLOW_64BIT_INTEGERS,
            "pointers-in-structures" => Self::ALLOW_POINTERS_IN_STRUCTURES,
            "module-scope-lets" => Self::ALLOW_MODULE_SCOPE_LETS,
            "overrides" => Self::ALLOW_OVERRIDES,
            "duplicate-bindings" => Self::ALLOW_DUPLICATE_BINDINGS,
            "phony-instructions" => Self::ALLOW_PHONY_INSTRUCTIONS,
            "handle-vars-without-bindings" => Self::ALLOW_HANDLE_VARS_WITHOUT_BINDINGS,
            "clip-distances-on-f32" => Self::ALLOW_CLIP_DISTANCES_ON_F32,
            _ => return None,
        })
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_flags() {
        let caps = Capabilities::ALLOW_REF_TYPES | Capabilities::ALLOW_OVERRIDES;
        assert!(caps.contains(Capabilities::ALLOW_REF_TYPES));
        assert!(caps.contains(Capabilities::ALLOW_OVERRIDES));
        assert!(!caps.contains(Capabilities::ALLOW_PHONY_INSTRUCTIONS));
        assert!(Capabilities::NONE.is_empty());
    }

    #[test]
    fn bits_round_trip() {
        let caps = Capabilities::ALLOW_8BIT_INTEGERS | Capabilities::ALLOW_DUPLICATE_BINDINGS;
        assert_eq!(Capabilities::from_bits(caps.bits()), caps);
        // Unknown bits are dropped.
        assert_eq!(Capabilities::from_bits(u32::MAX).bits(), 0x3FF);
    }

    #[test]
    fn names() {
        assert_eq!(
            Capabilities::from_name("overrides"),
            Some(Capabilities::ALLOW_OVERRIDES)
        );
        assert_eq!(Capabilities::from_name("no-such-capability"), None);
    }
}
