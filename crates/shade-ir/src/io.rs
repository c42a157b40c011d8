//! Address spaces, access modes, and shader-IO attributes.

/// Bitflags for memory access modes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Access(u32);

impl Access {
    /// No access.
    pub const EMPTY: Self = Self(0);
    /// Read access.
    pub const LOAD: Self = Self(1);
    /// Write access.
    pub const STORE: Self = Self(2);
    /// Read and write access.
    pub const LOAD_STORE: Self = Self(3);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bit representation, for the wire format.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuilds an access mask from its wire representation.
    ///
    /// Bits outside the known flags are dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::LOAD_STORE.0)
    }
}

impl std::ops::BitOr for Access {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Access {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Memory address space for variables and memory views.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum AddressSpace {
    /// Function-local storage.
    Function,
    /// Module-scope private storage.
    Private,
    /// Workgroup shared storage.
    Workgroup,
    /// Uniform buffer (read-only).
    Uniform,
    /// Storage buffer.
    Storage,
    /// Opaque handles: textures and samplers.
    Handle,
}

impl AddressSpace {
    /// Returns `true` for address spaces that bind external resources and
    /// therefore carry a binding point.
    pub fn is_resource(self) -> bool {
        matches!(self, Self::Uniform | Self::Storage | Self::Handle)
    }
}

/// `@group(N) @binding(N)` resource binding point.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BindingPoint {
    pub group: u32,
    pub binding: u32,
}

/// Built-in shader inputs/outputs.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BuiltinValue {
    /// `@builtin(position)` — vec4<f32>, vertex output / fragment input
    Position,
    /// `@builtin(front_facing)` — bool, fragment input
    FrontFacing,
    /// `@builtin(vertex_index)` — u32, vertex input
    VertexIndex,
    /// `@builtin(instance_index)` — u32, vertex input
    InstanceIndex,
    /// `@builtin(frag_depth)` — f32, fragment output
    FragDepth,
    /// `@builtin(sample_index)` — u32, fragment input
    SampleIndex,
    /// `@builtin(sample_mask)` — u32, fragment input or output
    SampleMask,
    /// `@builtin(clip_distances)` — array<f32, N>, vertex output
    ClipDistances,
    /// `@builtin(global_invocation_id)` — vec3<u32>, compute input
    GlobalInvocationId,
    /// `@builtin(local_invocation_id)` — vec3<u32>, compute input
    LocalInvocationId,
    /// `@builtin(local_invocation_index)` — u32, compute input
    LocalInvocationIndex,
    /// `@builtin(workgroup_id)` — vec3<u32>, compute input
    WorkgroupId,
    /// `@builtin(num_workgroups)` — vec3<u32>, compute input
    NumWorkgroups,
    /// `@builtin(subgroup_invocation_id)` — u32, fragment/compute input
    SubgroupInvocationId,
    /// `@builtin(subgroup_size)` — u32, fragment/compute input
    SubgroupSize,
}

/// Interpolation method for user-defined fragment inputs.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum InterpolationType {
    Perspective,
    Linear,
    Flat,
}

/// Sampling policy refining an interpolation method.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum InterpolationSampling {
    Center,
    Centroid,
    Sample,
    First,
    Either,
}

/// Interpolation attribute: method plus optional sampling policy.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Interpolation {
    pub ty: InterpolationType,
    pub sampling: Option<InterpolationSampling>,
}

/// Shader-IO attributes attached to a function parameter, a function return,
/// or a struct member.
///
/// The validator enforces that exactly one IO annotation (binding point,
/// location, or builtin) applies to any leaf IO value of an entry point.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct IoAttributes {
    /// `@group(N) @binding(N)` resource binding.
    pub binding_point: Option<BindingPoint>,
    /// `@location(N)` user-defined IO slot.
    pub location: Option<u32>,
    /// `@color(N)` framebuffer-fetch input slot.
    pub color: Option<u32>,
    /// `@builtin(...)` semantic role.
    pub builtin: Option<BuiltinValue>,
    /// `@interpolate(...)` method for location IO.
    pub interpolation: Option<Interpolation>,
    /// `@invariant` flag (position only).
    pub invariant: bool,
    /// `@input_attachment_index(N)` for input-attachment handles.
    pub input_attachment_index: Option<u32>,
}

impl IoAttributes {
    /// Returns `true` if no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Counts the IO annotations that claim this value for the pipeline
    /// interface: binding point, location, and builtin.
    pub fn annotation_count(&self) -> usize {
        usize::from(self.binding_point.is_some())
            + usize::from(self.location.is_some())
            + usize::from(self.builtin.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_flags() {
        let load = Access::LOAD;
        let store = Access::STORE;
        let both = load | store;
        assert!(both.contains(load));
        assert!(both.contains(store));
        assert!(!load.contains(store));
        assert_eq!(both, Access::LOAD_STORE);
        assert!(Access::EMPTY.is_empty());
    }

    #[test]
    fn access_bits_round_trip() {
        for access in [Access::EMPTY, Access::LOAD, Access::STORE, Access::LOAD_STORE] {
            assert_eq!(Access::from_bits(access.bits()), access);
        }
        // Unknown bits are dropped.
        assert_eq!(Access::from_bits(0xFF), Access::LOAD_STORE);
    }

    #[test]
    fn resource_address_spaces() {
        assert!(AddressSpace::Storage.is_resource());
        assert!(AddressSpace::Uniform.is_resource());
        assert!(AddressSpace::Handle.is_resource());
        assert!(!AddressSpace::Function.is_resource());
        assert!(!AddressSpace::Private.is_resource());
        assert!(!AddressSpace::Workgroup.is_resource());
    }

    #[test]
    fn annotation_count() {
        let mut attrs = IoAttributes::default();
        assert!(attrs.is_empty());
        assert_eq!(attrs.annotation_count(), 0);

        attrs.builtin = Some(BuiltinValue::Position);
        assert_eq!(attrs.annotation_count(), 1);

        attrs.location = Some(0);
        assert_eq!(attrs.annotation_count(), 2);
    }
}
