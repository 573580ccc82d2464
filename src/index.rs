use std::fmt::Debug;
use std::hash::Hash;

/// Sentinel used by the adjacency and point representative tables for
/// "no neighbor" and "no vertex".
pub const UNUSED32: u32 = u32::MAX;

/// An unsigned integer type usable as a triangle index.
///
/// `UNUSED` (the maximum value of the type) marks a removed index, so a mesh
/// indexed with `I` may hold at most `I::UNUSED - 1` vertices.
pub trait MeshIndex: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const UNUSED: Self;

    fn to_u32(self) -> u32;

    /// Narrows `value` to this type, returning `None` when it doesn't fit.
    fn from_u32(value: u32) -> Option<Self>;

    #[inline]
    fn is_unused(self) -> bool {
        self == Self::UNUSED
    }

    #[inline]
    fn to_usize(self) -> usize {
        self.to_u32() as usize
    }

    /// Largest vertex count addressable with this index width.
    #[inline]
    fn max_vertex_count() -> usize {
        Self::UNUSED.to_usize()
    }
}

impl MeshIndex for u16 {
    const UNUSED: Self = u16::MAX;

    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline]
    fn from_u32(value: u32) -> Option<Self> {
        u16::try_from(value).ok()
    }
}

impl MeshIndex for u32 {
    const UNUSED: Self = u32::MAX;

    #[inline]
    fn to_u32(self) -> u32 {
        self
    }

    #[inline]
    fn from_u32(value: u32) -> Option<Self> {
        Some(value)
    }
}

/// Returns the three indices of `face`.
#[inline]
pub(crate) fn triangle<I: MeshIndex>(indices: &[I], face: usize) -> [I; 3] {
    [indices[face * 3], indices[face * 3 + 1], indices[face * 3 + 2]]
}

/// A triangle is degenerate when two of its corners share an index.
#[inline]
pub(crate) fn is_degenerate<T: PartialEq>(tri: &[T; 3]) -> bool {
    tri[0] == tri[1] || tri[0] == tri[2] || tri[1] == tri[2]
}

#[inline]
pub(crate) fn has_unused<I: MeshIndex>(tri: &[I; 3]) -> bool {
    tri.iter().any(|i| i.is_unused())
}

/// Counts the triangles that reference at least one removed (`UNUSED`) index.
pub(crate) fn removed_face_count<I: MeshIndex>(indices: &[I]) -> usize {
    (0..indices.len() / 3)
        .filter(|&face| has_unused(&triangle(indices, face)))
        .count()
}
