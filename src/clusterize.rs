use crate::bounds::{compute_meshlet_bounds, Bounds};
use crate::index::removed_face_count;
use crate::partition::{partition_faces, validate_partition_input, MeshletTriangle};
use crate::packing::decode_positions;
use crate::utilities::{typed_to_bytes, validate_mesh};
use crate::{generate_adjacency_and_point_reps, DecodePosition, Error, MeshIndex, Result};

pub const MESHLET_DEFAULT_MAX_VERTS: usize = 128;
pub const MESHLET_DEFAULT_MAX_PRIMS: usize = 128;
pub const MESHLET_MINIMUM_SIZE: usize = 32;
pub const MESHLET_MAXIMUM_SIZE: usize = 256;

/// Size limits of the meshlets built by [`compute_meshlets`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshletConfig {
    /// Maximum number of unique vertices per meshlet.
    pub max_verts: usize,
    /// Maximum number of triangles per meshlet.
    pub max_prims: usize,
}

impl Default for MeshletConfig {
    fn default() -> Self {
        Self {
            max_verts: MESHLET_DEFAULT_MAX_VERTS,
            max_prims: MESHLET_DEFAULT_MAX_PRIMS,
        }
    }
}

impl MeshletConfig {
    pub fn validate(&self) -> Result<()> {
        let range = MESHLET_MINIMUM_SIZE..=MESHLET_MAXIMUM_SIZE;
        if !range.contains(&self.max_verts) || !range.contains(&self.max_prims) {
            return Err(Error::invalid_argument_dynamic(format!(
                "max_verts ({}) and max_prims ({}) must be within [{}, {}]",
                self.max_verts, self.max_prims, MESHLET_MINIMUM_SIZE, MESHLET_MAXIMUM_SIZE
            )));
        }
        Ok(())
    }
}

/// A contiguous run `first..first + count` of faces, or of meshlets in the
/// subset table returned by [`compute_meshlets`].
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subset {
    pub first: usize,
    pub count: usize,
}

impl Subset {
    #[inline]
    pub fn new(first: usize, count: usize) -> Self {
        Self { first, count }
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.first + self.count
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index < self.end()
    }
}

/// Output record of one meshlet. Vertex offsets and counts index
/// [`Meshlets::unique_vertex_indices`]; primitive offsets and counts are in
/// triangles and index [`Meshlets::primitive_triangles`] (and, times three,
/// [`Meshlets::primitive_indices`]).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Meshlet {
    pub vert_offset: u32,
    pub vert_count: u32,
    pub prim_offset: u32,
    pub prim_count: u32,
}

#[derive(Copy, Clone)]
pub struct MeshletRef<'data, I> {
    pub vertices: &'data [I],
    pub triangles: &'data [MeshletTriangle],
}

impl<'data, I: MeshIndex> MeshletRef<'data, I> {
    #[inline]
    pub fn prim_count(&self) -> usize {
        self.triangles.len()
    }

    /// The meshlet's triangles as original vertex ids.
    pub fn triangles(&self) -> impl Iterator<Item = [I; 3]> + 'data {
        let vertices = self.vertices;
        self.triangles
            .iter()
            .map(move |tri| tri.indices().map(|local| vertices[local as usize]))
    }
}

pub struct Meshlets<I> {
    pub meshlets: Vec<Meshlet>,
    /// Unique vertex ids of every meshlet, concatenated.
    pub unique_vertex_indices: Vec<I>,
    /// Local triangles of every meshlet, concatenated.
    pub primitive_triangles: Vec<MeshletTriangle>,
    /// The same triangles as original vertex ids, three per triangle.
    pub primitive_indices: Vec<I>,
    /// For each input subset, the run of meshlets built from it.
    pub subsets: Vec<Subset>,
}

impl<I: MeshIndex> Meshlets<I> {
    fn with_subsets(subset_count: usize) -> Self {
        Self {
            meshlets: Vec::new(),
            unique_vertex_indices: Vec::new(),
            primitive_triangles: Vec::new(),
            primitive_indices: Vec::new(),
            subsets: Vec::with_capacity(subset_count),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshlets.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshlets.is_empty()
    }

    fn meshlet_ref(&self, meshlet: &Meshlet) -> MeshletRef<'_, I> {
        MeshletRef {
            vertices: &self.unique_vertex_indices[meshlet.vert_offset as usize
                ..meshlet.vert_offset as usize + meshlet.vert_count as usize],
            triangles: &self.primitive_triangles[meshlet.prim_offset as usize
                ..meshlet.prim_offset as usize + meshlet.prim_count as usize],
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> MeshletRef<'_, I> {
        self.meshlet_ref(&self.meshlets[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = MeshletRef<'_, I>> {
        self.meshlets
            .iter()
            .map(|meshlet| self.meshlet_ref(meshlet))
    }

    /// Meshlet records as raw bytes, for upload.
    pub fn meshlet_bytes(&self) -> &[u8] {
        typed_to_bytes(&self.meshlets)
    }

    /// Local triangles packed into one `u32` each.
    pub fn packed_primitives(&self) -> Vec<u32> {
        self.primitive_triangles
            .iter()
            .map(MeshletTriangle::pack)
            .collect()
    }

    /// Culling bounds for every meshlet.
    pub fn compute_bounds<T: DecodePosition>(&self, vertices: &[T]) -> Result<Vec<Bounds>> {
        self.iter()
            .map(|meshlet| compute_meshlet_bounds(meshlet, vertices))
            .collect()
    }

    fn offset(len: usize) -> Result<u32> {
        u32::try_from(len)
            .map_err(|_| Error::invalid_argument("meshlet output exceeds 32-bit offsets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn offsets_past_u32_are_rejected() {
        assert_eq!(Meshlets::<u32>::offset(7).unwrap(), 7);
        assert!(matches!(
            Meshlets::<u32>::offset(u32::MAX as usize + 1),
            Err(Error::InvalidArgument(_))
        ));
    }
}

/// Splits each subset of the mesh into meshlets and flattens the results into
/// one set of output buffers.
///
/// When `adjacency` is `None` it is generated from exactly coincident vertices.
/// Returned subset `i` is the run of meshlets built from `subsets[i]`.
///
/// Note: `max_verts` and `max_prims` must be within [32, 256].
pub fn compute_meshlets<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
    subsets: &[Subset],
    adjacency: Option<&[u32]>,
    config: &MeshletConfig,
) -> Result<Meshlets<I>> {
    config.validate()?;
    let face_count = validate_mesh(indices, vertices)?;
    if subsets.is_empty() {
        return Err(Error::invalid_argument("at least one subset is required"));
    }
    if let Some((corner, index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, index)| !index.is_unused() && index.to_usize() >= vertices.len())
    {
        return Err(Error::out_of_range(format!(
            "index {:?} at corner {} references a vertex past the end ({} vertices)",
            index,
            corner,
            vertices.len()
        )));
    }

    let generated;
    let adjacency: &[u32] = match adjacency {
        Some(adjacency) => adjacency,
        None => {
            let (_, adjacency) = generate_adjacency_and_point_reps(indices, vertices, 0f32)?;
            generated = adjacency;
            &generated
        }
    };
    for subset in subsets {
        validate_partition_input(face_count, subset, adjacency)?;
    }

    log::debug!(
        "building meshlets for {} faces ({} removed), {} vertices, {} subsets, limits {}/{}",
        face_count,
        removed_face_count(indices),
        vertices.len(),
        subsets.len(),
        config.max_verts,
        config.max_prims
    );

    let positions = decode_positions(vertices)?;
    let mut output = Meshlets::with_subsets(subsets.len());

    for subset in subsets {
        let built = partition_faces(indices, &positions, *subset, adjacency, config)?;
        output.subsets.push(Subset::new(output.meshlets.len(), built.len()));

        for meshlet in built {
            output.meshlets.push(Meshlet {
                vert_offset: Meshlets::<I>::offset(output.unique_vertex_indices.len())?,
                vert_count: meshlet.unique_vertex_indices.len() as u32,
                prim_offset: Meshlets::<I>::offset(output.primitive_triangles.len())?,
                prim_count: meshlet.primitive_indices.len() as u32,
            });
            for tri in &meshlet.primitive_indices {
                output.primitive_indices.extend(
                    tri.indices()
                        .map(|local| meshlet.unique_vertex_indices[local as usize]),
                );
            }
            output
                .unique_vertex_indices
                .extend_from_slice(&meshlet.unique_vertex_indices);
            output
                .primitive_triangles
                .extend_from_slice(&meshlet.primitive_indices);
        }
    }

    log::debug!(
        "built {} meshlets, {} unique vertex indices, {} primitives",
        output.meshlets.len(),
        output.unique_vertex_indices.len(),
        output.primitive_triangles.len()
    );
    Ok(output)
}
