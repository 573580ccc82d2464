//! Greedy meshlet partitioning of one face subset.
//!
//! Meshlets are grown one at a time from a seed face. Faces adjacent to the
//! faces already in the meshlet become candidates, and after every addition
//! the candidates are rescored by vertex reuse, distance from the meshlet's
//! bounding sphere and agreement with its normal cone.

use crate::adjacency::face_normal;
use crate::bounds::BoundingSphere;
use crate::clusterize::{MeshletConfig, Subset};
use crate::index::{has_unused, is_degenerate, triangle};
use crate::packing::decode_positions;
use crate::utilities::{filled, validate_mesh};
use crate::{DecodePosition, Error, MeshIndex, Result, UNUSED32};
use glam::Vec3;
use std::collections::HashSet;

const WEIGHT_REUSE: f32 = 0.334;
const WEIGHT_LOCATION: f32 = 0.333;
const WEIGHT_ORIENTATION: f32 = 0.333;

/// Largest value a local triangle index may hold: three of them pack into the
/// 10-bit fields of one `u32`.
pub const MESHLET_TRIANGLE_INDEX_LIMIT: u32 = 1 << 10;

/// A triangle of a meshlet, as three indices into the meshlet's unique vertex
/// list.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshletTriangle {
    indices: [u16; 3],
}

impl MeshletTriangle {
    pub fn new(i0: u32, i1: u32, i2: u32) -> Result<Self> {
        let mut indices = [0u16; 3];
        for (slot, index) in indices.iter_mut().zip([i0, i1, i2]) {
            if index >= MESHLET_TRIANGLE_INDEX_LIMIT {
                return Err(Error::out_of_range(format!(
                    "local triangle index ({}) must be < {}",
                    index, MESHLET_TRIANGLE_INDEX_LIMIT
                )));
            }
            *slot = index as u16;
        }
        Ok(Self { indices })
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        self.indices.map(u32::from)
    }

    /// Packs the triangle as `i0 | i1 << 10 | i2 << 20`, the layout mesh
    /// shaders read.
    #[inline]
    pub fn pack(&self) -> u32 {
        let [i0, i1, i2] = self.indices();
        i0 | (i1 << 10) | (i2 << 20)
    }

    #[inline]
    pub fn unpack(packed: u32) -> Self {
        let mask = MESHLET_TRIANGLE_INDEX_LIMIT - 1;
        Self {
            indices: [packed & mask, (packed >> 10) & mask, (packed >> 20) & mask]
                .map(|index| index as u16),
        }
    }
}

/// A meshlet under construction: the unique original vertex ids it references
/// and its triangles expressed as indices into that list.
#[derive(Debug, Clone)]
pub struct InlineMeshlet<I> {
    pub unique_vertex_indices: Vec<I>,
    pub primitive_indices: Vec<MeshletTriangle>,
}

impl<I: MeshIndex> InlineMeshlet<I> {
    fn new(config: &MeshletConfig) -> Result<Self> {
        let mut unique_vertex_indices = Vec::new();
        unique_vertex_indices.try_reserve_exact(config.max_verts)?;
        let mut primitive_indices = Vec::new();
        primitive_indices.try_reserve_exact(config.max_prims)?;
        Ok(Self {
            unique_vertex_indices,
            primitive_indices,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitive_indices.is_empty()
    }

    fn is_full(&self, config: &MeshletConfig) -> bool {
        self.unique_vertex_indices.len() >= config.max_verts
            || self.primitive_indices.len() >= config.max_prims
    }

    /// Number of the triangle's vertices already in the meshlet.
    fn reuse(&self, tri: &[I; 3]) -> usize {
        tri.iter()
            .filter(|index| self.unique_vertex_indices.contains(index))
            .count()
    }

    /// Adds `tri` if both the vertex and primitive budgets allow it.
    fn try_add(&mut self, tri: [I; 3], config: &MeshletConfig) -> Result<bool> {
        if self.is_full(config) {
            return Ok(false);
        }

        let mut local = [UNUSED32; 3];
        for (slot, index) in local.iter_mut().zip(&tri) {
            if let Some(position) = self.unique_vertex_indices.iter().position(|v| v == index) {
                *slot = position as u32;
            }
        }
        let new_count = local.iter().filter(|&&slot| slot == UNUSED32).count();
        if self.unique_vertex_indices.len() + new_count > config.max_verts {
            return Ok(false);
        }

        for (slot, index) in local.iter_mut().zip(tri) {
            if *slot == UNUSED32 {
                *slot = self.unique_vertex_indices.len() as u32;
                self.unique_vertex_indices.push(index);
            }
        }
        self.primitive_indices
            .push(MeshletTriangle::new(local[0], local[1], local[2])?);
        Ok(true)
    }
}

/// Bounding sphere of the meshlet's positions and axis of its normal cone,
/// rebuilt from every triangle added so far.
struct MeshletShape {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    sphere: BoundingSphere,
    normal_axis: Vec3,
}

impl MeshletShape {
    fn new(config: &MeshletConfig) -> Result<Self> {
        let mut positions = Vec::new();
        positions.try_reserve_exact(config.max_prims * 3)?;
        let mut normals = Vec::new();
        normals.try_reserve_exact(config.max_prims)?;
        Ok(Self {
            positions,
            normals,
            sphere: BoundingSphere::default(),
            normal_axis: Vec3::ZERO,
        })
    }

    fn add(&mut self, corners: [Vec3; 3]) {
        self.positions.extend_from_slice(&corners);
        self.normals
            .push(face_normal(corners[0], corners[1], corners[2]));
        self.sphere = BoundingSphere::from_points(&self.positions);
        self.normal_axis = BoundingSphere::from_points(&self.normals)
            .center
            .normalize_or_zero();
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.sphere = BoundingSphere::default();
        self.normal_axis = Vec3::ZERO;
    }
}

/// Scores a candidate triangle against the meshlet being built. Lower is
/// better.
fn score<I: MeshIndex>(
    meshlet: &InlineMeshlet<I>,
    shape: &MeshletShape,
    tri: &[I; 3],
    corners: &[Vec3; 3],
) -> f32 {
    let reuse = meshlet.reuse(tri);
    let reuse_score = 1f32 - reuse as f32 / 3f32;

    let max_sq = corners
        .iter()
        .map(|c| c.distance_squared(shape.sphere.center))
        .fold(0f32, f32::max);
    let r_sq = shape.sphere.radius * shape.sphere.radius;
    let location_score = (max_sq / (r_sq + f32::EPSILON) + f32::EPSILON)
        .log2()
        .max(0f32);

    let normal = face_normal(corners[0], corners[1], corners[2]);
    let orientation_score = (1f32 - normal.dot(shape.normal_axis)) * 0.5;

    WEIGHT_REUSE * reuse_score
        + WEIGHT_LOCATION * location_score
        + WEIGHT_ORIENTATION * orientation_score
}

/// Checks the subset and adjacency table against the mesh.
pub(crate) fn validate_partition_input(
    face_count: usize,
    subset: &Subset,
    adjacency: &[u32],
) -> Result<()> {
    match subset.first.checked_add(subset.count) {
        Some(end) if end <= face_count => {}
        _ => {
            return Err(Error::out_of_range(format!(
                "subset of {} faces at {} exceeds face count ({})",
                subset.count, subset.first, face_count
            )))
        }
    }
    if adjacency.len() != face_count * 3 {
        return Err(Error::invalid_argument_dynamic(format!(
            "adjacency length ({}) must be 3 * face count ({})",
            adjacency.len(),
            face_count
        )));
    }
    if let Some((slot, &face)) = adjacency
        .iter()
        .enumerate()
        .find(|&(_, &face)| face != UNUSED32 && face as usize >= face_count)
    {
        return Err(Error::out_of_range(format!(
            "adjacency entry {} references face {} past the end ({} faces)",
            slot, face, face_count
        )));
    }
    Ok(())
}

/// Splits the faces of `subset` into meshlets of at most `config.max_verts`
/// unique vertices and `config.max_prims` triangles.
///
/// Degenerate triangles and triangles with removed indices are skipped and
/// appear in no meshlet.
pub fn partition<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
    subset: Subset,
    adjacency: &[u32],
    config: &MeshletConfig,
) -> Result<Vec<InlineMeshlet<I>>> {
    config.validate()?;
    let face_count = validate_mesh(indices, vertices)?;
    validate_partition_input(face_count, &subset, adjacency)?;
    if let Some((corner, index)) = indices[subset.first * 3..subset.end() * 3]
        .iter()
        .enumerate()
        .find(|&(_, index)| !index.is_unused() && index.to_usize() >= vertices.len())
    {
        return Err(Error::out_of_range(format!(
            "index {:?} at corner {} references a vertex past the end ({} vertices)",
            index,
            subset.first * 3 + corner,
            vertices.len()
        )));
    }
    let positions = decode_positions(vertices)?;
    partition_faces(indices, &positions, subset, adjacency, config)
}

/// Partitioning of pre-validated input.
pub(crate) fn partition_faces<I: MeshIndex>(
    indices: &[I],
    positions: &[Vec3],
    subset: Subset,
    adjacency: &[u32],
    config: &MeshletConfig,
) -> Result<Vec<InlineMeshlet<I>>> {
    let mut output = Vec::new();
    if subset.count == 0 {
        return Ok(output);
    }

    let corners_of = |tri: &[I; 3]| tri.map(|index| positions[index.to_usize()]);
    let in_subset = |face: u32| subset.contains(face as usize);

    let mut processed = filled(subset.count, false)?;
    let mut candidates: Vec<(u32, f32)> = Vec::new();
    let mut candidate_check: HashSet<u32> = HashSet::new();
    let mut current = InlineMeshlet::new(config)?;
    let mut shape = MeshletShape::new(config)?;
    let mut next_seed = subset.first;

    candidates.push((next_seed as u32, 0f32));
    candidate_check.insert(next_seed as u32);

    while let Some((face, _)) = candidates.pop() {
        let local = face as usize - subset.first;
        let tri = triangle(indices, face as usize);

        if is_degenerate(&tri) || has_unused(&tri) {
            processed[local] = true;
        } else if !processed[local] {
            if current.try_add(tri, config)? {
                processed[local] = true;
                shape.add(corners_of(&tri));

                for &neighbor in &adjacency[face as usize * 3..face as usize * 3 + 3] {
                    if neighbor == UNUSED32
                        || !in_subset(neighbor)
                        || processed[neighbor as usize - subset.first]
                        || candidate_check.contains(&neighbor)
                    {
                        continue;
                    }
                    candidates.push((neighbor, f32::MAX));
                    candidate_check.insert(neighbor);
                }

                for candidate in candidates.iter_mut() {
                    let tri = triangle(indices, candidate.0 as usize);
                    candidate.1 = if has_unused(&tri) {
                        f32::MAX
                    } else {
                        score(&current, &shape, &tri, &corners_of(&tri))
                    };
                }

                if current.is_full(config) {
                    output.push(std::mem::replace(&mut current, InlineMeshlet::new(config)?));
                    shape.clear();
                    candidate_check.clear();

                    // One leftover candidate seeds the next meshlet.
                    if let Some(survivor) = candidates.pop() {
                        candidates.clear();
                        candidate_check.insert(survivor.0);
                        candidates.push(survivor);
                    }
                } else {
                    // Best (lowest) score last, so it is popped next.
                    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
                }
            }
        }

        if candidates.is_empty() {
            if !current.is_empty() {
                output.push(std::mem::replace(&mut current, InlineMeshlet::new(config)?));
            }
            shape.clear();
            candidate_check.clear();

            while next_seed < subset.end() && processed[next_seed - subset.first] {
                next_seed += 1;
            }
            if next_seed == subset.end() {
                break;
            }
            candidates.push((next_seed as u32, 0f32));
            candidate_check.insert(next_seed as u32);
        }
    }

    if !current.is_empty() {
        output.push(current);
    }

    log::trace!(
        "partitioned faces {}..{} into {} meshlets",
        subset.first,
        subset.end(),
        output.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_packs_into_ten_bit_fields() {
        let tri = MeshletTriangle::new(1, 255, 1023).unwrap();
        assert_eq!(tri.pack(), 1 | (255 << 10) | (1023 << 20));
        assert_eq!(MeshletTriangle::unpack(tri.pack()), tri);
    }

    #[test]
    fn triangle_rejects_wide_indices() {
        assert!(matches!(
            MeshletTriangle::new(0, 1, 1024),
            Err(Error::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn add_respects_vertex_budget() {
        let config = MeshletConfig {
            max_verts: 32,
            max_prims: 256,
        };
        let mut meshlet = InlineMeshlet::<u32>::new(&config).unwrap();
        // A fan around vertex 0 adds one new vertex per triangle after the first.
        let mut added = 0;
        for i in 1..64u32 {
            if meshlet.try_add([0, i, i + 1], &config).unwrap() {
                added += 1;
            }
        }
        assert_eq!(meshlet.unique_vertex_indices.len(), 32);
        assert_eq!(added, 30);
        assert_eq!(meshlet.reuse(&[0, 1, 999]), 2);
    }

    #[test]
    fn shared_vertices_score_better() {
        let config = MeshletConfig::default();
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 9.0),
            Vec3::new(1.0, 0.0, 9.0),
            Vec3::new(0.0, 1.0, 9.0),
        ];
        let mut meshlet = InlineMeshlet::<u32>::new(&config).unwrap();
        let mut shape = MeshletShape::new(&config).unwrap();
        assert!(meshlet.try_add([0, 1, 2], &config).unwrap());
        shape.add([positions[0], positions[1], positions[2]]);

        let near = [2u32, 1, 3];
        let far = [4u32, 5, 6];
        let corners = |tri: &[u32; 3]| tri.map(|i| positions[i as usize]);
        let near_score = score(&meshlet, &shape, &near, &corners(&near));
        let far_score = score(&meshlet, &shape, &far, &corners(&far));
        assert!(near_score < far_score);
    }
}
