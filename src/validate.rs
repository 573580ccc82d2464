use crate::index::{has_unused, is_degenerate, triangle};
use crate::utilities::face_count;
use crate::{Error, MeshIndex, Result, UNUSED32};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ValidateFlags : u32 {
        /// Only checks that indices and adjacency entries are in range.
        const None = 0;
        /// Reports neighbors that walk a shared edge in the same direction,
        /// meaning one of the two faces is flipped. Needs adjacency.
        const Backfacing = 1;
        /// Reports triangles with a repeated index.
        const Degenerate = 2;
        /// Reports triangles with some, but not all, indices removed.
        const Unused = 4;
        /// Reports neighbor links that are not returned by the neighbor.
        /// Needs adjacency.
        const AsymmetricAdjacency = 8;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MeshIssue {
    Degenerate { face: u32 },
    PartiallyUnused { face: u32 },
    Backfacing { face: u32, neighbor: u32 },
    AsymmetricAdjacency { face: u32, neighbor: u32 },
}

/// Checks an index buffer, and optionally its adjacency, for problems.
///
/// Indices past `vertex_count` and adjacency entries past the face count are
/// errors. Conditions selected by `flags` are reported as issues; an empty
/// result means the mesh passed every requested check.
pub fn validate<I: MeshIndex>(
    indices: &[I],
    vertex_count: usize,
    adjacency: Option<&[u32]>,
    flags: ValidateFlags,
) -> Result<Vec<MeshIssue>> {
    let faces = face_count(indices)?;
    if faces == 0 || vertex_count == 0 {
        return Err(Error::invalid_argument("mesh must have at least one face and one vertex"));
    }
    if vertex_count >= I::max_vertex_count() {
        return Err(Error::invalid_argument_dynamic(format!(
            "vertex count ({}) is not representable by the index type",
            vertex_count
        )));
    }
    if (flags.contains(ValidateFlags::Backfacing)
        || flags.contains(ValidateFlags::AsymmetricAdjacency))
        && adjacency.is_none()
    {
        return Err(Error::invalid_argument("adjacency is required for backfacing and asymmetry checks"));
    }

    for (corner, index) in indices.iter().enumerate() {
        if !index.is_unused() && index.to_usize() >= vertex_count {
            return Err(Error::out_of_range(format!(
                "index {:?} at corner {} references a vertex past the end ({} vertices)",
                index, corner, vertex_count
            )));
        }
    }
    if let Some(adjacency) = adjacency {
        if adjacency.len() != faces * 3 {
            return Err(Error::invalid_argument_dynamic(format!(
                "adjacency length ({}) must be 3 * face count ({})",
                adjacency.len(),
                faces
            )));
        }
        for (slot, &neighbor) in adjacency.iter().enumerate() {
            if neighbor != UNUSED32 && neighbor as usize >= faces {
                return Err(Error::out_of_range(format!(
                    "adjacency entry {} references face {} past the end ({} faces)",
                    slot, neighbor, faces
                )));
            }
        }
    }

    let mut issues = Vec::new();
    for face in 0..faces {
        let tri = triangle(indices, face);
        let face32 = face as u32;

        if has_unused(&tri) {
            if flags.contains(ValidateFlags::Unused) && !tri.iter().all(|i| i.is_unused()) {
                issues.push(MeshIssue::PartiallyUnused { face: face32 });
            }
            continue;
        }
        if is_degenerate(&tri) {
            if flags.contains(ValidateFlags::Degenerate) {
                issues.push(MeshIssue::Degenerate { face: face32 });
            }
            continue;
        }

        let Some(adjacency) = adjacency else {
            continue;
        };
        for edge in 0..3 {
            let neighbor = adjacency[face * 3 + edge];
            if neighbor == UNUSED32 {
                continue;
            }
            let back = &adjacency[neighbor as usize * 3..neighbor as usize * 3 + 3];
            if flags.contains(ValidateFlags::AsymmetricAdjacency) && !back.contains(&face32) {
                issues.push(MeshIssue::AsymmetricAdjacency {
                    face: face32,
                    neighbor,
                });
            }
            if flags.contains(ValidateFlags::Backfacing) {
                let (a, b) = (tri[edge], tri[(edge + 1) % 3]);
                let other = triangle(indices, neighbor as usize);
                let same_direction =
                    (0..3).any(|e| other[e] == a && other[(e + 1) % 3] == b);
                if same_direction {
                    issues.push(MeshIssue::Backfacing {
                        face: face32,
                        neighbor,
                    });
                }
            }
        }
    }

    if !issues.is_empty() {
        log::debug!("validation found {} issues in {} faces", issues.len(), faces);
    }
    Ok(issues)
}
