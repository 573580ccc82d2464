//! Point representatives: welding coincident vertices for topology queries.
//!
//! A point representative table maps every vertex to the id of a vertex that
//! is considered geometrically identical to it (itself when unique). The index
//! buffer is never renumbered; the table is only a lookup for adjacency.

use crate::index::triangle;
use crate::packing::decode_positions;
use crate::utilities::{filled, validate_mesh};
use crate::{DecodePosition, Error, MeshIndex, Result, UNUSED32};
use glam::Vec3;

/// For every vertex, the corners that reference it, as singly linked lists
/// threaded through a per-corner `next` table.
pub(crate) struct VertexCorners {
    first: Vec<u32>,
    next: Vec<u32>,
}

impl VertexCorners {
    pub(crate) fn new<I: MeshIndex>(indices: &[I], vertex_count: usize) -> Result<Self> {
        let mut first = filled(vertex_count, UNUSED32)?;
        let mut next = filled(indices.len(), UNUSED32)?;
        for (corner, &index) in indices.iter().enumerate() {
            if index.is_unused() {
                continue;
            }
            let vertex = index.to_usize();
            if vertex >= vertex_count {
                return Err(Error::out_of_range(format!(
                    "index {} at corner {} references a vertex past the end ({} vertices)",
                    vertex, corner, vertex_count
                )));
            }
            next[corner] = first[vertex];
            first[vertex] = corner as u32;
        }
        Ok(Self { first, next })
    }

    /// Returns true if some face incident to `vertex` also uses `other`.
    pub(crate) fn shares_face<I: MeshIndex>(&self, indices: &[I], vertex: u32, other: u32) -> bool {
        let mut corner = self.first[vertex as usize];
        while corner != UNUSED32 {
            let face = corner as usize / 3;
            if triangle(indices, face)
                .iter()
                .any(|&index| !index.is_unused() && index.to_u32() == other)
            {
                return true;
            }
            corner = self.next[corner as usize];
        }
        false
    }
}

struct WeldEntry {
    bits: [u32; 3],
    vertex: u32,
    next: u32,
}

#[inline]
fn position_bits(p: Vec3) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Generates the point representative table for a mesh.
///
/// With `epsilon == 0` only vertices whose positions are bit-for-bit equal are
/// welded. With `epsilon > 0` vertices closer than `epsilon` are welded. In both
/// modes two vertices that already share a face are never welded, which would
/// collapse an edge of that face.
///
/// The relation is not closed transitively: with a positive epsilon a vertex
/// may be welded to a representative that is itself close to, but not welded
/// with, a third vertex.
pub fn generate_point_reps<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
    epsilon: f32,
) -> Result<Vec<u32>> {
    validate_mesh(indices, vertices)?;
    if !epsilon.is_finite() || epsilon < 0f32 {
        return Err(Error::invalid_argument_dynamic(format!(
            "weld epsilon ({}) must be finite and non-negative",
            epsilon
        )));
    }
    let positions = decode_positions(vertices)?;
    let corners = VertexCorners::new(indices, positions.len())?;

    let point_reps = if epsilon == 0f32 {
        weld_exact(indices, &positions, &corners)?
    } else {
        weld_epsilon(indices, &positions, &corners, epsilon)?
    };

    let welded = point_reps
        .iter()
        .enumerate()
        .filter(|&(vertex, &rep)| rep as usize != vertex)
        .count();
    log::trace!(
        "welded {} of {} vertices (epsilon {})",
        welded,
        positions.len(),
        epsilon
    );
    Ok(point_reps)
}

fn weld_exact<I: MeshIndex>(
    indices: &[I],
    positions: &[Vec3],
    corners: &VertexCorners,
) -> Result<Vec<u32>> {
    let hash_size = (positions.len() / 3).max(1);
    let mut heads = filled(hash_size, UNUSED32)?;
    let mut entries: Vec<WeldEntry> = Vec::new();
    entries.try_reserve_exact(positions.len())?;
    let mut point_reps = filled(positions.len(), UNUSED32)?;

    for (vertex, &position) in positions.iter().enumerate() {
        let bits = position_bits(position);
        let key = bits
            .iter()
            .fold(0u32, |sum, &b| sum.wrapping_add(b)) as usize
            % hash_size;

        let mut found = UNUSED32;
        let mut current = heads[key];
        while current != UNUSED32 {
            let entry = &entries[current as usize];
            if entry.bits == bits && !corners.shares_face(indices, vertex as u32, entry.vertex) {
                found = entry.vertex;
                break;
            }
            current = entry.next;
        }

        if found != UNUSED32 {
            point_reps[vertex] = found;
        } else {
            entries.push(WeldEntry {
                bits,
                vertex: vertex as u32,
                next: heads[key],
            });
            heads[key] = (entries.len() - 1) as u32;
            point_reps[vertex] = vertex as u32;
        }
    }

    Ok(point_reps)
}

fn weld_epsilon<I: MeshIndex>(
    indices: &[I],
    positions: &[Vec3],
    corners: &VertexCorners,
    epsilon: f32,
) -> Result<Vec<u32>> {
    let mut order: Vec<u32> = Vec::new();
    order.try_reserve_exact(positions.len())?;
    order.extend(0..positions.len() as u32);
    order.sort_by(|&a, &b| {
        positions[a as usize]
            .x
            .total_cmp(&positions[b as usize].x)
    });

    let mut point_reps = filled(positions.len(), UNUSED32)?;
    let epsilon_sq = epsilon * epsilon;
    let mut head = 0;

    for tail in 0..order.len() {
        let tail_x = positions[order[tail] as usize].x;
        head = head.max(tail + 1);
        while head < order.len() && positions[order[head] as usize].x - tail_x <= epsilon {
            head += 1;
        }

        let tail_vertex = order[tail];
        if point_reps[tail_vertex as usize] != UNUSED32 {
            continue;
        }
        point_reps[tail_vertex as usize] = tail_vertex;
        let outer = positions[tail_vertex as usize];

        for &candidate in &order[tail + 1..head] {
            if point_reps[candidate as usize] != UNUSED32 {
                continue;
            }
            let dist_sq = positions[candidate as usize].distance_squared(outer);
            if dist_sq < epsilon_sq && !corners.shares_face(indices, tail_vertex, candidate) {
                point_reps[candidate as usize] = tail_vertex;
            }
        }
    }

    Ok(point_reps)
}
