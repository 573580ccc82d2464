//! Triangle adjacency from point representatives.
//!
//! The adjacency table holds three entries per face: entry `e` of face `f` is
//! the face across the edge from corner `e` to corner `(e + 1) % 3`, or
//! [`UNUSED32`] for a boundary edge.

use crate::index::{has_unused, is_degenerate, triangle};
use crate::packing::decode_positions;
use crate::utilities::{filled, validate_mesh};
use crate::weld::generate_point_reps;
use crate::{DecodePosition, Error, MeshIndex, Result, UNUSED32};
use glam::Vec3;

/// One directed edge `v1 -> v2` of `face`; `other` is the remaining corner.
/// Vertex ids are point representatives.
struct HalfEdge {
    v1: u32,
    v2: u32,
    other: u32,
    face: u32,
    next: u32,
}

/// Half-edges bucketed by their start vertex. Each bucket is a singly linked
/// list, newest entry first, so lookups see the most recently inserted edge
/// before older ones.
struct HalfEdgeTable {
    heads: Vec<u32>,
    edges: Vec<HalfEdge>,
}

impl HalfEdgeTable {
    fn new(vertex_count: usize, capacity: usize) -> Result<Self> {
        let heads = filled((vertex_count / 3).max(1), UNUSED32)?;
        let mut edges = Vec::new();
        edges.try_reserve_exact(capacity)?;
        Ok(Self { heads, edges })
    }

    #[inline]
    fn bucket(&self, v1: u32) -> usize {
        v1 as usize % self.heads.len()
    }

    fn insert(&mut self, v1: u32, v2: u32, other: u32, face: u32) {
        let bucket = self.bucket(v1);
        self.edges.push(HalfEdge {
            v1,
            v2,
            other,
            face,
            next: self.heads[bucket],
        });
        self.heads[bucket] = (self.edges.len() - 1) as u32;
    }

    /// Unlinks `edge`, whose predecessor in its bucket is `prev`.
    fn unlink(&mut self, bucket: usize, prev: u32, edge: u32) {
        let next = self.edges[edge as usize].next;
        if prev == UNUSED32 {
            self.heads[bucket] = next;
        } else {
            self.edges[prev as usize].next = next;
        }
    }

    /// Finds the half-edge `v1 -> v2` best matching a face with normal
    /// `normal`. The first match in bucket order wins unless a later one has a
    /// strictly closer normal. Returns `(prev, edge)`.
    fn find_best(&self, v1: u32, v2: u32, positions: &[Vec3], normal: Vec3) -> Option<(u32, u32)> {
        let mut prev = UNUSED32;
        let mut current = self.heads[self.bucket(v1)];
        let mut found: Option<(u32, u32)> = None;
        let mut best_dot: Option<f32> = None;

        while current != UNUSED32 {
            let edge = &self.edges[current as usize];
            if edge.v1 == v1 && edge.v2 == v2 {
                match found {
                    None => found = Some((prev, current)),
                    Some((_, first)) => {
                        let best = *best_dot
                            .get_or_insert_with(|| self.edge_normal(first, positions).dot(normal));
                        let dot = self.edge_normal(current, positions).dot(normal);
                        if dot > best {
                            found = Some((prev, current));
                            best_dot = Some(dot);
                        }
                    }
                }
            }
            prev = current;
            current = edge.next;
        }
        found
    }

    fn edge_normal(&self, edge: u32, positions: &[Vec3]) -> Vec3 {
        let edge = &self.edges[edge as usize];
        face_normal(
            positions[edge.v1 as usize],
            positions[edge.v2 as usize],
            positions[edge.other as usize],
        )
    }

    /// Removes the half-edge `v1 -> v2` belonging to `face`, if still present.
    fn remove_face_edge(&mut self, v1: u32, v2: u32, face: u32) {
        let bucket = self.bucket(v1);
        let mut prev = UNUSED32;
        let mut current = self.heads[bucket];
        while current != UNUSED32 {
            let edge = &self.edges[current as usize];
            if edge.face == face && edge.v1 == v1 && edge.v2 == v2 {
                self.unlink(bucket, prev, current);
                return;
            }
            prev = current;
            current = edge.next;
        }
    }
}

/// Unit normal of the triangle `(a, b, c)`; zero for a degenerate triangle.
#[inline]
pub(crate) fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

fn welded_triangle<I: MeshIndex>(indices: &[I], point_reps: &[u32], face: usize) -> Option<[u32; 3]> {
    let tri = triangle(indices, face);
    if has_unused(&tri) {
        return None;
    }
    let welded = tri.map(|index| point_reps[index.to_usize()]);
    if is_degenerate(&welded) {
        None
    } else {
        Some(welded)
    }
}

/// Builds the adjacency table for a mesh from a point representative table.
///
/// Degenerate triangles (after welding) and triangles with removed indices get
/// no neighbors and are never a neighbor. When more than two faces share an
/// edge, each face is matched with the candidate whose normal agrees best with
/// its own; the losers stay unmatched on that edge. Two faces sharing more than
/// one edge are linked through the first shared edge only.
pub fn convert_point_reps_to_adjacency<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
    point_reps: &[u32],
) -> Result<Vec<u32>> {
    let face_count = validate_mesh(indices, vertices)?;
    if point_reps.len() != vertices.len() {
        return Err(Error::invalid_argument_dynamic(format!(
            "point representative count ({}) must match vertex count ({})",
            point_reps.len(),
            vertices.len()
        )));
    }
    if let Some((vertex, rep)) = point_reps
        .iter()
        .enumerate()
        .find(|&(_, &rep)| rep as usize >= vertices.len())
    {
        return Err(Error::out_of_range(format!(
            "point representative {} of vertex {} is past the end ({} vertices)",
            rep,
            vertex,
            vertices.len()
        )));
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

    let positions = decode_positions(vertices)?;
    let mut table = HalfEdgeTable::new(positions.len(), face_count * 3)?;

    for face in 0..face_count {
        let Some(welded) = welded_triangle(indices, point_reps, face) else {
            continue;
        };
        for point in 0..3 {
            table.insert(
                welded[point],
                welded[(point + 1) % 3],
                welded[(point + 2) % 3],
                face as u32,
            );
        }
    }

    let mut adjacency = filled(face_count * 3, UNUSED32)?;
    let mut linked_pairs = 0usize;

    for face in 0..face_count {
        let Some(welded) = welded_triangle(indices, point_reps, face) else {
            continue;
        };
        for point in 0..3 {
            if adjacency[face * 3 + point] != UNUSED32 {
                continue;
            }

            // Look for the reverse of this face's edge: next -> current.
            let va = welded[(point + 1) % 3];
            let vb = welded[point];
            let normal = face_normal(
                positions[vb as usize],
                positions[va as usize],
                positions[welded[(point + 2) % 3] as usize],
            );
            let Some((prev, found)) = table.find_best(va, vb, &positions, normal) else {
                continue;
            };

            let neighbor = table.edges[found as usize].face;
            table.unlink(table.bucket(va), prev, found);
            table.remove_face_edge(vb, va, face as u32);

            if adjacency[face * 3..face * 3 + point].contains(&neighbor) {
                continue;
            }
            adjacency[face * 3 + point] = neighbor;
            linked_pairs += 1;

            // Point the neighbor's matching edge back at this face.
            let neighbor = neighbor as usize;
            let back = triangle(indices, neighbor)
                .map(|index| point_reps[index.to_usize()]);
            if let Some(edge) = (0..3).find(|&e| back[e] == va) {
                if back[(edge + 1) % 3] == vb {
                    adjacency[neighbor * 3 + edge] = face as u32;
                }
            }
        }
    }

    log::trace!(
        "linked {} neighbor pairs across {} faces",
        linked_pairs,
        face_count
    );
    Ok(adjacency)
}

/// Welds the mesh and builds its adjacency in one pass, returning
/// `(point_reps, adjacency)`.
pub fn generate_adjacency_and_point_reps<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
    epsilon: f32,
) -> Result<(Vec<u32>, Vec<u32>)> {
    let point_reps = generate_point_reps(indices, vertices, epsilon)?;
    let adjacency = convert_point_reps_to_adjacency(indices, vertices, &point_reps)?;
    Ok((point_reps, adjacency))
}
