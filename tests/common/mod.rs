#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> Vec<[u32; 3]> {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect()
    }
}

/// A `size` x `size` quad grid in the z = 0 plane, two counter-clockwise
/// triangles per quad.
pub fn create_plane(size: u32) -> Mesh {
    let mut mesh = Mesh {
        positions: Vec::with_capacity((size as usize + 1) * (size as usize + 1)),
        indices: Vec::with_capacity(size as usize * size as usize * 6),
    };

    for y in 0..(size + 1) {
        for x in 0..(size + 1) {
            mesh.positions.push([x as f32, y as f32, 0f32]);
        }
    }

    for y in 0..size {
        for x in 0..size {
            mesh.indices.push(y * (size + 1) + x);
            mesh.indices.push(y * (size + 1) + (x + 1));
            mesh.indices.push((y + 1) * (size + 1) + x);

            mesh.indices.push((y + 1) * (size + 1) + x);
            mesh.indices.push(y * (size + 1) + (x + 1));
            mesh.indices.push((y + 1) * (size + 1) + (x + 1));
        }
    }

    mesh
}

/// Closed tetrahedron with outward facing triangles.
pub fn create_tetrahedron() -> Mesh {
    Mesh {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ],
        indices: vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
    }
}

/// A plane with jittered heights whose triangles are shuffled, so that
/// neighboring faces are far apart in the index buffer.
pub fn create_shuffled_terrain(size: u32, seed: u64) -> Mesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = create_plane(size);
    for p in &mut mesh.positions {
        p[2] = rng.gen_range(-0.25f32..0.25f32);
    }
    let mut triangles = mesh.triangles();
    triangles.shuffle(&mut rng);
    mesh.indices = triangles.into_iter().flatten().collect();
    mesh
}

pub fn sorted(mut triangles: Vec<[u32; 3]>) -> Vec<[u32; 3]> {
    triangles.sort_unstable();
    triangles
}
