mod common;

use common::{create_plane, create_shuffled_terrain, create_tetrahedron};
use meshletize::*;

const U: u32 = UNUSED32;

#[test]
fn closed_tetrahedron_is_fully_connected() {
    let mesh = create_tetrahedron();
    let (point_reps, adjacency) =
        generate_adjacency_and_point_reps(&mesh.indices, &mesh.positions, 0.0).unwrap();
    assert_eq!(point_reps, vec![0, 1, 2, 3]);
    assert_eq!(adjacency, vec![2, 3, 1, 0, 3, 2, 1, 3, 0, 0, 2, 1]);
    assert!(!adjacency.contains(&U));
}

#[test]
fn quad_shares_one_edge() {
    let positions = vec![
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ];
    let indices: Vec<u32> = vec![0, 1, 2, 2, 1, 3];
    let (_, adjacency) = generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(adjacency, vec![U, 1, U, 0, U, U]);
}

#[test]
fn welded_seam_is_connected() {
    let positions = vec![
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    let indices: Vec<u32> = vec![0, 1, 2, 3, 4, 5];

    // Without welding the seam is open.
    let identity: Vec<u32> = (0..6).collect();
    let open = convert_point_reps_to_adjacency(&indices, &positions, &identity).unwrap();
    assert_eq!(open, vec![U; 6]);

    let (point_reps, adjacency) =
        generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(point_reps, vec![0, 1, 2, 1, 4, 2]);
    assert_eq!(adjacency, vec![U, 1, U, U, U, 0]);
}

#[test]
fn degenerate_triangles_have_no_neighbors() {
    let positions = vec![
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [2.0, 2.0, 0.0],
        [3.0, 1.0, 0.0],
    ];
    let indices: Vec<u32> = vec![0, 1, 2, 2, 1, 3, 2, 2, 5];
    let (_, adjacency) = generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(adjacency, vec![U, 1, U, 0, U, U, U, U, U]);
}

#[test]
fn non_manifold_edge_prefers_matching_orientation() {
    // Three faces share the edge 0-1. Face 1 is coplanar with face 0, face 2
    // stands upright.
    let positions = vec![
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.5, 1.0, 0.0],
        [0.5, -1.0, 0.0],
        [0.5, 0.0, 1.0],
    ];
    let indices: Vec<u32> = vec![0, 1, 2, 1, 0, 3, 1, 0, 4];
    let (_, adjacency) = generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(adjacency, vec![1, U, U, 0, U, U, U, U, U]);

    // Face order doesn't change which pair is matched.
    let indices: Vec<u32> = vec![0, 1, 2, 1, 0, 4, 1, 0, 3];
    let (_, adjacency) = generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(adjacency, vec![2, U, U, U, U, U, 0, U, U]);
}

#[test]
fn double_sided_pair_links_once() {
    // Both faces share all three edges; only the first one links them.
    let positions = vec![[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let indices: Vec<u32> = vec![0, 1, 2, 1, 0, 2];
    let (_, adjacency) = generate_adjacency_and_point_reps(&indices, &positions, 0.0).unwrap();
    assert_eq!(adjacency, vec![1, U, U, 0, U, U]);
}

#[test]
fn adjacency_is_symmetric_on_manifold_meshes() {
    for seed in 0..4 {
        let mesh = create_shuffled_terrain(12, seed);
        let (_, adjacency) =
            generate_adjacency_and_point_reps(&mesh.indices, &mesh.positions, 0.0).unwrap();
        for face in 0..mesh.face_count() {
            for edge in 0..3 {
                let neighbor = adjacency[face * 3 + edge];
                if neighbor == U {
                    continue;
                }
                let back = &adjacency[neighbor as usize * 3..neighbor as usize * 3 + 3];
                assert!(
                    back.contains(&(face as u32)),
                    "face {} -> {} is not returned",
                    face,
                    neighbor
                );
            }
        }
        let issues = validate(
            &mesh.indices,
            mesh.positions.len(),
            Some(&adjacency),
            ValidateFlags::AsymmetricAdjacency | ValidateFlags::Backfacing,
        )
        .unwrap();
        assert!(issues.is_empty(), "{:?}", issues);
    }
}

#[test]
fn interior_edges_of_a_plane_are_linked() {
    let size = 10usize;
    let mesh = create_plane(size as u32);
    let (_, adjacency) =
        generate_adjacency_and_point_reps(&mesh.indices, &mesh.positions, 0.0).unwrap();
    let boundary = adjacency.iter().filter(|&&neighbor| neighbor == U).count();
    assert_eq!(boundary, 4 * size);
}

#[test]
fn regeneration_is_idempotent() {
    let mesh = create_shuffled_terrain(9, 7);
    let (reps_a, adjacency_a) =
        generate_adjacency_and_point_reps(&mesh.indices, &mesh.positions, 0.0).unwrap();
    let (reps_b, adjacency_b) =
        generate_adjacency_and_point_reps(&mesh.indices, &mesh.positions, 0.0).unwrap();
    assert_eq!(reps_a, reps_b);
    assert_eq!(adjacency_a, adjacency_b);

    let again = convert_point_reps_to_adjacency(&mesh.indices, &mesh.positions, &reps_a).unwrap();
    assert_eq!(again, adjacency_a);
}

#[test]
fn bad_point_reps_are_rejected() {
    let mesh = create_tetrahedron();
    assert!(matches!(
        convert_point_reps_to_adjacency(&mesh.indices, &mesh.positions, &[0, 1, 2]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        convert_point_reps_to_adjacency(&mesh.indices, &mesh.positions, &[0, 1, 2, 9]),
        Err(Error::IndexOutOfRange(_))
    ));
}
