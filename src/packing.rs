use float_cmp::ApproxEqUlps;
use glam::Vec3;

pub trait DecodePosition {
    fn decode_position(&self) -> [f32; 3];
}

impl DecodePosition for [f32; 3] {
    fn decode_position(&self) -> [f32; 3] {
        *self
    }
}

impl DecodePosition for Vec3 {
    fn decode_position(&self) -> [f32; 3] {
        self.to_array()
    }
}

#[derive(Default, Debug, Copy, Clone, PartialOrd)]
#[repr(C)]
/// A basic Vertex type that can be used with the welding and meshlet functions.
/// You don't _need_ to use this type, you can use your own type by implementing
/// the `DecodePosition` trait, or read positions out of an interleaved buffer
/// with a [`VertexDataAdapter`](crate::VertexDataAdapter).
pub struct Vertex {
    pub p: [f32; 3],
    pub n: [f32; 3],
    pub t: [f32; 2],
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Vertex) -> bool {
        self.p[0].approx_eq_ulps(&other.p[0], 2)
            && self.p[1].approx_eq_ulps(&other.p[1], 2)
            && self.p[2].approx_eq_ulps(&other.p[2], 2)
            && self.n[0].approx_eq_ulps(&other.n[0], 2)
            && self.n[1].approx_eq_ulps(&other.n[1], 2)
            && self.n[2].approx_eq_ulps(&other.n[2], 2)
            && self.t[0].approx_eq_ulps(&other.t[0], 2)
            && self.t[1].approx_eq_ulps(&other.t[1], 2)
    }
}

impl Eq for Vertex {}

impl DecodePosition for Vertex {
    fn decode_position(&self) -> [f32; 3] {
        self.p
    }
}

/// Decodes every position into the vector type used by the kernels.
pub(crate) fn decode_positions<T: DecodePosition>(vertices: &[T]) -> crate::Result<Vec<Vec3>> {
    let mut positions: Vec<Vec3> = Vec::new();
    positions.try_reserve_exact(vertices.len())?;
    positions.extend(
        vertices
            .iter()
            .map(|vertex| Vec3::from(vertex.decode_position())),
    );
    Ok(positions)
}
