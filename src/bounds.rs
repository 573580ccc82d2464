use crate::adjacency::face_normal;
use crate::clusterize::MeshletRef;
use crate::packing::decode_positions;
use crate::utilities::quantize_snorm;
use crate::{DecodePosition, Error, MeshIndex, Result};
use float_cmp::approx_eq;
use glam::Vec3;

/// Normal cones whose spread reaches past this dot product are too wide to be
/// useful for backface culling.
const CONE_DEGENERATE_DOT: f32 = 0.1;

#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Approximate bounding sphere of a point set.
    ///
    /// Starts from the pair of axis extremes with the widest span and grows
    /// the sphere to take in every point outside it. The result always encloses
    /// all points but is not the minimal sphere.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(&first) = points.first() else {
            return Self::default();
        };

        let mut min_axis = [first; 3];
        let mut max_axis = [first; 3];
        for &p in &points[1..] {
            for axis in 0..3 {
                if p[axis] < min_axis[axis][axis] {
                    min_axis[axis] = p;
                }
                if p[axis] > max_axis[axis][axis] {
                    max_axis[axis] = p;
                }
            }
        }

        let mut span_axis = 0;
        let mut span_sq = 0f32;
        for axis in 0..3 {
            let d = max_axis[axis].distance_squared(min_axis[axis]);
            if d > span_sq {
                span_sq = d;
                span_axis = axis;
            }
        }

        let p1 = min_axis[span_axis];
        let p2 = max_axis[span_axis];
        let mut center = (p1 + p2) * 0.5;
        let mut radius = p2.distance(p1) * 0.5;

        for &p in points {
            let dist_sq = p.distance_squared(center);
            if dist_sq > radius * radius {
                let dist = dist_sq.sqrt();
                let k = (radius / dist) * 0.5 + 0.5;
                center = center * k + p * (1f32 - k);
                radius = (radius + dist) * 0.5;
            }
        }

        Self { center, radius }
    }

    /// True if `point` lies inside the sphere, allowing for float rounding on
    /// the surface.
    pub fn contains(&self, point: Vec3) -> bool {
        let dist = point.distance(self.center);
        dist <= self.radius || approx_eq!(f32, dist, self.radius, epsilon = 1e-4, ulps = 8)
    }
}

/// Culling data for one meshlet.
///
/// For backface culling with orthographic projection, reject the meshlet when
///   `dot(view, cone_axis) >= cone_cutoff`
///
/// For perspective projection, use the apex:
///   `dot(normalize(cone_apex - camera_position), cone_axis) >= cone_cutoff`
///
/// A cone with a zero axis and a cutoff of 1 never culls.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
#[repr(C)]
pub struct Bounds {
    pub center: [f32; 3],
    pub radius: f32,
    pub cone_apex: [f32; 3],
    pub cone_axis: [f32; 3],
    pub cone_cutoff: f32,
    pub cone_axis_s8: [i8; 3],
    pub cone_cutoff_s8: i8,
}

pub(crate) fn bounds_from_triangles(triangles: &[[Vec3; 3]]) -> Bounds {
    let mut points = Vec::with_capacity(triangles.len() * 3);
    let mut normals = Vec::with_capacity(triangles.len());
    let mut corners = Vec::with_capacity(triangles.len());
    for tri in triangles {
        points.extend_from_slice(tri);
        let normal = face_normal(tri[0], tri[1], tri[2]);
        if normal != Vec3::ZERO {
            normals.push(normal);
            corners.push(tri[0]);
        }
    }

    let sphere = BoundingSphere::from_points(&points);
    let mut bounds = Bounds {
        center: sphere.center.to_array(),
        radius: sphere.radius,
        cone_apex: sphere.center.to_array(),
        cone_cutoff: 1f32,
        cone_cutoff_s8: 127,
        ..Default::default()
    };
    if normals.is_empty() {
        return bounds;
    }

    let axis = BoundingSphere::from_points(&normals).center.normalize_or_zero();
    let min_dot = normals
        .iter()
        .map(|n| n.dot(axis))
        .fold(1f32, f32::min);
    if axis == Vec3::ZERO || min_dot <= CONE_DEGENERATE_DOT {
        return bounds;
    }

    // Slide the apex back along the axis until it sits behind every triangle
    // plane.
    let mut max_t = 0f32;
    for (normal, corner) in normals.iter().zip(&corners) {
        let dc = (sphere.center - *corner).dot(*normal);
        let dn = axis.dot(*normal);
        max_t = max_t.max(dc / dn);
    }

    // The cone of normals widened by 90 degrees on every side and inverted:
    // -cos(a + 90) = sin(a).
    let cutoff = (1f32 - min_dot * min_dot).max(0f32).sqrt();

    bounds.cone_apex = (sphere.center - axis * max_t).to_array();
    bounds.cone_axis = axis.to_array();
    bounds.cone_cutoff = cutoff;
    bounds.cone_axis_s8 = axis.to_array().map(|c| quantize_snorm(c, 8) as i8);
    // Bias the quantized cutoff up so the quantized cone stays conservative.
    bounds.cone_cutoff_s8 = ((cutoff * 127f32 + 1f32) as i32).min(127) as i8;
    bounds
}

/// Creates bounding volumes that can be used for frustum, backface and
/// occlusion culling of one meshlet.
pub fn compute_meshlet_bounds<I: MeshIndex, T: DecodePosition>(
    meshlet: MeshletRef<'_, I>,
    vertices: &[T],
) -> Result<Bounds> {
    let positions = decode_positions(vertices)?;
    let mut triangles = Vec::with_capacity(meshlet.prim_count());
    for tri in meshlet.triangles() {
        let mut corners = [Vec3::ZERO; 3];
        for (corner, index) in corners.iter_mut().zip(tri) {
            *corner = *positions.get(index.to_usize()).ok_or_else(|| {
                Error::out_of_range(format!(
                    "meshlet vertex {:?} is past the end ({} vertices)",
                    index,
                    positions.len()
                ))
            })?;
        }
        triangles.push(corners);
    }
    Ok(bounds_from_triangles(&triangles))
}
