use crate::{DecodePosition, Error, MeshIndex, Result};
use std::io::{Cursor, Read};

#[inline(always)]
pub fn typed_to_bytes<T: Sized>(typed: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(typed.as_ptr().cast(), std::mem::size_of_val(typed)) }
}

/// Narrows a 32-bit index buffer to 16 bits. `UNUSED` entries stay `UNUSED`.
pub fn convert_indices_32_to_16(indices: &[u32]) -> Result<Vec<u16>> {
    let mut result: Vec<u16> = Vec::with_capacity(indices.len());
    for &index in indices {
        if index.is_unused() {
            result.push(u16::UNUSED);
            continue;
        }
        match u16::from_u32(index) {
            Some(narrow) if !narrow.is_unused() => result.push(narrow),
            _ => {
                return Err(Error::out_of_range(format!(
                    "index value ({}) must be < {} when converting to 16-bit",
                    index,
                    u16::UNUSED
                )))
            }
        }
    }
    Ok(result)
}

/// Widens a 16-bit index buffer to 32 bits. `UNUSED` entries stay `UNUSED`.
pub fn convert_indices_16_to_32(indices: &[u16]) -> Vec<u32> {
    indices
        .iter()
        .map(|&index| {
            if index.is_unused() {
                u32::UNUSED
            } else {
                index.to_u32()
            }
        })
        .collect()
}

/// Quantize a float in [-1..1] range into an N-bit fixed point snorm value.
///
/// Assumes reconstruction function (q / (2^(N-1)-1)), which is the case for
/// fixed-function normalized fixed point conversion (except early OpenGL versions).
///
/// Maximum reconstruction error: 1/2^N.
#[inline(always)]
pub fn quantize_snorm(v: f32, n: u32) -> i32 {
    let scale = ((1 << (n - 1)) - 1) as f32;
    let round = if v >= 0f32 { 0.5f32 } else { -0.5f32 };
    let v = v.clamp(-1f32, 1f32);
    (v * scale + round) as i32
}

/// Allocates a scratch table of `len` copies of `value`, reporting allocation
/// failure instead of aborting.
pub(crate) fn filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut table: Vec<T> = Vec::new();
    table.try_reserve_exact(len)?;
    table.resize(len, value);
    Ok(table)
}

/// Number of whole triangles in an index buffer.
pub(crate) fn face_count<I>(indices: &[I]) -> Result<usize> {
    if indices.len() % 3 != 0 {
        return Err(Error::invalid_argument_dynamic(format!(
            "index count ({}) must be a multiple of 3",
            indices.len()
        )));
    }
    let faces = indices.len() / 3;
    if faces >= u32::MAX as usize {
        return Err(Error::invalid_argument("face count exceeds the 32-bit adjacency range"));
    }
    Ok(faces)
}

/// Reads float3 positions out of an interleaved vertex buffer.
pub struct VertexDataAdapter<'a> {
    pub reader: Cursor<&'a [u8]>,
    pub vertex_count: usize,
    pub vertex_stride: usize,
    pub position_offset: usize,
}

impl<'a> VertexDataAdapter<'a> {
    pub fn new(
        data: &'a [u8],
        vertex_stride: usize,
        position_offset: usize,
    ) -> Result<VertexDataAdapter<'a>> {
        if vertex_stride == 0 {
            return Err(Error::invalid_argument("vertex_stride must be non-zero"));
        }
        let vertex_count = data.len() / vertex_stride;
        if data.len() % vertex_stride != 0 {
            Err(Error::invalid_argument_dynamic(format!(
                "vertex data length ({}) must be evenly divisible by vertex_stride ({})",
                data.len(),
                vertex_stride
            )))
        } else if position_offset + 12 > vertex_stride {
            Err(Error::invalid_argument_dynamic(format!(
                "position at offset ({}) must fit inside vertex_stride ({})",
                position_offset, vertex_stride
            )))
        } else {
            Ok(VertexDataAdapter {
                reader: Cursor::new(data),
                vertex_count,
                vertex_stride,
                position_offset,
            })
        }
    }

    pub fn xyz_f32_at(&mut self, vertex: usize) -> Result<[f32; 3]> {
        if vertex >= self.vertex_count {
            Err(Error::out_of_range(format!(
                "vertex index ({}) must be less than total vertex count ({})",
                vertex, self.vertex_count
            )))
        } else {
            let reader_pos = self.reader.position();
            let vertex_offset = vertex * self.vertex_stride;
            self.reader
                .set_position((vertex_offset + self.position_offset) as u64);
            let mut scratch = [0u8; 12];
            self.reader.read_exact(&mut scratch)?;
            self.reader.set_position(reader_pos);
            let component =
                |i: usize| f32::from_ne_bytes([scratch[i], scratch[i + 1], scratch[i + 2], scratch[i + 3]]);
            Ok([component(0), component(4), component(8)])
        }
    }

    /// Decodes the position of every vertex in the buffer.
    pub fn positions(&mut self) -> Result<Vec<[f32; 3]>> {
        let mut positions = Vec::new();
        positions.try_reserve_exact(self.vertex_count)?;
        for vertex in 0..self.vertex_count {
            positions.push(self.xyz_f32_at(vertex)?);
        }
        Ok(positions)
    }
}

impl<'a> Read for VertexDataAdapter<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, std::io::Error> {
        self.reader.read(buf)
    }
}

/// Entry-point checks shared by every kernel: non-empty buffers and a vertex
/// count that the index type can address without hitting `UNUSED`.
pub(crate) fn validate_mesh<I: MeshIndex, T: DecodePosition>(
    indices: &[I],
    vertices: &[T],
) -> Result<usize> {
    let faces = face_count(indices)?;
    if faces == 0 || vertices.is_empty() {
        return Err(Error::invalid_argument("mesh must have at least one face and one vertex"));
    }
    if vertices.len() >= I::max_vertex_count() {
        return Err(Error::invalid_argument_dynamic(format!(
            "vertex count ({}) is not representable by the index type (max {})",
            vertices.len(),
            I::max_vertex_count() - 1
        )));
    }
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn face_count_past_u32_is_rejected() {
        // Zero-sized elements: the buffer has the length but no storage.
        let mut indices: Vec<()> = Vec::new();
        unsafe { indices.set_len(u32::MAX as usize * 3) };
        assert!(matches!(
            face_count(&indices),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(face_count(&[(); 9]).unwrap(), 3);
    }
}
