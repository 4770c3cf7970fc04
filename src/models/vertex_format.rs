//! Per-element vertex attribute codec.
//!
//! Every vertex element carries a format code selecting one of ~54 GPU
//! encodings; each decodes a byte range of one vertex into a 4-component
//! float vector. Missing trailing components default to `0.0` and the 4th
//! component to `1.0` unless the format itself carries a 4th value.

use glam::Vec4;
use half::f16;
use tracing::{trace, warn};
use winnow::Parser;
use winnow::binary::{u8 as w_u8, u16 as w_u16};
use winnow::error::ContextError;

use crate::data::Endianness;
use crate::models::CodecError;

/// Vertex usage semantics referenced by the mesh assembler.
pub mod usage {
    pub const POSITION: u8 = 0;
    pub const NORMAL: u8 = 1;
    pub const COLOR: u8 = 4;
    pub const TEXCOORD: u8 = 5;
    pub const BLENDWEIGHTS: u8 = 6;
    pub const BLENDINDICES: u8 = 8;
}

/// The engine's vertex format codes, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VertexFormatCode {
    Float1 = 0x00,
    Float2 = 0x01,
    Float3 = 0x02,
    Float4 = 0x03,
    UByte4nColor = 0x04,
    UByte4nColorArgb = 0x05,
    UByte4nColorRgba = 0x06,
    Undefined0 = 0x07,
    UByte2nColor5650 = 0x08,
    UByte2nColor5551 = 0x09,
    UByte2nColor4444 = 0x0A,
    Int1 = 0x0B,
    Int2 = 0x0C,
    Int4 = 0x0D,
    UInt1 = 0x0E,
    UInt2 = 0x0F,
    UInt4 = 0x10,
    Int1n = 0x11,
    Int2n = 0x12,
    Int4n = 0x13,
    UInt1n = 0x14,
    UInt2n = 0x15,
    UInt4n = 0x16,
    UByte4 = 0x17,
    UByte4X4 = 0x18,
    Byte4 = 0x19,
    UByte4n = 0x1A,
    Undefined1 = 0x1B,
    Byte4n = 0x1C,
    Short2 = 0x1D,
    Short4 = 0x1E,
    UShort2 = 0x1F,
    UShort4 = 0x20,
    Short2n = 0x21,
    Short3n = 0x22,
    Short4n = 0x23,
    UShort2n = 0x24,
    UShort3n = 0x25,
    UShort4n = 0x26,
    UDec3 = 0x27,
    Dec3n = 0x28,
    Dec3nS11_11_10 = 0x29,
    Half2 = 0x2A,
    Half4 = 0x2B,
    Unused = 0x2C,
    Byte3n = 0x2D,
    Short3 = 0x2E,
    UShort3 = 0x2F,
    UByte4Endian = 0x30,
    UByte4Color = 0x31,
    Byte3 = 0x32,
    UByte2nColor5650Rgb = 0x33,
    UDec3Oes = 0x34,
    Dec3nOes = 0x35,
    Short4nEdge = 0x36,
}

impl VertexFormatCode {
    pub fn from_u8(value: u8) -> Option<VertexFormatCode> {
        if value <= 0x36 {
            // Safety: repr(u8) with contiguous discriminants 0x00..=0x36.
            Some(unsafe { std::mem::transmute::<u8, VertexFormatCode>(value) })
        } else {
            None
        }
    }
}

/// Maximum representable magnitude per format code, usable as an optional
/// renormalization divisor in validation paths. Normalized and float formats
/// report 1.
pub fn max_magnitude(code: u8) -> f32 {
    const TABLE: [f32; 0x37] = [
        1.0,           // FLOAT1
        1.0,           // FLOAT2
        1.0,           // FLOAT3
        1.0,           // FLOAT4
        1.0,           // UBYTE4N_COLOR
        1.0,           // UBYTE4N_COLOR_ARGB
        1.0,           // UBYTE4N_COLOR_RGBA
        1.0,           // UNDEFINED_0
        1.0,           // UBYTE2N_COLOR_5650
        1.0,           // UBYTE2N_COLOR_5551
        1.0,           // UBYTE2N_COLOR_4444
        2147483647.0,  // INT1
        2147483647.0,  // INT2
        2147483647.0,  // INT4
        4294967295.0,  // UINT1
        4294967295.0,  // UINT2
        4294967295.0,  // UINT4
        1.0,           // INT1N
        1.0,           // INT2N
        1.0,           // INT4N
        1.0,           // UINT1N
        1.0,           // UINT2N
        1.0,           // UINT4N
        255.0,         // UBYTE4
        255.0,         // UBYTE4_X4
        127.0,         // BYTE4
        1.0,           // UBYTE4N
        1.0,           // UNDEFINED_1
        1.0,           // BYTE4N
        16383.0,       // SHORT2
        16383.0,       // SHORT4
        65535.0,       // USHORT2
        65535.0,       // USHORT4
        1.0,           // SHORT2N
        1.0,           // SHORT3N
        1.0,           // SHORT4N
        1.0,           // USHORT2N
        1.0,           // USHORT3N
        1.0,           // USHORT4N
        1.0,           // UDEC3
        1.0,           // DEC3N
        1.0,           // DEC3N_S11_11_10
        1.0,           // HALF2
        1.0,           // HALF4
        1.0,           // UNUSED
        1.0,           // BYTE3N
        32767.0,       // SHORT3
        65535.0,       // USHORT3
        255.0,         // UBYTE4_ENDIAN
        255.0,         // UBYTE4_COLOR
        127.0,         // BYTE3
        1.0,           // UBYTE2N_COLOR_5650_RGB
        1.0,           // UDEC3_OES
        1.0,           // DEC3N_OES
        1.0,           // SHORT4N_EDGE
    ];
    TABLE.get(code as usize).copied().unwrap_or(1.0)
}

// --- Primitive readers over one vertex's bytes ------------------------------

fn bytes_at<const N: usize>(
    vertex: &[u8],
    offset: usize,
) -> Result<[u8; N], CodecError> {
    vertex
        .get(offset..offset + N)
        .map(|b| b.try_into().unwrap())
        .ok_or(CodecError::ShortVertexData {
            offset,
            need: N,
            have: vertex.len(),
        })
}

fn u16_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<u16, CodecError> {
    let b = bytes_at::<2>(vertex, offset)?;
    Ok(match endian {
        Endianness::Little => u16::from_le_bytes(b),
        Endianness::Big => u16::from_be_bytes(b),
    })
}

fn i16_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<i16, CodecError> {
    Ok(u16_at(vertex, offset, endian)? as i16)
}

fn u32_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<u32, CodecError> {
    let b = bytes_at::<4>(vertex, offset)?;
    Ok(match endian {
        Endianness::Little => u32::from_le_bytes(b),
        Endianness::Big => u32::from_be_bytes(b),
    })
}

fn i32_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<i32, CodecError> {
    Ok(u32_at(vertex, offset, endian)? as i32)
}

fn f32_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<f32, CodecError> {
    Ok(f32::from_bits(u32_at(vertex, offset, endian)?))
}

fn half_at(vertex: &[u8], offset: usize, endian: Endianness) -> Result<f32, CodecError> {
    Ok(f16::from_bits(u16_at(vertex, offset, endian)?).to_f32())
}

fn u8_at(vertex: &[u8], offset: usize) -> Result<u8, CodecError> {
    vertex
        .get(offset)
        .copied()
        .ok_or(CodecError::ShortVertexData {
            offset,
            need: 1,
            have: vertex.len(),
        })
}

fn i8_at(vertex: &[u8], offset: usize) -> Result<i8, CodecError> {
    Ok(u8_at(vertex, offset)? as i8)
}

// --- Grouped decoders -------------------------------------------------------

fn floats<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = f32_at(vertex, offset + 4 * i, endian)?;
    }
    Ok(out)
}

fn ints<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
    divisor: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = i32_at(vertex, offset + 4 * i, endian)? as f32 / divisor;
    }
    Ok(out)
}

fn uints<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
    divisor: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = u32_at(vertex, offset + 4 * i, endian)? as f32 / divisor;
    }
    Ok(out)
}

fn shorts<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
    divisor: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = f32::from(i16_at(vertex, offset + 2 * i, endian)?) / divisor;
    }
    Ok(out)
}

fn ushorts<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
    divisor: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = f32::from(u16_at(vertex, offset + 2 * i, endian)?) / divisor;
    }
    Ok(out)
}

fn sbytes<const N: usize>(
    vertex: &[u8],
    offset: usize,
    divisor: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = f32::from(i8_at(vertex, offset + i)?) / divisor;
    }
    Ok(out)
}

fn ubytes<const N: usize>(
    vertex: &[u8],
    offset: usize,
    scale: f32,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = f32::from(u8_at(vertex, offset + i)?) * scale;
    }
    Ok(out)
}

fn halves<const N: usize>(
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
) -> Result<Vec4, CodecError> {
    let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..N {
        out[i] = half_at(vertex, offset + 2 * i, endian)?;
    }
    Ok(out)
}

/// Decode one signed bitfield of `bits` magnitude bits with a trailing sign
/// bit, normalized to [-1, 1].
fn signed_field(raw: u32, shift: u32, bits: u32) -> f32 {
    let max = (1u32 << bits) - 1;
    let magnitude = ((raw >> shift) & max) as f32 / max as f32;
    if (raw >> shift) & (max + 1) == 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Decode a single attribute at `offset` within one vertex's bytes.
pub fn unpack_value(
    code: VertexFormatCode,
    vertex: &[u8],
    offset: usize,
    endian: Endianness,
) -> Result<Vec4, CodecError> {
    use VertexFormatCode::*;
    let value = match code {
        Float1 => floats::<1>(vertex, offset, endian)?,
        Float2 => floats::<2>(vertex, offset, endian)?,
        Float3 => floats::<3>(vertex, offset, endian)?,
        Float4 => floats::<4>(vertex, offset, endian)?,

        UByte4nColor | UByte4nColorRgba | UByte4n => ubytes::<4>(vertex, offset, 1.0 / 255.0)?,
        UByte4nColorArgb => {
            let c = ubytes::<4>(vertex, offset, 1.0 / 255.0)?;
            Vec4::new(c.y, c.z, c.w, c.x)
        }
        Undefined0 | Undefined1 => {
            trace!(?code, "undefined vertex format, decoding as zero");
            Vec4::ZERO
        }
        UByte2nColor5650 | UByte2nColor5650Rgb => {
            let c = u16_at(vertex, offset, endian)?;
            Vec4::new(
                ((c >> 11) & 31) as f32 / 31.0,
                ((c >> 5) & 63) as f32 / 63.0,
                (c & 31) as f32 / 31.0,
                1.0,
            )
        }
        UByte2nColor5551 => {
            let c = u16_at(vertex, offset, endian)?;
            Vec4::new(
                (c & 31) as f32 / 31.0,
                ((c >> 5) & 31) as f32 / 31.0,
                ((c >> 10) & 31) as f32 / 31.0,
                ((c >> 15) & 1) as f32,
            )
        }
        UByte2nColor4444 => {
            let c = u16_at(vertex, offset, endian)?;
            Vec4::new(
                (c & 15) as f32 / 15.0,
                ((c >> 4) & 15) as f32 / 15.0,
                ((c >> 8) & 15) as f32 / 15.0,
                ((c >> 12) & 15) as f32 / 15.0,
            )
        }

        Int1 => ints::<1>(vertex, offset, endian, 1.0)?,
        Int2 => ints::<2>(vertex, offset, endian, 1.0)?,
        Int4 => ints::<4>(vertex, offset, endian, 1.0)?,
        UInt1 => uints::<1>(vertex, offset, endian, 1.0)?,
        UInt2 => uints::<2>(vertex, offset, endian, 1.0)?,
        UInt4 => uints::<4>(vertex, offset, endian, 1.0)?,
        Int1n => ints::<1>(vertex, offset, endian, i32::MAX as f32)?,
        Int2n => ints::<2>(vertex, offset, endian, i32::MAX as f32)?,
        Int4n => ints::<4>(vertex, offset, endian, i32::MAX as f32)?,
        UInt1n => uints::<1>(vertex, offset, endian, u32::MAX as f32)?,
        UInt2n => uints::<2>(vertex, offset, endian, u32::MAX as f32)?,
        UInt4n => uints::<4>(vertex, offset, endian, u32::MAX as f32)?,

        UByte4 | UByte4Color => ubytes::<4>(vertex, offset, 1.0)?,
        UByte4X4 => ubytes::<4>(vertex, offset, 0.25)?,
        UByte4Endian => {
            let c = ubytes::<4>(vertex, offset, 1.0)?;
            Vec4::new(c.w, c.z, c.y, c.x)
        }
        Byte4 => sbytes::<4>(vertex, offset, 1.0)?,
        Byte4n => sbytes::<4>(vertex, offset, 127.0)?,
        Byte3 => sbytes::<3>(vertex, offset, 1.0)?,
        Byte3n => sbytes::<3>(vertex, offset, 127.0)?,

        Short2 => shorts::<2>(vertex, offset, endian, 1.0)?,
        Short3 => shorts::<3>(vertex, offset, endian, 1.0)?,
        Short4 => shorts::<4>(vertex, offset, endian, 1.0)?,
        UShort2 => ushorts::<2>(vertex, offset, endian, 1.0)?,
        UShort3 => ushorts::<3>(vertex, offset, endian, 1.0)?,
        UShort4 => ushorts::<4>(vertex, offset, endian, 1.0)?,
        Short2n => shorts::<2>(vertex, offset, endian, 32767.0)?,
        Short3n => shorts::<3>(vertex, offset, endian, 32767.0)?,
        Short4n | Short4nEdge => shorts::<4>(vertex, offset, endian, 32767.0)?,
        UShort2n => ushorts::<2>(vertex, offset, endian, 65535.0)?,
        UShort3n => ushorts::<3>(vertex, offset, endian, 65535.0)?,
        UShort4n => ushorts::<4>(vertex, offset, endian, 65535.0)?,

        UDec3 => {
            let raw = u32_at(vertex, offset, endian)?;
            Vec4::new(
                (raw & 0x3FF) as f32,
                ((raw >> 10) & 0x3FF) as f32,
                ((raw >> 20) & 0x3FF) as f32,
                1.0,
            )
        }
        UDec3Oes => {
            let raw = u32_at(vertex, offset, endian)?;
            Vec4::new(
                (raw >> 22) as f32,
                ((raw >> 12) & 0x3FF) as f32,
                ((raw >> 2) & 0x3FF) as f32,
                1.0,
            )
        }
        Dec3n => {
            let raw = u32_at(vertex, offset, endian)?;
            Vec4::new(
                signed_field(raw, 0, 9),
                signed_field(raw, 10, 9),
                signed_field(raw, 20, 9),
                1.0,
            )
        }
        Dec3nOes => {
            let raw = u32_at(vertex, offset, endian)?;
            Vec4::new(
                signed_field(raw, 2, 9),
                signed_field(raw, 12, 9),
                signed_field(raw, 22, 9),
                1.0,
            )
        }
        Dec3nS11_11_10 => {
            let raw = u32_at(vertex, offset, endian)?;
            Vec4::new(
                signed_field(raw, 0, 10),
                signed_field(raw, 11, 10),
                signed_field(raw, 22, 9),
                1.0,
            )
        }

        Half2 => halves::<2>(vertex, offset, endian)?,
        Half4 => halves::<4>(vertex, offset, endian)?,

        // SHORT4 with a homogeneous divide: w is a per-vertex divisor.
        Unused => {
            let v = shorts::<4>(vertex, offset, endian, 1.0)?;
            let w = if v.w == 0.0 { 1.0 } else { v.w };
            Vec4::new(v.x / w, v.y / w, v.z / w, v.w)
        }
    };
    Ok(value)
}

/// A vertex element descriptor: one attribute of one stream, with the format
/// code driving codec dispatch.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VertexElement {
    pub format_code: u8,
    pub stream: u8,
    pub map_to_element: u8,
    pub component_count: u8,
    pub usage: u8,
    pub usage_index: u8,
    pub pack_data_offset: u8,
    pub pack_type_and_frac_hint: u8,
    pub offset: u16,
    pub frequency: u16,
}

/// On-disk size of one element descriptor.
pub const VERTEX_ELEMENT_SIZE: usize = 0x0C;

type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

fn parse_element_fields(endi: Endianness) -> impl FnMut(&mut &[u8]) -> WResult<VertexElement> {
    move |input: &mut &[u8]| {
        let format_code = w_u8.parse_next(input)?;
        let stream = w_u8.parse_next(input)?;
        let map_to_element = w_u8.parse_next(input)?;
        let component_count = w_u8.parse_next(input)?;
        let usage = w_u8.parse_next(input)?;
        let usage_index = w_u8.parse_next(input)?;
        let pack_data_offset = w_u8.parse_next(input)?;
        let pack_type_and_frac_hint = w_u8.parse_next(input)?;
        let offset = w_u16(endi.to_winnow()).parse_next(input)?;
        let frequency = w_u16(endi.to_winnow()).parse_next(input)?;
        Ok(VertexElement {
            format_code,
            stream,
            map_to_element,
            component_count,
            usage,
            usage_index,
            pack_data_offset,
            pack_type_and_frac_hint,
            offset,
            frequency,
        })
    }
}

impl VertexElement {
    /// Parse a 12-byte element descriptor.
    pub fn parse(data: &[u8], endian: Endianness) -> Result<VertexElement, CodecError> {
        parse_element_fields(endian)(&mut &data[..]).map_err(|_| CodecError::ShortVertexData {
            offset: 0,
            need: VERTEX_ELEMENT_SIZE,
            have: data.len(),
        })
    }

    /// Whether this element's values pass through a fixed-point pack scale.
    fn is_pack_scaled(&self) -> bool {
        self.pack_type_and_frac_hint & 7 == 2
    }

    /// The renormalization divisor for this element's format, for
    /// validation/debug paths that want magnitudes in [0, 1].
    pub fn normalizer(&self) -> f32 {
        max_magnitude(self.format_code)
    }

    /// Decode this element for every vertex in `buffer`.
    ///
    /// `buffer` is one stream's bytes with `stride`-sized vertices; the
    /// element's own byte offset locates it within each vertex. When the
    /// pack-type hint marks the element as scaled fixed-point, a 32-bit shift
    /// amount is read from `pack_data` and applied to x/y/z only.
    pub fn unpack(
        &self,
        buffer: &[u8],
        stride: usize,
        pack_data: Option<&[u8]>,
        endian: Endianness,
    ) -> Result<Vec<Vec4>, CodecError> {
        if stride == 0 {
            return Err(CodecError::InvalidStride);
        }
        let code = VertexFormatCode::from_u8(self.format_code)
            .ok_or(CodecError::UnsupportedVertexFormat(self.format_code))?;

        let mut scale = 1.0f32;
        if self.is_pack_scaled()
            && let Some(pack) = pack_data
        {
            let shift = u32_at(pack, self.pack_data_offset as usize, endian)?;
            if shift < 32 {
                scale = 1.0 / (1u64 << shift) as f32;
            } else {
                warn!(shift, "pack scale shift out of range, ignoring");
            }
        }

        let count = buffer.len() / stride;
        let mut attributes = Vec::with_capacity(count);
        for i in 0..count {
            let vertex = &buffer[i * stride..(i + 1) * stride];
            let v = unpack_value(code, vertex, self.offset as usize, endian)?;
            attributes.push(Vec4::new(v.x * scale, v.y * scale, v.z * scale, v.w));
        }
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(format_code: u8) -> VertexElement {
        VertexElement {
            format_code,
            component_count: 4,
            ..VertexElement::default()
        }
    }

    #[test]
    fn ubyte4n_fixture() {
        let data = [0xFF, 0x80, 0x40, 0x00];
        let v = unpack_value(VertexFormatCode::UByte4n, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v.x, 1.0);
        assert!((v.y - 0.50196).abs() < 1e-4);
        assert!((v.z - 0.25098).abs() < 1e-4);
        assert_eq!(v.w, 0.0);
    }

    #[test]
    fn short4n_fixture() {
        let mut data = Vec::new();
        for s in [0x7FFFu16, 0x0000, 0x8001, 0x7FFF] {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let v = unpack_value(VertexFormatCode::Short4n, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 0.0);
        assert!((v.z + 1.0).abs() < 1e-4);
        assert_eq!(v.w, 1.0);
    }

    #[test]
    fn color_5650_fixture() {
        // all red bits set, everything else clear
        let data = 0xF800u16.to_le_bytes();
        let v =
            unpack_value(VertexFormatCode::UByte2nColor5650, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn half2_fixture() {
        let data = [0x00, 0x3C, 0x00, 0xC0];
        let v = unpack_value(VertexFormatCode::Half2, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v, Vec4::new(1.0, -2.0, 0.0, 1.0));
    }

    #[test]
    fn float3_defaults_w_to_one() {
        let mut data = Vec::new();
        for f in [1.5f32, -2.0, 0.25] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        let v = unpack_value(VertexFormatCode::Float3, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v, Vec4::new(1.5, -2.0, 0.25, 1.0));
    }

    #[test]
    fn homogeneous_short4_divides_by_w() {
        let mut data = Vec::new();
        for s in [2i16, 4, 6, 2] {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let v = unpack_value(VertexFormatCode::Unused, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v, Vec4::new(1.0, 2.0, 3.0, 2.0));
    }

    #[test]
    fn dec3n_sign_reconstruction() {
        // x field: magnitude 511 with sign bit set => -1.0
        let raw: u32 = 0x200 | 0x1FF;
        let data = raw.to_le_bytes();
        let v = unpack_value(VertexFormatCode::Dec3n, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v.x, -1.0);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn s11_11_10_field_layout() {
        // y field starts at bit 11 with 10 magnitude bits
        let raw: u32 = 0x3FF << 11;
        let data = raw.to_le_bytes();
        let v =
            unpack_value(VertexFormatCode::Dec3nS11_11_10, &data, 0, Endianness::Little).unwrap();
        assert_eq!(v.x, 0.0);
        assert_eq!(v.y, 1.0);
    }

    #[test]
    fn big_endian_shorts() {
        let data = [0x7F, 0xFF, 0x00, 0x00];
        let v = unpack_value(VertexFormatCode::Short2n, &data, 0, Endianness::Big).unwrap();
        assert_eq!(v.x, 1.0);
    }

    #[test]
    fn element_parse_round_trip() {
        let mut data = vec![0x02, 0x01, 0x00, 0x03, 0x00, 0x00, 0x08, 0x02];
        data.extend_from_slice(&0x0010u16.to_le_bytes());
        data.extend_from_slice(&0x0001u16.to_le_bytes());
        let e = VertexElement::parse(&data, Endianness::Little).unwrap();
        assert_eq!(e.format_code, 0x02);
        assert_eq!(e.stream, 0x01);
        assert_eq!(e.component_count, 0x03);
        assert_eq!(e.pack_data_offset, 0x08);
        assert_eq!(e.pack_type_and_frac_hint, 0x02);
        assert_eq!(e.offset, 0x10);
        assert_eq!(e.frequency, 1);
    }

    #[test]
    fn unpack_applies_pack_scale_to_xyz_only() {
        // two vertices of SHORT4, pack shift of 2 => scale 1/4
        let mut buffer = Vec::new();
        for s in [4i16, 8, 12, 1, 16, 20, 24, 1] {
            buffer.extend_from_slice(&s.to_le_bytes());
        }
        let element = VertexElement {
            format_code: VertexFormatCode::Short4 as u8,
            pack_type_and_frac_hint: 2,
            pack_data_offset: 0,
            ..VertexElement::default()
        };
        let pack = 2u32.to_le_bytes();
        let out = element
            .unpack(&buffer, 8, Some(&pack), Endianness::Little)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(out[1], Vec4::new(4.0, 5.0, 6.0, 1.0));
    }

    #[test]
    fn unknown_format_code_is_an_error() {
        let element = elem(0x40);
        let err = element
            .unpack(&[0u8; 16], 16, None, Endianness::Little)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVertexFormat(0x40)));
    }

    #[test]
    fn max_magnitude_table() {
        assert_eq!(max_magnitude(VertexFormatCode::Float3 as u8), 1.0);
        assert_eq!(max_magnitude(VertexFormatCode::UByte4 as u8), 255.0);
        assert_eq!(max_magnitude(VertexFormatCode::Short3 as u8), 32767.0);
        assert_eq!(max_magnitude(VertexFormatCode::Short4 as u8), 16383.0);
        // out-of-table codes fall back to 1
        assert_eq!(max_magnitude(0x40), 1.0);
    }
}
