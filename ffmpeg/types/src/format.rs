/*!
    Pixel and sample format types.
*/

/**
    Video pixel formats.

    This is the subset of formats delivered to renderers. Decoded frames in
    any other format are converted to [`PixelFormat::Yuv420p`] by the decoder.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Planar YUV 4:2:0, 10-bit little-endian samples (HDR content)
    Yuv420p10,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Semi-planar YUV 4:2:0, 12bpp (common hardware decoder output)
    Nv12,
    /// Single 8-bit luma plane
    Gray8,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed BGRA, 32bpp
    Bgra,
}

/**
    Size of one tightly packed plane of a frame.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Bytes per row, without padding.
    pub row_bytes: usize,
    /// Number of rows.
    pub rows: usize,
}

impl PlaneLayout {
    /**
        Total bytes of the plane.
    */
    pub const fn len(self) -> usize {
        self.row_bytes * self.rows
    }

    /**
        Returns true if the plane holds no bytes.
    */
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl PixelFormat {
    /**
        Returns true if this is a planar (or semi-planar) format.
    */
    pub const fn is_planar(self) -> bool {
        !matches!(self, Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra)
    }

    /**
        Layout of each plane for a frame of the given dimensions.

        Chroma dimensions round up, so odd-sized frames keep their last
        column and row.
    */
    pub fn planes(self, width: u32, height: u32) -> Vec<PlaneLayout> {
        let w = width as usize;
        let h = height as usize;
        let cw = w.div_ceil(2);
        let ch = h.div_ceil(2);
        let plane = |row_bytes, rows| PlaneLayout { row_bytes, rows };

        match self {
            Self::Yuv420p => vec![plane(w, h), plane(cw, ch), plane(cw, ch)],
            Self::Yuv420p10 => vec![plane(w * 2, h), plane(cw * 2, ch), plane(cw * 2, ch)],
            Self::Yuv422p => vec![plane(w, h), plane(cw, h), plane(cw, h)],
            Self::Yuv444p => vec![plane(w, h), plane(w, h), plane(w, h)],
            Self::Nv12 => vec![plane(w, h), plane(cw * 2, ch)],
            Self::Gray8 => vec![plane(w, h)],
            Self::Rgb24 | Self::Bgr24 => vec![plane(w * 3, h)],
            Self::Rgba | Self::Bgra => vec![plane(w * 4, h)],
        }
    }

    /**
        Total size in bytes of a tightly packed frame.
    */
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        self.planes(width, height).iter().map(|p| p.len()).sum()
    }
}

/**
    Audio sample formats (always interleaved once decoded).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    S16,
    /// Signed 32-bit integer
    S32,
    /// 32-bit floating point, range [-1.0, 1.0]
    F32,
    /// 64-bit floating point
    F64,
}

impl SampleFormat {
    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /**
        Returns true if this is a floating-point format.
    */
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuv420p_planes_round_up_odd_sizes() {
        let planes = PixelFormat::Yuv420p.planes(5, 3);
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0], PlaneLayout { row_bytes: 5, rows: 3 });
        assert_eq!(planes[1], PlaneLayout { row_bytes: 3, rows: 2 });
        assert_eq!(PixelFormat::Yuv420p.frame_size(5, 3), 15 + 6 + 6);
    }

    #[test]
    fn nv12_has_interleaved_chroma_plane() {
        let planes = PixelFormat::Nv12.planes(4, 4);
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[1], PlaneLayout { row_bytes: 4, rows: 2 });
    }

    #[test]
    fn packed_formats_are_single_plane() {
        assert_eq!(PixelFormat::Rgba.frame_size(10, 10), 400);
        assert_eq!(PixelFormat::Bgr24.frame_size(10, 10), 300);
        assert!(!PixelFormat::Bgra.is_planar());
        assert!(PixelFormat::Nv12.is_planar());
    }

    #[test]
    fn sample_format_sizes() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F64.bytes_per_sample(), 8);
        assert!(SampleFormat::F32.is_float());
        assert!(!SampleFormat::S32.is_float());
    }
}
