use std::sync::Arc;

/// A dense 3-channel (RGB) image, row-major, one byte per channel.
///
/// Decoding itself is an opaque external collaborator per spec.md §1 (the
/// video decoder is "out of scope: the neural networks themselves ... the
/// video decoder"); this type is the shape a [`crate::reader::Decoder`]
/// hands back. Resize and horizontal concatenation, by contrast, are the
/// Preprocessor's own job (spec.md §4.2) and are implemented directly below
/// rather than pulled in from an image crate, since nearest-neighbor
/// resampling of a flat RGB buffer needs no more machinery than this.
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    data: Arc<[u8]>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data: data.into(),
        })
    }

    pub fn zeros(width: u32, height: u32) -> Self {
        let data = vec![0u8; width as usize * height as usize * 3];
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Nearest-neighbor resize to `(new_width, new_height)`, matching the
    /// shape contract of spec.md §4.2's `detectFrame = resize(raw,
    /// detect_shape)`.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Frame {
        if new_width == self.width && new_height == self.height {
            return self.clone();
        }
        let mut out = vec![0u8; new_width as usize * new_height as usize * 3];
        for ny in 0..new_height {
            let sy = (ny as u64 * self.height as u64 / new_height.max(1) as u64) as u32;
            let sy = sy.min(self.height.saturating_sub(1));
            for nx in 0..new_width {
                let sx = (nx as u64 * self.width as u64 / new_width.max(1) as u64) as u32;
                let sx = sx.min(self.width.saturating_sub(1));
                let px = self.pixel(sx, sy);
                let idx = (ny as usize * new_width as usize + nx as usize) * 3;
                out[idx] = px[0];
                out[idx + 1] = px[1];
                out[idx + 2] = px[2];
            }
        }
        Frame {
            width: new_width,
            height: new_height,
            data: out.into(),
        }
    }

    /// Horizontal concatenation of the left third and right third of the
    /// frame, per spec.md §4.2's `clsFrame = hconcat(raw[:, :w/3],
    /// raw[:, -w/3:])` — the door classifier only looks at the two edges of
    /// the frame, where a bus door typically sits.
    pub fn hconcat_thirds(&self) -> Frame {
        let third = self.width / 3;
        let mut out = vec![0u8; third as usize * 2 * self.height as usize * 3];
        let out_width = third * 2;
        for y in 0..self.height {
            for x in 0..third {
                let left = self.pixel(x, y);
                let right_x = self.width - third + x;
                let right = self.pixel(right_x, y);

                let left_idx = (y as usize * out_width as usize + x as usize) * 3;
                out[left_idx] = left[0];
                out[left_idx + 1] = left[1];
                out[left_idx + 2] = left[2];

                let right_idx = (y as usize * out_width as usize + (third + x) as usize) * 3;
                out[right_idx] = right[0];
                out[right_idx + 1] = right[1];
                out[right_idx + 2] = right[2];
            }
        }
        Frame {
            width: out_width,
            height: self.height,
            data: out.into(),
        }
    }
}
