/// Display is the monochrome framebuffer the interpreter draws into. Pixels
/// are packed MSB-first, `row_bytes` bytes per row, so a renderer can walk the
/// raw buffer without knowing anything about the interpreter.
///
/// It has no notion of wraparound: anything off the edge is clipped.
/// Toroidal sprite placement is the interpreter's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    width: usize,
    height: usize,
    row_bytes: usize,
    buffer: Vec<u8>,
}

impl Display {
    pub fn new(width: usize, height: usize) -> Self {
        let row_bytes = (width + 7) / 8;
        Display {
            width,
            height,
            row_bytes,
            buffer: vec![0; row_bytes * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// raw packed pixels, for bulk rendering
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn locate(&self, x: usize, y: usize) -> Option<(usize, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.row_bytes + x / 8, 0x80 >> (x % 8)))
    }

    /// turn a pixel on or off; off-screen is a no-op
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if let Some((i, mask)) = self.locate(x, y) {
            if on {
                self.buffer[i] |= mask;
            } else {
                self.buffer[i] &= !mask;
            }
        }
    }

    /// off-screen pixels read as off
    pub fn get(&self, x: usize, y: usize) -> bool {
        match self.locate(x, y) {
            Some((i, mask)) => self.buffer[i] & mask != 0,
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|b| *b = 0);
    }

    /// XOR a sprite into the buffer with its top-left corner at (x, y), one
    /// byte per row. Returns true if any lit pixel was turned off.
    pub fn draw(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        if x >= self.width {
            return false;
        }
        // drop sprite columns that would land past the right edge
        let visible = (self.width - x).min(8);
        let clip = (0xffu16 << (8 - visible)) as u8;
        let shift = x % 8;
        let col = x / 8;

        let mut collision = false;
        for (row, &data) in sprite.iter().enumerate() {
            let dy = y + row;
            if dy >= self.height {
                continue;
            }
            let data = data & clip;
            let i = dy * self.row_bytes + col;

            if shift == 0 {
                collision |= self.buffer[i] & data != 0;
                self.buffer[i] ^= data;
            } else {
                let l = data >> shift;
                let r = data << (8 - shift);
                collision |= self.buffer[i] & l != 0;
                self.buffer[i] ^= l;
                // clipping guarantees r is empty when there's no byte to its right
                if col + 1 < self.row_bytes {
                    collision |= self.buffer[i + 1] & r != 0;
                    self.buffer[i + 1] ^= r;
                }
            }
        }
        collision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_size() {
        let d = Display::new(64, 32);
        assert_eq!(d.row_bytes(), 8);
        assert_eq!(d.as_bytes().len(), 256);
        let d = Display::new(60, 10);
        assert_eq!(d.row_bytes(), 8);
        assert_eq!(d.as_bytes().len(), 80);
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut d = Display::new(64, 32);
        for &(x, y) in &[(0, 0), (7, 0), (8, 0), (63, 31), (13, 17)] {
            assert!(!d.get(x, y));
            d.set(x, y, true);
            assert!(d.get(x, y));
            d.set(x, y, false);
            assert!(!d.get(x, y));
        }
    }

    #[test]
    fn test_msb_first() {
        let mut d = Display::new(64, 32);
        d.set(0, 0, true);
        d.set(9, 1, true);
        assert_eq!(d.as_bytes()[0], 0b1000_0000);
        assert_eq!(d.as_bytes()[8 + 1], 0b0100_0000);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut d = Display::new(64, 32);
        d.set(64, 0, true);
        d.set(0, 32, true);
        d.set(1000, 1000, true);
        assert!(d.as_bytes().iter().all(|&b| b == 0));
        assert!(!d.get(64, 0));
        assert!(!d.get(0, 32));
    }

    #[test]
    fn test_clear() {
        let mut d = Display::new(64, 32);
        d.draw(3, 3, &[0xff, 0xff]);
        d.clear();
        for y in 0..32 {
            for x in 0..64 {
                assert!(!d.get(x, y));
            }
        }
    }

    #[test]
    fn test_draw_aligned() {
        let mut d = Display::new(64, 32);
        let collision = d.draw(8, 2, &[0b10101011]);
        assert!(!collision);
        let target = (8 + 2 * 64) / 8;
        assert_eq!(d.as_bytes()[target - 1], 0x0);
        assert_eq!(d.as_bytes()[target], 0b10101011);
        assert_eq!(d.as_bytes()[target + 1], 0x0);
    }

    #[test]
    fn test_draw_unaligned() {
        let mut d = Display::new(64, 32);
        let collision = d.draw(2, 0, &[0b10101011]);
        assert!(!collision);
        assert_eq!(d.as_bytes()[0], 0b00101010);
        assert_eq!(d.as_bytes()[1], 0b11000000);
        assert_eq!(d.as_bytes()[2], 0x0);
    }

    #[test]
    fn test_draw_unaligned_collision() {
        let mut d = Display::new(64, 32);
        d.set(8, 0, true); // lands under the second half of the sprite
        let collision = d.draw(2, 0, &[0b10101011]);
        assert!(collision);
        assert_eq!(d.as_bytes()[1], 0b01000000);
    }

    #[test]
    fn test_draw_twice_restores() {
        let mut d = Display::new(64, 32);
        d.set(5, 5, true);
        d.set(40, 20, true);
        let before = d.clone();
        let sprite = [0x3c, 0x42, 0x81, 0xff, 0x18];
        d.draw(5, 4, &sprite);
        assert_ne!(d, before);
        d.draw(5, 4, &sprite);
        assert_eq!(d, before);
    }

    #[test]
    fn test_draw_matches_per_pixel_xor() {
        let sprite = [0xf0, 0x90, 0xf0, 0x90, 0x90];
        let mut fast = Display::new(64, 32);
        let mut slow = Display::new(64, 32);
        fast.set(11, 7, true);
        slow.set(11, 7, true);
        let collision = fast.draw(11, 6, &sprite);
        let mut expected = false;
        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) != 0 {
                    let (x, y) = (11 + col, 6 + row);
                    expected |= slow.get(x, y);
                    slow.set(x, y, !slow.get(x, y));
                }
            }
        }
        assert_eq!(fast, slow);
        assert_eq!(collision, expected);
        assert!(collision);
    }

    #[test]
    fn test_draw_clips_right_edge() {
        let mut d = Display::new(64, 32);
        d.draw(59, 0, &[0b10101011]);
        assert_eq!(d.as_bytes()[7], 0b00010101);
        // nothing leaked into the next row
        assert_eq!(d.as_bytes()[8], 0x0);
    }

    #[test]
    fn test_draw_clips_bottom_edge() {
        let mut d = Display::new(64, 32);
        d.draw(0, 30, &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(d.as_bytes()[30 * 8], 0xff);
        assert_eq!(d.as_bytes()[31 * 8], 0xff);
        // no wrap to the top
        assert_eq!(d.as_bytes()[0], 0x0);
        assert_eq!(d.as_bytes()[8], 0x0);
    }

    #[test]
    fn test_draw_off_screen() {
        let mut d = Display::new(64, 32);
        assert!(!d.draw(64, 0, &[0xff]));
        assert!(!d.draw(0, 32, &[0xff]));
        assert!(d.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draw_odd_width_keeps_padding_clear() {
        let mut d = Display::new(12, 2);
        d.draw(6, 0, &[0xff]);
        // columns 6..12 lit, padding bits 12..16 untouched
        assert_eq!(d.as_bytes()[0], 0b00000011);
        assert_eq!(d.as_bytes()[1], 0b11110000);
        assert!(d.get(11, 0));
        assert!(!d.get(12, 0));
    }
}
