//! Software rendering of projected points
//!
//! The frame loop only knows about [`FrameSink`]. [`PixelCanvas`] is a
//! headless implementation: NDC to pixels, a size cue from distance to the
//! centre, and squares drawn in point order with no depth test.

use std::path::Path;

use glam::{IVec2, Vec2};
use shared::ScreenCoord;

use crate::error::CrateResult;

/// Receives each tick's coordinates once the transform has finished.
pub trait FrameSink {
    fn present(&mut self, coords: &[ScreenCoord]);
}

impl<F: FnMut(&[ScreenCoord])> FrameSink for F {
    fn present(&mut self, coords: &[ScreenCoord]) {
        self(coords)
    }
}

pub const BACKGROUND: [u8; 3] = [25, 25, 30];
pub const FOREGROUND: [u8; 3] = [255, 255, 255];

/// Map an NDC coordinate to a pixel position, y pointing down.
#[inline]
pub fn ndc_to_pixel(ndc: ScreenCoord, width: u32, height: u32) -> IVec2 {
    let size = Vec2::new(width as f32, height as f32);
    let unit = Vec2::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    (unit * size).as_ivec2()
}

/// Side length of the square drawn for a point: 1 at the rim up to 4 at the centre.
#[inline]
pub fn point_size(ndc: ScreenCoord) -> i32 {
    let dist = Vec2::new(ndc.x, ndc.y).length();
    1 + ((1.0 - dist.min(1.0)) * 3.0) as i32
}

/// RGB framebuffer the points are drawn into.
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
    drawn: usize,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width as usize * height as usize],
            drawn: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Points drawn in the last presented frame.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[(y * self.width + x) as usize])
    }

    pub fn clear(&mut self) {
        self.pixels.fill(BACKGROUND);
        self.drawn = 0;
    }

    fn fill_square(&mut self, corner: IVec2, size: i32) {
        let (w, h) = (self.width as i32, self.height as i32);
        let x0 = corner.x.max(0);
        let y0 = corner.y.max(0);
        let x1 = (corner.x + size).min(w);
        let y1 = (corner.y + size).min(h);
        if x0 >= x1 {
            return;
        }
        for y in y0..y1 {
            let row = (y * w) as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(FOREGROUND);
        }
    }

    /// Write the current frame as a PNG, creating missing parent directories.
    pub fn save_png(&self, path: impl AsRef<Path>) -> CrateResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let buffer = image::RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb(self.pixels[(y * self.width + x) as usize])
        });
        buffer.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

impl FrameSink for PixelCanvas {
    fn present(&mut self, coords: &[ScreenCoord]) {
        self.clear();
        for &ndc in coords {
            // sentinels (2, 2) fall outside the visible range too
            if !ndc.is_visible() {
                continue;
            }
            let corner = ndc_to_pixel(ndc, self.width, self.height);
            self.fill_square(corner, point_size(ndc));
            self.drawn += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_mapping_flips_y() {
        assert_eq!(ndc_to_pixel(ScreenCoord::new(0.0, 0.0), 800, 600), IVec2::new(400, 300));
        assert_eq!(ndc_to_pixel(ScreenCoord::new(-1.0, 1.0), 800, 600), IVec2::new(0, 0));
        assert_eq!(ndc_to_pixel(ScreenCoord::new(1.0, -1.0), 800, 600), IVec2::new(800, 600));
    }

    #[test]
    fn size_cue_shrinks_towards_rim() {
        assert_eq!(point_size(ScreenCoord::new(0.0, 0.0)), 4);
        assert_eq!(point_size(ScreenCoord::new(0.5, 0.0)), 2);
        assert_eq!(point_size(ScreenCoord::new(1.2, 0.0)), 1);
    }

    #[test]
    fn skips_sentinel_and_far_points() {
        let mut canvas = PixelCanvas::new(40, 30);
        canvas.present(&[
            ScreenCoord::OFF_SCREEN,
            ScreenCoord::new(1.6, 0.0),
            ScreenCoord::new(0.0, -1.51),
            ScreenCoord::new(0.0, 0.0),
        ]);
        assert_eq!(canvas.drawn(), 1);
        assert_eq!(canvas.pixel(20, 15), Some(FOREGROUND));
        assert_eq!(canvas.pixel(23, 18), Some(FOREGROUND));
        assert_eq!(canvas.pixel(24, 15), Some(BACKGROUND));
    }

    #[test]
    fn edge_points_are_clipped() {
        let mut canvas = PixelCanvas::new(10, 10);
        // visible but mapped beyond the canvas on both axes
        canvas.present(&[ScreenCoord::new(1.4, -1.4), ScreenCoord::new(-1.4, 1.4)]);
        assert_eq!(canvas.drawn(), 2);
        assert!(canvas.pixels.iter().all(|&p| p == BACKGROUND));
    }

    #[test]
    fn snapshot_creates_parent_directories() {
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("sphere-snapshot-{pid}"));
        let path = dir.join("frames").join("last.png");
        let mut canvas = PixelCanvas::new(16, 12);
        canvas.present(&[ScreenCoord::new(0.0, 0.0)]);

        canvas.save_png(&path).unwrap();
        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (16, 12));
        assert_eq!(saved.get_pixel(8, 6).0, FOREGROUND);
        assert_eq!(saved.get_pixel(0, 0).0, BACKGROUND);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn snapshot_under_a_file_is_io_error() {
        let pid = std::process::id();
        let blocker = std::env::temp_dir().join(format!("sphere-blocker-{pid}"));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = PixelCanvas::new(4, 4)
            .save_png(blocker.join("frame.png"))
            .unwrap_err();
        assert!(matches!(err, crate::SphereError::Io(_)));
        assert_eq!(err.category(), crate::ErrorCategory::Other);

        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn present_clears_previous_frame() {
        let mut canvas = PixelCanvas::new(8, 8);
        canvas.present(&[ScreenCoord::new(0.0, 0.0)]);
        assert_eq!(canvas.pixel(4, 4), Some(FOREGROUND));
        canvas.present(&[]);
        assert_eq!(canvas.pixel(4, 4), Some(BACKGROUND));
        assert_eq!(canvas.drawn(), 0);
    }
}
