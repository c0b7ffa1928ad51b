//! Debugging outputs of the encoder: raw per-pixel dumps and segmentation
//! images.

use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use fxhash::FxHasher;
use image::{ImageFormat, Rgb, RgbImage};

use crate::{Pixel, PixelState, ProbeEncoder, Result, CUBE_FACES_COUNT};

const MAGIC: [u8; 4] = *b"NPIX";
const VERSION: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PixelsHeader {
    magic: [u8; 4],
    version: u32,
    face_size: u32,
    pixels_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PixelRecord {
    face: u32,
    x: u32,
    y: u32,
    position: [f32; 3],
    normal: [f32; 3],
    albedo: [f32; 3],
    albedo_hsl: [f32; 3],
    static_lit_color: [f32; 3],
    face_index: u32,
    emissive_mat_id: u32,
    neighbor_probe_id: u32,

    /// Surface id, `-1` for free pixels and `-2` for discarded ones.
    surface_id: i32,

    /// Sample index, `-1` if none.
    sample_index: i32,

    distance: f32,
    neighbor_probe_distance: f32,
    solid_angle: f32,
    importance: f32,
    distance_to_border: u32,
    infinity: u32,
}

impl From<&Pixel> for PixelRecord {
    fn from(pixel: &Pixel) -> Self {
        Self {
            face: pixel.texel.face,
            x: pixel.texel.x,
            y: pixel.texel.y,
            position: pixel.position.to_array(),
            normal: pixel.normal.to_array(),
            albedo: pixel.albedo.to_array(),
            albedo_hsl: pixel.albedo_hsl.to_array(),
            static_lit_color: pixel.static_lit_color.to_array(),
            face_index: pixel.face_index,
            emissive_mat_id: pixel.emissive_mat_id,
            neighbor_probe_id: pixel.neighbor_probe_id,
            surface_id: match pixel.state {
                PixelState::Free => -1,
                PixelState::Discarded => -2,
                PixelState::Surface(id) => id as i32,
            },
            sample_index: pixel.sample_index.map_or(-1, |idx| idx as i32),
            distance: pixel.distance,
            neighbor_probe_distance: pixel.neighbor_probe_distance,
            solid_angle: pixel.solid_angle as f32,
            importance: pixel.importance as f32,
            distance_to_border: pixel.distance_to_border,
            infinity: pixel.infinity as u32,
        }
    }
}

impl ProbeEncoder {
    /// Dumps all pixels of the last encoded probe.
    pub fn save_pixels(&self, mut writer: impl Write) -> Result<()> {
        let header = PixelsHeader {
            magic: MAGIC,
            version: VERSION,
            face_size: self.face_size(),
            pixels_count: self.pixels().len() as u32,
        };

        writer.write_all(bytemuck::bytes_of(&header))?;

        for pixel in self.pixels() {
            writer.write_all(bytemuck::bytes_of(&PixelRecord::from(pixel)))?;
        }

        Ok(())
    }

    /// Renders the faces of the last encoded probe side by side, with each
    /// surface painted in its own color.
    pub fn segmentation_image(&self) -> RgbImage {
        let size = self.face_size();
        let mut image = RgbImage::new(CUBE_FACES_COUNT * size, size);

        for pixel in self.pixels() {
            let color = match pixel.state {
                PixelState::Surface(id) => surface_color(id),
                PixelState::Discarded => Rgb([48, 48, 48]),
                PixelState::Free if pixel.infinity => Rgb([0, 0, 0]),
                PixelState::Free => Rgb([128, 128, 128]),
            };

            image.put_pixel(
                pixel.texel.face * size + pixel.texel.x,
                pixel.texel.y,
                color,
            );
        }

        image
    }

    pub fn save_segmentation(&self, path: impl AsRef<Path>) -> Result<()> {
        self.segmentation_image()
            .save_with_format(path, ImageFormat::Png)?;

        Ok(())
    }
}

fn surface_color(id: usize) -> Rgb<u8> {
    let mut hasher = FxHasher::default();

    id.hash(&mut hasher);

    let [r, g, b, ..] = hasher.finish().to_le_bytes();

    // Keep away from the greys used for non-surface pixels
    Rgb([r | 0x40, g | 0x80, b | 0x20])
}

#[cfg(test)]
mod tests {
    use std::mem;

    use glam::Vec3;

    use super::*;
    use crate::{
        CapturedTexel, CubeTexel, EncoderConfig, ProbeCapture, NO_ID,
    };

    fn encoder() -> ProbeEncoder {
        let size = 4;
        let mut capture = ProbeCapture::new(size);

        for texel in CubeTexel::all(size).filter(|texel| texel.face == 4) {
            let dir = texel.direction(size);
            let position = dir / dir.z;

            let value = CapturedTexel {
                position,
                normal: -Vec3::Z,
                albedo: Vec3::ONE,
                distance: position.length(),
                ..CapturedTexel::sky()
            };

            capture.set(texel, value).unwrap();
        }

        let mut encoder = ProbeEncoder::new(EncoderConfig {
            spatial_distance_weight: 0.1,
            ..Default::default()
        });

        encoder.encode(&capture, 0, None).unwrap();
        encoder
    }

    #[test]
    fn pixels_dump() {
        let encoder = encoder();
        let mut buf = Vec::new();

        encoder.save_pixels(&mut buf).unwrap();

        assert_eq!(116, mem::size_of::<PixelRecord>());
        assert_eq!(16 + 96 * 116, buf.len());
        assert_eq!(b"NPIX", &buf[..4]);

        let first: PixelRecord = bytemuck::pod_read_unaligned(&buf[16..132]);

        assert_eq!(1, first.infinity);
        assert_eq!(-1, first.surface_id);
        assert_eq!(NO_ID, first.emissive_mat_id);
    }

    #[test]
    fn segmentation() {
        let encoder = encoder();
        let image = encoder.segmentation_image();

        assert_eq!((24, 4), image.dimensions());
        assert_eq!(&Rgb([0, 0, 0]), image.get_pixel(0, 0));

        let surface = *image.get_pixel(16, 0);

        assert_eq!(surface_color(0), surface);

        for y in 0..4 {
            for x in 16..20 {
                assert_eq!(&surface, image.get_pixel(x, y));
            }
        }

        assert_ne!(surface_color(0), surface_color(1));
    }
}
