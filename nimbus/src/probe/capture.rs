use glam::Vec3;

use crate::{CubeTexel, Error, Result};

/// Sentinel for "no emissive material" / "no neighbor probe".
pub const NO_ID: u32 = u32::MAX;

/// Everything the capture pass rendered into a single cube-map texel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapturedTexel {
    /// Position of the visible surface, relative to the probe's center.
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub static_lit_color: Vec3,
    pub emissive_mat_id: u32,
    pub face_index: u32,
    pub neighbor_probe_id: u32,
    pub neighbor_probe_distance: f32,

    /// Distance from the probe's center; infinite (or very large) for sky
    /// texels.
    pub distance: f32,
}

impl CapturedTexel {
    pub fn sky() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            albedo: Vec3::ZERO,
            static_lit_color: Vec3::ZERO,
            emissive_mat_id: NO_ID,
            face_index: NO_ID,
            neighbor_probe_id: NO_ID,
            neighbor_probe_distance: 0.0,
            distance: f32::INFINITY,
        }
    }
}

impl Default for CapturedTexel {
    fn default() -> Self {
        Self::sky()
    }
}

/// Provides texels of a captured cube map; usually implemented on top of a
/// read-back staging texture.
pub trait CubeMapSource {
    fn face_size(&self) -> u32;

    fn texel(&self, texel: CubeTexel) -> CapturedTexel;
}

/// Cube map kept in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeCapture {
    size: u32,
    texels: Vec<CapturedTexel>,
}

impl ProbeCapture {
    /// Creates a capture of given face size where everything is sky.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            texels: vec![CapturedTexel::sky(); CubeTexel::count(size)],
        }
    }

    /// Creates a capture out of texels laid out face by face, row by row.
    pub fn from_texels(size: u32, texels: Vec<CapturedTexel>) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidCapture("face size is zero".into()));
        }

        if texels.len() != CubeTexel::count(size) {
            return Err(Error::InvalidCapture(format!(
                "expected {} texels for faces of {size}x{size}, got {}",
                CubeTexel::count(size),
                texels.len()
            )));
        }

        Ok(Self { size, texels })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn get(&self, texel: CubeTexel) -> Result<&CapturedTexel> {
        let idx = self.checked_index(texel)?;

        Ok(&self.texels[idx])
    }

    pub fn set(
        &mut self,
        texel: CubeTexel,
        value: CapturedTexel,
    ) -> Result<()> {
        let idx = self.checked_index(texel)?;

        self.texels[idx] = value;

        Ok(())
    }

    fn checked_index(&self, texel: CubeTexel) -> Result<usize> {
        if texel.x >= self.size || texel.y >= self.size {
            return Err(Error::InvalidCapture(format!(
                "texel {texel:?} lies outside of a {}x{} face",
                self.size, self.size
            )));
        }

        let idx = texel.index(self.size);

        Error::check_index(idx, self.texels.len())?;

        Ok(idx)
    }
}

impl CubeMapSource for ProbeCapture {
    fn face_size(&self) -> u32 {
        self.size
    }

    fn texel(&self, texel: CubeTexel) -> CapturedTexel {
        self.texels[texel.index(self.size)]
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn from_texels() {
        assert!(ProbeCapture::from_texels(2, vec![]).is_err());
        assert!(ProbeCapture::from_texels(0, vec![]).is_err());

        let texels = vec![CapturedTexel::sky(); 24];

        assert!(ProbeCapture::from_texels(2, texels).is_ok());
    }

    #[test]
    fn get_and_set() {
        let mut target = ProbeCapture::new(4);
        let texel = CubeTexel::new(3, 1, 2);

        let value = CapturedTexel {
            position: vec3(1.0, 2.0, 3.0),
            distance: 3.7,
            ..CapturedTexel::sky()
        };

        target.set(texel, value).unwrap();

        assert_eq!(&value, target.get(texel).unwrap());
        assert_eq!(value, target.texel(texel));

        assert!(target.set(CubeTexel::new(0, 4, 0), value).is_err());
        assert!(matches!(
            target.get(CubeTexel::new(6, 0, 0)),
            Err(Error::IndexOutOfRange { .. })
        ));
    }
}
