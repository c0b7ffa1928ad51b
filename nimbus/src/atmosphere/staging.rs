use glam::UVec2;

use crate::{gpu, Error, Result};

/// Texture the transmittance table gets uploaded into.
///
/// Implemented by the renderer on top of whatever its graphics API offers;
/// texels are laid out row by row, starting at the lowest altitude.
pub trait StagingTexture {
    fn size(&self) -> UVec2;

    fn write(&mut self, texels: &[gpu::TransmittanceTexel]);
}

/// [`StagingTexture`] that lives in RAM - useful for tests and offline tools.
#[derive(Clone, Debug, Default)]
pub struct CpuStagingTexture {
    size: UVec2,
    texels: Vec<gpu::TransmittanceTexel>,
}

impl CpuStagingTexture {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            texels: vec![Default::default(); (size.x * size.y) as usize],
        }
    }

    pub fn texels(&self) -> &[gpu::TransmittanceTexel] {
        &self.texels
    }

    pub fn texel(&self, x: u32, y: u32) -> Result<gpu::TransmittanceTexel> {
        Error::check_index(x as usize, self.size.x as usize)?;
        Error::check_index(y as usize, self.size.y as usize)?;

        Ok(self.texels[(y * self.size.x + x) as usize])
    }
}

impl StagingTexture for CpuStagingTexture {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn write(&mut self, texels: &[gpu::TransmittanceTexel]) {
        self.texels.clear();
        self.texels.extend_from_slice(texels);
    }
}
