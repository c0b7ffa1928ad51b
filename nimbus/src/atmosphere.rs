mod params;
mod staging;
mod transmittance;

use glam::{vec4, UVec2, Vec3};
use log::{debug, info};

pub use self::params::*;
pub use self::staging::*;
pub use self::transmittance::*;
use crate::{gpu, metric, Error, Result};

/// State of the atmosphere: its parameters and the tables derived from them.
///
/// The transmittance table is rebuilt only when a parameter that affects the
/// medium changes; until the rebuild completes, the previous table (if any)
/// stays in use.
#[derive(Debug)]
pub struct Atmosphere {
    params: AtmosphereParams,
    config: TransmittanceConfig,
    table: Option<TransmittanceTable>,
    table_params: Option<AtmosphereParams>,
    job: Option<TransmittanceJob>,
}

impl Atmosphere {
    pub fn new(params: AtmosphereParams, config: TransmittanceConfig) -> Self {
        let mut this = Self {
            params,
            config,
            table: None,
            table_params: None,
            job: None,
        };

        this.schedule_rebuild();
        this
    }

    pub fn params(&self) -> &AtmosphereParams {
        &self.params
    }

    /// Updates parameters, scheduling a rebuild of the transmittance table if
    /// necessary; returns whether a rebuild got scheduled.
    pub fn set_params(&mut self, params: AtmosphereParams) -> bool {
        let requires_rebuild = self.params.requires_rebuild(&params);

        self.params = params;

        if requires_rebuild {
            debug!("Atmosphere parameters changed, rebuilding tables");

            self.schedule_rebuild();
        }

        requires_rebuild
    }

    /// Returns whether the published table is missing or out of date.
    pub fn is_dirty(&self) -> bool {
        self.job.is_some()
    }

    /// Returns the size staging textures passed to [`Self::update()`] must
    /// have.
    pub fn table_size(&self) -> UVec2 {
        self.config.size()
    }

    fn schedule_rebuild(&mut self) {
        self.job = Some(TransmittanceJob::new(
            self.params.extinction(),
            self.config.size(),
            self.config.steps,
        ));
    }

    /// Advances the pending rebuild by up to `rows` rows of the table; once
    /// the table is complete, it gets uploaded into `staging` and published.
    ///
    /// Returns whether a new table has been published; a staging texture of
    /// wrong size is rejected before any work is done, leaving the rebuild
    /// pending.
    pub fn update(
        &mut self,
        rows: u32,
        staging: &mut dyn StagingTexture,
    ) -> Result<bool> {
        let Some(job) = &mut self.job else {
            return Ok(false);
        };

        if staging.size() != job.size() {
            return Err(Error::InvalidState(
                "staging texture's size doesn't match the transmittance table",
            ));
        }

        if job.progress() == 0.0 {
            info!(
                "Building transmittance table ({}x{}, {} steps)",
                job.size().x,
                job.size().y,
                self.config.steps,
            );
        }

        let Some(table) =
            metric("atmosphere.transmittance", || job.step(rows))
        else {
            return Ok(false);
        };

        table.upload(staging)?;

        info!("Transmittance table ready");

        self.table = Some(table);
        self.table_params = Some(self.params.clone());
        self.job = None;

        Ok(true)
    }

    /// Completes the pending rebuild (if any) right away.
    pub fn rebuild(&mut self, staging: &mut dyn StagingTexture) -> Result<()> {
        self.update(u32::MAX, staging)?;

        Ok(())
    }

    /// Returns the published transmittance table.
    pub fn table(&self) -> Result<&TransmittanceTable> {
        self.table.as_ref().ok_or(Error::InvalidState(
            "transmittance table has not been built yet",
        ))
    }

    /// Returns parameters the published table has been built with.
    pub fn table_params(&self) -> Option<&AtmosphereParams> {
        self.table_params.as_ref()
    }

    /// See: [`TransmittanceTable::transmittance()`].
    pub fn transmittance(
        &self,
        altitude_km: f32,
        cos_theta: f32,
    ) -> Result<Vec3> {
        Ok(self.table()?.transmittance(altitude_km, cos_theta))
    }

    /// See: [`TransmittanceTable::transmittance_along()`].
    pub fn transmittance_along(
        &self,
        altitude_km: f32,
        cos_theta: f32,
        distance_km: f32,
    ) -> Result<Vec3> {
        Ok(self
            .table()?
            .transmittance_along(altitude_km, cos_theta, distance_km))
    }

    /// Returns direction towards the sun.
    pub fn light_direction(&self) -> Vec3 {
        self.params.light_direction()
    }

    /// Returns color of the sun, as seen from given altitude.
    pub fn sun_color(&self, altitude_km: f32) -> Result<Vec3> {
        let transmittance =
            self.transmittance(altitude_km, self.light_direction().y)?;

        Ok(self.params.sun_intensity * transmittance)
    }

    pub fn uniform(&self) -> gpu::AtmosphereUniform {
        let extinction = self.params.extinction();
        let light_direction = self.light_direction();

        gpu::AtmosphereUniform {
            light_direction: light_direction.extend(self.params.sun_intensity),
            air: extinction
                .rayleigh
                .extend(self.params.air_reference_altitude_km),
            fog: vec4(
                self.params.fog_scattering,
                self.params.fog_extinction,
                self.params.fog_reference_altitude_km,
                self.params.fog_anisotropy,
            ),
            transmittance: vec4(
                gpu::cos_theta_min(0.0),
                gpu::TRANSMITTANCE_TAN_MAX,
                gpu::ATMOSPHERE_THICKNESS_KM,
                self.params.average_ground_reflectance,
            ),
        }
    }
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::new(Default::default(), Default::default())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;

    fn config() -> TransmittanceConfig {
        TransmittanceConfig {
            width: 32,
            height: 16,
            steps: 32,
        }
    }

    fn staging() -> CpuStagingTexture {
        CpuStagingTexture::new(uvec2(32, 16))
    }

    #[test]
    fn sampling_before_build() {
        let target = Atmosphere::new(Default::default(), config());

        assert!(target.is_dirty());
        assert!(matches!(target.table(), Err(Error::InvalidState(_))));

        assert!(matches!(
            target.transmittance(0.0, 1.0),
            Err(Error::InvalidState(_))
        ));

        assert!(matches!(
            target.transmittance_along(0.0, 1.0, 10.0),
            Err(Error::InvalidState(_))
        ));

        assert!(matches!(target.sun_color(0.0), Err(Error::InvalidState(_))));
    }

    #[test]
    fn time_sliced_rebuild() {
        let mut target = Atmosphere::new(Default::default(), config());
        let mut staging = staging();

        for _ in 0..3 {
            assert!(!target.update(5, &mut staging).unwrap());
            assert!(target.table().is_err());
        }

        assert!(target.update(5, &mut staging).unwrap());
        assert!(!target.is_dirty());
        assert!(target.table().is_ok());
        assert_eq!(Some(target.params()), target.table_params());

        // Nothing to do anymore
        assert!(!target.update(5, &mut staging).unwrap());
    }

    #[test]
    fn recovers_from_wrong_staging() {
        let mut target = Atmosphere::new(Default::default(), config());

        assert!(matches!(
            target.update(u32::MAX, &mut CpuStagingTexture::new(uvec2(3, 3))),
            Err(Error::InvalidState(_))
        ));

        assert!(target.is_dirty());
        assert!(target.update(u32::MAX, &mut staging()).unwrap());
        assert!(!target.is_dirty());
        assert!(target.table().is_ok());
    }

    #[test]
    fn tiny_tables_are_clamped() {
        let mut target = Atmosphere::new(
            Default::default(),
            TransmittanceConfig {
                width: 1,
                height: 0,
                steps: 8,
            },
        );

        assert_eq!(uvec2(2, 2), target.table_size());

        let mut staging = CpuStagingTexture::new(target.table_size());

        assert!(target.update(u32::MAX, &mut staging).unwrap());
        assert_eq!(4, staging.texels().len());
    }

    #[test]
    fn rebuild_only_when_medium_changes() {
        let mut target = Atmosphere::new(Default::default(), config());
        let mut staging = staging();

        target.rebuild(&mut staging).unwrap();

        let mut params = target.params().clone();

        params.sun_theta = 0.1;

        assert!(!target.set_params(params.clone()));
        assert!(!target.is_dirty());

        params.air_amount = 2.0;

        assert!(target.set_params(params));
        assert!(target.is_dirty());

        // Previous table remains available until the new one is ready
        assert!(target.table().is_ok());
        assert_eq!(1.0, target.table_params().unwrap().air_amount);

        target.rebuild(&mut staging).unwrap();

        assert_eq!(2.0, target.table_params().unwrap().air_amount);
    }

    #[test]
    fn sun_color() {
        let mut target = Atmosphere::new(
            AtmosphereParams {
                sun_theta: 0.0,
                ..Default::default()
            },
            config(),
        );

        target.rebuild(&mut staging()).unwrap();

        let color = target.sun_color(0.0).unwrap();
        let transmittance = target.transmittance(0.0, 1.0).unwrap();

        assert_relative_eq!(color.x, 100.0 * transmittance.x);
        assert!(color.x > color.z);
        assert!(color.z > 0.0);
    }

    #[test]
    fn uniform() {
        let target = Atmosphere::default();
        let uniform = target.uniform();

        assert_relative_eq!(uniform.sun_intensity(), 100.0);
        assert_relative_eq!(uniform.light_direction().length(), 1.0);
        assert_relative_eq!(uniform.air.w, 8.0);
        assert_relative_eq!(uniform.fog.w, 0.76);
    }
}
