//! Binary format of encoded probes.
//!
//! A file consists of a header followed by the diffuse surfaces, the emissive
//! surfaces (each immediately followed by its samples) and the neighbor
//! probes; all records are `#[repr(C)]` and stored as-is, i.e. in the
//! machine's native byte order.
//!
//! Files are not portable across byte orders: a file written on a machine of
//! the other endianness has its version byte-swapped and gets rejected.

use std::io::{self, Read, Write};
use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Vec3};

use crate::gpu::{ShRgb, SH_COEFFS_COUNT};
use crate::{
    EncodedProbe, Error, NeighborProbe, ProbeStats, Result, Surface,
    SurfaceSample, NO_ID,
};

const MAGIC: [u8; 4] = *b"NPRB";
const VERSION: u32 = 1;

type ShRgbRecord = [[f64; 3]; SH_COEFFS_COUNT];

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct HeaderRecord {
    magic: [u8; 4],
    version: u32,
    probe_id: u32,
    surfaces_count: u32,
    emissive_surfaces_count: u32,
    neighbors_count: u32,
    mean_distance: f64,
    mean_harmonic_distance: f64,
    min_distance: f64,
    max_distance: f64,
    bbox_min: [f32; 3],
    bbox_max: [f32; 3],
    nearest_neighbor_distance: f32,
    farthest_neighbor_distance: f32,
    static_sh: ShRgbRecord,
    occlusion_sh: [f64; SH_COEFFS_COUNT],
    sh_sum_diffuse: ShRgbRecord,
    sh_sum_emissive: ShRgbRecord,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct SurfaceRecord {
    sh: ShRgbRecord,
    solid_angle: f64,
    position: [f32; 3],
    normal: [f32; 3],
    tangent: [f32; 3],
    bitangent: [f32; 3],
    albedo: [f32; 3],
    id: u32,
    emissive_mat_id: u32,
    pixels_count: u32,
    samples_count: u32,
    _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct SampleRecord {
    position: [f32; 3],
    normal: [f32; 3],
    radius: f32,
    pixels_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct NeighborRecord {
    sh: [f64; SH_COEFFS_COUNT],
    solid_angle: f64,
    direction: [f32; 3],
    probe_id: u32,
    distance: f32,
    pixels_count: u32,
}

impl EncodedProbe {
    pub fn save(&self, mut writer: impl Write) -> Result<()> {
        let header = HeaderRecord {
            magic: MAGIC,
            version: VERSION,
            probe_id: self.probe_id,
            surfaces_count: self.surfaces.len() as u32,
            emissive_surfaces_count: self.emissive_surfaces.len() as u32,
            neighbors_count: self.neighbors.len() as u32,
            mean_distance: self.stats.mean_distance,
            mean_harmonic_distance: self.stats.mean_harmonic_distance,
            min_distance: self.stats.min_distance,
            max_distance: self.stats.max_distance,
            bbox_min: self.stats.bbox_min.to_array(),
            bbox_max: self.stats.bbox_max.to_array(),
            nearest_neighbor_distance: self.nearest_neighbor_distance,
            farthest_neighbor_distance: self.farthest_neighbor_distance,
            static_sh: sh_to_record(&self.static_sh),
            occlusion_sh: self.occlusion_sh,
            sh_sum_diffuse: sh_to_record(&self.sh_sum_diffuse),
            sh_sum_emissive: sh_to_record(&self.sh_sum_emissive),
        };

        write(&mut writer, &header)?;

        for surface in self.surfaces.iter().chain(&self.emissive_surfaces) {
            write_surface(&mut writer, surface)?;
        }

        for neighbor in &self.neighbors {
            let record = NeighborRecord {
                sh: neighbor.sh,
                solid_angle: neighbor.solid_angle,
                direction: neighbor.direction.to_array(),
                probe_id: neighbor.probe_id,
                distance: neighbor.distance,
                pixels_count: neighbor.pixels_count,
            };

            write(&mut writer, &record)?;
        }

        Ok(())
    }

    pub fn load(mut reader: impl Read) -> Result<Self> {
        let header: HeaderRecord = read(&mut reader)?;

        if header.magic != MAGIC {
            return Err(Error::InvalidAsset("not a probe file".into()));
        }

        if header.version != VERSION {
            return Err(Error::InvalidAsset(format!(
                "unsupported version: {} (expected {})",
                header.version, VERSION
            )));
        }

        let surfaces = (0..header.surfaces_count)
            .map(|_| read_surface(&mut reader))
            .collect::<Result<_>>()?;

        let emissive_surfaces = (0..header.emissive_surfaces_count)
            .map(|_| read_surface(&mut reader))
            .collect::<Result<_>>()?;

        let neighbors = (0..header.neighbors_count)
            .map(|_| {
                let record: NeighborRecord = read(&mut reader)?;

                Ok(NeighborProbe {
                    probe_id: record.probe_id,
                    distance: record.distance,
                    solid_angle: record.solid_angle,
                    direction: Vec3::from_array(record.direction),
                    sh: record.sh,
                    pixels_count: record.pixels_count,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            probe_id: header.probe_id,
            stats: ProbeStats {
                mean_distance: header.mean_distance,
                mean_harmonic_distance: header.mean_harmonic_distance,
                min_distance: header.min_distance,
                max_distance: header.max_distance,
                bbox_min: Vec3::from_array(header.bbox_min),
                bbox_max: Vec3::from_array(header.bbox_max),
            },
            static_sh: sh_from_record(&header.static_sh),
            occlusion_sh: header.occlusion_sh,
            surfaces,
            emissive_surfaces,
            sh_sum_diffuse: sh_from_record(&header.sh_sum_diffuse),
            sh_sum_emissive: sh_from_record(&header.sh_sum_emissive),
            neighbors,
            nearest_neighbor_distance: header.nearest_neighbor_distance,
            farthest_neighbor_distance: header.farthest_neighbor_distance,
        })
    }
}

fn write_surface(writer: &mut impl Write, surface: &Surface) -> Result<()> {
    let record = SurfaceRecord {
        sh: sh_to_record(&surface.sh),
        solid_angle: surface.solid_angle,
        position: surface.position.to_array(),
        normal: surface.normal.to_array(),
        tangent: surface.tangent.to_array(),
        bitangent: surface.bitangent.to_array(),
        albedo: surface.albedo.to_array(),
        id: surface.id,
        emissive_mat_id: surface.emissive_mat_id.unwrap_or(NO_ID),
        pixels_count: surface.pixels_count,
        samples_count: surface.samples.len() as u32,
        _padding: 0,
    };

    write(writer, &record)?;

    for sample in &surface.samples {
        let record = SampleRecord {
            position: sample.position.to_array(),
            normal: sample.normal.to_array(),
            radius: sample.radius,
            pixels_count: sample.pixels_count,
        };

        write(writer, &record)?;
    }

    Ok(())
}

fn read_surface(reader: &mut impl Read) -> Result<Surface> {
    let record: SurfaceRecord = read(reader)?;

    let samples = (0..record.samples_count)
        .map(|_| {
            let record: SampleRecord = read(reader)?;

            Ok(SurfaceSample {
                position: Vec3::from_array(record.position),
                normal: Vec3::from_array(record.normal),
                radius: record.radius,
                pixels_count: record.pixels_count,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Surface {
        id: record.id,
        emissive_mat_id: (record.emissive_mat_id != NO_ID)
            .then_some(record.emissive_mat_id),
        position: Vec3::from_array(record.position),
        normal: Vec3::from_array(record.normal),
        tangent: Vec3::from_array(record.tangent),
        bitangent: Vec3::from_array(record.bitangent),
        albedo: Vec3::from_array(record.albedo),
        solid_angle: record.solid_angle,
        pixels_count: record.pixels_count,
        sh: sh_from_record(&record.sh),
        samples,
    })
}

fn sh_to_record(sh: &ShRgb) -> ShRgbRecord {
    sh.map(|coeff| coeff.to_array())
}

fn sh_from_record(record: &ShRgbRecord) -> ShRgb {
    record.map(DVec3::from_array)
}

fn write<T>(writer: &mut impl Write, record: &T) -> Result<()>
where
    T: Pod,
{
    writer.write_all(bytemuck::bytes_of(record))?;

    Ok(())
}

fn read<T>(reader: &mut impl Read) -> Result<T>
where
    T: Pod,
{
    let mut buf = vec![0; mem::size_of::<T>()];

    reader.read_exact(&mut buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::InvalidAsset("file is truncated".into())
        } else {
            err.into()
        }
    })?;

    Ok(bytemuck::pod_read_unaligned(&buf))
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;
    use crate::{
        CapturedTexel, CubeMapSource, CubeTexel, ProbeCapture, ProbeEncoder,
    };

    #[test]
    fn layouts() {
        assert_eq!(808, mem::size_of::<HeaderRecord>());
        assert_eq!(304, mem::size_of::<SurfaceRecord>());
        assert_eq!(32, mem::size_of::<SampleRecord>());
        assert_eq!(104, mem::size_of::<NeighborRecord>());
    }

    /// Returns a probe with a bit of everything: diffuse and emissive walls,
    /// sky and neighbors.
    fn probe() -> EncodedProbe {
        let size = 8;
        let mut capture = ProbeCapture::new(size);

        for texel in CubeTexel::all(size) {
            let dir = texel.direction(size);

            let value = match texel.face {
                4 | 0 => {
                    let (axis, emissive_mat_id) = if texel.face == 4 {
                        (Vec3::Z, NO_ID)
                    } else {
                        (Vec3::X, 3)
                    };

                    let position = dir / dir.dot(axis);

                    CapturedTexel {
                        position,
                        normal: -axis,
                        albedo: vec3(0.7, 0.4, 0.1),
                        static_lit_color: vec3(0.1, 0.2, 0.3),
                        emissive_mat_id,
                        distance: position.length(),
                        ..CapturedTexel::sky()
                    }
                }

                2 => CapturedTexel {
                    neighbor_probe_id: 12,
                    neighbor_probe_distance: 3.5,
                    ..CapturedTexel::sky()
                },

                _ => capture.texel(texel),
            };

            capture.set(texel, value).unwrap();
        }

        ProbeEncoder::default().encode(&capture, 7, None).unwrap()
    }

    #[test]
    fn roundtrip() {
        let probe = probe();

        assert_eq!(1, probe.surfaces.len());
        assert_eq!(1, probe.emissive_surfaces.len());
        assert_eq!(1, probe.neighbors.len());

        let mut buf = Vec::new();

        probe.save(&mut buf).unwrap();

        let loaded = EncodedProbe::load(buf.as_slice()).unwrap();

        assert_eq!(probe, loaded);
    }

    #[test]
    fn invalid_files() {
        let mut buf = Vec::new();

        probe().save(&mut buf).unwrap();

        let truncated = &buf[..buf.len() - 1];

        assert!(matches!(
            EncodedProbe::load(truncated),
            Err(Error::InvalidAsset(_))
        ));

        let mut bad_magic = buf.clone();

        bad_magic[0] = b'X';

        assert!(matches!(
            EncodedProbe::load(bad_magic.as_slice()),
            Err(Error::InvalidAsset(_))
        ));

        let mut bad_version = buf.clone();

        bad_version[4] = 99;

        assert!(matches!(
            EncodedProbe::load(bad_version.as_slice()),
            Err(Error::InvalidAsset(_))
        ));

        // Same file, as seen by a machine of the other endianness
        let mut swapped = buf;

        swapped[4..8].reverse();

        assert!(matches!(
            EncodedProbe::load(swapped.as_slice()),
            Err(Error::InvalidAsset(_))
        ));
    }

    #[test]
    fn native_byte_order() {
        let mut buf = Vec::new();

        probe().save(&mut buf).unwrap();

        assert_eq!(b"NPRB", &buf[..4]);
        assert_eq!(VERSION.to_ne_bytes(), buf[4..8]);
    }
}
