//! Cube-map addressing: texel directions, solid angles and adjacency across
//! face boundaries.
//!
//! Faces follow the usual order (`+X`, `-X`, `+Y`, `-Y`, `+Z`, `-Z`); on each
//! face `x` grows to the right and `y` grows downwards.

use glam::{vec3, Vec3};

pub const CUBE_FACES_COUNT: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeTexel {
    pub face: u32,
    pub x: u32,
    pub y: u32,
}

impl CubeTexel {
    pub fn new(face: u32, x: u32, y: u32) -> Self {
        Self { face, x, y }
    }

    /// Returns the number of texels on a cube map with faces of given size.
    pub fn count(size: u32) -> usize {
        (CUBE_FACES_COUNT * size * size) as usize
    }

    pub fn index(&self, size: u32) -> usize {
        ((self.face * size + self.y) * size + self.x) as usize
    }

    pub fn from_index(index: usize, size: u32) -> Self {
        let index = index as u32;

        Self {
            face: index / (size * size),
            x: index % size,
            y: (index / size) % size,
        }
    }

    /// Iterates through all texels, in the order of their indices.
    pub fn all(size: u32) -> impl Iterator<Item = Self> {
        (0..Self::count(size)).map(move |idx| Self::from_index(idx, size))
    }

    /// Returns the texel next to this one, wrapping onto the adjacent face
    /// when crossing the edge.
    pub fn adjacent(&self, dir: Direction, size: u32) -> Self {
        let Self { face, x, y } = *self;
        let m = size - 1;

        match dir {
            Direction::Left if x > 0 => return Self::new(face, x - 1, y),
            Direction::Right if x < m => return Self::new(face, x + 1, y),
            Direction::Up if y > 0 => return Self::new(face, x, y - 1),
            Direction::Down if y < m => return Self::new(face, x, y + 1),
            _ => (),
        }

        let (face, new_x, new_y) = EDGES[face as usize][dir as usize];
        let resolve = |coord: Coord| match coord {
            Coord::Zero => 0,
            Coord::Max => m,
            Coord::X => x,
            Coord::Y => y,
            Coord::FlipX => m - x,
            Coord::FlipY => m - y,
        };

        Self::new(face, resolve(new_x), resolve(new_y))
    }

    /// Returns the face-space coordinates of this texel's center, in
    /// `-1..=1`, with `v` pointing up.
    pub fn uv(&self, size: u32) -> (f32, f32) {
        let size = size as f32;
        let u = 2.0 * (self.x as f32 + 0.5) / size - 1.0;
        let v = 1.0 - 2.0 * (self.y as f32 + 0.5) / size;

        (u, v)
    }

    /// Returns the (normalized) direction this texel looks at.
    pub fn direction(&self, size: u32) -> Vec3 {
        let (u, v) = self.uv(size);

        let dir = match self.face {
            0 => vec3(1.0, v, -u),
            1 => vec3(-1.0, v, u),
            2 => vec3(u, 1.0, -v),
            3 => vec3(u, -1.0, v),
            4 => vec3(u, v, 1.0),
            _ => vec3(-u, v, -1.0),
        };

        dir.normalize()
    }

    /// Returns the solid angle subtended by this texel, as seen from the
    /// cube's center.
    pub fn solid_angle(&self, size: u32) -> f64 {
        fn area(x: f64, y: f64) -> f64 {
            (x * y).atan2((x * x + y * y + 1.0).sqrt())
        }

        let texel = 1.0 / size as f64;
        let u = 2.0 * (self.x as f64 + 0.5) * texel - 1.0;
        let v = 2.0 * (self.y as f64 + 0.5) * texel - 1.0;
        let (x0, x1) = (u - texel, u + texel);
        let (y0, y1) = (v - texel, v + texel);

        (area(x0, y0) - area(x0, y1) - area(x1, y0) + area(x1, y1)).abs()
    }
}

/// How a coordinate carries over onto the adjacent face; `Max` denotes the
/// last texel and `FlipX` stands for `Max - x`.
#[derive(Clone, Copy, Debug)]
enum Coord {
    Zero,
    Max,
    X,
    Y,
    FlipX,
    FlipY,
}

/// For each face and direction (left, right, up, down): the adjacent face and
/// how to compute the new `x` and `y`.
const EDGES: [[(u32, Coord, Coord); 4]; 6] = {
    use Coord::*;

    [
        // +X
        [(4, Max, Y), (5, Zero, Y), (2, Max, FlipX), (3, Max, X)],
        // -X
        [(5, Max, Y), (4, Zero, Y), (2, Zero, X), (3, Zero, FlipX)],
        // +Y
        [(1, Y, Zero), (0, FlipY, Zero), (5, FlipX, Zero), (4, X, Zero)],
        // -Y
        [(1, FlipY, Max), (0, Y, Max), (4, X, Max), (5, FlipX, Max)],
        // +Z
        [(1, Max, Y), (0, Zero, Y), (2, X, Max), (3, X, Zero)],
        // -Z
        [(0, Max, Y), (1, Zero, Y), (2, FlipX, Zero), (3, FlipX, Max)],
    ]
};

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    const SIZE: u32 = 8;

    #[test]
    fn index_roundtrip() {
        for (idx, texel) in CubeTexel::all(SIZE).enumerate() {
            assert_eq!(idx, texel.index(SIZE));
        }

        assert_eq!(
            CubeTexel::new(2, 3, 5),
            CubeTexel::from_index(2 * 64 + 43, SIZE)
        );
    }

    #[test]
    fn solid_angles_sum_to_sphere() {
        let total: f64 =
            CubeTexel::all(SIZE).map(|texel| texel.solid_angle(SIZE)).sum();

        assert_relative_eq!(total, 4.0 * PI, epsilon = 1e-9);
    }

    #[test]
    fn face_centers() {
        let expected =
            [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];

        for (face, expected) in expected.into_iter().enumerate() {
            let dir = CubeTexel::new(face as u32, 0, 0).direction(2);

            assert!(dir.dot(expected) > 0.5, "face {face}: {dir}");
        }
    }

    #[test]
    fn neighbors_are_close() {
        // Two texels apart is plenty, even around the cube's corners
        let max_angle = 2.0 * (std::f32::consts::FRAC_PI_2 / SIZE as f32);

        for texel in CubeTexel::all(SIZE) {
            for dir in Direction::ALL {
                let neighbor = texel.adjacent(dir, SIZE);
                let angle = texel
                    .direction(SIZE)
                    .dot(neighbor.direction(SIZE))
                    .clamp(-1.0, 1.0)
                    .acos();

                assert!(
                    angle <= max_angle,
                    "{texel:?} -> {dir:?} -> {neighbor:?}: {angle}"
                );
            }
        }
    }

    #[test]
    fn walking_back_returns_to_start() {
        for texel in CubeTexel::all(SIZE) {
            for dir in Direction::ALL {
                let neighbor = texel.adjacent(dir, SIZE);

                // Crossing an edge can rotate the frame, so look for the way
                // back among all directions
                let returns = Direction::ALL
                    .into_iter()
                    .any(|back| neighbor.adjacent(back, SIZE) == texel);

                assert!(returns, "{texel:?} -> {dir:?} -> {neighbor:?}");

                if neighbor.face == texel.face {
                    let back = match dir {
                        Direction::Left => Direction::Right,
                        Direction::Right => Direction::Left,
                        Direction::Up => Direction::Down,
                        Direction::Down => Direction::Up,
                    };

                    assert_eq!(texel, neighbor.adjacent(back, SIZE));
                }
            }
        }
    }
}
