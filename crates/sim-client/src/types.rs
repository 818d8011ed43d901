use core::fmt;
use core::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Position or velocity in the simulator's NED frame (+z points down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3r {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3r {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3r {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3r {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3r {
    type Output = Self;
    fn mul(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl fmt::Display for Vector3r {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Orientation quaternion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternionr {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternionr {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vector3r,
    pub orientation: Quaternionr,
    pub linear_velocity: Vector3r,
    /// Body rates in rad/s
    pub angular_velocity: Vector3r,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum LandedState {
    #[default]
    Landed,
    Flying,
}

/// Snapshot of the vehicle as estimated by the simulator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultirotorState {
    pub kinematics: Kinematics,
    pub landed_state: LandedState,
    pub armed: bool,
    pub api_control: bool,
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Scene,
    DepthPlanar,
    Segmentation,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Scene => "scene",
            ImageType::DepthPlanar => "depth_planar",
            ImageType::Segmentation => "segmentation",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub camera_name: String,
    pub image_type: ImageType,
    /// Ask the backend for a compressed (PNG) payload. Backends may ignore it;
    /// check [`ImageResponse::compressed`].
    pub compress: bool,
}

impl ImageRequest {
    pub fn new(camera_name: impl Into<String>, image_type: ImageType) -> Self {
        Self {
            camera_name: camera_name.into(),
            image_type,
            compress: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub camera_name: String,
    pub image_type: ImageType,
    pub width: u32,
    pub height: u32,
    /// PNG bytes when `compressed`, otherwise row-major RGB8
    pub data: Vec<u8>,
    pub compressed: bool,
    pub timestamp: OffsetDateTime,
}
