//! Eye aspect ratio from facial landmarks
//!
//! EAR = (|p2 - p6| + |p3 - p5|) / (2 * |p1 - p4|), where p1/p4 are the eye
//! corners and p2,p3 / p6,p5 the upper and lower lid points.

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Left eye indices in the 468-point face mesh (p1..p6)
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Right eye indices in the 468-point face mesh (p1..p6)
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Number of points in a face mesh
pub const FACE_MESH_POINTS: usize = 468;

/// 2D point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Landmarks of one face, normalized to the frame (0..1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Point>,
}

impl FaceLandmarks {
    /// Eye points in pixel coordinates
    fn eye(&self, indices: &[usize; 6], width: u32, height: u32) -> Result<[Point; 6], DmsError> {
        let mut eye = [Point::default(); 6];
        for (slot, &idx) in eye.iter_mut().zip(indices) {
            let p = self.points.get(idx).ok_or(DmsError::KeypointsMissing)?;
            *slot = Point::new(p.x * width as f32, p.y * height as f32);
        }
        Ok(eye)
    }
}

/// EAR of one eye; 0 when the corners coincide
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    if c == 0.0 {
        return 0.0;
    }
    (a + b) / (2.0 * c)
}

/// Mean EAR of both eyes in a frame of the given size
pub fn frame_ear(face: &FaceLandmarks, width: u32, height: u32) -> Result<f32, DmsError> {
    let left = eye_aspect_ratio(&face.eye(&LEFT_EYE, width, height)?);
    let right = eye_aspect_ratio(&face.eye(&RIGHT_EYE, width, height)?);
    Ok((left + right) / 2.0)
}
