//! Frame and angle helpers shared by clients and controllers.

use crate::Quaternionr;
use std::f32::consts::PI;

/// Quaternion to `(pitch, roll, yaw)` in radians.
pub fn to_euler_angles(q: &Quaternionr) -> (f32, f32, f32) {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);
    let ysqr = y * y;

    let t0 = 2.0 * (w * x + y * z);
    let t1 = 1.0 - 2.0 * (x * x + ysqr);
    let roll = t0.atan2(t1);

    let t2 = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = t2.asin();

    let t3 = 2.0 * (w * z + x * y);
    let t4 = 1.0 - 2.0 * (ysqr + z * z);
    let yaw = t3.atan2(t4);

    (pitch, roll, yaw)
}

/// `(pitch, roll, yaw)` in radians to a quaternion.
pub fn to_quaternion(pitch: f32, roll: f32, yaw: f32) -> Quaternionr {
    let (t0, t1) = ((yaw * 0.5).cos(), (yaw * 0.5).sin());
    let (t2, t3) = ((roll * 0.5).cos(), (roll * 0.5).sin());
    let (t4, t5) = ((pitch * 0.5).cos(), (pitch * 0.5).sin());

    Quaternionr {
        w: t0 * t2 * t4 + t1 * t3 * t5,
        x: t0 * t3 * t4 - t1 * t2 * t5,
        y: t0 * t2 * t5 + t1 * t3 * t4,
        z: t1 * t2 * t4 - t0 * t3 * t5,
    }
}

pub fn yaw_of(q: &Quaternionr) -> f32 {
    to_euler_angles(q).2
}

/// Rotate a body-frame horizontal offset (forward, right) into the world frame.
pub fn body_to_world(dx: f32, dy: f32, yaw: f32) -> (f32, f32) {
    let (sin, cos) = yaw.sin_cos();
    (dx * cos - dy * sin, dx * sin + dy * cos)
}

/// Wrap an angle into (-pi, pi].
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}
