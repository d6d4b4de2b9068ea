//! Latitude/longitude sampling of the unit sphere

use std::f32::consts::{PI, TAU};

use shared::Point3D;

use crate::error::{CrateResult, SphereError};

/// Sample `lat_steps × lon_steps` points on the unit sphere.
///
/// Polar angles sit at half-step offsets over (0, π) so no two rows collapse
/// onto a pole; azimuths cover [0, 2π). Output is row-major by latitude then
/// longitude, and buffers downstream rely on that order.
pub fn generate(lat_steps: u32, lon_steps: u32) -> CrateResult<Vec<Point3D>> {
    if lat_steps == 0 || lon_steps == 0 {
        return Err(SphereError::InvalidArgument(format!(
            "sphere sampling needs at least one step per axis, got {lat_steps}x{lon_steps}"
        )));
    }

    let count = (lat_steps as usize)
        .checked_mul(lon_steps as usize)
        .filter(|&n| n <= u32::MAX as usize)
        .ok_or_else(|| {
            SphereError::InvalidArgument(format!("{lat_steps}x{lon_steps} points is too many"))
        })?;

    let mut points = Vec::with_capacity(count);
    for i in 0..lat_steps {
        let theta = PI * ((i as f32 + 0.5) / lat_steps as f32);
        let (sin_theta, cos_theta) = theta.sin_cos();
        for j in 0..lon_steps {
            let phi = TAU * (j as f32 / lon_steps as f32);
            let (sin_phi, cos_phi) = phi.sin_cos();
            points.push(Point3D::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi));
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn count_norm_and_w() {
        for (lat, lon) in [(1, 1), (1, 7), (3, 4), (120, 240)] {
            let points = generate(lat, lon).unwrap();
            assert_eq!(points.len(), (lat * lon) as usize);
            for p in &points {
                assert_eq!(p.w, 1.0);
                let len = Vec3::new(p.x, p.y, p.z).length();
                assert!((len - 1.0).abs() < 1e-5, "|p| = {len}");
            }
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(generate(17, 33).unwrap(), generate(17, 33).unwrap());
    }

    #[test]
    fn row_major_order() {
        let points = generate(2, 4).unwrap();
        // first row is the northern band, starting at phi = 0 (+x)
        assert!(points[0].y > 0.0 && points[4].y < 0.0);
        assert!(points[0].z.abs() < 1e-6 && points[0].x > 0.0);
        // quarter turn in longitude moves onto +z
        assert!(points[1].x.abs() < 1e-6 && points[1].z > 0.0);
    }

    #[test]
    fn single_latitude_sits_on_equator() {
        let points = generate(1, 8).unwrap();
        assert!(points.iter().all(|p| p.y.abs() < 1e-6));
    }

    #[test]
    fn zero_steps_rejected() {
        assert!(matches!(generate(0, 5), Err(SphereError::InvalidArgument(_))));
        assert!(matches!(generate(5, 0), Err(SphereError::InvalidArgument(_))));
    }
}
