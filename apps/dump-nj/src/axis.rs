// This file is part of OpenNJ.
//
// OpenNJ is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// OpenNJ is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with OpenNJ.  If not, see <http://www.gnu.org/licenses/>.
use anyhow::{bail, ensure, Error, Result};
use nalgebra::{Matrix3, Matrix4, Vector3};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    NegX,
    NegY,
    NegZ,
}

impl Axis {
    pub fn vector(self) -> Vector3<f32> {
        match self {
            Self::X => Vector3::x(),
            Self::Y => Vector3::y(),
            Self::Z => Vector3::z(),
            Self::NegX => -Vector3::x(),
            Self::NegY => -Vector3::y(),
            Self::NegZ => -Vector3::z(),
        }
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "x" | "+x" => Self::X,
            "y" | "+y" => Self::Y,
            "z" | "+z" => Self::Z,
            "-x" => Self::NegX,
            "-y" => Self::NegY,
            "-z" => Self::NegZ,
            _ => bail!("unknown axis '{}': expected one of x, y, z, -x, -y, -z", s),
        })
    }
}

/// Rotates a model authored with the given forward and up axes into glTF's
/// frame, where forward is -Z and up is +Y.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisConversion {
    rotation: Matrix3<f32>,
}

impl AxisConversion {
    pub fn new(forward: Axis, up: Axis) -> Result<Self> {
        let forward_v = forward.vector();
        let up_v = up.vector();
        let right = forward_v.cross(&up_v);
        ensure!(
            right != Vector3::zeros(),
            "forward axis {:?} and up axis {:?} must not be parallel",
            forward,
            up
        );
        let source = Matrix3::from_columns(&[right, up_v, forward_v]);
        let target = Matrix3::<f32>::from_columns(&[Vector3::x(), Vector3::y(), -Vector3::z()]);
        Ok(Self {
            rotation: target * source.transpose(),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == Matrix3::identity()
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.rotation.to_homogeneous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn it_parses_axes() -> Result<()> {
        assert_eq!("x".parse::<Axis>()?, Axis::X);
        assert_eq!("+Y".parse::<Axis>()?, Axis::Y);
        assert_eq!("-z".parse::<Axis>()?, Axis::NegZ);
        assert!("w".parse::<Axis>().is_err());
        assert!("".parse::<Axis>().is_err());
        Ok(())
    }

    #[test]
    fn gltf_axes_need_no_conversion() -> Result<()> {
        assert!(AxisConversion::new(Axis::NegZ, Axis::Y)?.is_identity());
        Ok(())
    }

    #[test]
    fn z_up_models_are_rotated() -> Result<()> {
        let conversion = AxisConversion::new(Axis::Y, Axis::Z)?;
        assert!(!conversion.is_identity());
        let m = conversion.rotation;
        assert_relative_eq!(m * Vector3::y(), -Vector3::z());
        assert_relative_eq!(m * Vector3::z(), Vector3::y());
        assert_relative_eq!(m * Vector3::x(), Vector3::x());
        assert_relative_eq!(m.determinant(), 1.0);
        Ok(())
    }

    #[test]
    fn parallel_axes_are_rejected() {
        assert!(AxisConversion::new(Axis::Y, Axis::Y).is_err());
        assert!(AxisConversion::new(Axis::X, Axis::NegX).is_err());
    }
}
