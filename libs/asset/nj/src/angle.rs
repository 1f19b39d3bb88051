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
use std::f64::consts::TAU;

// A full turn is 0xFFFF units; anything at or above 0x7FFF_FFFF has wrapped
// around from a negative angle.
const FULL_TURN: f64 = 0xFFFF as f64;
const WRAP: i64 = 0xFFFF_FFFF;

pub fn angle_to_rad(raw: u32) -> f32 {
    let mut angle = i64::from(raw);
    if angle >= 0x7FFF_FFFF {
        angle -= WRAP;
    }
    (angle as f64 / FULL_TURN * TAU) as f32
}
