//! Decoding of packed waypoint orientation bytes (direction, bank, pitch) into rotations.
//!
//! Angle values follow the published track geometry of the simulation: 32 yaw steps,
//! 22.5° bank steps, and per-sprite pitch codes for slopes, loops, corkscrews and spirals.

use glam::{EulerRot, Quat};

const BANKING_STEP: f32 = 22.5;
const BANKING_CORKSCREW_1: f32 = 15.8;
const BANKING_CORKSCREW_2: f32 = 34.4;
const BANKING_CORKSCREW_3: f32 = 90.0;
const BANKING_CORKSCREW_4: f32 = 180.0 - BANKING_CORKSCREW_2;
const BANKING_CORKSCREW_5: f32 = 180.0 - BANKING_CORKSCREW_1;

const SLOPE_GENTLE: f32 = 22.2052;
const SLOPE_STEEP: f32 = 58.5148;
const SLOPE_VERTICAL: f32 = 90.0;
const SLOPE_FLAT_TO_GENTLE: f32 = SLOPE_GENTLE / 2.0;
const SLOPE_GENTLE_TO_STEEP: f32 = (SLOPE_GENTLE + SLOPE_STEEP) / 2.0;
const SLOPE_STEEP_TO_VERTICAL: f32 = (SLOPE_STEEP + SLOPE_VERTICAL) / 2.0;

const SLOPE_INVERTED_FULL: f32 = 180.0;
const SLOPE_INVERTED_STEP_1: f32 = SLOPE_VERTICAL + SLOPE_FLAT_TO_GENTLE;
const SLOPE_INVERTED_STEP_2: f32 = SLOPE_VERTICAL + SLOPE_GENTLE;
const SLOPE_INVERTED_STEP_3: f32 = SLOPE_VERTICAL + SLOPE_GENTLE_TO_STEEP;
const SLOPE_INVERTED_STEP_4: f32 = SLOPE_VERTICAL + SLOPE_STEEP;
const SLOPE_INVERTED_STEP_5: f32 = SLOPE_VERTICAL + SLOPE_STEEP_TO_VERTICAL;

const SLOPE_SPIRAL_SMALL: f32 = 5.5266;
const SLOPE_SPIRAL_BIG: f32 = 3.2933;
const SLOPE_SPIRAL_QUARTER: f32 = 6.5366;
const SLOPE_SPIRAL_LIFT_HILL: f32 = 10.8737;

const SLOPE_DIAGONAL_GENTLE: f32 = 16.1005;
const SLOPE_DIAGONAL_STEEP: f32 = 49.1035;
const SLOPE_DIAGONAL_FLAT_TO_GENTLE: f32 = SLOPE_DIAGONAL_GENTLE / 2.0;

const SLOPE_CORKSCREW: [f32; 5] = [16.4, 43.3, 45.0, 43.3, 16.4];
const ROTATION_CORKSCREW: [f32; 5] = [2.3, 14.0, 45.0, 90.0 - 14.0, 90.0 - 2.3];
const BANKING_CORKSCREW: [f32; 5] = [
    BANKING_CORKSCREW_1,
    BANKING_CORKSCREW_2,
    BANKING_CORKSCREW_3,
    BANKING_CORKSCREW_4,
    BANKING_CORKSCREW_5,
];

/// Euler angles in degrees: `pitch` about X, `yaw` about Y, `roll` about Z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerDegrees {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl EulerDegrees {
    /// Yaw first, then pitch, then roll.
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }
}

/// Rotation for a packed waypoint orientation.
///
/// `direction` is one of 32 yaw steps, `bank` a banking code and `pitch` the
/// vehicle sprite code. Unknown codes are logged and contribute no rotation.
pub fn rotation_from_packed(direction: u8, bank: u8, pitch: u8) -> Quat {
    packed_angles(direction, bank, pitch).to_quat()
}

/// The Euler angles behind [`rotation_from_packed`].
pub fn packed_angles(direction: u8, bank: u8, pitch: u8) -> EulerDegrees {
    let mut angles = EulerDegrees {
        pitch: 0.0,
        yaw: direction_angle(direction),
        roll: bank_angle(bank),
    };
    apply_pitch(pitch, &mut angles);
    angles
}

/// Yaw in degrees for one of the 32 direction steps. Direction 0 faces negative X.
pub fn direction_angle(direction: u8) -> f32 {
    (360.0 / 32.0) * direction as f32 + 270.0
}

/// Roll in degrees for a banking code.
pub fn bank_angle(bank: u8) -> f32 {
    let bank_f = bank as f32;
    match bank {
        0 => 0.0,
        // right banking, 1x and 2x
        1 | 2 => bank_f * BANKING_STEP,
        // left banking
        3 | 4 => (2.0 - bank_f) * BANKING_STEP,
        // right barrel roll, 3x to 7x
        5..=9 => (bank_f - 2.0) * BANKING_STEP,
        // left barrel roll
        10..=14 => (7.0 - bank_f) * BANKING_STEP,
        // right inverted barrel roll
        16 | 17 => (18.0 - bank_f) * BANKING_STEP,
        // left inverted barrel roll
        18 | 19 => (bank_f - 20.0) * BANKING_STEP,
        _ => {
            tracing::warn!(bank, "unknown banking code");
            0.0
        }
    }
}

fn apply_pitch(pitch: u8, rot: &mut EulerDegrees) {
    match pitch {
        0 => {}

        1 => rot.pitch = -SLOPE_FLAT_TO_GENTLE,
        2 => rot.pitch = -SLOPE_GENTLE,
        3 => rot.pitch = -SLOPE_GENTLE_TO_STEEP,
        4 => rot.pitch = -SLOPE_STEEP,

        5 => rot.pitch = SLOPE_FLAT_TO_GENTLE,
        6 => rot.pitch = SLOPE_GENTLE,
        7 => rot.pitch = SLOPE_GENTLE_TO_STEEP,
        8 => rot.pitch = SLOPE_STEEP,

        9 => rot.pitch = -SLOPE_STEEP_TO_VERTICAL,
        10 => rot.pitch = -SLOPE_VERTICAL,

        11 => rot.pitch = -SLOPE_INVERTED_STEP_1,
        12 => rot.pitch = -SLOPE_INVERTED_STEP_2,
        13 => rot.pitch = -SLOPE_INVERTED_STEP_3,
        14 => rot.pitch = -SLOPE_INVERTED_STEP_4,
        15 => rot.pitch = -SLOPE_INVERTED_STEP_5,

        16 => rot.pitch = SLOPE_INVERTED_FULL,

        17 => rot.pitch = SLOPE_STEEP_TO_VERTICAL,
        18 => rot.pitch = SLOPE_VERTICAL,

        19 => rot.pitch = SLOPE_INVERTED_STEP_1,
        20 => rot.pitch = SLOPE_INVERTED_STEP_2,
        21 => rot.pitch = SLOPE_INVERTED_STEP_3,
        22 => rot.pitch = SLOPE_INVERTED_STEP_4,
        23 => rot.pitch = SLOPE_INVERTED_STEP_5,

        // corkscrews, five sprites each: start right, end right, start left, end left
        24..=43 => {
            let group = (pitch - 24) / 5;
            let step = ((pitch - 24) % 5) as usize;
            let slope = SLOPE_CORKSCREW[step];
            let turn = ROTATION_CORKSCREW[step];
            let bank = BANKING_CORKSCREW[step];
            match group {
                0 => {
                    rot.pitch = -slope;
                    rot.yaw += turn;
                    rot.roll -= bank;
                }
                1 => {
                    rot.pitch = slope;
                    rot.yaw += turn;
                    rot.roll += bank;
                }
                2 => {
                    rot.pitch = -slope;
                    rot.yaw -= turn;
                    rot.roll += bank;
                }
                _ => {
                    rot.pitch = slope;
                    rot.yaw -= turn;
                    rot.roll -= bank;
                }
            }
        }

        44 => rot.pitch = -SLOPE_SPIRAL_BIG,
        45 => rot.pitch = -SLOPE_SPIRAL_SMALL,
        46 => rot.pitch = SLOPE_SPIRAL_BIG,
        47 => rot.pitch = SLOPE_SPIRAL_SMALL,

        48 => rot.pitch = -SLOPE_SPIRAL_QUARTER,
        49 => rot.pitch = SLOPE_SPIRAL_QUARTER,

        50 => rot.pitch = -SLOPE_DIAGONAL_FLAT_TO_GENTLE,
        51 => rot.pitch = -SLOPE_DIAGONAL_GENTLE,
        52 => rot.pitch = -SLOPE_DIAGONAL_STEEP,

        53 => rot.pitch = SLOPE_DIAGONAL_FLAT_TO_GENTLE,
        54 => rot.pitch = SLOPE_DIAGONAL_GENTLE,
        55 => rot.pitch = SLOPE_DIAGONAL_STEEP,

        // inverted half loop, bottom part only
        56 => rot.pitch = SLOPE_GENTLE,
        57 => rot.pitch = SLOPE_GENTLE_TO_STEEP,
        58 => rot.pitch = SLOPE_STEEP,

        59 => rot.pitch = -SLOPE_SPIRAL_LIFT_HILL,

        _ => tracing::warn!(pitch, "unknown track vehicle sprite"),
    }
}
