//! Captured reference frames and a demo module
//!
//! [`CAPTURED_FRAMES`] holds telemetry frames recorded from a live module
//! during protocol bring-up; they are the ground truth the decoder is
//! tested against. [`DemoCdi`] synthesizes frames in the same layout so
//! the monitor and display stack can run with no hardware attached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::{FRAME_HEADER, FRAME_LEN, FRAME_TRAILER};

/// Telemetry frames captured from a live module
pub const CAPTURED_FRAMES: [[u8; FRAME_LEN]; 7] = [
    // Engine stopped, 11.4 V
    [
        0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x72, 0x10, 0x04, 0x00, 0x08, 0x00, 0x0A, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0xA6, 0xA9,
    ],
    // Cranking, 768 RPM
    [
        0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x72, 0x10, 0x04, 0x00, 0x08, 0x00, 0x0A, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0xA9, 0xA9,
    ],
    // Cranking, second capture of the same state
    [
        0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x72, 0x10, 0x04, 0x00, 0x08, 0x00, 0x0A, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0xA9, 0xA9,
    ],
    // Revving, 3392 RPM, 12.7 V
    [
        0x03, 0x0D, 0x40, 0x00, 0x00, 0x00, 0x00, 0x7F, 0x06, 0x60, 0x00, 0x08, 0x00, 0x22, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0x6A, 0xA9,
    ],
    // Coming down, 1920 RPM, 12.0 V
    [
        0x03, 0x07, 0x80, 0x00, 0x00, 0x00, 0x00, 0x78, 0x0C, 0xFF, 0x00, 0x09, 0x00, 0x11, 0x02,
        0x01, 0x04, 0x03, 0x02, 0x01, 0x34, 0xA9,
    ],
    // Idle, 960 RPM, 11.6 V
    [
        0x03, 0x03, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x74, 0x0D, 0xA5, 0x00, 0x08, 0x00, 0x0A, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0x09, 0xA9,
    ],
    // Low idle, 704 RPM, 11.5 V
    [
        0x03, 0x02, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x73, 0x0D, 0x9C, 0x00, 0x08, 0x00, 0x0A, 0x02,
        0x01, 0x03, 0x02, 0x02, 0x01, 0xFE, 0xA9,
    ],
];

const IDLE_RPM: f64 = 850.0;

/// Simulated CDI module.
///
/// Holds the engine at a wobbly idle and occasionally blips the throttle,
/// producing frames a real module could have sent. Bytes with no
/// established meaning are filled the way live captures look.
pub struct DemoCdi {
    rng: StdRng,
    rpm: f64,
    blip_target: f64,
    blip_cycles_left: u32,
    cycles_until_blip: u32,
}

impl DemoCdi {
    /// Simulator seeded from entropy
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Simulator with a fixed seed, for reproducible output
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rpm: IDLE_RPM,
            blip_target: 0.0,
            blip_cycles_left: 0,
            cycles_until_blip: 20,
        }
    }

    /// Produce the next telemetry frame; always valid
    pub fn next_frame(&mut self) -> [u8; FRAME_LEN] {
        self.step();

        let rpm = self.rpm.round().clamp(0.0, f64::from(u16::MAX)) as u16;
        let battery = 126u8.saturating_add_signed(self.rng.gen_range(-3..=2));
        let timing = (10.0 + self.rpm / 200.0).round().clamp(0.0, 255.0) as u8;

        let mut frame = [0u8; FRAME_LEN];
        frame[0] = FRAME_HEADER;
        frame[1] = (rpm >> 8) as u8;
        frame[2] = (rpm & 0xFF) as u8;
        frame[7] = battery;
        frame[8] = 0x0D;
        frame[9] = timing;
        frame[10..20]
            .copy_from_slice(&[0x00, 0x08, 0x00, 0x0A, 0x02, 0x01, 0x03, 0x02, 0x02, 0x01]);
        frame[20] = self.rng.gen();
        frame[FRAME_LEN - 1] = FRAME_TRAILER;
        frame
    }

    fn step(&mut self) {
        if self.blip_cycles_left > 0 {
            self.blip_cycles_left -= 1;
            let target = if self.blip_cycles_left > 2 {
                self.blip_target
            } else {
                IDLE_RPM
            };
            self.rpm += (target - self.rpm) * 0.6;
        } else if self.cycles_until_blip == 0 {
            self.blip_target = self.rng.gen_range(2000.0..4000.0);
            self.blip_cycles_left = self.rng.gen_range(6..12);
            self.cycles_until_blip = self.rng.gen_range(30..90);
        } else {
            self.cycles_until_blip -= 1;
            self.rpm = IDLE_RPM + self.rng.gen_range(-30.0..30.0);
        }
    }
}

impl Default for DemoCdi {
    fn default() -> Self {
        Self::new()
    }
}
