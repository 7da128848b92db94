#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spin-angle integrator that animates the wheel between launch and rest.
//!
//! A spin runs at full speed for two seconds, decelerates linearly for three
//! more, and is settled after five. Every sample is perturbed by a small
//! jitter drawn from a seeded generator so identical seeds replay identical
//! spins.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Total duration of a spin.
pub const SPIN_DURATION: Duration = Duration::from_secs(5);

const FULL_SPEED_SECONDS: f64 = 2.0;
const TURNS_PER_SECOND_MIN: f64 = 4.7;
const TURNS_PER_SECOND_MAX: f64 = 5.3;
const DECELERATION_SECONDS: f64 = 3.0;
const JITTER_MIN: f64 = 0.01;
const JITTER_MAX: f64 = 0.05;

/// Launch parameters of a single spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinMotion {
    initial_speed: f64,
    deceleration: f64,
    jitter: f64,
}

impl SpinMotion {
    /// Creates a motion profile from explicit parameters.
    ///
    /// Speeds are measured in degrees per second and deceleration in degrees
    /// per second squared. `jitter` is the maximum relative noise per sample.
    #[must_use]
    pub const fn new(initial_speed: f64, deceleration: f64, jitter: f64) -> Self {
        Self {
            initial_speed,
            deceleration,
            jitter,
        }
    }

    /// Angular speed at launch.
    #[must_use]
    pub const fn initial_speed(&self) -> f64 {
        self.initial_speed
    }

    /// Linear deceleration applied after the full-speed phase.
    #[must_use]
    pub const fn deceleration(&self) -> f64 {
        self.deceleration
    }

    /// Maximum relative noise applied to each speed sample.
    #[must_use]
    pub const fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Noise-free angular speed `elapsed` seconds after launch.
    #[must_use]
    pub fn base_speed(&self, elapsed: f64) -> f64 {
        if elapsed < FULL_SPEED_SECONDS {
            return self.initial_speed;
        }
        if elapsed < SPIN_DURATION.as_secs_f64() {
            let slow_time = elapsed - FULL_SPEED_SECONDS;
            return (self.initial_speed - self.deceleration * slow_time).max(0.0);
        }
        0.0
    }

    /// Reports whether the spin has come to rest.
    #[must_use]
    pub fn is_settled(elapsed: f64) -> bool {
        elapsed >= SPIN_DURATION.as_secs_f64()
    }
}

/// Seeded source of spin launches and speed noise.
#[derive(Clone, Debug)]
pub struct Spinner {
    rng: ChaCha8Rng,
}

impl Spinner {
    /// Creates a spinner whose randomness derives from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Samples the launch parameters of a new spin.
    pub fn launch(&mut self) -> SpinMotion {
        let initial_speed = self.rng.gen_range(TURNS_PER_SECOND_MIN..TURNS_PER_SECOND_MAX) * 360.0;
        let jitter = self.rng.gen_range(JITTER_MIN..JITTER_MAX);
        SpinMotion::new(initial_speed, initial_speed / DECELERATION_SECONDS, jitter)
    }

    /// Samples the instantaneous angular speed of `motion` at `elapsed` seconds.
    pub fn speed(&mut self, motion: &SpinMotion, elapsed: f64) -> f64 {
        let jitter = motion.jitter.abs();
        let noise = 1.0 + self.rng.gen_range(-jitter..=jitter);
        motion.base_speed(elapsed) * noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_parameters_stay_in_range() {
        let mut spinner = Spinner::new(7);
        for _ in 0..64 {
            let motion = spinner.launch();
            assert!(motion.initial_speed() >= TURNS_PER_SECOND_MIN * 360.0);
            assert!(motion.initial_speed() <= TURNS_PER_SECOND_MAX * 360.0);
            assert!((motion.deceleration() * 3.0 - motion.initial_speed()).abs() < 1e-9);
            assert!((JITTER_MIN..JITTER_MAX).contains(&motion.jitter()));
        }
    }

    #[test]
    fn speed_profile_holds_then_decelerates_to_rest() {
        let motion = SpinMotion::new(1_800.0, 600.0, 0.0);
        assert!((motion.base_speed(0.0) - 1_800.0).abs() < f64::EPSILON);
        assert!((motion.base_speed(1.99) - 1_800.0).abs() < f64::EPSILON);
        assert!((motion.base_speed(3.5) - 900.0).abs() < 1e-9);
        assert!(motion.base_speed(4.999) >= 0.0);
        assert!(motion.base_speed(5.0).abs() < f64::EPSILON);
        assert!(SpinMotion::is_settled(5.0));
        assert!(!SpinMotion::is_settled(4.99));
    }

    #[test]
    fn noise_is_bounded_by_jitter() {
        let mut spinner = Spinner::new(11);
        let motion = SpinMotion::new(1_000.0, 0.0, 0.05);
        for _ in 0..128 {
            let speed = spinner.speed(&motion, 0.5);
            assert!((949.999..=1_050.001).contains(&speed));
        }
    }

    #[test]
    fn identical_seeds_replay_identical_launches() {
        let mut first = Spinner::new(0xfeed);
        let mut second = Spinner::new(0xfeed);
        for _ in 0..8 {
            assert_eq!(first.launch(), second.launch());
        }
    }
}
