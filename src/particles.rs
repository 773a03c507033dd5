//! Decorative background particles.
//!
//! The field is drawn once at startup and never changes afterwards; animation
//! is a pure function of elapsed time.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

pub const DEFAULT_PARTICLE_COUNT: usize = 200;

pub const SIZE_RANGE: Range<f32> = 3.0..8.0;
pub const POSITION_RANGE: Range<f32> = 0.0..100.0;
pub const DELAY_RANGE: Range<f32> = 0.0..0.1;
pub const DURATION_RANGE: Range<f32> = 10.0..30.0;

/// One decorative element. Positions are percentages of the drawing area,
/// delay and duration are seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub size: f32,
    pub left: f32,
    pub top: f32,
    pub delay: f32,
    pub duration: f32,
}

impl Particle {
    fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            size: rng.gen_range(SIZE_RANGE),
            left: rng.gen_range(POSITION_RANGE),
            top: rng.gen_range(POSITION_RANGE),
            delay: rng.gen_range(DELAY_RANGE),
            duration: rng.gen_range(DURATION_RANGE),
        }
    }

    fn glyph(&self) -> &'static str {
        if self.size < 4.5 {
            "·"
        } else if self.size < 6.5 {
            "•"
        } else {
            "●"
        }
    }

    /// Vertical position in percent after `elapsed`, drifting upward and
    /// wrapping once per `duration`.
    fn top_at(&self, elapsed: Duration) -> f32 {
        let t = elapsed.as_secs_f32() - self.delay;
        if t <= 0.0 {
            return self.top;
        }
        let progress = (t / self.duration).fract();
        let top = (self.top - progress * 100.0).rem_euclid(100.0);
        // rem_euclid can round up to the modulus itself
        if top >= 100.0 {
            0.0
        } else {
            top
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Self {
        let particles = (0..count).map(|_| Particle::random(rng)).collect();
        Self { particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn count(&self) -> usize {
        self.particles.len()
    }

    /// Widget view of the field at a point in its animation.
    pub fn frame_at(&self, elapsed: Duration) -> ParticleFrame<'_> {
        ParticleFrame {
            field: self,
            elapsed,
        }
    }
}

pub struct ParticleFrame<'a> {
    field: &'a ParticleField,
    elapsed: Duration,
}

impl Widget for ParticleFrame<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for particle in self.field.particles() {
            let x = percent_to_cell(particle.left, area.width);
            let y = percent_to_cell(particle.top_at(self.elapsed), area.height);
            let color = if particle.size >= 6.5 {
                Color::Rgb(255, 140, 60)
            } else {
                Color::Rgb(120, 60, 30)
            };
            buf.set_string(
                area.x + x,
                area.y + y,
                particle.glyph(),
                Style::default().fg(color),
            );
        }
    }
}

fn percent_to_cell(percent: f32, extent: u16) -> u16 {
    let cell = (percent / 100.0 * extent as f32) as u16;
    cell.min(extent - 1)
}
