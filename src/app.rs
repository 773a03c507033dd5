use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::layout::Rect;

use crate::chat::ChatPanel;
use crate::client::AskClient;
use crate::config::Config;
use crate::particles::ParticleField;

pub const TITLE: &str = "NAATU AI";
pub const TAGLINE: &str = "Spicy Yet Flavourful";
pub const SOCIAL_LINK: &str = "https://www.instagram.com/naatu__ruchulu";

pub struct App {
    pub should_quit: bool,
    started: Instant,

    pub particles: ParticleField,
    pub chat: ChatPanel,

    // Areas for mouse hit-testing (updated during render)
    pub messages_area: Option<Rect>,
    pub link_area: Option<Rect>,
    pub shortcut_areas: Vec<(Rect, usize)>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let client = match config.request_timeout() {
            Some(timeout) => AskClient::with_timeout(&config.endpoint, timeout)?,
            None => AskClient::new(&config.endpoint),
        };
        let particles = ParticleField::generate(config.particle_count, &mut rand::thread_rng());

        tracing::info!(
            endpoint = client.endpoint(),
            particles = particles.count(),
            "chat widget ready"
        );

        Ok(Self::with_parts(particles, ChatPanel::new(client)))
    }

    pub fn with_parts(particles: ParticleField, chat: ChatPanel) -> Self {
        Self {
            should_quit: false,
            started: Instant::now(),
            particles,
            chat,
            messages_area: None,
            link_area: None,
            shortcut_areas: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Example shortcut rendered under the given cell, if any.
    pub fn shortcut_at(&self, x: u16, y: u16) -> Option<usize> {
        self.shortcut_areas
            .iter()
            .find(|(area, _)| point_in_rect(x, y, *area))
            .map(|(_, index)| *index)
    }

    pub fn tick(&mut self) {
        self.chat.tick_animation();
    }
}

pub fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shortcut_hit_testing() {
        let config = Config {
            particle_count: 5,
            ..Config::default()
        };
        let mut app = App::new(&config).unwrap();
        assert_eq!(app.particles.count(), 5);

        app.shortcut_areas = vec![(Rect::new(2, 4, 10, 1), 0), (Rect::new(2, 5, 10, 1), 1)];
        assert_eq!(app.shortcut_at(2, 4), Some(0));
        assert_eq!(app.shortcut_at(11, 5), Some(1));
        assert_eq!(app.shortcut_at(12, 5), None);
        assert_eq!(app.shortcut_at(3, 6), None);
    }
}
