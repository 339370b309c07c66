use std::time::{Duration, Instant};

const STEP_PERCENT: u16 = 5;
const CAP_PERCENT: u16 = 95;
const STEP_INTERVAL: Duration = Duration::from_millis(500);

/// Cosmetic progress indicator. It advances on a fixed timer and knows
/// nothing about the request it decorates.
#[derive(Debug, Clone, Default)]
pub struct ProgressBar {
    started: Option<Instant>,
    percent: u16,
    visible: bool,
}

impl ProgressBar {
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
        self.percent = 0;
        self.visible = true;
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(started) = self.started else {
            return;
        };
        let steps = now.saturating_duration_since(started).as_millis() / STEP_INTERVAL.as_millis();
        let percent = steps.saturating_mul(u128::from(STEP_PERCENT));
        self.percent = percent.min(u128::from(CAP_PERCENT)) as u16;
    }

    pub fn stop(&mut self) {
        self.started = None;
        self.percent = 100;
        self.visible = false;
    }

    pub fn percent(&self) -> u16 {
        self.percent
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_in_steps_and_caps() {
        let start = Instant::now();
        let mut bar = ProgressBar::default();
        bar.start(start);
        assert!(bar.is_visible());
        bar.tick(start + Duration::from_millis(1600));
        assert_eq!(bar.percent(), 15);
        bar.tick(start + Duration::from_secs(60));
        assert_eq!(bar.percent(), 95);
    }

    #[test]
    fn stop_completes_and_hides() {
        let start = Instant::now();
        let mut bar = ProgressBar::default();
        bar.start(start);
        bar.stop();
        assert_eq!(bar.percent(), 100);
        assert!(!bar.is_visible());
        bar.tick(start + Duration::from_secs(5));
        assert_eq!(bar.percent(), 100);
    }
}
