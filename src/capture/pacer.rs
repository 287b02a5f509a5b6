//! Fixed-rate frame admission for capture.

/// Admits at most one frame per interval, keeping phase when frames arrive late
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval_s: f64,
    next_due_s: Option<f64>,
}

impl FramePacer {
    /// Slack so a 60 Hz display is not aliased against a 60 fps target
    const TOLERANCE: f64 = 0.25;

    pub fn new(fps: u32) -> Self {
        Self {
            interval_s: 1.0 / fps.max(1) as f64,
            next_due_s: None,
        }
    }

    /// Whether a frame rendered at `now_s` should be captured
    pub fn admit(&mut self, now_s: f64) -> bool {
        let due = match self.next_due_s {
            None => now_s,
            Some(due) => due,
        };
        if now_s + self.interval_s * Self::TOLERANCE < due {
            return false;
        }

        let mut next = due + self.interval_s;
        if next < now_s {
            // Fell more than a frame behind; resync instead of bursting
            next = now_s + self.interval_s;
        }
        self.next_due_s = Some(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rate_matches_target() {
        let mut pacer = FramePacer::new(60);
        let admitted = (0..600)
            .filter(|i| pacer.admit(*i as f64 / 60.0))
            .count();
        assert_eq!(admitted, 600);
    }

    #[test]
    fn test_fast_display_is_thinned() {
        let mut pacer = FramePacer::new(60);
        let admitted = (0..1440)
            .filter(|i| pacer.admit(*i as f64 / 144.0))
            .count();
        // 10 seconds at 60 fps
        assert!((590..=610).contains(&admitted), "{admitted}");
    }

    #[test]
    fn test_stall_does_not_burst() {
        let mut pacer = FramePacer::new(60);
        assert!(pacer.admit(0.0));
        assert!(pacer.admit(1.0));
        assert!(!pacer.admit(1.001));
        assert!(pacer.admit(1.0 + 1.0 / 60.0));
    }
}
