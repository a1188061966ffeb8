//! Single-flight tracking of image list requests
//!
//! Every request gets a new generation number. Only the completion that
//! carries the latest generation is applied; anything older was superseded
//! and is dropped.

use tracing::debug;

/// What to do with a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Latest request, still wanted
    Current,
    /// Latest request, but the user dismissed the progress dialog
    Canceled,
    /// Superseded by a newer request (or already completed)
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: u64,
    canceled: bool,
}

#[derive(Debug, Default)]
pub struct FetchTracker {
    generation: u64,
    in_flight: Option<InFlight>,
}

impl FetchTracker {
    /// Start a new request, superseding the pending one
    pub fn begin(&mut self) -> u64 {
        if let Some(prev) = self.in_flight.take() {
            debug!("Superseding image list request #{}", prev.generation);
        }
        self.generation += 1;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            canceled: false,
        });
        self.generation
    }

    /// User closed the progress dialog. Returns false if nothing was loading.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight {
            Some(ref mut f) if !f.canceled => {
                f.canceled = true;
                true
            }
            _ => false,
        }
    }

    /// A request is pending and its progress dialog is still shown
    pub fn is_loading(&self) -> bool {
        self.in_flight.map(|f| !f.canceled).unwrap_or(false)
    }

    pub fn complete(&mut self, generation: u64) -> Completion {
        match self.in_flight {
            Some(f) if f.generation == generation => {
                self.in_flight = None;
                if f.canceled {
                    Completion::Canceled
                } else {
                    Completion::Current
                }
            }
            _ => Completion::Stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let mut tracker = FetchTracker::default();
        assert!(!tracker.is_loading());

        let gen = tracker.begin();
        assert!(tracker.is_loading());
        assert_eq!(tracker.complete(gen), Completion::Current);
        assert!(!tracker.is_loading());

        // Delivered twice: second delivery is ignored
        assert_eq!(tracker.complete(gen), Completion::Stale);
    }

    #[test]
    fn test_second_request_supersedes_first() {
        let mut tracker = FetchTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(second > first);

        assert_eq!(tracker.complete(first), Completion::Stale);
        assert!(tracker.is_loading());
        assert_eq!(tracker.complete(second), Completion::Current);
    }

    #[test]
    fn test_late_first_completion_after_second() {
        let mut tracker = FetchTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();

        assert_eq!(tracker.complete(second), Completion::Current);
        assert_eq!(tracker.complete(first), Completion::Stale);
    }

    #[test]
    fn test_cancel() {
        let mut tracker = FetchTracker::default();
        assert!(!tracker.cancel());

        let gen = tracker.begin();
        assert!(tracker.cancel());
        assert!(!tracker.is_loading());
        assert!(!tracker.cancel());
        assert_eq!(tracker.complete(gen), Completion::Canceled);
    }

    #[test]
    fn test_new_request_after_cancel() {
        let mut tracker = FetchTracker::default();
        let first = tracker.begin();
        tracker.cancel();
        let second = tracker.begin();

        assert!(tracker.is_loading());
        assert_eq!(tracker.complete(first), Completion::Stale);
        assert_eq!(tracker.complete(second), Completion::Current);
    }
}
