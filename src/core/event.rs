use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Kinds of events the engine schedules.
///
/// Tie-breaking for deterministic ordering at equal times prefers
/// `Pair` < `WallX` < `WallY` < `Redraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Collision between particles `a` and `b` (normalized so `a < b`).
    Pair { a: u32, b: u32 },
    /// Particle `i` striking a vertical wall (x axis reflection).
    WallX { i: u32 },
    /// Particle `i` striking a horizontal wall (y axis reflection).
    WallY { i: u32 },
    /// Redraw heartbeat; carries no participants and never goes stale.
    Redraw,
}

impl EventKind {
    /// Participant ids carried by this kind, first and second slot.
    /// Vertical-wall hits occupy the first slot, horizontal-wall hits the
    /// second, matching the snapshot layout on `Event`.
    #[inline]
    pub fn participants(&self) -> (Option<u32>, Option<u32>) {
        match *self {
            EventKind::Pair { a, b } => (Some(a), Some(b)),
            EventKind::WallX { i } => (Some(i), None),
            EventKind::WallY { i } => (None, Some(i)),
            EventKind::Redraw => (None, None),
        }
    }

    #[inline]
    fn order_key(&self) -> (u8, u32, u32) {
        match *self {
            EventKind::Pair { a, b } => (0, a, b),
            EventKind::WallX { i } => (1, i, 0),
            EventKind::WallY { i } => (2, i, 0),
            EventKind::Redraw => (3, 0, 0),
        }
    }
}

/// A scheduled event with deterministic total ordering.
///
/// - `time`: absolute occurrence time (finite, non-NaN).
/// - `kind`: event kind and participants.
/// - `cc_a`, `cc_b`: collision-count snapshots taken at scheduling time,
///   one per participant slot; `None` where the slot is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: NotNan<f64>,
    pub kind: EventKind,
    pub cc_a: Option<u64>,
    pub cc_b: Option<u64>,
}

impl Event {
    /// Create a new event, validating that time is finite and non-NaN.
    pub fn new(time: f64, kind: EventKind, cc_a: Option<u64>, cc_b: Option<u64>) -> Result<Self> {
        if time.is_nan() {
            return Err(Error::Numeric("event time cannot be NaN".into()));
        }
        if !time.is_finite() {
            return Err(Error::Numeric("event time must be finite".into()));
        }
        let time =
            NotNan::new(time).map_err(|_| Error::Numeric("event time cannot be NaN".into()))?;
        Ok(Self {
            time,
            kind,
            cc_a,
            cc_b,
        })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// Validate against current collision counts, one per participant slot.
    /// A slot with no snapshot never invalidates; a snapshot whose particle
    /// has collided since scheduling does.
    #[inline]
    pub fn is_valid(&self, cc_a_now: Option<u64>, cc_b_now: Option<u64>) -> bool {
        fn slot_ok(snap: Option<u64>, now: Option<u64>) -> bool {
            match (snap, now) {
                (Some(s), Some(n)) => s == n,
                (None, _) => true,
                // A snapshot with no current counter means the participant
                // vanished; treat as stale.
                (Some(_), None) => false,
            }
        }
        slot_ok(self.cc_a, cc_a_now) && slot_ok(self.cc_b, cc_b_now)
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {
                let a = self.kind.order_key();
                let b = other.kind.order_key();
                match a.cmp(&b) {
                    Ordering::Equal => {
                        // Final tie-breaker on cc snapshots for a total order.
                        (self.cc_a.unwrap_or(0), self.cc_b.unwrap_or(0))
                            .cmp(&(other.cc_a.unwrap_or(0), other.cc_b.unwrap_or(0)))
                    }
                    o => o,
                }
            }
            o => o,
        }
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::{Pair, Redraw, WallX, WallY};

    #[test]
    fn new_event_rejects_nan_time() {
        let err = Event::new(f64::NAN, Pair { a: 1, b: 2 }, Some(0), Some(0)).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn new_event_rejects_infinite_time() {
        let err = Event::new(f64::INFINITY, Redraw, None, None).unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    #[test]
    fn ordering_by_time() -> Result<()> {
        let e1 = Event::new(1.0, Pair { a: 0, b: 1 }, Some(0), Some(0))?;
        let e2 = Event::new(2.0, WallX { i: 0 }, Some(0), None)?;
        assert!(e1 < e2);
        Ok(())
    }

    #[test]
    fn tie_breaker_orders_kinds_at_equal_time() -> Result<()> {
        let t = 5.0;
        let pair = Event::new(t, Pair { a: 0, b: 1 }, Some(3), Some(4))?;
        let wx = Event::new(t, WallX { i: 0 }, Some(3), None)?;
        let wy = Event::new(t, WallY { i: 0 }, Some(3), None)?;
        let redraw = Event::new(t, Redraw, None, None)?;
        assert!(pair < wx);
        assert!(wx < wy);
        assert!(wy < redraw);
        Ok(())
    }

    #[test]
    fn tie_breaker_orders_participants_within_kind() -> Result<()> {
        let a = Event::new(1.0, Pair { a: 0, b: 2 }, Some(0), Some(0))?;
        let b = Event::new(1.0, Pair { a: 1, b: 2 }, Some(0), Some(0))?;
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn is_valid_checks_collision_counts() -> Result<()> {
        let pair = Event::new(1.0, Pair { a: 1, b: 2 }, Some(10), Some(20))?;
        assert!(pair.is_valid(Some(10), Some(20)));
        assert!(!pair.is_valid(Some(11), Some(20)));
        assert!(!pair.is_valid(Some(10), Some(21)));
        assert!(!pair.is_valid(Some(10), None));

        let wall_x = Event::new(1.0, WallX { i: 3 }, Some(7), None)?;
        assert!(wall_x.is_valid(Some(7), None));
        assert!(!wall_x.is_valid(Some(8), None));
        // An unrelated second counter does not invalidate a wall event.
        assert!(wall_x.is_valid(Some(7), Some(999)));

        let wall_y = Event::new(1.0, WallY { i: 3 }, None, Some(7))?;
        assert!(wall_y.is_valid(None, Some(7)));
        assert!(!wall_y.is_valid(None, Some(8)));
        Ok(())
    }

    #[test]
    fn redraw_never_goes_stale() -> Result<()> {
        let e = Event::new(0.25, Redraw, None, None)?;
        assert!(e.is_valid(None, None));
        assert!(e.is_valid(Some(42), Some(7)));
        Ok(())
    }

    #[test]
    fn participants_by_kind() {
        assert_eq!(Pair { a: 2, b: 5 }.participants(), (Some(2), Some(5)));
        assert_eq!(WallX { i: 9 }.participants(), (Some(9), None));
        assert_eq!(WallY { i: 9 }.participants(), (None, Some(9)));
        assert_eq!(Redraw.participants(), (None, None));
    }

    #[test]
    fn time_f64_round_trips() -> Result<()> {
        let e = Event::new(3.5, Redraw, None, None)?;
        assert_eq!(e.time_f64(), 3.5);
        Ok(())
    }
}
