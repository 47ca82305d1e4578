//! The event-classification state machine of spec.md §4.5: converts noisy
//! per-id trajectories into debounced `enter`/`exit` commit and cancel
//! events.
//!
//! This is deliberately pure and I/O-free (no queues, no logging): it
//! takes a door state and a set of `(bbox, id)` tracker rows per tick and
//! returns the list of commit/cancel emissions for the caller
//! (`boardcount-core`'s tracker worker) to turn into counter updates and
//! log records. Keeping it pure makes the six concrete scenarios of
//! spec.md §8 (S1-S6's tracker-relevant S1-S4) directly unit-testable
//! without constructing a queue/worker harness.

use std::collections::VecDeque;

use boardcount_types::{BBox, DirectionState, DoorState, EventName};

use crate::ordered_map::OrderedBoundedMap;

#[derive(Debug, Clone, Copy)]
pub struct EventClassifierParams {
    pub width: f64,
    pub height: f64,
    pub line_height: f64,
    pub num_frames_to_average: usize,
    pub min_frames_to_count: u64,
    pub max_tracked_objects: usize,
}

impl EventClassifierParams {
    fn delta_y(&self) -> f64 {
        self.height / 20.0
    }

    fn x_min(&self) -> f64 {
        self.width / 6.0
    }

    fn x_max(&self) -> f64 {
        self.width - self.width / 6.0
    }
}

/// One committed or cancelled event, to be turned into a counter update
/// and a [`boardcount_types::LogRecord`] by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Commit(EventName),
    Cancel(EventName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub id: u64,
    pub emission: Emission,
}

#[derive(Clone)]
struct Windows {
    cy: VecDeque<f64>,
    y1: VecDeque<f64>,
    y2: VecDeque<f64>,
    cap: usize,
}

impl Windows {
    fn new(cap: usize) -> Self {
        Self {
            cy: VecDeque::with_capacity(cap),
            y1: VecDeque::with_capacity(cap),
            y2: VecDeque::with_capacity(cap),
            cap,
        }
    }

    fn push(&mut self, cy: f64, y1: f64, y2: f64) {
        push_bounded(&mut self.cy, cy, self.cap);
        push_bounded(&mut self.y1, y1, self.cap);
        push_bounded(&mut self.y2, y2, self.cap);
    }
}

fn push_bounded(deque: &mut VecDeque<f64>, value: f64, cap: usize) {
    deque.push_back(value);
    while deque.len() > cap {
        deque.pop_front();
    }
}

fn mean(deque: &VecDeque<f64>) -> f64 {
    if deque.is_empty() {
        return 0.0;
    }
    deque.iter().sum::<f64>() / deque.len() as f64
}

fn detect_raw_event(
    avg_cy: f64,
    cy: f64,
    avg_y1: f64,
    y1: f64,
    avg_y2: f64,
    y2: f64,
    line_height: f64,
    delta_y: f64,
) -> Option<(EventName, bool)> {
    if avg_cy < line_height && cy > line_height {
        return Some((EventName::Enter, false));
    }
    if avg_cy > line_height && cy < line_height {
        return Some((EventName::Exit, false));
    }
    if avg_y2 > (line_height - delta_y) && y2 < (line_height - delta_y) {
        return Some((EventName::Exit, true));
    }
    if avg_y1 < (line_height + delta_y) && y1 > (line_height + delta_y) {
        return Some((EventName::Enter, true));
    }
    None
}

/// Per-camera tracker state. One instance per [`Stream`](boardcount-core).
pub struct EventClassifier {
    params: EventClassifierParams,
    frame_counter: u64,
    windows: OrderedBoundedMap<u64, Windows>,
    last_direction: OrderedBoundedMap<u64, DirectionState>,
}

impl EventClassifier {
    pub fn new(params: EventClassifierParams) -> Self {
        Self {
            params,
            frame_counter: 0,
            windows: OrderedBoundedMap::default(),
            last_direction: OrderedBoundedMap::default(),
        }
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Run one tick: `tracks` is the tracker's `(bbox, id)` output for this
    /// frame. `door` gates event *detection* only — sliding windows are
    /// still updated while the door is closed, matching
    /// `tracker/tracker.py::update_counters`'s unconditional window append.
    pub fn process_tick(&mut self, door: DoorState, tracks: &[(BBox, u64)]) -> Vec<TickEvent> {
        self.frame_counter += 1;
        let mut emitted = Vec::new();

        let x_min = self.params.x_min();
        let x_max = self.params.x_max();
        let line_height = self.params.line_height;
        let delta_y = self.params.delta_y();
        let cap = self.params.num_frames_to_average;

        for &(bbox, id) in tracks {
            let cx = bbox.center_x();
            let cy = bbox.center_y();
            let y1 = bbox.y1;
            let y2 = bbox.y2;

            let has_window = self.windows.get(&id).is_some();
            if has_window && door.is_open() && cx >= x_min && cx <= x_max {
                let w = self.windows.get(&id).unwrap();
                let avg_cy = mean(&w.cy);
                let avg_y1 = mean(&w.y1);
                let avg_y2 = mean(&w.y2);

                if let Some((name, weak)) =
                    detect_raw_event(avg_cy, cy, avg_y1, y1, avg_y2, y2, line_height, delta_y)
                {
                    for emission in self.transition(id, name, weak) {
                        emitted.push(TickEvent { id, emission });
                    }
                }
            }

            self.windows
                .get_or_insert_with(id, || Windows::new(cap))
                .push(cy, y1, y2);
        }

        self.windows.evict_to_cap(self.params.max_tracked_objects);
        self.last_direction.evict_to_cap(self.params.max_tracked_objects);

        emitted
    }

    /// Apply the hysteresis rules of spec.md §4.5 for one raw event and
    /// return the emissions (0, 1, or 2: an optional cancel followed by an
    /// optional commit).
    fn transition(&mut self, id: u64, name: EventName, is_weak: bool) -> Vec<Emission> {
        let new_tag = if is_weak { name.weak() } else { name.strong() };
        let frame = self.frame_counter;

        match self.last_direction.get(&id).copied() {
            None => {
                // Rule 1: no prior event for this id.
                self.last_direction.insert(id, DirectionState { tag: new_tag, frame });
                vec![Emission::Commit(name)]
            }
            Some(state) if state.tag.name() == name.opposite() => {
                let delta_f = frame.saturating_sub(state.frame);
                if state.tag.is_weak() && delta_f < self.params.min_frames_to_count {
                    // Rule 2: weak opposite inside the debounce horizon — cancel then commit.
                    self.last_direction.insert(id, DirectionState { tag: new_tag, frame });
                    vec![Emission::Cancel(state.tag.name()), Emission::Commit(name)]
                } else if state.tag.is_strong() && delta_f >= self.params.min_frames_to_count {
                    // Rule 4: strong opposite that has waited out the debounce horizon.
                    self.last_direction.insert(id, DirectionState { tag: new_tag, frame });
                    vec![Emission::Commit(name)]
                } else {
                    // Rule 5: strong opposite too soon, or weak opposite past the
                    // horizon — neither is specified as actionable; do nothing.
                    vec![]
                }
            }
            Some(state) if state.tag.name() == name && state.tag.is_weak() && !is_weak => {
                // Rule 3: same-name weak→strong upgrade. No counter change, no
                // commit, frame of the original commit is preserved.
                self.last_direction
                    .insert(id, DirectionState { tag: new_tag, frame: state.frame });
                vec![]
            }
            Some(_) => {
                // Rule 5: same name repeat, or an attempted strong→weak
                // downgrade — do nothing.
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardcount_types::BBox;

    fn params() -> EventClassifierParams {
        EventClassifierParams {
            width: 640.0,
            height: 640.0,
            line_height: 130.0,
            num_frames_to_average: 5,
            min_frames_to_count: 500,
            max_tracked_objects: 100,
        }
    }

    fn box_at(cy: f64) -> BBox {
        // x within [x_min, x_max] = [106.6, 533.3] for width 640.
        BBox::new(300.0, cy - 5.0, 320.0, cy + 5.0).unwrap()
    }

    /// S1. Single strong enter.
    #[test]
    fn s1_single_strong_enter() {
        let mut ec = EventClassifier::new(params());
        let mut events = Vec::new();
        for _ in 0..5 {
            events.extend(ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]));
        }
        for _ in 0..5 {
            events.extend(ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]));
        }
        assert_eq!(events, vec![TickEvent { id: 1, emission: Emission::Commit(EventName::Enter) }]);
    }

    /// S2. Weak-then-strong upgrade: one commit, no duplicate.
    #[test]
    fn upgrade_weak_to_strong_enter_no_double_count() {
        let mut ec = EventClassifier::new(params());
        // Build a window sitting just below the high band so a weak-enter
        // trigger fires: avg_y1 < line+delta, y1 crosses above line+delta.
        let delta = 640.0 / 20.0; // 32
        let below = 130.0 + delta - 5.0;
        let above = 130.0 + delta + 5.0;

        for _ in 0..5 {
            let bbox = BBox::new(300.0, below - 5.0, 320.0, below + 5.0).unwrap();
            ec.process_tick(DoorState::Open, &[(bbox, 1)]);
        }
        let bbox_weak = BBox::new(300.0, above - 5.0, 320.0, above + 5.0).unwrap();
        let weak_events = ec.process_tick(DoorState::Open, &[(bbox_weak, 1)]);
        assert_eq!(weak_events, vec![TickEvent { id: 1, emission: Emission::Commit(EventName::Enter) }]);

        // Refill the window above the line so the next strong predicate can
        // fire, then cross the centre line to trigger enter_s while the
        // debounce horizon has not elapsed (same name: upgrade, not cancel).
        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]);
        }
        let strong_events = ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]);
        assert!(strong_events.is_empty(), "upgrade must not re-commit");
    }

    /// Symmetric case of the above for exit: weak exit upgrading to strong
    /// exit must not touch `count_out` a second time either.
    #[test]
    fn upgrade_weak_to_strong_exit_no_double_count() {
        let mut ec = EventClassifier::new(params());
        let delta = 640.0 / 20.0;
        let above_low = 130.0 - delta + 5.0;
        let below_low = 130.0 - delta - 5.0;

        for _ in 0..5 {
            let bbox = BBox::new(300.0, above_low - 5.0, 320.0, above_low + 5.0).unwrap();
            ec.process_tick(DoorState::Open, &[(bbox, 1)]);
        }
        let bbox_weak = BBox::new(300.0, below_low - 5.0, 320.0, below_low + 5.0).unwrap();
        let weak_events = ec.process_tick(DoorState::Open, &[(bbox_weak, 1)]);
        assert_eq!(weak_events, vec![TickEvent { id: 1, emission: Emission::Commit(EventName::Exit) }]);

        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]);
        }
        let strong_events = ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]);
        assert!(strong_events.is_empty(), "upgrade must not re-commit");
    }

    /// S3. Cancellation: weak exit then strong enter inside the debounce
    /// horizon cancels the exit and commits the enter.
    #[test]
    fn s3_cancellation() {
        let mut ec = EventClassifier::new(params());
        let delta = 640.0 / 20.0;
        let above_low = 130.0 - delta + 5.0;
        let below_low = 130.0 - delta - 5.0;

        for _ in 0..5 {
            let bbox = BBox::new(300.0, above_low - 5.0, 320.0, above_low + 5.0).unwrap();
            ec.process_tick(DoorState::Open, &[(bbox, 1)]);
        }
        let bbox_weak_exit = BBox::new(300.0, below_low - 5.0, 320.0, below_low + 5.0).unwrap();
        let weak_exit = ec.process_tick(DoorState::Open, &[(bbox_weak_exit, 1)]);
        assert_eq!(weak_exit, vec![TickEvent { id: 1, emission: Emission::Commit(EventName::Exit) }]);

        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]);
        }
        let cancel_then_enter = ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]);
        assert_eq!(
            cancel_then_enter,
            vec![
                TickEvent { id: 1, emission: Emission::Cancel(EventName::Exit) },
                TickEvent { id: 1, emission: Emission::Commit(EventName::Enter) },
            ]
        );
    }

    /// S4. Door closed the entire run: never emits.
    #[test]
    fn s4_door_closed_never_emits() {
        let mut ec = EventClassifier::new(params());
        let mut events = Vec::new();
        for _ in 0..5 {
            events.extend(ec.process_tick(DoorState::Closed, &[(box_at(100.0), 1)]));
        }
        for _ in 0..5 {
            events.extend(ec.process_tick(DoorState::Closed, &[(box_at(200.0), 1)]));
        }
        assert!(events.is_empty());
    }

    /// Two strong-opposite events inside the debounce horizon: one commit,
    /// no cancellation (rule 4 requires the horizon to have elapsed).
    #[test]
    fn strong_opposite_inside_horizon_is_ignored() {
        let mut ec = EventClassifier::new(params());
        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]);
        }
        let enter = ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]);
        assert_eq!(enter, vec![TickEvent { id: 1, emission: Emission::Commit(EventName::Enter) }]);

        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(box_at(200.0), 1)]);
        }
        let exit_attempt = ec.process_tick(DoorState::Open, &[(box_at(100.0), 1)]);
        assert!(exit_attempt.is_empty());
    }

    #[test]
    fn x_window_outside_bounds_suppresses_events() {
        let mut ec = EventClassifier::new(params());
        let far_left = BBox::new(0.0, 95.0, 10.0, 105.0).unwrap();
        for _ in 0..5 {
            ec.process_tick(DoorState::Open, &[(far_left, 1)]);
        }
        let far_left_crossing = BBox::new(0.0, 195.0, 10.0, 205.0).unwrap();
        let events = ec.process_tick(DoorState::Open, &[(far_left_crossing, 1)]);
        assert!(events.is_empty());
    }

    #[test]
    fn bounded_state_evicts_oldest_ids() {
        let mut params = params();
        params.max_tracked_objects = 2;
        let mut ec = EventClassifier::new(params);
        for id in 1..=3u64 {
            ec.process_tick(DoorState::Open, &[(box_at(100.0), id)]);
        }
        assert!(ec.windows.len() <= 2);
    }
}
