//! Property-based invariant tests for the value bridge.
//!
//! 1. The rendered value equals the last value pushed by the currently
//!    selected, not-yet-terminated source (or the default before any).
//! 2. At most one subject has a live observer from the bridge at any time.
//! 3. Completion and failure handlers fire at most once per subscription and
//!    only for the selected source.
//! 4. With suspense, a render of a source suspends iff the current cycle has
//!    seen no event, a render without a source suspends iff a token is still
//!    outstanding, and a cycle never issues more than one token.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_core::stream::Subject;
use tether_core::StreamError;
use tether_runtime::bridge::{BridgeOptions, ValueBridge};
use tether_runtime::host::RenderSignal;

const SOURCES: usize = 3;
const DEFAULT: i32 = -1;

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Select(Option<usize>),
    Next(usize, i32),
    Complete(usize),
    Error(usize),
    Render,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => proptest::option::of(0..SOURCES).prop_map(Op::Select),
        6 => (0..SOURCES, any::<i32>()).prop_map(|(s, v)| Op::Next(s, v)),
        1 => (0..SOURCES).prop_map(Op::Complete),
        1 => (0..SOURCES).prop_map(Op::Error),
        2 => Just(Op::Render),
    ]
}

/// Reference model of the bridge.
#[derive(Default)]
struct Model {
    selected: Option<usize>,
    subscribed: Option<usize>,
    value: Option<i32>,
    stopped: [bool; SOURCES],
    /// Whether the current cycle has seen an event.
    settled: bool,
    /// Whether a token was handed out and has not fired.
    awaiting: bool,
    terminals: u32,
    cycles: u64,
}

impl Model {
    fn new() -> Self {
        Self {
            value: Some(DEFAULT),
            ..Self::default()
        }
    }

    /// Apply a render of the selected source. Returns whether it suspends
    /// when suspense is requested.
    fn render(&mut self) -> bool {
        if self.selected != self.subscribed {
            self.subscribed = self.selected;
            if let Some(s) = self.selected {
                self.cycles += 1;
                self.settled = false;
                // A stopped subject replays its terminal event on subscribe.
                if self.stopped[s] {
                    self.settle();
                    self.terminals += 1;
                }
            }
        }
        if self.selected.is_some() && !self.settled {
            self.awaiting = true;
        }
        match self.selected {
            Some(_) => !self.settled,
            None => self.awaiting,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
        self.awaiting = false;
    }

    fn event(&mut self, source: usize, next: Option<i32>) {
        if self.subscribed == Some(source) && !self.stopped[source] {
            self.settle();
            match next {
                Some(v) => self.value = Some(v),
                None => self.terminals += 1,
            }
        }
        if next.is_none() {
            self.stopped[source] = true;
        }
    }
}

struct Harness {
    subjects: Vec<Subject<i32>>,
    bridge: ValueBridge<i32>,
    options: BridgeOptions<i32>,
    terminals: Rc<Cell<u32>>,
}

impl Harness {
    fn new(suspense: bool) -> Self {
        let terminals = Rc::new(Cell::new(0));
        let (c, e) = (Rc::clone(&terminals), Rc::clone(&terminals));
        let options = BridgeOptions::new()
            .default_value(DEFAULT)
            .suspense(suspense)
            .on_complete(move || c.set(c.get() + 1))
            .on_error(move |_: StreamError| e.set(e.get() + 1));
        Self {
            subjects: (0..SOURCES).map(|_| Subject::new()).collect(),
            bridge: ValueBridge::new(RenderSignal::new()),
            options,
            terminals,
        }
    }

    fn render(&mut self, selected: Option<usize>) -> Result<Option<i32>, ()> {
        let source = selected.map(|i| self.subjects[i].as_observable());
        self.bridge
            .bridge_value(source.as_ref(), &self.options)
            .map_err(|_| ())
    }

    fn live_observers(&self) -> usize {
        self.subjects.iter().map(Subject::observer_count).sum()
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Value, single subscription, and terminal handlers match the model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bridge_matches_model(ops in proptest::collection::vec(op_strategy(), 0..=64)) {
        let mut h = Harness::new(false);
        let mut m = Model::new();

        for op in ops {
            match op {
                Op::Select(selected) => {
                    m.selected = selected;
                    m.render();
                    prop_assert_eq!(h.render(selected), Ok(m.value));
                }
                Op::Render => {
                    m.render();
                    prop_assert_eq!(h.render(m.selected), Ok(m.value));
                }
                Op::Next(s, v) => {
                    h.subjects[s].next(v);
                    m.event(s, Some(v));
                }
                Op::Complete(s) => {
                    h.subjects[s].complete();
                    m.event(s, None);
                }
                Op::Error(s) => {
                    h.subjects[s].error(StreamError::msg("boom"));
                    m.event(s, None);
                }
            }
            prop_assert!(h.live_observers() <= 1);
            prop_assert_eq!(h.terminals.get(), m.terminals);
        }
    }
}

proptest! {
    #[test]
    fn stopped_source_replays_terminal_once(stop_with_error in any::<bool>(), renders in 1usize..5) {
        let mut h = Harness::new(false);
        if stop_with_error {
            h.subjects[0].error(StreamError::msg("gone"));
        } else {
            h.subjects[0].complete();
        }
        for _ in 0..renders {
            prop_assert_eq!(h.render(Some(0)), Ok(Some(DEFAULT)));
        }
        prop_assert_eq!(h.terminals.get(), 1);
        prop_assert_eq!(h.live_observers(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Suspension tracks the first event of each cycle
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn suspense_follows_first_event(ops in proptest::collection::vec(op_strategy(), 0..=64)) {
        let mut h = Harness::new(true);
        let mut m = Model::new();

        for op in ops {
            match op {
                Op::Select(_) | Op::Render => {
                    if let Op::Select(selected) = op {
                        m.selected = selected;
                    }
                    let suspends = m.render();
                    let result = h.render(m.selected);
                    if suspends {
                        prop_assert_eq!(result, Err(()));
                    } else {
                        prop_assert_eq!(result, Ok(m.value));
                    }
                }
                Op::Next(s, v) => {
                    h.subjects[s].next(v);
                    m.event(s, Some(v));
                }
                Op::Complete(s) => {
                    h.subjects[s].complete();
                    m.event(s, None);
                }
                Op::Error(s) => {
                    h.subjects[s].error(StreamError::msg("boom"));
                    m.event(s, None);
                }
            }
            prop_assert!(h.bridge.tokens_issued() <= m.cycles);
            prop_assert_eq!(h.terminals.get(), m.terminals);
        }
    }
}
