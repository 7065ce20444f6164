//! Render cache - versioned record of one keyed item's rendered output.
//!
//! The keyed-list primitive keeps one cache per item key. A cache is an
//! ordered doubly-linked list of previously rendered outputs plus a read
//! cursor. Each reconciliation pass runs the same protocol:
//!
//! 1. [`RenderCache::start`] begins a pass at a version, resetting the
//!    cursor to the most recent record;
//! 2. [`RenderCache::get`] hands out one cached output per call, walking
//!    backward from the tail, never the same record twice in one pass;
//! 3. [`RenderCache::add`] appends output rendered fresh during the pass;
//! 4. [`RenderCache::end`] freezes the cursor as the boundary between
//!    records the pass referenced and records it left behind;
//! 5. [`RenderCache::cleanup`] detaches everything on the unreferenced side,
//!    invoking a per-record teardown, and reports whether the key still has
//!    live output.
//!
//! A key may legitimately own more than one record across renders (its
//! rendering can gain or lose nodes), which is why "does this key still have
//! live output" is answered by the list, not a flag.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::view::RenderOutput;

type Slot = Rc<RefCell<CacheSlot>>;

struct CacheSlot {
    output: RenderOutput,
    prev: Option<Weak<RefCell<CacheSlot>>>,
    next: Option<Slot>,
}

/// Per-key record of previously rendered output. See the module docs for the
/// pass protocol.
pub struct RenderCache {
    head: Option<Slot>,
    tail: Option<Slot>,
    cursor: Option<Slot>,
    boundary: Option<Slot>,
    version: u64,
    running: bool,
}

impl RenderCache {
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            cursor: None,
            boundary: None,
            version: 0,
            running: false,
        }
    }

    /// Begin a read pass at `version`, resetting the cursor to the tail.
    ///
    /// No-op only when a pass is already running at this same version, which
    /// guards against a re-entrant double start mid-pass. A fresh start at
    /// the version already tracked (while not running) still resets the
    /// cursor: it is a new pass.
    pub fn start(&mut self, version: u64) {
        if self.running && self.version == version {
            return;
        }
        self.cursor = self.tail.clone();
        self.version = version;
        self.running = true;
    }

    /// Hand out the next cached output, most recent first, advancing the
    /// cursor. `None` once the pass has consumed every record (the caller
    /// renders fresh and [`RenderCache::add`]s).
    pub fn get(&mut self) -> Option<RenderOutput> {
        let current = self.cursor.take()?;
        let slot = current.borrow();
        self.cursor = slot.prev.as_ref().and_then(Weak::upgrade);
        Some(slot.output.clone())
    }

    /// Append freshly rendered output as the newest record.
    pub fn add(&mut self, output: RenderOutput) {
        let slot = Rc::new(RefCell::new(CacheSlot {
            output,
            prev: self.tail.as_ref().map(Rc::downgrade),
            next: None,
        }));
        if let Some(tail) = &self.tail {
            tail.borrow_mut().next = Some(slot.clone());
        }
        if self.head.is_none() {
            self.head = Some(slot.clone());
        }
        self.tail = Some(slot);
    }

    /// End the pass, freezing the cursor as the referenced/unreferenced
    /// boundary for [`RenderCache::cleanup`].
    pub fn end(&mut self) {
        self.running = false;
        self.boundary = self.cursor.clone();
    }

    /// Detach and tear down every record the last pass did not reference
    /// (the boundary record and everything older). Returns whether any
    /// record remains. Idempotent when there is nothing to clean.
    pub fn cleanup(&mut self, teardown: &mut dyn FnMut(&RenderOutput)) -> bool {
        if let Some(boundary) = self.boundary.take() {
            let next = boundary.borrow_mut().next.take();
            if let Some(next) = &next {
                next.borrow_mut().prev = None;
            }
            if self
                .tail
                .as_ref()
                .is_some_and(|tail| Rc::ptr_eq(tail, &boundary))
            {
                self.tail = None;
            }
            self.head = next;
            self.cursor = None;
            Self::unlink_backward(boundary, teardown);
        }
        self.tail.is_some()
    }

    /// Tear down every record unconditionally. Used when the keyed list
    /// itself is being destroyed.
    pub fn clear(&mut self, teardown: &mut dyn FnMut(&RenderOutput)) {
        if let Some(tail) = self.tail.take() {
            Self::unlink_backward(tail, teardown);
        }
        self.head = None;
        self.cursor = None;
        self.boundary = None;
        self.running = false;
    }

    fn unlink_backward(from: Slot, teardown: &mut dyn FnMut(&RenderOutput)) {
        let mut current = Some(from);
        while let Some(slot) = current {
            let mut slot = slot.borrow_mut();
            teardown(&slot.output);
            slot.next = None;
            current = slot.prev.take().as_ref().and_then(Weak::upgrade);
        }
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderCache {
    fn drop(&mut self) {
        // Unlink iteratively; dropping a long strong `next` chain through
        // nested destructors could exhaust the stack.
        let mut slot = self.head.take();
        while let Some(current) = slot {
            slot = current.borrow_mut().next.take();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeRef, TextNode};

    fn output(label: &str) -> RenderOutput {
        RenderOutput::Node(NodeRef::Text(TextNode::new(label)))
    }

    fn labels(torn: &[RenderOutput]) -> Vec<String> {
        torn.iter()
            .map(|o| o.single().unwrap().outer_html())
            .collect()
    }

    #[test]
    fn test_get_walks_backward_without_repeats() {
        let mut cache = RenderCache::new();
        cache.add(output("old"));
        cache.add(output("new"));

        cache.start(1);
        let first = cache.get().unwrap().single().unwrap().outer_html();
        let second = cache.get().unwrap().single().unwrap().outer_html();
        assert_eq!(first, "new", "most recent record comes first");
        assert_eq!(second, "old");
        assert!(cache.get().is_none(), "a pass never repeats a record");
    }

    #[test]
    fn test_get_on_empty_cache_is_none() {
        let mut cache = RenderCache::new();
        cache.start(1);
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_cleanup_discards_unreferenced_side() {
        let mut cache = RenderCache::new();
        cache.add(output("stale"));
        cache.add(output("live"));

        cache.start(1);
        let _ = cache.get(); // references "live", cursor now at "stale"
        cache.end();

        let mut torn = Vec::new();
        let has_more = cache.cleanup(&mut |o| torn.push(o.clone()));
        assert!(has_more, "the referenced record remains");
        assert_eq!(labels(&torn), vec!["stale"]);

        // The surviving record is still readable next pass.
        cache.start(2);
        assert_eq!(cache.get().unwrap().single().unwrap().outer_html(), "live");
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_cleanup_of_untouched_pass_discards_everything() {
        let mut cache = RenderCache::new();
        cache.add(output("a"));
        cache.add(output("b"));

        cache.start(1);
        cache.end(); // no get: nothing referenced

        let mut torn = Vec::new();
        let has_more = cache.cleanup(&mut |o| torn.push(o.clone()));
        assert!(!has_more, "an untouched cache empties entirely");
        assert_eq!(labels(&torn), vec!["b", "a"]);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut cache = RenderCache::new();
        cache.add(output("a"));
        cache.start(1);
        cache.end();

        let mut count = 0;
        assert!(!cache.cleanup(&mut |_| count += 1));
        assert!(!cache.cleanup(&mut |_| count += 1));
        assert_eq!(count, 1, "second cleanup has nothing to do");
    }

    #[test]
    fn test_fresh_start_at_same_version_resets_cursor() {
        let mut cache = RenderCache::new();
        cache.add(output("a"));

        cache.start(1);
        assert!(cache.get().is_some());
        cache.end();

        // Not running anymore: same version still begins a new pass.
        cache.start(1);
        assert!(
            cache.get().is_some(),
            "a fresh pass at the tracked version resets the cursor"
        );
    }

    #[test]
    fn test_reentrant_start_mid_pass_is_ignored() {
        let mut cache = RenderCache::new();
        cache.add(output("a"));
        cache.add(output("b"));

        cache.start(1);
        let _ = cache.get();
        cache.start(1); // re-entrant double start: must not reset the cursor
        assert_eq!(cache.get().unwrap().single().unwrap().outer_html(), "a");
    }

    #[test]
    fn test_clear_tears_down_all_records() {
        let mut cache = RenderCache::new();
        cache.add(output("a"));
        cache.add(output("b"));

        let mut torn = Vec::new();
        cache.clear(&mut |o| torn.push(o.clone()));
        assert_eq!(labels(&torn), vec!["b", "a"]);

        cache.start(1);
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_add_mid_pass_is_not_read_by_that_pass() {
        let mut cache = RenderCache::new();
        cache.add(output("cached"));

        cache.start(1);
        let _ = cache.get();
        cache.add(output("fresh")); // appended by the running pass
        cache.end();

        let mut torn = Vec::new();
        assert!(cache.cleanup(&mut |o| torn.push(o.clone())));
        assert!(torn.is_empty(), "fresh and referenced records both survive");

        cache.start(2);
        assert_eq!(cache.get().unwrap().single().unwrap().outer_html(), "fresh");
        assert_eq!(cache.get().unwrap().single().unwrap().outer_html(), "cached");
    }
}
