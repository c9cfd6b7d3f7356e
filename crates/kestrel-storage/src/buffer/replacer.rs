//! LRU-K eviction policy for the buffer pool.
//!
//! LRU-K ranks frames by backward K-distance: the time since a frame's K-th
//! most recent access, infinite while a frame has fewer than K accesses.
//! Frames with infinite distance are preferred victims, oldest first; this
//! keeps one-touch scans from flushing the hot working set out of the pool.
//!
//! Rather than recomputing distances, the replacer keeps two queues. A
//! frame sits in the history queue until its K-th access promotes it to the
//! cache queue; position within each queue encodes the tie-breaking
//! timestamp. Eviction scans history front to back, then cache.

use parking_lot::Mutex;

use super::frame::FrameId;

/// Which queue a node currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queue {
    /// Fewer than K recorded accesses: backward K-distance is infinite.
    History,
    /// At least K recorded accesses.
    Cache,
}

/// Per-frame bookkeeping. Nodes are linked into their queue by frame index.
#[derive(Debug)]
struct Node {
    access_count: usize,
    evictable: bool,
    queue: Queue,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Head and tail of one intrusive queue.
#[derive(Debug, Default)]
struct QueueEnds {
    head: Option<usize>,
    tail: Option<usize>,
}

struct ReplacerInner {
    /// Node slots, indexed by frame id. `None` means untracked.
    nodes: Vec<Option<Node>>,
    history: QueueEnds,
    cache: QueueEnds,
    /// Number of tracked nodes whose evictable flag is set.
    evictable_count: usize,
}

impl ReplacerInner {
    fn ends(&mut self, queue: Queue) -> &mut QueueEnds {
        match queue {
            Queue::History => &mut self.history,
            Queue::Cache => &mut self.cache,
        }
    }

    /// Appends a tracked, unlinked node to the back of `queue`.
    fn push_back(&mut self, queue: Queue, id: usize) {
        let tail = self.ends(queue).tail;
        {
            let node = self.nodes[id].as_mut().expect("push of untracked node");
            node.queue = queue;
            node.prev = tail;
            node.next = None;
        }
        match tail {
            Some(tail_id) => {
                self.nodes[tail_id].as_mut().expect("corrupt queue").next = Some(id);
            }
            None => self.ends(queue).head = Some(id),
        }
        self.ends(queue).tail = Some(id);
    }

    /// Unlinks a tracked node from its queue.
    fn unlink(&mut self, id: usize) {
        let (queue, prev, next) = {
            let node = self.nodes[id].as_ref().expect("unlink of untracked node");
            (node.queue, node.prev, node.next)
        };
        match prev {
            Some(prev_id) => self.nodes[prev_id].as_mut().expect("corrupt queue").next = next,
            None => self.ends(queue).head = next,
        }
        match next {
            Some(next_id) => self.nodes[next_id].as_mut().expect("corrupt queue").prev = prev,
            None => self.ends(queue).tail = prev,
        }
        let node = self.nodes[id].as_mut().expect("unlink of untracked node");
        node.prev = None;
        node.next = None;
    }

    /// Returns the first evictable node in `queue`, front to back.
    fn first_evictable(&self, queue: Queue) -> Option<usize> {
        let mut cursor = match queue {
            Queue::History => self.history.head,
            Queue::Cache => self.cache.head,
        };
        while let Some(id) = cursor {
            let node = self.nodes[id].as_ref().expect("corrupt queue");
            if node.evictable {
                return Some(id);
            }
            cursor = node.next;
        }
        None
    }

    /// Drops an evictable node from the structure entirely.
    fn remove_node(&mut self, id: usize) {
        let evictable = self.nodes[id].as_ref().expect("remove of untracked node").evictable;
        assert!(evictable, "removed an unevictable frame");
        self.unlink(id);
        self.nodes[id] = None;
        self.evictable_count -= 1;
    }
}

/// LRU-K replacer tracking up to `num_frames` frames.
///
/// All operations serialize behind a single lock. Frame ids must lie in
/// `[0, num_frames)`; an out-of-range id is a caller bug and panics.
pub struct LruKReplacer {
    num_frames: usize,
    k: usize,
    inner: Mutex<ReplacerInner>,
}

impl LruKReplacer {
    /// Creates a replacer for `num_frames` frames with parameter `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k >= 1, "replacer k must be >= 1");
        Self {
            num_frames,
            k,
            inner: Mutex::new(ReplacerInner {
                nodes: (0..num_frames).map(|_| None).collect(),
                history: QueueEnds::default(),
                cache: QueueEnds::default(),
                evictable_count: 0,
            }),
        }
    }

    /// Records an access to `frame_id`.
    ///
    /// An untracked frame becomes tracked with one access, unevictable, at
    /// the back of the history queue (or directly in the cache queue when
    /// `k == 1`, where a single access already makes the K-distance finite).
    /// A tracked frame's count is bumped and the node requeues: to the back
    /// of history while still below K, into the cache queue at K, to the
    /// back of the cache queue beyond K. The evictable flag survives moves.
    pub fn record_access(&self, frame_id: FrameId) {
        let id = self.checked_index(frame_id);
        let mut inner = self.inner.lock();

        if inner.nodes[id].is_none() {
            let queue = if self.k == 1 {
                Queue::Cache
            } else {
                Queue::History
            };
            inner.nodes[id] = Some(Node {
                access_count: 1,
                evictable: false,
                queue,
                prev: None,
                next: None,
            });
            inner.push_back(queue, id);
            return;
        }

        let count = {
            let node = inner.nodes[id].as_mut().expect("tracked node");
            node.access_count += 1;
            node.access_count
        };
        let target = if count < self.k {
            Queue::History
        } else {
            Queue::Cache
        };
        inner.unlink(id);
        inner.push_back(target, id);
    }

    /// Sets whether `frame_id` may be evicted.
    ///
    /// No effect if the frame is untracked or the flag already matches.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let id = self.checked_index(frame_id);
        let mut inner = self.inner.lock();

        match inner.nodes[id].as_mut() {
            Some(node) if node.evictable != evictable => node.evictable = evictable,
            _ => return,
        }
        if evictable {
            inner.evictable_count += 1;
        } else {
            inner.evictable_count -= 1;
        }
    }

    /// Stops tracking `frame_id`.
    ///
    /// No effect if the frame is untracked.
    ///
    /// # Panics
    ///
    /// Panics if the frame is tracked but not evictable; removing a pinned
    /// frame's history is a caller bug.
    pub fn remove(&self, frame_id: FrameId) {
        let id = self.checked_index(frame_id);
        let mut inner = self.inner.lock();
        if inner.nodes[id].is_some() {
            inner.remove_node(id);
        }
    }

    /// Evicts the frame with the greatest backward K-distance among
    /// evictable frames, removing its access history.
    ///
    /// Frames still below K accesses (infinite distance) are taken first in
    /// queue order; only when none is evictable does the cache queue supply
    /// the victim. Returns `None` if nothing is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let victim = inner
            .first_evictable(Queue::History)
            .or_else(|| inner.first_evictable(Queue::Cache))?;
        inner.remove_node(victim);
        Some(FrameId::new(victim))
    }

    /// Returns the number of evictable frames.
    pub fn evictable_count(&self) -> usize {
        self.inner.lock().evictable_count
    }

    /// Returns the K parameter.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    fn checked_index(&self, frame_id: FrameId) -> usize {
        let id = frame_id.index();
        assert!(
            id < self.num_frames,
            "frame id {id} out of range for replacer of {} frames",
            self.num_frames
        );
        id
    }
}

impl std::fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruKReplacer")
            .field("num_frames", &self.num_frames)
            .field("k", &self.k)
            .field("evictable_count", &inner.evictable_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacer(num_frames: usize, k: usize) -> LruKReplacer {
        LruKReplacer::new(num_frames, k)
    }

    fn access_all(r: &LruKReplacer, ids: &[usize]) {
        for &id in ids {
            r.record_access(FrameId::new(id));
        }
    }

    fn evictable_all(r: &LruKReplacer, ids: &[usize]) {
        for &id in ids {
            r.set_evictable(FrameId::new(id), true);
        }
    }

    #[test]
    fn test_evicts_history_in_arrival_order() {
        let r = replacer(8, 2);
        access_all(&r, &[1, 2, 3]);
        evictable_all(&r, &[1, 2, 3]);

        assert_eq!(r.evict(), Some(FrameId::new(1)));
        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
        assert_eq!(r.evict(), None);
    }

    #[test]
    fn test_promotion_to_cache_keeps_arrival_order() {
        // Every frame reaches K = 2 in the order 1, 2, 3, 4; eviction
        // follows that promotion order.
        let r = replacer(8, 2);
        access_all(&r, &[1, 2, 3, 4, 1, 2, 3, 4]);
        evictable_all(&r, &[1, 2, 3, 4]);

        assert_eq!(r.evict(), Some(FrameId::new(1)));
        assert_eq!(r.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_history_beats_cache() {
        // Frame 1 is promoted by its second access; 2 and 3 still have
        // infinite K-distance and go first, in arrival order.
        let r = replacer(8, 2);
        access_all(&r, &[1, 2, 3, 1]);
        evictable_all(&r, &[1, 2, 3]);

        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
        assert_eq!(r.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_mixed_access_counts() {
        // k = 3: frame 1 accessed once, 2 twice, 3 three times. Only 3
        // reaches the cache queue; 1 and 2 leave history in arrival order.
        let r = replacer(8, 3);
        access_all(&r, &[1, 2, 2, 3, 3, 3]);
        evictable_all(&r, &[1, 2, 3]);

        assert_eq!(r.evict(), Some(FrameId::new(1)));
        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
    }

    #[test]
    fn test_k_one_goes_straight_to_cache() {
        let r = replacer(8, 1);
        access_all(&r, &[1, 2, 3]);
        evictable_all(&r, &[1, 2, 3]);

        // Re-access moves 1 to the back of the cache queue.
        r.record_access(FrameId::new(1));

        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
        assert_eq!(r.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_reaccess_below_k_requeues_history() {
        // k = 3: all frames stay in history, but frame 1's second access
        // moves it behind 2 and 3.
        let r = replacer(8, 3);
        access_all(&r, &[1, 2, 3, 1]);
        evictable_all(&r, &[1, 2, 3]);

        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
        assert_eq!(r.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_evictable_count() {
        let r = replacer(8, 2);
        access_all(&r, &[1, 2, 3]);
        assert_eq!(r.evictable_count(), 0);

        evictable_all(&r, &[1, 2, 3]);
        assert_eq!(r.evictable_count(), 3);

        // Repeating the flag changes nothing.
        r.set_evictable(FrameId::new(1), true);
        assert_eq!(r.evictable_count(), 3);

        r.set_evictable(FrameId::new(1), false);
        assert_eq!(r.evictable_count(), 2);

        // Untracked frame is a no-op.
        r.set_evictable(FrameId::new(7), true);
        assert_eq!(r.evictable_count(), 2);

        assert!(r.evict().is_some());
        assert_eq!(r.evictable_count(), 1);
    }

    #[test]
    fn test_evict_skips_unevictable() {
        let r = replacer(8, 2);
        access_all(&r, &[1, 2, 3]);
        evictable_all(&r, &[2, 3]);

        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(3)));
        assert_eq!(r.evict(), None);
    }

    #[test]
    fn test_evictable_flag_survives_promotion() {
        let r = replacer(8, 2);
        access_all(&r, &[1, 2]);
        evictable_all(&r, &[1, 2]);

        // Promote 1 into the cache queue; it must stay evictable.
        r.record_access(FrameId::new(1));
        assert_eq!(r.evictable_count(), 2);

        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let r = replacer(8, 2);
        r.remove(FrameId::new(3));
        assert_eq!(r.evictable_count(), 0);
    }

    #[test]
    fn test_remove_evictable() {
        let r = replacer(8, 2);
        access_all(&r, &[1, 2]);
        evictable_all(&r, &[1, 2]);

        r.remove(FrameId::new(1));
        assert_eq!(r.evictable_count(), 1);
        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), None);
    }

    #[test]
    #[should_panic(expected = "unevictable")]
    fn test_remove_unevictable_panics() {
        let r = replacer(8, 2);
        r.record_access(FrameId::new(1));
        r.remove(FrameId::new(1));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let r = replacer(4, 2);
        r.record_access(FrameId::new(4));
    }

    #[test]
    fn test_removed_frame_restarts_history() {
        // After eviction the access history is gone; a new access starts
        // from scratch in the history queue.
        let r = replacer(8, 2);
        access_all(&r, &[1, 1]);
        evictable_all(&r, &[1]);
        assert_eq!(r.evict(), Some(FrameId::new(1)));

        access_all(&r, &[2, 1]);
        evictable_all(&r, &[1, 2]);
        assert_eq!(r.evict(), Some(FrameId::new(2)));
        assert_eq!(r.evict(), Some(FrameId::new(1)));
    }
}
