// spec.md §4.2 Evaluation Registry. The process-wide set of in-flight
// `Eval`s, indexed by event-id (duplicate suppression) and by owning
// task (so destroying a task can tear down its evals per spec.md §9's
// "cyclic ownership" design note), plus a sequence index once the
// write phase has assigned one.

use crate::eval::{Eval, EvalId, TaskId};
use crate::fault::Fault;
use crate::options::Options;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use submerge_model::{EventId, EventSource, RoomVersion};

pub type EvalHandle = Arc<Mutex<Eval>>;

#[derive(Default)]
pub struct EvalRegistry {
    next_id: AtomicU64,
    evals: DashMap<EvalId, EvalHandle>,
    by_event: DashMap<EventId, Vec<EvalId>>,
    by_task: DashMap<TaskId, Vec<EvalId>>,
    by_sequence: Mutex<BTreeMap<u64, EvalId>>,
}

impl EvalRegistry {
    pub fn new() -> Self {
        EvalRegistry::default()
    }

    fn next_id(&self) -> EvalId {
        EvalId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Creates and inserts an `Eval`, enforcing spec.md §4.2's duplicate
    /// admission contract: unless `options.admission.unique` is false or
    /// `replays` is set, a second eval for an already-live `event_id`
    /// fails with `EXISTS` and is not inserted.
    pub fn create(
        &self,
        options: Arc<Options>,
        task: TaskId,
        events: Vec<Arc<EventSource>>,
        room_version: RoomVersion,
    ) -> Result<EvalHandle, Fault> {
        let event_id = events.first().and_then(|e| e.event_id()).cloned();
        if let Some(ref id) = event_id {
            if options.admission.unique && !options.admission.replays && self.count(id) > 0 {
                return Err(Fault::Exists);
            }
        }
        let id = self.next_id();
        let eval = Arc::new(Mutex::new(Eval::new(id, options, task, events, room_version)));
        self.insert(id, event_id, task, eval.clone());
        Ok(eval)
    }

    fn insert(&self, id: EvalId, event_id: Option<EventId>, task: TaskId, handle: EvalHandle) {
        self.evals.insert(id, handle);
        if let Some(event_id) = event_id {
            self.by_event.entry(event_id).or_default().push(id);
        }
        self.by_task.entry(task).or_default().push(id);
    }

    /// Removes an eval from every index. Idempotent.
    pub fn remove(&self, id: EvalId) {
        let Some((_, handle)) = self.evals.remove(&id) else {
            return;
        };
        let eval = handle.lock();
        if let Some(event_id) = eval.event_id() {
            if let Some(mut ids) = self.by_event.get_mut(event_id) {
                ids.retain(|e| *e != id);
            }
        }
        if let Some(mut ids) = self.by_task.get_mut(&eval.task) {
            ids.retain(|e| *e != id);
        }
        if let Some(seq) = eval.sequence {
            self.by_sequence.lock().remove(&seq);
        }
    }

    /// Every eval belonging to `task` is destroyed when the task is
    /// (spec.md §3 Registry invariants: "destroying the task must
    /// destroy its evals").
    pub fn remove_task(&self, task: TaskId) {
        let ids = self.by_task.get(&task).map(|v| v.clone()).unwrap_or_default();
        for id in ids {
            self.remove(id);
        }
    }

    pub fn find(&self, event_id: &EventId) -> Option<EvalHandle> {
        self.by_event
            .get(event_id)
            .and_then(|ids| ids.first().copied())
            .and_then(|id| self.evals.get(&id).map(|e| e.clone()))
    }

    pub fn count(&self, event_id: &EventId) -> usize {
        self.by_event.get(event_id).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn for_each(&self, task: Option<TaskId>, mut f: impl FnMut(&Eval)) {
        match task {
            Some(task) => {
                if let Some(ids) = self.by_task.get(&task) {
                    for id in ids.iter() {
                        if let Some(handle) = self.evals.get(id) {
                            f(&handle.lock());
                        }
                    }
                }
            }
            None => {
                for entry in self.evals.iter() {
                    f(&entry.value().lock());
                }
            }
        }
    }

    /// Records that `id` now holds `sequence`, once the write phase has
    /// allocated one. Asserts spec.md §4.2's "sequence uniqueness"
    /// contract: the writer must check `seq_unique` before calling this.
    pub fn assign_sequence(&self, id: EvalId, sequence: u64) {
        self.by_sequence.lock().insert(sequence, id);
    }

    pub fn seq_unique(&self, sequence: u64) -> bool {
        !self.by_sequence.lock().contains_key(&sequence)
    }

    pub fn seq_min(&self) -> Option<u64> {
        self.by_sequence.lock().keys().next().copied()
    }

    pub fn seq_max(&self) -> Option<u64> {
        self.by_sequence.lock().keys().next_back().copied()
    }

    /// The next live eval with `sequence` strictly greater than `s`.
    pub fn seq_next(&self, s: u64) -> Option<EvalHandle> {
        let id = *self
            .by_sequence
            .lock()
            .range((std::ops::Bound::Excluded(s), std::ops::Bound::Unbounded))
            .next()?
            .1;
        self.evals.get(&id).map(|e| e.clone())
    }

    /// Stable ascending-by-sequence enumeration (spec.md §4.2
    /// "`seq_sort` guarantees stable ordering by sequence").
    pub fn seq_sort(&self) -> Vec<EvalId> {
        self.by_sequence.lock().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.evals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evals.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use submerge_model::{Event, RoomVersion};
    use test_log::test;

    fn fixture_event(id: &str) -> Arc<EventSource> {
        let mut tuple = Event {
            kind: "m.room.message".into(),
            sender: "@alice:example.org".into(),
            room_id: "!room:example.org".into(),
            state_key: None,
            content: serde_json::json!({}),
            depth: 2,
            prev_events: vec![],
            auth_events: vec![],
            hashes: None,
            signatures: Default::default(),
            origin: "example.org".into(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: None,
        };
        tuple.event_id = Some(id.into());
        Arc::new(EventSource {
            tuple,
            source: None,
            room_version: RoomVersion::V11,
        })
    }

    #[test]
    fn duplicate_event_id_is_rejected_by_default() {
        let registry = EvalRegistry::new();
        let options = Arc::new(Options::default());
        let task = TaskId(1);
        let first = registry.create(options.clone(), task, vec![fixture_event("$a")], RoomVersion::V11);
        assert!(first.is_ok());
        assert_eq!(registry.count(&EventId::new("$a")), 1);

        let second = registry.create(options, task, vec![fixture_event("$a")], RoomVersion::V11);
        assert!(matches!(second, Err(Fault::Exists)));
    }

    #[test]
    fn replays_option_permits_duplicate_admission() {
        let registry = EvalRegistry::new();
        let mut opts = Options::default();
        opts.admission.replays = true;
        let options = Arc::new(opts);
        let task = TaskId(1);
        assert!(registry.create(options.clone(), task, vec![fixture_event("$a")], RoomVersion::V11).is_ok());
        assert!(registry.create(options, task, vec![fixture_event("$a")], RoomVersion::V11).is_ok());
        assert_eq!(registry.count(&EventId::new("$a")), 2);
    }

    #[test]
    fn removing_a_task_destroys_its_evals() {
        let registry = EvalRegistry::new();
        let options = Arc::new(Options::default());
        let task = TaskId(9);
        registry.create(options, task, vec![fixture_event("$a")], RoomVersion::V11).unwrap();
        assert_eq!(registry.len(), 1);
        registry.remove_task(task);
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.count(&EventId::new("$a")), 0);
    }

    #[test]
    fn sequence_enumeration_is_ascending_and_unique() {
        let registry = EvalRegistry::new();
        let options = Arc::new(Options::default());
        let task = TaskId(1);
        let a = registry.create(options.clone(), task, vec![fixture_event("$a")], RoomVersion::V11).unwrap();
        let b = registry.create(options, task, vec![fixture_event("$b")], RoomVersion::V11).unwrap();
        a.lock().sequence = Some(5);
        registry.assign_sequence(a.lock().id, 5);
        b.lock().sequence = Some(7);
        registry.assign_sequence(b.lock().id, 7);

        assert!(!registry.seq_unique(5));
        assert!(registry.seq_unique(6));
        assert_eq!(registry.seq_min(), Some(5));
        assert_eq!(registry.seq_max(), Some(7));
        assert_eq!(registry.seq_sort(), vec![a.lock().id, b.lock().id]);
        assert_eq!(registry.seq_next(5).unwrap().lock().id, b.lock().id);
    }
}
