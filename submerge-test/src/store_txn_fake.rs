// An in-memory `submerge_txn::StoreTxn` for writer tests elsewhere in
// the workspace that don't want to link `redb` (`submerge-rowdb`'s
// concrete implementation) just to exercise the write-phase plumbing.

use parking_lot::Mutex;
use std::sync::Arc;
use submerge_base::Result;
use submerge_txn::StoreTxn;

pub struct FakeStoreTxn {
    writes: Vec<(String, Vec<u8>)>,
    committed: Arc<Mutex<Vec<Vec<(String, Vec<u8>)>>>>,
}

impl FakeStoreTxn {
    pub fn new(committed: Arc<Mutex<Vec<Vec<(String, Vec<u8>)>>>>) -> Self {
        FakeStoreTxn {
            writes: Vec::new(),
            committed,
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.writes.push((key.into(), value.into()));
    }
}

impl StoreTxn for FakeStoreTxn {
    fn reserve(&mut self, bytes: usize, indices: usize) -> Result<()> {
        self.writes.reserve(bytes / 64 + indices);
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.committed.lock().push(self.writes);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn commit_appends_staged_writes_to_the_shared_log() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut txn = FakeStoreTxn::new(log.clone());
        txn.reserve(128, 4).unwrap();
        txn.put("event-by-id:$a", b"...".to_vec());
        txn.commit().unwrap();
        assert_eq!(log.lock().len(), 1);
        assert_eq!(log.lock()[0][0].0, "event-by-id:$a");
    }
}
