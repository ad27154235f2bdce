//! Apply ordering for logged mutations.
//!
//! The WAL writer resolves records in commit order, but the submitting
//! threads wake up in whatever order the scheduler picks. The sequencer
//! admits them to the apply step one commit sequence at a time.

use parking_lot::{Condvar, Mutex};

use cairn_common::types::CommitSeq;

/// Turnstile keyed on commit sequence numbers.
#[derive(Debug)]
pub(crate) struct ApplySequencer {
    /// Highest sequence whose apply step has finished.
    applied: Mutex<CommitSeq>,
    turn: Condvar,
}

impl ApplySequencer {
    /// Creates a sequencer where everything up to `applied` is done.
    pub(crate) fn new(applied: CommitSeq) -> Self {
        Self {
            applied: Mutex::new(applied),
            turn: Condvar::new(),
        }
    }

    /// Blocks until every sequence before `seq` has been applied.
    ///
    /// The returned guard marks `seq` applied when dropped, so a failed or
    /// panicking apply step never blocks later sequences.
    pub(crate) fn wait_turn(&self, seq: CommitSeq) -> Turn<'_> {
        let mut applied = self.applied.lock();
        while *applied < seq.prev() {
            self.turn.wait(&mut applied);
        }
        Turn {
            sequencer: self,
            seq,
        }
    }

    /// Returns the highest applied sequence.
    pub(crate) fn applied(&self) -> CommitSeq {
        *self.applied.lock()
    }
}

/// Exclusive right to apply one commit sequence.
#[must_use = "the turn ends when this guard is dropped"]
pub(crate) struct Turn<'a> {
    sequencer: &'a ApplySequencer,
    seq: CommitSeq,
}

impl Turn<'_> {
    /// Returns the sequence being applied.
    pub(crate) fn seq(&self) -> CommitSeq {
        self.seq
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut applied = self.sequencer.applied.lock();
        if *applied < self.seq {
            *applied = self.seq;
        }
        self.sequencer.turn.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_in_order_turns() {
        let seq = ApplySequencer::new(CommitSeq::INVALID);
        drop(seq.wait_turn(CommitSeq::new(1)));
        let turn = seq.wait_turn(CommitSeq::new(2));
        assert_eq!(turn.seq(), CommitSeq::new(2));
        drop(turn);
        assert_eq!(seq.applied(), CommitSeq::new(2));
    }

    #[test]
    fn test_out_of_order_arrivals_apply_in_order() {
        let sequencer = Arc::new(ApplySequencer::new(CommitSeq::new(10)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (11..=15u64)
            .rev()
            .map(|n| {
                let sequencer = Arc::clone(&sequencer);
                let order = Arc::clone(&order);
                thread::spawn(move || {
                    let _turn = sequencer.wait_turn(CommitSeq::new(n));
                    order.lock().push(n);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*order.lock(), vec![11, 12, 13, 14, 15]);
        assert_eq!(sequencer.applied(), CommitSeq::new(15));
    }

    #[test]
    fn test_later_turn_waits() {
        let sequencer = Arc::new(ApplySequencer::new(CommitSeq::INVALID));
        let s = Arc::clone(&sequencer);
        let waiter = thread::spawn(move || {
            let _turn = s.wait_turn(CommitSeq::new(2));
        });
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        drop(sequencer.wait_turn(CommitSeq::new(1)));
        waiter.join().unwrap();
        assert_eq!(sequencer.applied(), CommitSeq::new(2));
    }

    #[test]
    fn test_panicking_turn_releases_next() {
        let sequencer = Arc::new(ApplySequencer::new(CommitSeq::INVALID));
        let s = Arc::clone(&sequencer);
        let result = thread::spawn(move || {
            let _turn = s.wait_turn(CommitSeq::new(1));
            panic!("apply failed");
        })
        .join();
        assert!(result.is_err());
        drop(sequencer.wait_turn(CommitSeq::new(2)));
        assert_eq!(sequencer.applied(), CommitSeq::new(2));
    }
}
