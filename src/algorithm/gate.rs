use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    epoch: u64,
    permits: usize,
}

/// Counting semaphore whose releases are numbered.
///
/// A waiter passes the last epoch it observed and only takes a permit from
/// a later release, so a fast path that loops around can never consume a
/// permit meant for a slower peer in the same round.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Opens a new epoch with `permits` additional permits.
    pub fn release(&self, permits: usize) {
        let mut s = self.state.lock();
        s.epoch += 1;
        s.permits += permits;
        self.cv.notify_all();
    }

    /// Blocks until a release newer than `seen` has a permit left, takes
    /// it, and returns the epoch the caller has now observed.
    pub fn wait(&self, seen: u64) -> u64 {
        let mut s = self.state.lock();
        while s.epoch == seen || s.permits == 0 {
            self.cv.wait(&mut s);
        }
        s.permits -= 1;
        s.epoch
    }
}
