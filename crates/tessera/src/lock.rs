//! Reentrant reader/writer lock and the guarded cell built on it
//!
//! [`RecursiveSharedLock`] tracks owners by [`ThreadId`]:
//! - **Exclusive**: one thread at a time, reentrant (depth counter)
//! - **Shared**: any number of threads, each reentrant (per-thread count)
//! - **Upgrade**: a thread that is the *only* shared holder may also take
//!   the exclusive mode
//!
//! Every release broadcasts to all waiters, which re-check their admission
//! predicate. There is no FIFO ordering among waiters; only eventual
//! admission is guaranteed once holders release. Two shared holders that
//! both try to upgrade will wait on each other forever.
//!
//! [`Guarded`] pairs the lock with a value and hands out closure-scoped
//! borrows. A nested borrow on the same thread that would alias a mutable
//! borrow panics instead, the same way `RefCell` does.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use ahash::RandomState;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

/// Bookkeeping protected by the internal mutex
#[derive(Default)]
struct LockState {
    /// Thread holding the exclusive mode
    owner: Option<ThreadId>,

    /// Exclusive re-acquisition depth
    depth: usize,

    /// Shared hold count per thread
    readers: HashMap<ThreadId, usize, RandomState>,
}

impl LockState {
    fn can_share(&self) -> bool {
        self.owner.is_none()
    }

    fn can_own(&self, me: ThreadId) -> bool {
        if matches!(self.owner, Some(owner) if owner != me) {
            return false;
        }
        self.readers.keys().all(|&reader| reader == me)
    }

    fn grant_shared(&mut self, me: ThreadId) {
        *self.readers.entry(me).or_insert(0) += 1;
    }

    fn grant_exclusive(&mut self, me: ThreadId) {
        self.owner = Some(me);
        self.depth += 1;
    }
}

/// Reentrant lock with shared (reader) and exclusive (writer) modes
///
/// Locking calls block the calling thread, never the process. Pairs must
/// balance per thread; releasing a mode the calling thread does not hold is
/// a logic error and panics.
pub struct RecursiveSharedLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl RecursiveSharedLock {
    /// Create a new unlocked lock
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            cond: Condvar::new(),
        }
    }

    /// Acquire the shared mode, blocking while another thread holds exclusive
    ///
    /// # Panics
    /// If the calling thread currently holds the exclusive mode.
    pub fn lock_shared(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        Self::reject_shared_while_owner(&state, me);
        while !state.can_share() {
            self.cond.wait(&mut state);
        }
        state.grant_shared(me);
    }

    /// Acquire the shared mode only if it is available right now
    pub fn try_lock_shared(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        Self::reject_shared_while_owner(&state, me);
        if !state.can_share() {
            return false;
        }
        state.grant_shared(me);
        true
    }

    /// Acquire the shared mode, giving up after `timeout`
    ///
    /// # Returns
    /// * `bool` - true if the lock was acquired
    pub fn try_lock_shared_for(&self, timeout: Duration) -> bool {
        let me = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        Self::reject_shared_while_owner(&state, me);
        while !state.can_share() {
            if self.cond.wait_until(&mut state, deadline).timed_out() && !state.can_share() {
                trace!(?timeout, "shared acquisition timed out");
                return false;
            }
        }
        state.grant_shared(me);
        true
    }

    /// Release one level of the shared mode held by the calling thread
    ///
    /// # Panics
    /// If the calling thread holds no shared mode.
    pub fn unlock_shared(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.readers.get_mut(&me) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                state.readers.remove(&me);
            }
            None => panic!("unlock_shared called by a thread that holds no shared lock"),
        }
        drop(state);
        self.cond.notify_all();
    }

    /// Acquire the exclusive mode
    ///
    /// Blocks while another thread holds exclusive, or while shared holders
    /// other than the calling thread exist. Re-entrant for the current owner.
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while !state.can_own(me) {
            self.cond.wait(&mut state);
        }
        state.grant_exclusive(me);
    }

    /// Acquire the exclusive mode only if it is available right now
    pub fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if !state.can_own(me) {
            return false;
        }
        state.grant_exclusive(me);
        true
    }

    /// Acquire the exclusive mode, giving up after `timeout`
    ///
    /// # Returns
    /// * `bool` - true if the lock was acquired
    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        let me = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.can_own(me) {
            if self.cond.wait_until(&mut state, deadline).timed_out() && !state.can_own(me) {
                trace!(?timeout, "exclusive acquisition timed out");
                return false;
            }
        }
        state.grant_exclusive(me);
        true
    }

    /// Release one level of the exclusive mode
    ///
    /// # Panics
    /// If the calling thread is not the exclusive owner.
    pub fn unlock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            drop(state);
            panic!("unlock called by a thread that does not hold the exclusive lock");
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
        }
        drop(state);
        self.cond.notify_all();
    }

    /// Acquire the shared mode for the lifetime of the returned guard
    pub fn read(&self) -> SharedGuard<'_> {
        self.lock_shared();
        SharedGuard::new(self)
    }

    /// Non-blocking [`read`](Self::read)
    pub fn try_read(&self) -> Option<SharedGuard<'_>> {
        self.try_lock_shared().then(|| SharedGuard::new(self))
    }

    /// Bounded-wait [`read`](Self::read)
    pub fn try_read_for(&self, timeout: Duration) -> Option<SharedGuard<'_>> {
        self.try_lock_shared_for(timeout).then(|| SharedGuard::new(self))
    }

    /// Acquire the exclusive mode for the lifetime of the returned guard
    pub fn write(&self) -> ExclusiveGuard<'_> {
        self.lock();
        ExclusiveGuard::new(self)
    }

    /// Non-blocking [`write`](Self::write)
    pub fn try_write(&self) -> Option<ExclusiveGuard<'_>> {
        self.try_lock().then(|| ExclusiveGuard::new(self))
    }

    /// Bounded-wait [`write`](Self::write)
    pub fn try_write_for(&self, timeout: Duration) -> Option<ExclusiveGuard<'_>> {
        self.try_lock_for(timeout).then(|| ExclusiveGuard::new(self))
    }

    /// Whether any thread holds the exclusive mode
    pub fn is_locked_exclusive(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the calling thread holds the exclusive mode
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Number of distinct threads holding the shared mode
    pub fn shared_holders(&self) -> usize {
        self.state.lock().readers.len()
    }

    fn reject_shared_while_owner(state: &MutexGuard<'_, LockState>, me: ThreadId) {
        if state.owner == Some(me) {
            panic!("shared acquisition by the thread that holds the exclusive lock");
        }
    }
}

impl Default for RecursiveSharedLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone never carries lock state over; it is a fresh, unlocked lock.
impl Clone for RecursiveSharedLock {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecursiveSharedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecursiveSharedLock")
            .field("owner", &state.owner)
            .field("depth", &state.depth)
            .field("readers", &state.readers.len())
            .finish()
    }
}

/// RAII shared hold; releases on drop
///
/// Bound to the acquiring thread, so it is not `Send`.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SharedGuard<'a> {
    lock: &'a RecursiveSharedLock,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a> SharedGuard<'a> {
    fn new(lock: &'a RecursiveSharedLock) -> Self {
        Self {
            lock,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_shared();
    }
}

/// RAII exclusive hold; releases one level on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    lock: &'a RecursiveSharedLock,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a> ExclusiveGuard<'a> {
    fn new(lock: &'a RecursiveSharedLock) -> Self {
        Self {
            lock,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// Borrow flag: positive = shared borrows, -1 = mutable borrow
struct BorrowFlag<'a> {
    flag: &'a AtomicIsize,
    exclusive: bool,
}

impl<'a> BorrowFlag<'a> {
    fn shared(flag: &'a AtomicIsize) -> Self {
        let acquired = flag.fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| {
            (n >= 0).then_some(n + 1)
        });
        if acquired.is_err() {
            panic!("value already mutably borrowed on this thread");
        }
        Self {
            flag,
            exclusive: false,
        }
    }

    fn exclusive(flag: &'a AtomicIsize) -> Self {
        if flag
            .compare_exchange(0, -1, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            panic!("value already borrowed on this thread");
        }
        Self {
            flag,
            exclusive: true,
        }
    }
}

impl Drop for BorrowFlag<'_> {
    fn drop(&mut self) {
        if self.exclusive {
            self.flag.store(0, Ordering::Release);
        } else {
            self.flag.fetch_sub(1, Ordering::Release);
        }
    }
}

/// A value protected by a [`RecursiveSharedLock`]
///
/// Access is closure-scoped: [`read`](Self::read) runs under the shared
/// mode, [`write`](Self::write) under the exclusive mode. Because the lock is
/// reentrant, a thread may call back into the same container from a
/// callback as long as no borrow is live across the call; use
/// [`hold`](Self::hold) to keep the exclusive mode across several borrows.
pub struct Guarded<T> {
    lock: RecursiveSharedLock,
    borrow: AtomicIsize,
    value: UnsafeCell<T>,
}

// SAFETY: all access to `value` goes through `read`/`write`, which pair the
// lock mode with the borrow flag: shared borrows only coexist with other
// shared borrows, and a mutable borrow requires the exclusive mode plus a
// zero flag, which rules out both cross-thread and same-thread aliasing.
unsafe impl<T: Send> Send for Guarded<T> {}
unsafe impl<T: Send + Sync> Sync for Guarded<T> {}

impl<T> Guarded<T> {
    /// Wrap `value` behind a fresh lock
    pub fn new(value: T) -> Self {
        Self {
            lock: RecursiveSharedLock::new(),
            borrow: AtomicIsize::new(0),
            value: UnsafeCell::new(value),
        }
    }

    /// Run `f` with shared access to the value
    ///
    /// Called from inside a [`hold`](Self::hold) scope, this re-enters the
    /// exclusive mode instead of requesting the shared one.
    ///
    /// # Panics
    /// If the calling thread is inside a [`write`](Self::write) closure on
    /// this value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        // The exclusive owner re-enters exclusively; the raw lock forbids
        // mixing modes on one thread.
        let (_shared, _exclusive) = if self.lock.is_owned_by_current_thread() {
            (None, Some(self.lock.write()))
        } else {
            (Some(self.lock.read()), None)
        };
        let _borrow = BorrowFlag::shared(&self.borrow);
        // SAFETY: shared mode held and flag >= 0, so no `&mut T` exists.
        f(unsafe { &*self.value.get() })
    }

    /// Run `f` with exclusive access to the value
    ///
    /// # Panics
    /// If the calling thread is inside another `read`/`write` closure on this
    /// value.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _guard = self.lock.write();
        let _borrow = BorrowFlag::exclusive(&self.borrow);
        // SAFETY: exclusive mode held and flag was 0, so this is the only borrow.
        f(unsafe { &mut *self.value.get() })
    }

    /// Hold the exclusive mode until the guard drops
    pub fn hold(&self) -> ExclusiveGuard<'_> {
        self.lock.write()
    }

    /// Access the underlying lock
    pub fn lock(&self) -> &RecursiveSharedLock {
        &self.lock
    }

    /// Mutable access without locking; `&mut self` proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consume the cell and return the value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Guarded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Copies the value under the shared mode; the copy gets a fresh lock.
impl<T: Clone> Clone for Guarded<T> {
    fn clone(&self) -> Self {
        Self::new(self.read(T::clone))
    }
}

impl<T> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
