//! 边沿触发的引用计数
//!
//! [`WakeLockRef`] 只在计数从 0 变为 1 以及从 1 变为 0 时回调监听者。

use sync::SpinLock;

/// 引用计数边沿监听者
pub trait WakeRefListener {
    /// 计数从 0 变为 1
    fn on_first_acquire(&self);

    /// 计数从 1 变为 0
    fn on_last_release(&self);
}

#[derive(Debug, Default)]
struct RefState {
    count: usize,
    /// 计数跨越边沿的次数，偶数次之后的下一个边沿是 0 -> 1
    crossed: usize,
    /// 已回调的边沿数
    fired: usize,
    /// 是否有线程正在执行回调
    draining: bool,
}

/// 边沿触发的引用计数
///
/// 回调在内部锁之外执行。同一时刻只有一个线程执行回调，其它线程跨越边沿时只记录边沿，
/// 由正在回调的线程按发生顺序补发。因此每次跨越边沿恰好回调一次，
/// 回调之间互不重叠，且总是在 first/last 之间交替。
///
/// `on_first_acquire` 内可以对同一个引用成对地 `acquire`/`release`，
/// 此时计数不会跨越边沿。`on_last_release` 内这样做会产生新的一对边沿。
#[derive(Debug, Default)]
pub struct WakeLockRef {
    state: SpinLock<RefState>,
}

impl WakeLockRef {
    /// 创建计数为 0 的引用
    pub const fn new() -> Self {
        Self {
            state: SpinLock::new(RefState {
                count: 0,
                crossed: 0,
                fired: 0,
                draining: false,
            }),
        }
    }

    /// 增加计数，0 -> 1 时回调 `on_first_acquire`
    pub fn acquire<L: WakeRefListener + ?Sized>(&self, listener: &L) {
        let drain = {
            let mut state = self.state.lock();
            state.count = state.count.saturating_add(1);
            state.count == 1 && Self::cross(&mut state)
        };
        if drain {
            self.drain(listener);
        }
    }

    /// 减少计数，1 -> 0 时回调 `on_last_release`
    ///
    /// 计数已经为 0 时什么也不做。
    pub fn release<L: WakeRefListener + ?Sized>(&self, listener: &L) {
        let drain = {
            let mut state = self.state.lock();
            if state.count == 0 {
                return;
            }
            state.count -= 1;
            state.count == 0 && Self::cross(&mut state)
        };
        if drain {
            self.drain(listener);
        }
    }

    /// 当前计数
    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    /// 记录一次边沿，返回调用者是否需要负责回调
    fn cross(state: &mut RefState) -> bool {
        state.crossed += 1;
        if state.draining {
            return false;
        }
        state.draining = true;
        true
    }

    /// 在锁外逐个补发边沿，直到没有未回调的边沿
    fn drain<L: WakeRefListener + ?Sized>(&self, listener: &L) {
        loop {
            let first = {
                let mut state = self.state.lock();
                if state.fired == state.crossed {
                    state.draining = false;
                    return;
                }
                let first = state.fired % 2 == 0;
                state.fired += 1;
                first
            };
            if first {
                listener.on_first_acquire();
            } else {
                listener.on_last_release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    #[derive(Default)]
    struct EdgeCounter {
        first: AtomicUsize,
        last: AtomicUsize,
        in_callback: AtomicBool,
        overlapped: AtomicBool,
    }

    impl EdgeCounter {
        fn enter(&self) {
            if self.in_callback.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
        }

        fn leave(&self) {
            self.in_callback.store(false, Ordering::SeqCst);
        }
    }

    impl WakeRefListener for EdgeCounter {
        fn on_first_acquire(&self) {
            self.enter();
            self.first.fetch_add(1, Ordering::SeqCst);
            self.leave();
        }

        fn on_last_release(&self) {
            self.enter();
            self.last.fetch_add(1, Ordering::SeqCst);
            self.leave();
        }
    }

    #[test]
    fn test_edges_fire_once_per_crossing() {
        let sref = WakeLockRef::new();
        let listener = EdgeCounter::default();

        sref.acquire(&listener);
        sref.acquire(&listener);
        sref.acquire(&listener);
        assert_eq!(listener.first.load(Ordering::SeqCst), 1);
        assert_eq!(sref.count(), 3);

        sref.release(&listener);
        sref.release(&listener);
        assert_eq!(listener.last.load(Ordering::SeqCst), 0);
        sref.release(&listener);
        assert_eq!(listener.last.load(Ordering::SeqCst), 1);

        sref.acquire(&listener);
        sref.release(&listener);
        assert_eq!(listener.first.load(Ordering::SeqCst), 2);
        assert_eq!(listener.last.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_release_at_zero_is_noop() {
        let sref = WakeLockRef::new();
        let listener = EdgeCounter::default();
        sref.release(&listener);
        sref.release(&listener);
        assert_eq!(sref.count(), 0);
        assert_eq!(listener.first.load(Ordering::SeqCst), 0);
        assert_eq!(listener.last.load(Ordering::SeqCst), 0);
    }

    struct Reentrant {
        sref: WakeLockRef,
        first: AtomicUsize,
        last: AtomicUsize,
    }

    impl WakeRefListener for Reentrant {
        fn on_first_acquire(&self) {
            self.first.fetch_add(1, Ordering::SeqCst);
            self.sref.acquire(self);
            self.sref.release(self);
        }

        fn on_last_release(&self) {
            self.last.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_first_acquire_callback_may_reenter() {
        let listener = Reentrant {
            sref: WakeLockRef::new(),
            first: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
        };

        for _ in 0..3 {
            listener.sref.acquire(&listener);
            assert_eq!(listener.sref.count(), 1);
            listener.sref.release(&listener);
            assert_eq!(listener.sref.count(), 0);
        }
        assert_eq!(listener.first.load(Ordering::SeqCst), 3);
        assert_eq!(listener.last.load(Ordering::SeqCst), 3);
    }

    /// 回调中途其它线程完成的一对边沿不会丢失
    struct Crossing {
        sref: Arc<WakeLockRef>,
        events: SpinLock<Vec<bool>>,
    }

    impl WakeRefListener for Crossing {
        fn on_first_acquire(&self) {
            let first_call = {
                let mut events = self.events.lock();
                events.push(true);
                events.len() == 1
            };
            if first_call {
                let sref = Arc::clone(&self.sref);
                let other = Arc::new(Counterpart);
                thread::spawn(move || {
                    sref.release(&*other);
                    sref.acquire(&*other);
                })
                .join()
                .unwrap();
            }
        }

        fn on_last_release(&self) {
            self.events.lock().push(false);
        }
    }

    struct Counterpart;

    impl WakeRefListener for Counterpart {
        fn on_first_acquire(&self) {
            panic!("edge must be fired by the draining thread");
        }

        fn on_last_release(&self) {
            panic!("edge must be fired by the draining thread");
        }
    }

    #[test]
    fn test_edges_crossed_during_callback_are_replayed() {
        let sref = Arc::new(WakeLockRef::new());
        let listener = Crossing {
            sref: Arc::clone(&sref),
            events: SpinLock::new(Vec::new()),
        };

        sref.acquire(&listener);
        assert_eq!(sref.count(), 1);
        assert_eq!(*listener.events.lock(), [true, false, true]);
    }

    #[test]
    fn test_concurrent_pairs_keep_edges_balanced() {
        let sref = Arc::new(WakeLockRef::new());
        let listener = Arc::new(EdgeCounter::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sref = Arc::clone(&sref);
                let listener = Arc::clone(&listener);
                thread::spawn(move || {
                    for _ in 0..500 {
                        sref.acquire(&*listener);
                        sref.release(&*listener);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sref.count(), 0);
        let first = listener.first.load(Ordering::SeqCst);
        let last = listener.last.load(Ordering::SeqCst);
        assert!(first >= 1);
        assert_eq!(first, last);
        assert!(!listener.overlapped.load(Ordering::SeqCst));
    }
}
