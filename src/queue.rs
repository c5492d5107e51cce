use crate::node::NodeHeader;
use crate::sync::{AtomicPtr, AtomicUsize, Ordering};
use std::ptr;

/// The reclamation queue: an intrusive, lock-free, allocation-free
/// multi-producer / single-consumer stack of nodes awaiting destruction.
///
/// Producers are arbitrary threads releasing handles, including the
/// real-time thread. The single consumer is the [`Collector`] that owns
/// this queue; single-consumer discipline is enforced by visibility
/// (`drain` is crate-private) and by `Collector::collect` taking `&mut self`.
///
/// Push order among concurrent producers is unspecified; `drain` yields
/// nodes in reverse-of-push order. Neither matters for correctness: every
/// queued node is destroyed exactly once, eventually.
///
/// Cache-aligned to keep the contended head off neighboring data.
///
/// [`Collector`]: crate::Collector
///
/// 回收队列：一个侵入式、无锁、无分配的多生产者/单消费者节点栈，
/// 其中的节点等待销毁。
/// 生产者是释放句柄的任意线程，包括实时线程。唯一的消费者是拥有
/// 此队列的 [`Collector`]；单消费者纪律由可见性（`drain` 为 crate
/// 私有）以及 `Collector::collect` 取 `&mut self` 来保证。
/// 并发推入的顺序不作规定；`drain` 以推入的逆序产出节点。
/// 两者都不影响正确性——每个入队节点最终都恰好被销毁一次。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct DropQueue {
    /// Head of the intrusive stack; null when empty.
    /// 侵入式栈的头部；为空时是 null。
    head: AtomicPtr<NodeHeader>,
    /// Nodes allocated against this queue and not yet freed.
    /// 已在此队列上分配且尚未释放的节点数。
    allocs: AtomicUsize,
}

impl DropQueue {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            allocs: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn note_alloc(&self) {
        self.allocs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn note_freed(&self, count: usize) {
        self.allocs.fetch_sub(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn alloc_count(&self) -> usize {
        self.allocs.load(Ordering::Relaxed)
    }

    /// Push one node: read the head, link the node to it, CAS the head over.
    ///
    /// Lock-free; the CAS retries only under contention from other
    /// producers, and each failure means some other push succeeded. No
    /// allocation, no syscall, so this is legal on the real-time thread.
    ///
    /// The successful CAS uses `Release` so the consumer's `Acquire` drain
    /// observes all writes made to the payload before it was released.
    ///
    /// # Safety
    /// `node` must be a live node not currently in the queue, and the caller
    /// transfers ownership of it to the queue.
    ///
    /// 推入一个节点：读取头部，将节点链接到它，再 CAS 头部。
    /// 无锁；CAS 仅在与其他生产者竞争时重试，且每次失败意味着
    /// 另一个推入成功了。无分配、无系统调用，因此在实时线程上合法。
    /// 成功的 CAS 使用 `Release`，使消费者的 `Acquire` drain 能观察到
    /// 载荷在释放前的所有写入。
    pub(crate) unsafe fn push(&self, node: *mut NodeHeader) {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            // Until the CAS lands we still own the node, so this store is
            // unobservable by the consumer.
            unsafe {
                (*node).next.store(head, Ordering::Relaxed);
            }

            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Take ownership of the entire accumulated chain in one atomic swap.
    ///
    /// Crate-private and called only by the owning `Collector`; concurrent
    /// drains are not defended against.
    ///
    /// 通过一次原子交换取得已累积的整条链的所有权。
    /// crate 私有，只由拥有它的 `Collector` 调用；不防御并发 drain。
    pub(crate) fn drain(&self) -> Drain {
        Drain {
            next: self.head.swap(ptr::null_mut(), Ordering::Acquire),
        }
    }
}

/// Iterator over a drained chain. Yields raw node pointers; the caller owns
/// each yielded node and is responsible for destroying it.
///
/// 已取出链的迭代器。产出原始节点指针；调用者拥有每个产出的节点，
/// 并负责销毁它。
pub(crate) struct Drain {
    next: *mut NodeHeader,
}

impl Iterator for Drain {
    type Item = *mut NodeHeader;

    fn next(&mut self) -> Option<*mut NodeHeader> {
        if self.next.is_null() {
            return None;
        }

        let node = self.next;
        // The swap in `drain` transferred sole ownership of the chain, so a
        // relaxed traversal is sufficient. Read the link before the caller
        // frees the node.
        self.next = unsafe { (*node).next.load(Ordering::Relaxed) };
        Some(node)
    }
}
