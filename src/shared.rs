use crate::node::Node;
use crate::sync::{AtomicUsize, Ordering, fence};
use std::ops::Deref;
use std::ptr::NonNull;

/// Payload wrapper for [`Shared`] nodes: the atomic reference count lives
/// next to the value, inside the node itself.
///
/// [`Shared`] 节点的载荷包装：原子引用计数与值相邻，位于节点内部。
pub(crate) struct SharedInner<T> {
    pub(crate) refs: AtomicUsize,
    pub(crate) value: T,
}

/// A reference-counted pointer whose memory is reclaimed by a [`Collector`].
///
/// `Shared<T>` behaves like an `Arc<T>` with deferred destruction: `clone`
/// is one relaxed atomic increment, and dropping the last handle does not
/// run the payload destructor or free memory. Instead the node is pushed
/// onto the collector's drop queue (O(1), allocation-free, lock-free) so
/// even the thread that discovers the zero count may be the real-time
/// thread. Destruction happens later, inside [`Collector::collect`].
///
/// Access is read-only; there is no weak variant and reference cycles are
/// unsupported by design.
///
/// **Memory ordering**: `clone` uses `Relaxed` (the cloning thread already
/// holds a live reference, so the count cannot concurrently reach zero).
/// Drop decrements with `Release`; the thread whose decrement reaches zero
/// issues an `Acquire` fence before queueing, which makes every releasing
/// thread's prior writes visible to the destructor.
///
/// # Examples
/// ```
/// use rt_reclaim::Collector;
///
/// let mut collector = Collector::new();
/// let table = collector.make_shared(vec![0u8; 256]);
/// let alias = table.clone();
///
/// drop(table);
/// assert_eq!(alias.len(), 256);
///
/// drop(alias);                        // last drop: node is queued
/// assert_eq!(collector.collect(), 1); // destructor + free happen here
/// ```
///
/// [`Collector`]: crate::Collector
/// [`Collector::collect`]: crate::Collector::collect
///
/// 一个引用计数指针，其内存由 [`Collector`] 回收。
/// `Shared<T>` 类似 `Arc<T>`，但析构是延迟的：`clone` 是一次 relaxed
/// 原子自增，drop 最后一个句柄不会运行载荷析构或释放内存，而是将
/// 节点推入回收器的丢弃队列——O(1)、无分配、无锁——因此即使发现
/// 计数归零的线程是实时线程也没有问题。销毁稍后在
/// [`Collector::collect`] 中进行。
/// 访问是只读的；没有弱引用变体，设计上不支持引用循环。
pub struct Shared<T: Send + 'static> {
    pub(crate) node: NonNull<Node<SharedInner<T>>>,
}

unsafe impl<T: Send + Sync + 'static> Send for Shared<T> {}
unsafe impl<T: Send + Sync + 'static> Sync for Shared<T> {}

impl<T: Send + 'static> Shared<T> {
    pub(crate) fn from_node(node: NonNull<Node<SharedInner<T>>>) -> Shared<T> {
        Shared { node }
    }

    #[inline]
    fn inner(&self) -> &SharedInner<T> {
        unsafe { &self.node.as_ref().data }
    }

    /// Current reference count, racy by nature. Test oracle only.
    /// 当前引用计数，本质上是竞态的。仅作测试断言用。
    #[cfg(test)]
    pub(crate) fn ref_count(&self) -> usize {
        self.inner().refs.load(Ordering::Relaxed)
    }
}

impl<T: Send + 'static> Clone for Shared<T> {
    /// One relaxed increment; real-time-safe.
    /// 一次 relaxed 自增；实时安全。
    #[inline]
    fn clone(&self) -> Shared<T> {
        self.inner().refs.fetch_add(1, Ordering::Relaxed);
        Shared { node: self.node }
    }
}

impl<T: Send + 'static> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner().value
    }
}

impl<T: Send + 'static> Drop for Shared<T> {
    /// Release-decrement; the thread that observes zero performs the
    /// Live → Queued transition after an acquire fence.
    ///
    /// Release 自减；观察到零的线程在一次 acquire fence 之后执行
    /// Live → Queued 转换。
    fn drop(&mut self) {
        if self.inner().refs.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            unsafe {
                Node::queue_drop(self.node);
            }
        }
    }
}
