use crate::node::Node;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// A unique-ownership pointer whose memory is reclaimed by a [`Collector`].
///
/// `Owned<T>` behaves like a `Box<T>` with one difference: dropping it never
/// frees memory. Instead the underlying node is pushed onto the collector's
/// drop queue (O(1), allocation-free, lock-free) and both the payload
/// destructor and the deallocation run later, inside
/// [`Collector::collect`] on a non-real-time thread. This makes it legal to
/// drop an `Owned<T>` from the real-time thread.
///
/// There is no clone operation; ownership moves.
///
/// **Lifecycle contract**: the [`Collector`] that issued this handle must
/// still be collecting when the handle is dropped. A handle that outlives
/// its collector leaks its allocation (it is never unsafe).
///
/// # Examples
/// ```
/// use rt_reclaim::Collector;
///
/// let mut collector = Collector::new();
/// let mut buffer = collector.make_owned([0.0f32; 64]);
/// buffer[0] = 1.0;
///
/// drop(buffer);              // real-time-safe: only queues the node
/// assert_eq!(collector.collect(), 1); // actual free happens here
/// ```
///
/// [`Collector`]: crate::Collector
/// [`Collector::collect`]: crate::Collector::collect
///
/// 一个独占所有权指针，其内存由 [`Collector`] 回收。
/// `Owned<T>` 的行为类似 `Box<T>`，区别只有一点：drop 它从不释放内存，
/// 而是将底层节点推入回收器的丢弃队列——O(1)、无分配、无锁——
/// 载荷析构和内存释放稍后在非实时线程的 [`Collector::collect`] 中进行。
/// 因此在实时线程上 drop 一个 `Owned<T>` 是合法的。
/// 没有克隆操作；所有权只能移动。
pub struct Owned<T: Send + 'static> {
    node: NonNull<Node<T>>,
}

unsafe impl<T: Send + 'static> Send for Owned<T> {}

impl<T: Send + 'static> Owned<T> {
    pub(crate) fn from_node(node: NonNull<Node<T>>) -> Owned<T> {
        Owned { node }
    }
}

impl<T: Send + 'static> Deref for Owned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { &self.node.as_ref().data }
    }
}

impl<T: Send + 'static> DerefMut for Owned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut self.node.as_mut().data }
    }
}

impl<T: Send + 'static> Drop for Owned<T> {
    /// Live → Queued. The sole owner performs the transition; the payload is
    /// not touched here.
    ///
    /// Live → Queued。唯一所有者执行该转换；这里不触碰载荷。
    fn drop(&mut self) {
        unsafe {
            Node::queue_drop(self.node);
        }
    }
}
