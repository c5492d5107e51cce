use crate::queue::DropQueue;
use crate::sync::{Arc, AtomicPtr};
use std::boxed::Box;
use std::ptr::NonNull;

/// The intrusive header shared by every allocation managed by a [`Collector`].
///
/// The header carries everything the drop queue and the collector need, so
/// releasing a node never has to allocate or reach back through the handle
/// that owned it: the queue link, a type-erased destructor, and a reference
/// to the queue the node is bound to.
///
/// [`Collector`]: crate::Collector
///
/// 每个由 [`Collector`] 管理的分配所共享的侵入式头部。
/// 头部携带了丢弃队列和回收器所需的一切，因此释放一个节点
/// 永远不需要分配内存，也不需要通过曾持有它的句柄回溯：
/// 队列链接、类型擦除的析构函数，以及节点所绑定队列的引用。
pub(crate) struct NodeHeader {
    /// Intrusive link used while the node sits in the drop queue.
    /// 节点位于丢弃队列中时使用的侵入式链接。
    pub(crate) next: AtomicPtr<NodeHeader>,
    /// The queue this node pushes itself onto when released.
    /// 节点被释放时将自己推入的队列。
    pub(crate) queue: Arc<DropQueue>,
    /// Type-erased destructor: drops the payload and frees the node storage.
    /// 类型擦除的析构函数：drop 载荷并释放节点存储。
    pub(crate) drop_fn: unsafe fn(*mut NodeHeader),
}

/// One managed allocation: header plus payload storage.
///
/// `#[repr(C)]` guarantees the header is at offset zero, so a
/// `*mut NodeHeader` and a `*mut Node<T>` are freely interchangeable. This is
/// what lets the queue and the collector operate on nodes of erased type.
///
/// 一个受管理的分配：头部加载荷存储。
/// `#[repr(C)]` 保证头部位于偏移零处，因此 `*mut NodeHeader` 和
/// `*mut Node<T>` 可以自由互换。这使得队列和回收器可以在
/// 类型被擦除的节点上操作。
#[repr(C)]
pub(crate) struct Node<T> {
    pub(crate) header: NodeHeader,
    pub(crate) data: T,
}

/// Generic destructor wired into every node at allocation time.
/// Reconstitutes the `Box<Node<T>>` and drops it, payload included.
///
/// 在分配时接入每个节点的通用析构函数。
/// 重建 `Box<Node<T>>` 并将其 drop，包括载荷。
unsafe fn drop_node<T>(node: *mut NodeHeader) {
    unsafe {
        drop(Box::from_raw(node as *mut Node<T>));
    }
}

impl<T: Send + 'static> Node<T> {
    /// Allocate a node bound to `queue`, holding `data`.
    ///
    /// This is the only place the crate allocates. It must never be called
    /// from the real-time thread; allocation failure aborts, which is the
    /// intended behavior off the real-time path.
    ///
    /// 分配一个绑定到 `queue`、持有 `data` 的节点。
    /// 这是本 crate 唯一进行分配的地方。绝不能在实时线程上调用；
    /// 分配失败会中止进程，这在非实时路径上是预期行为。
    pub(crate) fn alloc(queue: &Arc<DropQueue>, data: T) -> NonNull<Node<T>> {
        queue.note_alloc();

        let node = Box::into_raw(Box::new(Node {
            header: NodeHeader {
                next: AtomicPtr::new(std::ptr::null_mut()),
                queue: Arc::clone(queue),
                drop_fn: drop_node::<T>,
            },
            data,
        }));

        // Box::into_raw never returns null.
        unsafe { NonNull::new_unchecked(node) }
    }
}

impl<T> Node<T> {
    /// Push a node onto its bound queue: the Live → Queued transition.
    ///
    /// O(1), allocation-free, lock-free. Safe to call from the real-time
    /// thread.
    ///
    /// # Safety
    /// `node` must have been produced by [`Node::alloc`], `queue_drop` must
    /// be called at most once per node, and the node's data must not be
    /// accessed afterwards. Once pushed, the node belongs to the collector.
    ///
    /// 将节点推入其绑定的队列：Live → Queued 的状态转换。
    /// O(1)、无分配、无锁。可以安全地从实时线程调用。
    ///
    /// # Safety
    /// `node` 必须由 [`Node::alloc`] 产生，每个节点最多调用一次
    /// `queue_drop`，之后不得再访问节点数据。一旦推入，节点即归回收器所有。
    pub(crate) unsafe fn queue_drop(node: NonNull<Node<T>>) {
        let header = node.as_ptr() as *mut NodeHeader;
        // The queue outlives this call: the collector (or any still-live
        // node) holds its own Arc, so the borrow below cannot dangle even
        // if the collector frees this node right after the push lands.
        unsafe {
            (*header).queue.push(header);
        }
    }
}
