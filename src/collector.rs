use crate::node::Node;
use crate::owned::Owned;
use crate::queue::DropQueue;
use crate::shared::{Shared, SharedInner};
use crate::sync::{Arc, AtomicUsize};
use std::cell::Cell;
use std::marker::PhantomData;

/// The factory and the sole consumer of one reclamation queue.
///
/// A `Collector` issues [`Owned`] and [`Shared`] handles bound to its queue
/// and periodically drains that queue, running payload destructors and
/// freeing node storage. The cadence is entirely caller-controlled:
/// reclamation latency equals however often [`collect`] is invoked, and
/// memory queued but never collected stays reachable (and allocated), so
/// backpressure is the caller's knob, not an automatic guarantee.
///
/// **Thread classes**: allocation ([`make_owned`], [`make_shared`]) and
/// [`collect`] belong on non-real-time threads. Only handle deref / clone /
/// drop (and [`PublishedCell::get`]) are real-time-legal.
///
/// **Single consumer**: `Collector` is `Send` but neither `Clone` nor
/// `Sync`, and [`collect`] takes `&mut self`, so a second concurrent
/// consumer of the same queue is unrepresentable.
///
/// **Lifecycle**: construct → issue handles → repeatedly collect → drop.
/// Dropping the collector drains whatever is already queued. A handle that
/// outlives its collector is a programming error; it degrades to a leak,
/// never to a use-after-free, because each node keeps the queue state alive.
///
/// # Examples
/// ```
/// use rt_reclaim::Collector;
///
/// let mut collector = Collector::new();
/// let x = collector.make_owned(1);
/// let y = collector.make_shared("two");
/// assert_eq!(collector.alloc_count(), 2);
///
/// drop(x);
/// drop(y);
/// assert_eq!(collector.alloc_count(), 2); // queued, not yet freed
///
/// assert_eq!(collector.collect(), 2);
/// assert_eq!(collector.alloc_count(), 0);
/// ```
///
/// [`collect`]: Collector::collect
/// [`make_owned`]: Collector::make_owned
/// [`make_shared`]: Collector::make_shared
/// [`PublishedCell::get`]: crate::PublishedCell::get
///
/// 一个回收队列的工厂与唯一消费者。
/// `Collector` 签发绑定到其队列的 [`Owned`] 和 [`Shared`] 句柄，并周期性
/// 地排空该队列：运行载荷析构并释放节点存储。节奏完全由调用者控制：
/// 回收延迟等于 [`collect`] 被调用的频率；入队但未回收的内存保持可达
/// （且已分配）——背压是调用者的旋钮，而非自动保证。
/// `Collector` 是 `Send` 但既非 `Clone` 也非 `Sync`，且 [`collect`] 取
/// `&mut self`，因此同一队列的第二个并发消费者在类型上不可表达。
pub struct Collector {
    queue: Arc<DropQueue>,
    // Suppresses Sync without giving up Send: collect() must have one
    // logical caller over time.
    _not_sync: PhantomData<Cell<()>>,
}

impl Collector {
    /// Construct a collector with a fresh, empty queue.
    /// 构造一个带有全新空队列的回收器。
    pub fn new() -> Collector {
        Collector {
            queue: Arc::new(DropQueue::new()),
            _not_sync: PhantomData,
        }
    }

    /// Allocate `value` into a new node and return the unique handle to it.
    ///
    /// Non-real-time threads only (this allocates).
    ///
    /// 将 `value` 分配进一个新节点并返回其独占句柄。
    /// 仅限非实时线程（此操作会分配内存）。
    pub fn make_owned<T: Send + 'static>(&self, value: T) -> Owned<T> {
        Owned::from_node(Node::alloc(&self.queue, value))
    }

    /// Allocate `value` into a new node with a reference count of one and
    /// return the first shared handle to it.
    ///
    /// Non-real-time threads only (this allocates).
    ///
    /// 将 `value` 分配进一个引用计数为一的新节点，并返回第一个共享句柄。
    /// 仅限非实时线程（此操作会分配内存）。
    pub fn make_shared<T: Send + 'static>(&self, value: T) -> Shared<T> {
        Shared::from_node(Node::alloc(
            &self.queue,
            SharedInner {
                refs: AtomicUsize::new(1),
                value,
            },
        ))
    }

    /// Get a cheap, cloneable allocation handle bound to this collector's
    /// queue, for worker threads that need to allocate without holding the
    /// collector itself.
    ///
    /// 获取一个廉价、可克隆、绑定到此回收器队列的分配句柄，
    /// 供需要分配但不持有回收器本身的工作线程使用。
    pub fn allocator(&self) -> Allocator {
        Allocator {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Drain the queue fully: run each queued node's destructor and free its
    /// storage. Returns the number of nodes freed.
    ///
    /// Queued → Freed happens only here. Non-real-time threads only; the
    /// `&mut self` receiver is what enforces the single-consumer contract.
    ///
    /// 完全排空队列：运行每个入队节点的析构函数并释放其存储。
    /// 返回被释放的节点数。Queued → Freed 只发生在这里。仅限非实时线程；
    /// `&mut self` 接收者即是单消费者契约的执行者。
    pub fn collect(&mut self) -> usize {
        let mut freed = 0;

        for node in self.queue.drain() {
            unsafe {
                ((*node).drop_fn)(node);
            }
            freed += 1;
        }

        if freed > 0 {
            self.queue.note_freed(freed);
        }
        freed
    }

    /// Number of live allocations bound to this collector: everything
    /// allocated and not yet freed, whether still held by a handle or
    /// sitting in the queue.
    ///
    /// 绑定到此回收器的存活分配数：已分配且尚未释放的一切，
    /// 无论仍被句柄持有还是位于队列中。
    pub fn alloc_count(&self) -> usize {
        self.queue.alloc_count()
    }
}

impl Default for Collector {
    fn default() -> Collector {
        Collector::new()
    }
}

impl Drop for Collector {
    /// Final drain. Nodes still held by live handles at this point are not
    /// reclaimable and will leak once released.
    ///
    /// 最后一次排空。此时仍被存活句柄持有的节点不再可回收，
    /// 释放后将会泄漏。
    fn drop(&mut self) {
        self.collect();
    }
}

/// A cloneable allocation handle to a [`Collector`]'s queue.
///
/// Many `Allocator`s for one collector may exist at a time; they can be
/// moved and shared freely between non-real-time threads. They allocate
/// only; collection stays with the unique [`Collector`].
///
/// # Examples
/// ```
/// use rt_reclaim::Collector;
///
/// let mut collector = Collector::new();
/// let allocator = collector.allocator();
///
/// let worker = std::thread::spawn(move || {
///     let owned = allocator.make_owned(vec![1u32, 2, 3]);
///     drop(owned);
/// });
/// worker.join().unwrap();
///
/// assert_eq!(collector.collect(), 1);
/// ```
///
/// [`Collector`]: crate::Collector
///
/// 指向 [`Collector`] 队列的可克隆分配句柄。
/// 同一回收器可以同时存在多个 `Allocator`；它们可以在非实时线程间
/// 自由移动与共享。它们只负责分配——回收始终属于唯一的 [`Collector`]。
#[derive(Clone)]
pub struct Allocator {
    queue: Arc<DropQueue>,
}

impl Allocator {
    /// Same as [`Collector::make_owned`].
    /// 与 [`Collector::make_owned`] 相同。
    pub fn make_owned<T: Send + 'static>(&self, value: T) -> Owned<T> {
        Owned::from_node(Node::alloc(&self.queue, value))
    }

    /// Same as [`Collector::make_shared`].
    /// 与 [`Collector::make_shared`] 相同。
    pub fn make_shared<T: Send + 'static>(&self, value: T) -> Shared<T> {
        Shared::from_node(Node::alloc(
            &self.queue,
            SharedInner {
                refs: AtomicUsize::new(1),
                value,
            },
        ))
    }
}
