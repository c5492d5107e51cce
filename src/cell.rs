use crate::node::Node;
use crate::shared::{Shared, SharedInner};
use crate::sync::{AtomicPtr, AtomicUsize, Ordering, spin_loop};
use std::mem;
use std::ptr::NonNull;

/// An atomically-publishable slot holding one [`Shared`] value, readable
/// wait-free from the real-time thread while non-real-time writers swap in
/// replacements.
///
/// The cell itself owns one reference to the stored node, so a pointer read
/// from the slot always refers to a node with a reference count of at least
/// one. The reader-count handshake extends that guarantee across the window
/// in which [`get`] turns the raw pointer into its own reference.
///
/// **Cost asymmetry, by design**: [`get`] pays two atomic increments and a
/// decrement and never waits; the real-time thread calls it often and
/// under a deadline. [`set`] / [`replace`] swap the slot and then spin until
/// no `get` is in flight; writers are infrequent and not deadline-bound,
/// so they absorb the wait.
///
/// Multiple concurrent writers are supported: each captures its own
/// distinct old value from the atomic swap and waits, conservatively, on
/// the shared reader count.
///
/// # Examples
/// ```
/// use rt_reclaim::{Collector, PublishedCell};
///
/// let mut collector = Collector::new();
/// let cell = PublishedCell::new(collector.make_shared(vec![0.0f32; 32]));
///
/// // Real-time thread: wait-free snapshot of the current value.
/// let snapshot = cell.get();
/// assert_eq!(snapshot.len(), 32);
///
/// // Non-real-time thread: publish a replacement.
/// cell.set(collector.make_shared(vec![1.0f32; 64]));
/// assert_eq!(cell.get().len(), 64);
///
/// drop(snapshot);
/// drop(cell);
/// collector.collect();
/// ```
///
/// [`get`]: PublishedCell::get
/// [`set`]: PublishedCell::set
/// [`replace`]: PublishedCell::replace
///
/// 一个可原子发布的槽位，持有一个 [`Shared`] 值：实时线程可以无等待地
/// 读取，同时非实时写入者换入替代值。
/// 槽位自身持有所存节点的一个引用，因此从槽位读到的指针总是指向
/// 引用计数至少为一的节点。读者计数握手将该保证延伸到 [`get`] 把
/// 原始指针转换为自己的引用的那个窗口。
/// 成本不对称是有意的：[`get`] 付出两次原子自增和一次自减，从不等待；
/// [`set`] / [`replace`] 先交换槽位，再自旋到没有进行中的 `get` 为止。
/// 支持多个并发写入者：每个写入者通过原子交换捕获各自不同的旧值，
/// 并保守地等待共享的读者计数。
#[repr(align(64))]
pub struct PublishedCell<T: Send + 'static> {
    /// In-flight `get` calls.
    /// 进行中的 `get` 调用数。
    readers: AtomicUsize,
    /// The published node. Never null.
    /// 已发布的节点。永不为 null。
    slot: AtomicPtr<Node<SharedInner<T>>>,
}

unsafe impl<T: Send + Sync + 'static> Send for PublishedCell<T> {}
unsafe impl<T: Send + Sync + 'static> Sync for PublishedCell<T> {}

impl<T: Send + 'static> PublishedCell<T> {
    /// Construct a cell publishing `initial`. The cell takes over the
    /// caller's reference; the count does not change.
    ///
    /// 构造一个发布 `initial` 的槽位。槽位接管调用者的引用；计数不变。
    pub fn new(initial: Shared<T>) -> PublishedCell<T> {
        let node = initial.node.as_ptr();
        mem::forget(initial);

        PublishedCell {
            readers: AtomicUsize::new(0),
            slot: AtomicPtr::new(node),
        }
    }

    /// Take a new reference to the currently published value.
    ///
    /// Wait-free and real-time-safe: two atomic increments and one
    /// decrement, no spinning, no allocation.
    ///
    /// The `SeqCst` increment-then-load pairs with the writer's `SeqCst`
    /// swap-then-load (the store-buffering pattern): either this call
    /// observes the new slot value, or the writer observes a nonzero reader
    /// count and waits. Either way the reference-count increment below lands
    /// on a node the writer has not yet released.
    ///
    /// 对当前已发布的值取一个新引用。
    /// 无等待且实时安全：两次原子自增和一次自减，无自旋，无分配。
    /// `SeqCst` 的“自增后加载”与写入者 `SeqCst` 的“交换后加载”配对
    /// （store-buffering 模式）：要么本调用观察到新的槽位值，要么写入者
    /// 观察到非零的读者计数并等待。无论哪种情况，下面的引用计数自增
    /// 都落在写入者尚未释放的节点上。
    pub fn get(&self) -> Shared<T> {
        self.readers.fetch_add(1, Ordering::SeqCst);
        let node = self.slot.load(Ordering::SeqCst);
        unsafe {
            (*node).data.refs.fetch_add(1, Ordering::Relaxed);
        }
        // Release: the increment above must be ordered before any writer
        // observes this decrement.
        self.readers.fetch_sub(1, Ordering::Release);

        Shared::from_node(unsafe { NonNull::new_unchecked(node) })
    }

    /// Publish `value` and release the previously published value.
    ///
    /// Not real-time-safe: spins until in-flight [`get`] calls complete,
    /// and releasing the old value may queue its node.
    ///
    /// 发布 `value` 并释放先前发布的值。
    /// 非实时安全：自旋等待进行中的 [`get`] 完成，且释放旧值可能使其
    /// 节点入队。
    ///
    /// [`get`]: PublishedCell::get
    pub fn set(&self, value: Shared<T>) {
        drop(self.replace(value));
    }

    /// Publish `value` and return the previously published value instead of
    /// releasing it. Same contract as [`set`].
    ///
    /// The spin waits on the shared reader count, so it may also wait for
    /// readers that loaded a different (newer) value; that is a looser
    /// latency bound, never an unsoundness.
    ///
    /// 发布 `value`，并返回而非释放先前发布的值。契约与 [`set`] 相同。
    /// 自旋等待的是共享的读者计数，因此也可能等到加载了别的（更新的）
    /// 值的读者；这只是更宽松的延迟界，绝不是不健全。
    ///
    /// [`set`]: PublishedCell::set
    pub fn replace(&self, value: Shared<T>) -> Shared<T> {
        let new = value.node.as_ptr();
        mem::forget(value);

        let old = self.slot.swap(new, Ordering::SeqCst);

        // Any get() that could still hold a raw pointer to `old` without
        // having secured its reference yet is counted here. Once the count
        // reads zero, every such get has finished its increment.
        while self.readers.load(Ordering::SeqCst) != 0 {
            spin_loop();
        }

        Shared::from_node(unsafe { NonNull::new_unchecked(old) })
    }

    /// Consume the cell, returning the published value.
    /// 消耗槽位，返回已发布的值。
    pub fn into_inner(self) -> Shared<T> {
        let node = self.slot.load(Ordering::Relaxed);
        mem::forget(self);

        Shared::from_node(unsafe { NonNull::new_unchecked(node) })
    }
}

impl<T: Send + 'static> Drop for PublishedCell<T> {
    /// Release the cell's own reference. No readers can be in flight once
    /// the cell is being dropped.
    ///
    /// 释放槽位自身的引用。槽位被 drop 时不可能再有进行中的读者。
    fn drop(&mut self) {
        let node = self.slot.load(Ordering::Relaxed);
        drop(Shared::from_node(unsafe {
            NonNull::new_unchecked(node)
        }));
    }
}
