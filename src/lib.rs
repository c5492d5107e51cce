//! Allocation-free deferred memory reclamation for real-time audio threads.
//!
//! A latency-bound thread (an audio callback) must never allocate, free,
//! lock, or block. This crate lets such a thread *release* memory anyway:
//! dropping an [`Owned`] or [`Shared`] handle only pushes the allocation's
//! intrusive node onto a lock-free queue, and a non-real-time thread later
//! calls [`Collector::collect`] to run destructors and actually free the
//! storage. [`PublishedCell`] builds on [`Shared`] to let a non-real-time
//! thread republish immutable data for the real-time thread to read
//! wait-free, with no locks and no use-after-free.
//!
//! # Thread classes
//! - **Real-time thread** (at most one per audio stream): may deref, clone
//!   and drop handles, and call [`PublishedCell::get`]. All of these are
//!   wait-free or constant-time, with no syscalls and no allocator calls.
//! - **Non-real-time threads** (any number): everything else, meaning allocation
//!   via [`Collector::make_owned`] / [`Collector::make_shared`] /
//!   [`Allocator`], collection via [`Collector::collect`], and publishing
//!   via [`PublishedCell::set`] / [`PublishedCell::replace`].
//!
//! # Typical usage
//! ```
//! use rt_reclaim::{Collector, PublishedCell};
//!
//! // Main thread: create the collector and publish initial data.
//! let mut collector = Collector::new();
//! let cell = PublishedCell::new(collector.make_shared(vec![0.0f32; 512]));
//!
//! // Real-time thread: take a wait-free snapshot, use it, drop it.
//! let snapshot = cell.get();
//! assert_eq!(snapshot.len(), 512);
//! drop(snapshot); // only queues; no destructor, no free
//!
//! // Non-real-time thread: publish a replacement, then reclaim.
//! cell.set(collector.make_shared(vec![1.0f32; 512]));
//! drop(cell);
//! collector.collect();
//! ```
//!
//! # Non-goals
//! No general-purpose garbage collection, no weak references or cycle
//! detection, no dynamically-sized payloads (add a layer of indirection),
//! and no blocking primitive usable from the real-time thread.
//!
//! 面向实时音频线程的无分配延迟内存回收。
//! 受延迟约束的线程（音频回调）绝不能分配、释放、加锁或阻塞。本 crate
//! 让这样的线程照样可以*释放*内存：drop 一个 [`Owned`] 或 [`Shared`]
//! 句柄只是把分配的侵入式节点推入一个无锁队列，稍后由非实时线程调用
//! [`Collector::collect`] 运行析构并真正释放存储。[`PublishedCell`]
//! 建立在 [`Shared`] 之上，使非实时线程可以重新发布不可变数据，供
//! 实时线程无等待地读取，既无锁也无悬垂使用。

mod cell;
mod collector;
mod node;
mod owned;
mod queue;
mod shared;
mod sync;

pub use cell::PublishedCell;
pub use collector::{Allocator, Collector};
pub use owned::Owned;
pub use shared::Shared;

#[cfg(test)]
mod tests;
