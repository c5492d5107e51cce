/// 并发测试模块
/// 测试多生产者入队、跨线程引用计数和发布槽位的读写协议
use crate::{Collector, PublishedCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// 析构探针：每次 drop 使计数器加一
struct DropProbe(Arc<AtomicUsize>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// 带标签的析构探针，用于区分发布槽位中的不同代
struct Tagged {
    id: u32,
    _probe: DropProbe,
}

/// 测试1: N 个生产者线程各入队 M 个节点，无一丢失、无一重复
#[test]
fn test_many_producers_no_node_lost() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;

    let counter = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();
    let allocator = collector.allocator();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let allocator = allocator.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..PER_PRODUCER {
                    // 分配后立即 drop：生产者从不阻塞
                    drop(allocator.make_owned(DropProbe(counter.clone())));
                }
            })
        })
        .collect();

    // 与生产者并发地回收
    let mut freed = 0;
    while counter.load(Ordering::Relaxed) < PRODUCERS * PER_PRODUCER {
        freed += collector.collect();
    }

    for handle in handles {
        handle.join().unwrap();
    }
    freed += collector.collect();

    assert_eq!(freed, PRODUCERS * PER_PRODUCER);
    assert_eq!(counter.load(Ordering::Relaxed), PRODUCERS * PER_PRODUCER);
    drop(allocator);
    assert_eq!(collector.alloc_count(), 0);
}

/// 测试2: 跨线程 clone/release，析构恰好运行一次
#[test]
fn test_concurrent_clone_release_destructor_once() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    for _ in 0..20 {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut collector = Collector::new();
        let shared = collector.make_shared(DropProbe(counter.clone()));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        let clone = shared.clone();
                        drop(clone);
                    }
                    drop(shared);
                })
            })
            .collect();

        drop(shared);

        for handle in handles {
            handle.join().unwrap();
        }

        collector.collect();
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(collector.alloc_count(), 0);
    }
}

/// 测试3: 最后一次 release 发生在另一线程（模拟实时线程）
#[test]
fn test_last_release_on_other_thread() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();
    let shared = collector.make_shared(DropProbe(counter.clone()));

    let worker = thread::spawn(move || {
        // 此线程发现计数归零并执行入队
        drop(shared);
    });
    worker.join().unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 0);
    assert_eq!(collector.collect(), 1);
    assert_eq!(counter.load(Ordering::Relaxed), 1);
}

/// 测试4: get 与 set 并发，读者永不拿到已释放的节点
#[test]
fn test_cell_get_concurrent_with_set() {
    const GETS: usize = 2000;
    const SETS: usize = 200;

    let counter = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();
    let allocator = collector.allocator();

    let cell = Arc::new(PublishedCell::new(collector.make_shared(Tagged {
        id: 0,
        _probe: DropProbe(counter.clone()),
    })));

    let reader_cell = cell.clone();
    let reader = thread::spawn(move || {
        let mut max_seen = 0;
        for _ in 0..GETS {
            let snapshot = reader_cell.get();
            // 任何快照都必须仍然有效；id 单调增加
            assert!(snapshot.id <= SETS as u32);
            assert!(snapshot.id >= max_seen);
            max_seen = snapshot.id;
        }
    });

    for id in 1..=SETS as u32 {
        let counter = counter.clone();
        cell.set(allocator.make_shared(Tagged {
            id,
            _probe: DropProbe(counter),
        }));
    }

    reader.join().unwrap();

    drop(cell);
    collector.collect();

    // 共发布 SETS + 1 个值，全部恰好析构一次
    assert_eq!(counter.load(Ordering::Relaxed), SETS + 1);
    drop(allocator);
    assert_eq!(collector.alloc_count(), 0);
}

/// 测试5: 规格场景——写入者 set(V2) 与 1000 次 get 交错
#[test]
fn test_cell_writer_swap_during_thousand_gets() {
    let c1 = Arc::new(AtomicUsize::new(0));
    let c2 = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();

    let cell = Arc::new(PublishedCell::new(collector.make_shared(Tagged {
        id: 1,
        _probe: DropProbe(c1.clone()),
    })));

    let reader_cell = cell.clone();
    let reader = thread::spawn(move || {
        // 保留一部分句柄，其余立即 drop
        let mut held = Vec::new();
        for i in 0..1000 {
            let snapshot = reader_cell.get();
            if i % 100 == 0 {
                held.push(snapshot);
            }
        }
        held
    });

    cell.set(collector.make_shared(Tagged {
        id: 2,
        _probe: DropProbe(c2.clone()),
    }));

    let held = reader.join().unwrap();
    collector.collect();

    // V1 最多已析构一次（读者可能仍持有 V1 的句柄）
    assert!(c1.load(Ordering::Relaxed) <= 1);
    assert_eq!(c2.load(Ordering::Relaxed), 0);

    // V2 的计数 = 槽位自身 + 读者仍持有的 V2 句柄
    let outstanding_v2 = held.iter().filter(|s| s.id == 2).count();
    let probe = cell.get();
    assert_eq!(probe.id, 2);
    assert_eq!(probe.ref_count(), 1 + outstanding_v2 + 1);
    drop(probe);

    // 全部释放后：两个值各恰好析构一次
    drop(held);
    drop(cell);
    collector.collect();
    assert_eq!(c1.load(Ordering::Relaxed), 1);
    assert_eq!(c2.load(Ordering::Relaxed), 1);
    assert_eq!(collector.alloc_count(), 0);
}

/// 测试6: 多个并发写入者，各自捕获不同的旧值
#[test]
fn test_cell_multiple_concurrent_writers() {
    const WRITERS: usize = 4;
    const REPLACES: usize = 100;

    let counter = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();
    let allocator = collector.allocator();

    let cell = Arc::new(PublishedCell::new(collector.make_shared(DropProbe(
        counter.clone(),
    ))));

    let reader_cell = cell.clone();
    let reader = thread::spawn(move || {
        for _ in 0..1000 {
            drop(reader_cell.get());
        }
    });

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let cell = cell.clone();
            let allocator = allocator.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..REPLACES {
                    let old = cell.replace(allocator.make_shared(DropProbe(counter.clone())));
                    drop(old);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    drop(cell);
    collector.collect();

    // 1 个初始值 + WRITERS * REPLACES 个替换值，全部恰好析构一次
    assert_eq!(counter.load(Ordering::Relaxed), 1 + WRITERS * REPLACES);
    drop(allocator);
    assert_eq!(collector.alloc_count(), 0);
}

/// 测试7: Owned 与 Shared 混合的多线程释放
#[test]
fn test_mixed_owned_shared_releases() {
    const THREADS: usize = 6;

    let counter = Arc::new(AtomicUsize::new(0));
    let mut collector = Collector::new();
    let allocator = collector.allocator();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let allocator = allocator.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    if i % 2 == 0 {
                        drop(allocator.make_owned(DropProbe(counter.clone())));
                    } else {
                        let shared = allocator.make_shared(DropProbe(counter.clone()));
                        let clone = shared.clone();
                        drop(shared);
                        drop(clone);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    collector.collect();
    assert_eq!(counter.load(Ordering::Relaxed), THREADS * 100);
}
