//! 队列压力测试 - 并发支付回调与叫号
//!
//! 使用 ServerState::initialize 完整初始化。
//!
//! 交叉执行模式：支付回调（含重复投递）、叫号和出餐并发进行，
//! 验证三条硬性约束：
//! - 制作位同一时刻最多一个订单
//! - 队列号全局唯一且单调
//! - 重复回调只产生一次转换

use antrian_server::{Config, ServerState};
use rand::Rng;
use shared::models::Product;
use shared::order::{DraftItem, OrderDraft, PaymentNotification, PaymentOutcome, QueueState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

const ORDER_COUNT: usize = 200;
const CALLBACK_WORKERS: usize = 8;
const OPERATOR_WORKERS: usize = 4;

const PRODUCTS: &[(&str, &str, i64)] = &[
    ("product-nasi", "Nasi Goreng", 25000),
    ("product-mie", "Mie Ayam", 18000),
    ("product-sate", "Sate Ayam", 30000),
    ("product-teh", "Es Teh", 5000),
    ("product-jeruk", "Es Jeruk", 8000),
];

fn random_draft(rng: &mut impl Rng, idx: usize) -> OrderDraft {
    let count = rng.gen_range(1..=4);
    let items = (0..count)
        .map(|_| DraftItem {
            product_id: PRODUCTS[rng.gen_range(0..PRODUCTS.len())].0.to_string(),
            quantity: rng.gen_range(1..=3),
        })
        .collect();
    OrderDraft {
        customer_name: format!("Pelanggan {}", idx),
        contact_handle: format!("08123{:06}", idx),
        items,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callbacks_and_operators() {
    let work_dir = std::env::temp_dir().join(format!("antrian_stress_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&work_dir);

    let config = Config::with_overrides(work_dir.to_str().unwrap(), 18090);
    let state = Arc::new(ServerState::initialize(&config).unwrap());

    for (id, name, price) in PRODUCTS {
        state.store.put_product(&Product::new(*id, *name, *price)).unwrap();
    }

    // 1. 下单
    let start = Instant::now();
    let mut order_ids = Vec::with_capacity(ORDER_COUNT);
    {
        let mut rng = rand::thread_rng();
        for idx in 0..ORDER_COUNT {
            let (order, _) = state
                .lifecycle
                .create_order(&random_draft(&mut rng, idx))
                .await
                .unwrap();
            order_ids.push(order.order_id);
        }
    }
    println!("created {} orders in {:?}", ORDER_COUNT, start.elapsed());

    // 2. 并发支付回调，每单投递两次（模拟 provider 重试）
    let applied = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for worker in 0..CALLBACK_WORKERS {
        let state = Arc::clone(&state);
        let order_ids = order_ids.clone();
        let applied = Arc::clone(&applied);
        handles.push(tokio::task::spawn_blocking(move || {
            for (idx, order_id) in order_ids.iter().enumerate() {
                if idx % CALLBACK_WORKERS != worker {
                    continue;
                }
                for _ in 0..2 {
                    let result = state
                        .lifecycle
                        .handle_payment_outcome(&PaymentNotification {
                            provider_txn_id: format!("txn-{}", idx),
                            order_id: order_id.clone(),
                            outcome: PaymentOutcome::Success,
                        })
                        .unwrap();
                    if result.is_some() {
                        applied.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }

    // 3. 并发叫号 + 出餐，与回调交叉执行
    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..OPERATOR_WORKERS {
        let state = Arc::clone(&state);
        let completed = Arc::clone(&completed);
        handles.push(tokio::task::spawn_blocking(move || {
            while completed.load(Ordering::Relaxed) < ORDER_COUNT {
                match state.lifecycle.promote().unwrap() {
                    Some(order) => {
                        // 叫到号的 worker 负责出餐
                        state.lifecycle.complete(&order.order_id).unwrap();
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => std::thread::yield_now(),
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    println!(
        "processed {} orders in {:?}",
        ORDER_COUNT,
        start.elapsed()
    );

    // 每单恰好一次转换，尽管每单收到两次回调
    assert_eq!(applied.load(Ordering::Relaxed), ORDER_COUNT);
    assert_eq!(completed.load(Ordering::Relaxed), ORDER_COUNT);

    // 4. 终态校验
    let mut queue_numbers = HashSet::new();
    for order_id in &order_ids {
        let order = state.store.get(order_id).unwrap();
        assert_eq!(order.queue_state, QueueState::Done, "order {}", order_id);
        let number = order.queue_number.unwrap();
        assert!(
            queue_numbers.insert(number),
            "duplicate queue number {}",
            number
        );
    }
    assert_eq!(queue_numbers.len(), ORDER_COUNT);
    assert_eq!(*queue_numbers.iter().max().unwrap(), ORDER_COUNT as u64);

    // 事件序列：每单 3 个事件（入队/开做/出餐），无空洞
    let head = state.store.current_sequence().unwrap();
    assert_eq!(head, (ORDER_COUNT * 3) as u64);

    let _ = std::fs::remove_dir_all(&work_dir);
}

/// 制作位互斥：叫号与出餐并发进行时，持续采样全量状态，
/// 任意时刻 in_preparation 的订单数不得超过 1。
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_preparation_count_never_exceeds_one() {
    const N: usize = 60;
    const PROMOTERS: usize = 4;

    let dir = TempDir::new().unwrap();
    let config = Config::with_overrides(dir.path().to_str().unwrap(), 18091);
    let state = Arc::new(ServerState::initialize(&config).unwrap());

    for (id, name, price) in PRODUCTS {
        state.store.put_product(&Product::new(*id, *name, *price)).unwrap();
    }

    // 先把所有订单排进等候队列
    let mut rng = rand::thread_rng();
    for idx in 0..N {
        let (order, _) = state
            .lifecycle
            .create_order(&random_draft(&mut rng, idx))
            .await
            .unwrap();
        state
            .lifecycle
            .handle_payment_outcome(&PaymentNotification {
                provider_txn_id: format!("txn-{}", idx),
                order_id: order.order_id,
                outcome: PaymentOutcome::Success,
            })
            .unwrap();
    }

    let completed = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();

    // 采样线程：与叫号并发读取全量状态
    {
        let state = Arc::clone(&state);
        let completed = Arc::clone(&completed);
        handles.push(tokio::task::spawn_blocking(move || {
            while completed.load(Ordering::Relaxed) < N {
                let in_prep = state
                    .store
                    .non_terminal_orders()
                    .unwrap()
                    .into_iter()
                    .filter(|o| o.queue_state == QueueState::InPreparation)
                    .count();
                assert!(in_prep <= 1, "{} orders in preparation at once", in_prep);
            }
        }));
    }

    for _ in 0..PROMOTERS {
        let state = Arc::clone(&state);
        let completed = Arc::clone(&completed);
        handles.push(tokio::task::spawn_blocking(move || {
            while completed.load(Ordering::Relaxed) < N {
                match state.lifecycle.promote().unwrap() {
                    Some(order) => {
                        state.lifecycle.complete(&order.order_id).unwrap();
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => std::thread::yield_now(),
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(completed.load(Ordering::Relaxed), N);
}
