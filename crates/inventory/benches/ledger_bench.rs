use criterion::{Criterion, criterion_group, criterion_main};
use inventory::{InMemoryStockLedger, ProductId, StockLedger};

fn bench_deduct_and_restore(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ledger = InMemoryStockLedger::new();
    rt.block_on(ledger.put_item(ProductId::new(1), 1_000)).unwrap();

    c.bench_function("ledger/deduct_and_restore", |b| {
        b.iter(|| {
            rt.block_on(async {
                ledger.deduct_stock(ProductId::new(1), 1).await.unwrap();
                ledger.restore_stock(ProductId::new(1), 1).await.unwrap();
            });
        });
    });
}

fn bench_contended_deductions(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/contended_deductions_16", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ledger = InMemoryStockLedger::new();
                ledger.put_item(ProductId::new(1), 8).await.unwrap();

                let handles: Vec<_> = (0..16)
                    .map(|_| {
                        let ledger = ledger.clone();
                        tokio::spawn(async move { ledger.deduct_stock(ProductId::new(1), 1).await })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.await.unwrap();
                }
            });
        });
    });
}

fn bench_independent_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ledger = InMemoryStockLedger::new();
    rt.block_on(async {
        for id in 1..=32 {
            ledger.put_item(ProductId::new(id), 1_000_000).await.unwrap();
        }
    });

    c.bench_function("ledger/independent_products_32", |b| {
        b.iter(|| {
            rt.block_on(async {
                let handles: Vec<_> = (1..=32)
                    .map(|id| {
                        let ledger = ledger.clone();
                        tokio::spawn(async move { ledger.deduct_stock(ProductId::new(id), 1).await })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap().unwrap();
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_deduct_and_restore,
    bench_contended_deductions,
    bench_independent_products
);
criterion_main!(benches);
