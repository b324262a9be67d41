use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use subsync_core::{FrameQueue, ManagerConfig, RenderContext, SubscriptionManager};

fn manager(frames: &FrameQueue) -> SubscriptionManager<usize, String> {
    ManagerConfig::new(
        |q: &String| Ok(q.len()),
        |qs: &[String]| {
            black_box(qs.len());
            Ok(())
        },
        |qs: &[String]| {
            black_box(qs.len());
            Ok(())
        },
    )
    .deferral(frames.clone())
    .build()
}

fn bench_render_sweep(c: &mut Criterion) {
    let queries: Vec<String> = (0..64).map(|n| format!("item:{n}")).collect();

    c.bench_function("sweep 100 contexts x 64 queries", |b| {
        b.iter_batched(
            || {
                let frames = FrameQueue::new();
                let contexts: Vec<_> = (0..100).map(|_| RenderContext::detached()).collect();
                (frames.clone(), manager(&frames), contexts)
            },
            |(frames, manager, contexts)| {
                for ctx in &contexts {
                    ctx.render(|ctx| {
                        for q in &queries {
                            black_box(manager.get_with(q, ctx).ok());
                        }
                    })
                    .ok();
                }
                frames.flush();
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("rerender with one changed query", |b| {
        let frames = FrameQueue::new();
        let manager = manager(&frames);
        let contexts: Vec<_> = (0..100).map(|_| RenderContext::detached()).collect();
        let mut tick = 0usize;

        b.iter(|| {
            tick += 1;
            for ctx in &contexts {
                ctx.render(|ctx| {
                    for q in &queries[..63] {
                        black_box(manager.get_with(q, ctx).ok());
                    }
                    black_box(manager.get_with(&format!("tick:{}", tick % 2), ctx).ok());
                })
                .ok();
            }
            frames.flush();
        })
    });
}

criterion_group!(benches, bench_render_sweep);
criterion_main!(benches);
