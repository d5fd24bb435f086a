use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use voxtimer::compose::{ComposeOptions, Composer, PhasePlan, merge_phases};
use voxtimer::schedule::StageSchedule;
use voxtimer::tts::MockSynthesizer;

fn plans(prep: u64, main: u64) -> (PhasePlan, PhasePlan) {
    let schedule = StageSchedule::default();
    (
        PhasePlan::from_schedule(&schedule, prep),
        PhasePlan::from_schedule(&schedule, main),
    )
}

/// Schedule generation and merge for a long session
fn bench_schedule(c: &mut Criterion) {
    let schedule = StageSchedule::default();
    c.bench_function("schedule_2h", |b| {
        b.iter(|| schedule.announcements(black_box(7200)))
    });

    let (prep, main) = plans(20, 7200);
    c.bench_function("merge_2h", |b| {
        b.iter(|| merge_phases(black_box(&prep), black_box(&main)))
    });
}

/// Full in-memory composition of the default 20s + 6m55s track
fn bench_compose(c: &mut Criterion) {
    let (prep, main) = plans(20, 415);
    let synth = MockSynthesizer::new();

    let mut group = c.benchmark_group("compose_default_track");
    group.sample_size(20);
    for workers in [1usize, 2, 4] {
        let options = ComposeOptions {
            workers,
            ..Default::default()
        };
        let composer = Composer::new(&synth, options);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                let (timeline, _) = composer
                    .compose(black_box(&prep), black_box(&main))
                    .expect("composition failed");
                black_box(timeline.total_samples())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_schedule, bench_compose);
criterion_main!(benches);
