use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xfill::{
    Alphabet, Crossword, Layout, NullPresenter, Orchestrator, SolverConfig, WordList, WordReuse,
};

const GRID: &str = "     \n     \n     \n     \n     ";

fn words() -> WordList {
    WordList::parse(
        "HEART\nEMBER\nABUSE\nRESIN\nTREND\nHOUSE\nAPPLE\nQUICK\nMONEY\nTRAIN\n\
         SATIN\nTRACE\nCRANE\nSLATE\nPARSE",
    )
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dictionary = Arc::new(words());
    let config = SolverConfig::default().with_word_reuse(WordReuse::Allowed);

    for backend in ["backtrack", "sat", "native"] {
        c.bench_function(&format!("fill_5x5_{}", backend), |b| {
            b.iter(|| {
                let layout = Layout::parse(GRID, Alphabet::latin());
                let outcome = Orchestrator::default()
                    .solve(
                        black_box(layout),
                        dictionary.clone(),
                        config.clone().with_backend(backend),
                        &mut NullPresenter,
                    )
                    .unwrap();
                assert!(outcome.result.is_solved());
            })
        });
    }

    c.bench_function("build_grid", |b| {
        b.iter(|| Crossword::square(black_box("**   ***     *                     *     ***   **")))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
