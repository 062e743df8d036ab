use crate::ensembles::{ensemble, historical};
use criterion::{black_box, Criterion};
use shortage_distributions::analysis::percentile_bands::{ensemble_percentile_bands, sort_members};
use shortage_distributions::prelude::*;

const MEMBER_COUNTS: [usize; 3] = [97, 366, 1000];

pub fn bench_annual_totals(c: &mut Criterion) {
    for &members in &MEMBER_COUNTS {
        let ensemble = ensemble(members);
        let id = &format!("annual_totals_{}", members);
        c.bench_function(id, |b| b.iter(|| black_box(&ensemble).annual_totals(12).unwrap()));
    }
}

pub fn bench_percentile_bands(c: &mut Criterion) {
    for &members in &MEMBER_COUNTS {
        let sorted = sort_members(ensemble(members).annual_totals(12).unwrap().view());
        let id = &format!("percentile_bands_{}", members);
        c.bench_function(id, |b| {
            b.iter(|| {
                ensemble_percentile_bands(black_box(sorted.view()), &DEFAULT_PERCENTILE_LEVELS).unwrap()
            })
        });
    }
}

pub fn bench_analyze(c: &mut Criterion) {
    let analyzer = ShortageDistributionAnalyzer::default();
    let historical = historical();

    for &members in &MEMBER_COUNTS {
        let ensemble = ensemble(members);
        let id = &format!("analyze_{}", members);
        c.bench_function(id, |b| {
            b.iter(|| analyzer.analyze(black_box(&historical), black_box(&ensemble)).unwrap())
        });

        let distribution = analyzer.analyze(&historical, &ensemble).unwrap();
        println!("[{}] Rank positions: {}", id, distribution.bands.len());
    }
}
