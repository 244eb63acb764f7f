use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pyprune_parser::{extract_source_imports, LanguageRegistry};
use std::hint::black_box;

fn sample_module(functions: usize) -> String {
    let mut source = String::from(
        "import os\nimport sys\nimport numpy as np\nfrom typing import Any, Optional\nfrom .models import User\n\n",
    );
    for i in 0..functions {
        source.push_str(&format!(
            "def handler_{i}(request):\n    from requests.adapters import HTTPAdapter\n    value = np.zeros({i})\n    return HTTPAdapter, value\n\n"
        ));
    }
    source
}

fn bench_extract(c: &mut Criterion) {
    let registry = LanguageRegistry::default();
    let mut group = c.benchmark_group("extract_imports");

    for functions in [10usize, 200] {
        let source = sample_module(functions);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("{functions}_functions"), |b| {
            let mut parser = registry.create_parser().expect("python grammar");
            b.iter(|| {
                let items = extract_source_imports(&mut parser, black_box(source.as_bytes()))
                    .expect("valid source");
                black_box(items)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
