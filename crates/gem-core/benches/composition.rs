use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gem_core::{Definition, Gem, TypeId, Value};

fn person(gem: &Gem, name: &str, parents: &[TypeId]) -> TypeId {
    let b = *gem.builtins();
    gem.model(
        name,
        parents,
        Definition::new()
            .field("name*", b.text)
            .field("age?", b.number)
            .field("active", true),
    )
    .unwrap()
}

fn bench_compose(c: &mut Criterion) {
    let gem = Gem::new().unwrap();
    let base = person(&gem, "Base", &[]);

    c.bench_function("compose_model", |b| {
        b.iter(|| person(&gem, black_box("Person"), &[]));
    });

    let mut group = c.benchmark_group("compose_depth");
    for depth in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut ty = base;
                for _ in 0..depth {
                    ty = gem.compose("Layer", &[ty], Definition::new()).unwrap();
                }
                ty
            });
        });
    }
    group.finish();
}

fn bench_construct(c: &mut Criterion) {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let person = person(&gem, "Person", &[]);
    let student = gem
        .compose("Student", &[person], Definition::new().field("gpa*", b.number))
        .unwrap();
    let args = [Value::record([
        ("name", Value::from("Ann")),
        ("gpa", Value::from(3.5)),
    ])];

    c.bench_function("construct_student", |bench| {
        bench.iter(|| gem.construct(student, black_box(&args)).unwrap());
    });

    let ann = gem.instantiate(student, &args).unwrap();
    let mut n = 0.0;
    c.bench_function("field_set", |bench| {
        bench.iter(|| {
            n += 1.0;
            ann.set(&gem, "gpa", black_box(n)).unwrap()
        });
    });

    c.bench_function("field_set_text_coerced", |bench| {
        bench.iter(|| ann.set(&gem, "age", black_box("41")).unwrap());
    });
}

fn bench_defines(c: &mut Criterion) {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let has_name = gem
        .interface("HasName", &[], Definition::new().field("name*", b.text))
        .unwrap();
    let record = Value::record([("name", "X")]);

    c.bench_function("defines_structural", |bench| {
        bench.iter(|| gem.defines(has_name, black_box(&record)));
    });

    let mut ty = person(&gem, "Root", &[]);
    let root = ty;
    for _ in 0..32 {
        ty = gem.compose("Layer", &[ty], Definition::new()).unwrap();
    }
    let deep = gem.construct(ty, &[Value::record([("name", "Deep")])]).unwrap();
    c.bench_function("defines_nominal_deep", |bench| {
        bench.iter(|| gem.defines(root, black_box(&deep)));
    });
}

criterion_group!(benches, bench_compose, bench_construct, bench_defines);
criterion_main!(benches);
