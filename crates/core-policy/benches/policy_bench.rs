use core_policy::{Policy, Resource};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn create_test_policy(num_rules: usize) -> Policy {
    let mut yaml = String::from("description: benchmark-policy\nfor:\n  job:\n");
    for i in 0..num_rules {
        yaml.push_str(&format!(
            "    - match:\n        group: 'team{i}/.*'\n      allow: [read, run]\n"
        ));
    }
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    Policy::from_value(&value).unwrap()
}

fn benchmark_policy_evaluation(c: &mut Criterion) {
    let policy_10 = create_test_policy(10);
    let policy_100 = create_test_policy(100);
    let policy_1000 = create_test_policy(1000);

    let resource = |i: usize| Resource::of_type("job").with("group", format!("team{i}/deploy"));
    let r5 = resource(5);
    let r50 = resource(50);
    let r500 = resource(500);

    c.bench_function("policy_eval_10_rules", |b| {
        b.iter(|| policy_10.includes(black_box(&r5), black_box("run")));
    });

    c.bench_function("policy_eval_100_rules", |b| {
        b.iter(|| policy_100.includes(black_box(&r50), black_box("run")));
    });

    c.bench_function("policy_eval_1000_rules", |b| {
        b.iter(|| policy_1000.includes(black_box(&r500), black_box("run")));
    });
}

fn benchmark_policy_creation(c: &mut Criterion) {
    let value: serde_yaml::Value = serde_yaml::from_str(
        "description: bench\ncontext:\n  project: 'prod-.*'\nfor:\n  node:\n    - allow: '*'\n",
    )
    .unwrap();

    c.bench_function("policy_create", |b| {
        b.iter(|| Policy::from_value(black_box(&value)));
    });

    c.bench_function("policy_first_request", |b| {
        let node = Resource::of_type("node");
        b.iter(|| {
            let policy = Policy::from_value(&value).unwrap();
            policy.includes(black_box(&node), black_box("read"))
        });
    });
}

fn benchmark_legacy_rules(c: &mut Criterion) {
    let value: serde_yaml::Value = serde_yaml::from_str(
        "description: legacy\nrules:\n  'ops/.*':\n    actions: [read, run]\n  'dev/.*':\n    actions: '*'\n",
    )
    .unwrap();
    let policy = Policy::from_value(&value).unwrap();
    let job = Resource::of_type("job")
        .with("group", "dev/build")
        .with("job", "compile");

    c.bench_function("legacy_rule_lookup", |b| {
        b.iter(|| policy.includes(black_box(&job), black_box("run")));
    });
}

criterion_group!(
    benches,
    benchmark_policy_evaluation,
    benchmark_policy_creation,
    benchmark_legacy_rules
);
criterion_main!(benches);
