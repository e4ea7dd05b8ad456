use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use models::{Credential, Role, RouteTable};
use service::auth::collaborator::mock::MockAuthCollaborator;
use service::auth::{ResolverConfig, SessionResolver};
use service::storage::SessionStore;

fn bench_resolve(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let path = std::env::temp_dir().join(format!("bench_session_{}.json", std::process::id()));
    let store = rt.block_on(SessionStore::init(&path)).unwrap();
    let mock = Arc::new(MockAuthCollaborator::new().with_account("bench@h.com", "Benchmark1", Role::Doctor, "Bench"));
    let resolver = SessionResolver::new(mock, store, Arc::new(RouteTable::default()), ResolverConfig::default());

    c.bench_function("resolve_in_memory_session", |b| {
        b.iter(|| {
            let res = rt.block_on(resolver.resolve(Credential::new(Role::Doctor, "bench@h.com", "Benchmark1")));
            assert!(res.result().is_some_and(|r| r.is_success()));
        });
    });

    c.bench_function("resolve_role_mismatch", |b| {
        b.iter(|| {
            let _ = rt.block_on(resolver.resolve(Credential::new(Role::Admin, "bench@h.com", "Benchmark1")));
        });
    });

    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
