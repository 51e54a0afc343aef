#![allow(dead_code)]

pub use dagsched_test_utils::builders;
pub use dagsched_test_utils::dag;
pub use dagsched_test_utils::fake_backend;
pub use dagsched_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use dagsched::resource::{PoolRef, SharedPool};

/// A single pool called `p` with the given cores per host.
pub fn single_pool(hosts: &[u32]) -> (SharedPool, Vec<PoolRef>) {
    let pool = SharedPool::new("p", hosts);
    let refs: Vec<PoolRef> = vec![Arc::new(pool.clone())];
    (pool, refs)
}

pub fn pool_refs(pools: &[SharedPool]) -> Vec<PoolRef> {
    pools
        .iter()
        .map(|p| Arc::new(p.clone()) as PoolRef)
        .collect()
}
