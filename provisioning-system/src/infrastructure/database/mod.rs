mod memory;
mod redis;

use domain_provisioning::{exception::ProvisionException, model::vo::StorageLimits};

pub use self::memory::MemoryRepository;
pub use self::redis::RedisRepository;

fn check_key(key: &str, limits: &StorageLimits) -> anyhow::Result<()> {
    check_size("key", key.len(), limits.max_key_size)
}

fn check_size(what: &'static str, size: usize, limit: usize) -> anyhow::Result<()> {
    if size > limit {
        return Err(ProvisionException::StorageLimitExceeded { what, size, limit }.into());
    }
    Ok(())
}

/// Serialize a value and enforce the size ceiling of its store.
fn encode<T: serde::Serialize>(
    what: &'static str,
    value: &T,
    limit: usize,
) -> anyhow::Result<String> {
    let encoded = serde_json::to_string(value)?;
    check_size(what, encoded.len(), limit)?;
    Ok(encoded)
}
