use std::hash::BuildHasher;

use twox_hash::XxHash64;

const NAME_SEED: u64 = 0xdeadbeef;

/// An implementation of [`BuildHasher`] producing xxhash64 hashers with a
/// fixed seed, used to key the registry by metric name.
#[derive(Default, Debug, Clone, Copy)]
pub struct BuildNameHasher;

impl BuildHasher for BuildNameHasher {
    type Hasher = XxHash64;

    fn build_hasher(&self) -> Self::Hasher {
        XxHash64::with_seed(NAME_SEED)
    }
}
