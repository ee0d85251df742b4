//! Helpers shared by unit tests across the workspace.

use arbitrary::{Arbitrary, Unstructured};
use rand::RngCore;

const ARB_GEN_LEN: usize = 1 << 14;

/// Generates arbitrary instances backed by a random byte pool.
pub struct ArbitraryGenerator {
    buf: Vec<u8>,
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::new_with_size(ARB_GEN_LEN)
    }

    pub fn new_with_size(n: usize) -> Self {
        let mut buf = vec![0u8; n];
        rand::thread_rng().fill_bytes(&mut buf);
        Self { buf }
    }

    pub fn generate<'a, T: Arbitrary<'a>>(&'a self) -> T {
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("failed to generate arbitrary instance")
    }
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}
