use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free shared double, per spec.md §9 ("use lock-free atomic doubles
/// ... never share higher-level collections across workers"). `std` has no
/// `AtomicF64`, so this stores the bit pattern in an `AtomicU64` the way
/// `std::sync::atomic::AtomicF64`-shaped crates typically do: `f64::to_bits`
/// going in, `f64::from_bits` coming out, both lossless.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bits() {
        let a = AtomicF64::new(51.047_2);
        assert_eq!(a.load(Ordering::Relaxed), 51.047_2);
        a.store(-13.5, Ordering::Relaxed);
        assert_eq!(a.load(Ordering::Relaxed), -13.5);
    }
}
