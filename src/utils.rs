use crate::types::{NodeRef, Terminal, Var};

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        // b * b + a
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        // a * a + a + b
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// [Pairing function][pairing] for two `u64` values.
///
/// [pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Cheap structural hashing used for node-identity buckets and operation
/// caches.  Not a cryptographic hash; collisions are resolved by the chains
/// (identity table) or tolerated (caches are lossy).
pub trait MyHash {
    fn hash(&self) -> u64;
}

impl MyHash for u64 {
    fn hash(&self) -> u64 {
        *self
    }
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        pairing3(self.0, self.1, self.2)
    }
}

impl MyHash for NodeRef {
    fn hash(&self) -> u64 {
        self.index() as u64
    }
}

impl MyHash for Terminal {
    fn hash(&self) -> u64 {
        self.raw() as u64
    }
}

impl MyHash for (NodeRef, NodeRef) {
    fn hash(&self) -> u64 {
        pairing2(self.0.index() as u64, self.1.index() as u64)
    }
}

impl MyHash for (NodeRef, NodeRef, NodeRef) {
    fn hash(&self) -> u64 {
        pairing3(self.0.index() as u64, self.1.index() as u64, self.2.index() as u64)
    }
}

impl MyHash for (u32, NodeRef) {
    fn hash(&self) -> u64 {
        pairing2(self.0 as u64, self.1.index() as u64)
    }
}

impl MyHash for (u32, NodeRef, NodeRef) {
    fn hash(&self) -> u64 {
        pairing3(self.0 as u64, self.1.index() as u64, self.2.index() as u64)
    }
}

impl MyHash for (Var, NodeRef, NodeRef) {
    fn hash(&self) -> u64 {
        pairing3(self.0.id() as u64, self.1.index() as u64, self.2.index() as u64)
    }
}
