use halo2_proofs::halo2curves::bn256::Fr;
use hash_circuit::hash::Hashable;
use num_bigint::BigUint;

/// Two to one poseidon hash used for both tree nodes and leaf encodings.
pub fn hash(x: Fr, y: Fr) -> Fr {
    Hashable::hash([x, y])
}

pub(crate) trait Bit {
    fn bit(&self, i: usize) -> bool;
}

impl Bit for Fr {
    fn bit(&self, i: usize) -> bool {
        self.to_bytes()
            .get(i / 8)
            .map_or(false, |&byte| byte & (1 << (i % 8)) != 0)
    }
}

impl Bit for u64 {
    fn bit(&self, i: usize) -> bool {
        i < 64 && (*self >> i) & 1 == 1
    }
}

pub(crate) fn fr_to_biguint(x: &Fr) -> BigUint {
    BigUint::from_bytes_le(&x.to_bytes())
}

/// None if `x` is not below the field modulus.
pub(crate) fn fr_from_biguint(x: &BigUint) -> Option<Fr> {
    let little_endian_bytes = x.to_bytes_le();
    if little_endian_bytes.len() > 32 {
        return None;
    }
    let mut bytes = [0; 32];
    bytes[..little_endian_bytes.len()].copy_from_slice(&little_endian_bytes);
    Option::from(Fr::from_bytes(&bytes))
}

pub(crate) fn log2_ceil(n: usize) -> u32 {
    u32::BITS - (n.max(1) - 1).leading_zeros()
}
