use std::marker::PhantomData;

pub trait ToBitIdx {
    fn to_bit_idx(&self) -> usize;
}

pub trait FromBitIdx {
    fn from_bit_idx(idx: usize) -> Self;
}

#[derive(Debug)]
pub struct BitSet<T: ToBitIdx> {
    chunks: Vec<u64>,
    len: usize,
    phantom: PhantomData<T>,
}

impl<T: ToBitIdx> Clone for BitSet<T> {
    fn clone(&self) -> Self {
        BitSet {
            chunks: self.chunks.clone(),
            len: self.len,
            phantom: PhantomData,
        }
    }
}

impl<T: ToBitIdx> PartialEq for BitSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.chunks == other.chunks
    }
}

impl<T: ToBitIdx> Eq for BitSet<T> {}

#[inline(always)]
fn chunk_idx(n: usize) -> usize {
    n / 64
}

#[inline(always)]
fn bit_idx(n: usize) -> usize {
    n % 64
}

impl<T: ToBitIdx> BitSet<T> {
    pub fn new(n_elems: usize) -> BitSet<T> {
        let words = (n_elems + 63) / 64;
        BitSet {
            chunks: vec![0; words],
            len: n_elems,
            phantom: PhantomData,
        }
    }

    /// Returns whether the bit was updated
    #[inline]
    pub fn set(&mut self, elem: &T) -> bool {
        let elem_idx = elem.to_bit_idx();
        let chunk = &mut self.chunks[chunk_idx(elem_idx)];
        let mask = 1u64 << bit_idx(elem_idx);
        let updated = *chunk & mask == 0;
        *chunk |= mask;
        updated
    }

    #[inline]
    pub fn get(&self, elem: &T) -> bool {
        let elem_idx = elem.to_bit_idx();
        self.get_bit(elem_idx)
    }

    /// Adds all elements of `other`. Returns whether any bit was updated. Both sets need to be
    /// created with the same size.
    pub fn union(&mut self, other: &BitSet<T>) -> bool {
        debug_assert_eq!(self.len, other.len);
        let mut updated = false;
        for (chunk, other_chunk) in self.chunks.iter_mut().zip(other.chunks.iter()) {
            let new_chunk = *chunk | *other_chunk;
            updated |= new_chunk != *chunk;
            *chunk = new_chunk;
        }
        updated
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn get_bit(&self, bit: usize) -> bool {
        let chunk = self.chunks[chunk_idx(bit)];
        (chunk >> bit_idx(bit)) & 0b1 == 0b1
    }
}

struct BitIter<'a, T: ToBitIdx> {
    set: &'a BitSet<T>,
    idx: usize,
}

impl<'a, T: ToBitIdx + FromBitIdx> Iterator for BitIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        for i in self.idx..self.set.len() {
            if self.set.get_bit(i) {
                self.idx = i + 1;
                return Some(T::from_bit_idx(i));
            }
        }
        self.idx = self.set.len();
        None
    }
}

impl<T: ToBitIdx + FromBitIdx> BitSet<T> {
    pub fn elems(&self) -> impl Iterator<Item = T> + '_ {
        BitIter { set: self, idx: 0 }
    }
}

#[cfg(test)]
impl ToBitIdx for usize {
    fn to_bit_idx(&self) -> usize {
        *self
    }
}

#[cfg(test)]
impl FromBitIdx for usize {
    fn from_bit_idx(idx: usize) -> Self {
        idx
    }
}

#[test]
fn bit_set_1() {
    const N_ELEMS: usize = 100;

    let mut bitset: BitSet<usize> = BitSet::new(N_ELEMS);
    for i in 0..N_ELEMS {
        assert!(!bitset.get(&i));
    }
    for i in 0..N_ELEMS {
        bitset.set(&i);
        for j in 0..=i {
            assert!(bitset.get(&j));
        }
        for j in i + 1..N_ELEMS {
            assert!(!bitset.get(&j));
        }
    }
}

#[test]
fn bit_set_union_and_iter() {
    let mut a: BitSet<usize> = BitSet::new(130);
    let mut b: BitSet<usize> = BitSet::new(130);
    assert_eq!(a.elems().count(), 0);
    a.set(&3);
    b.set(&3);
    b.set(&64);
    b.set(&129);
    assert!(a.union(&b));
    assert!(!a.union(&b));
    assert_eq!(a.elems().collect::<Vec<usize>>(), vec![3, 64, 129]);
    assert_eq!(a, b);
}
