//! Component-presence bitmasks.
//!
//! A mask is a little array of u32 words, one bit per component id. Equal
//! masks hash and compare equal, so a mask is its own canonical archetype
//! key.

use std::fmt;

use smallvec::{SmallVec, smallvec};

/// Bitset over component ids.
///
/// Word width is fixed per store (enough words for the declared component
/// count); query leaf masks may be narrower, and the matching operations
/// treat missing words as zero.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Mask {
    words: SmallVec<[u32; 4]>,
}

impl Mask {
    /// A mask of `words` zeroed words.
    #[must_use]
    pub fn zeroed(words: usize) -> Self {
        Self {
            words: smallvec![0; words],
        }
    }

    /// Number of words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// The raw words, low component ids first.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Whether `bit` is set. Bits beyond the word width read as unset.
    #[must_use]
    pub fn get(&self, bit: u32) -> bool {
        match self.words.get((bit >> 5) as usize) {
            Some(&word) => word & (1 << (bit & 31)) != 0,
            None => false,
        }
    }

    /// Set `bit`.
    pub fn set(&mut self, bit: u32) {
        self.words[(bit >> 5) as usize] |= 1 << (bit & 31);
    }

    /// Flip `bit`.
    pub fn toggle(&mut self, bit: u32) {
        self.words[(bit >> 5) as usize] ^= 1 << (bit & 31);
    }

    /// Grow or shrink to `words` words; new words are zeroed.
    pub fn resize(&mut self, words: usize) {
        self.words.resize(words, 0);
    }

    /// Whether every bit set in `other` is set in `self`.
    #[must_use]
    pub fn contains_all(&self, other: &Mask) -> bool {
        for (i, &want) in other.words.iter().enumerate() {
            let have = self.words.get(i).copied().unwrap_or(0);
            if have & want != want {
                return false;
            }
        }
        true
    }

    /// Whether any bit set in `other` is set in `self`.
    #[must_use]
    pub fn intersects(&self, other: &Mask) -> bool {
        for (i, &want) in other.words.iter().enumerate() {
            let have = self.words.get(i).copied().unwrap_or(0);
            if have & want != 0 {
                return true;
            }
        }
        false
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask[")?;
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{word:08x}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_reads_unset() {
        let mask = Mask::zeroed(2);
        assert_eq!(mask.word_count(), 2);
        for bit in 0..64 {
            assert!(!mask.get(bit));
        }
        // Out of range reads as unset rather than panicking.
        assert!(!mask.get(1000));
    }

    #[test]
    fn test_set_and_get_across_words() {
        let mut mask = Mask::zeroed(2);
        mask.set(0);
        mask.set(31);
        mask.set(32);
        mask.set(63);
        assert!(mask.get(0));
        assert!(mask.get(31));
        assert!(mask.get(32));
        assert!(mask.get(63));
        assert!(!mask.get(1));
        assert!(!mask.get(33));
        assert_eq!(mask.words(), &[0x8000_0001, 0x8000_0001]);
    }

    #[test]
    fn test_toggle() {
        let mut mask = Mask::zeroed(1);
        mask.toggle(5);
        assert!(mask.get(5));
        mask.toggle(5);
        assert!(!mask.get(5));
    }

    #[test]
    fn test_equal_bits_are_equal_keys() {
        let mut a = Mask::zeroed(2);
        let mut b = Mask::zeroed(2);
        a.set(3);
        a.set(40);
        b.set(40);
        b.set(3);
        assert_eq!(a, b);

        let mut c = Mask::zeroed(2);
        c.set(3);
        assert_ne!(a, c);
    }

    #[test]
    fn test_contains_all() {
        let mut target = Mask::zeroed(2);
        target.set(1);
        target.set(2);
        target.set(40);

        let mut want = Mask::zeroed(1);
        want.set(1);
        want.set(2);
        assert!(target.contains_all(&want));

        want.set(3);
        assert!(!target.contains_all(&want));

        // Vacuous truth for the empty mask.
        assert!(target.contains_all(&Mask::zeroed(0)));
        assert!(Mask::zeroed(0).contains_all(&Mask::zeroed(0)));
    }

    #[test]
    fn test_contains_all_with_wider_pattern() {
        // A pattern wider than the target treats missing target words as
        // zero.
        let mut target = Mask::zeroed(1);
        target.set(0);
        let mut want = Mask::zeroed(2);
        want.set(0);
        assert!(target.contains_all(&want));
        want.set(40);
        assert!(!target.contains_all(&want));
    }

    #[test]
    fn test_intersects() {
        let mut target = Mask::zeroed(2);
        target.set(33);

        let mut want = Mask::zeroed(2);
        want.set(2);
        assert!(!target.intersects(&want));
        want.set(33);
        assert!(target.intersects(&want));

        // The empty mask intersects nothing.
        assert!(!target.intersects(&Mask::zeroed(0)));
        assert!(!target.intersects(&Mask::zeroed(2)));
    }

    #[test]
    fn test_resize_preserves_low_bits() {
        let mut mask = Mask::zeroed(1);
        mask.set(7);
        mask.resize(3);
        assert!(mask.get(7));
        assert!(!mask.get(64));
        assert_eq!(mask.word_count(), 3);
    }
}
