#![forbid(unsafe_code)]

/// A fixed-length bit set over table rows.
///
/// Used both as the result of filter evaluation (which rows are selected) and as the
/// storage for boolean values / validity flags inside columns.
///
/// Bits are stored little-endian within each `u64` word: row 0 is the LSB of word 0.
/// Bits past `len` in the last word are always zero, so two masks with the same rows
/// selected compare (and hash) equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RowMask {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

fn word_count(bits: usize) -> usize {
    bits.div_ceil(64)
}

fn tail_mask(bits: usize) -> u64 {
    match bits % 64 {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

impl RowMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mask of `len` rows with every row selected.
    pub fn all(len: usize) -> Self {
        if len == 0 {
            return Self::new();
        }
        let mut words = vec![u64::MAX; word_count(len)];
        if let Some(last) = words.last_mut() {
            *last = tail_mask(len);
        }
        Self {
            words,
            len,
            ones: len,
        }
    }

    /// A mask of `len` rows with no row selected.
    pub fn none(len: usize) -> Self {
        Self {
            words: vec![0u64; word_count(len)],
            len,
            ones: 0,
        }
    }

    /// Build a mask of `len` rows selecting `rows`. Indices past `len` are ignored.
    pub fn from_rows(len: usize, rows: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::none(len);
        for row in rows {
            if row < len {
                mask.set(row, true);
            }
        }
        mask
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of selected rows.
    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn is_all(&self) -> bool {
        self.ones == self.len
    }

    pub fn push(&mut self, value: bool) {
        if self.len % 64 == 0 {
            self.words.push(0);
        }
        if value {
            self.words[self.len / 64] |= 1u64 << (self.len % 64);
            self.ones += 1;
        }
        self.len += 1;
    }

    pub fn get(&self, row: usize) -> bool {
        debug_assert!(row < self.len, "RowMask index out of bounds");
        (self.words[row / 64] >> (row % 64)) & 1 == 1
    }

    pub fn set(&mut self, row: usize, value: bool) {
        debug_assert!(row < self.len, "RowMask index out of bounds");
        let bit = 1u64 << (row % 64);
        let word = &mut self.words[row / 64];
        let was_set = *word & bit != 0;
        match (was_set, value) {
            (false, true) => {
                *word |= bit;
                self.ones += 1;
            }
            (true, false) => {
                *word &= !bit;
                self.ones -= 1;
            }
            _ => {}
        }
    }

    pub fn and_inplace(&mut self, other: &RowMask) {
        debug_assert_eq!(self.len, other.len, "RowMask length mismatch");
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= *o;
        }
        self.recount();
    }

    pub fn or_inplace(&mut self, other: &RowMask) {
        debug_assert_eq!(self.len, other.len, "RowMask length mismatch");
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= *o;
        }
        self.recount();
    }

    /// Iterate selected row indices in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| {
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let bit = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(word_idx * 64 + bit)
                })
            })
    }

    fn recount(&mut self) {
        self.ones = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}
