//! The atom table: interning of short byte-strings into a stable,
//! pointer-identity-equivalent handle.
//!
//! Two atoms compare equal iff the bytes they were interned from compare
//! equal — but the comparison itself is a single `u32` comparison, because
//! `intern` never hands out two different indices for the same bytes. This
//! mirrors a classic compiler symbol interner (see e.g. rustc's
//! `syntax_pos::symbol::Interner`): a bump arena owns the byte payloads, a
//! hash map gives insertion+lookup in one pass, and a `Vec` gives the
//! reverse index→bytes mapping.

use bumpalo::Bump;
use rustc_hash::FxHashMap;

/// An interned, immutable byte-string. `Copy`, 4 bytes, comparable by value.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    /// The distinguished nil atom (the empty string). Empty cells resolve
    /// to this.
    pub const NIL: Atom = Atom(0);
    /// The single-byte `$` atom, used throughout the range grammar as the
    /// "substitute the caller's row/col" token. Index `1 + b'$' as u32`
    /// because the preallocation loop places single byte `v` at index
    /// `1 + v` (index `0` is the nil atom).
    pub const DOLLAR: Atom = Atom(1 + b'$' as u32);

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_nil(self) -> bool {
        self == Atom::NIL
    }
}

impl std::fmt::Debug for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Atom({})", self.0)
    }
}

/// Preallocated single-ASCII-byte atoms, one per byte 0..=255, indexed by
/// the byte value. Every length-0 or length-1-ASCII intern is a table
/// lookup, never an allocation — spec.md §4.1.
const SHORT_COUNT: usize = 1 + 256; // nil + 256 single-byte atoms

/// Context-scoped interner. Every allocation is owned by this table; there
/// is no global/process-wide interner state (spec.md §9).
pub struct AtomTable {
    arena: Bump,
    // SAFETY: every slice stored here (in `names` and `strings`) points
    // into `arena`. The `'static` lifetime is a lie we tell the borrow
    // checker; the true lifetime is "as long as `arena` is not dropped".
    // Since `arena` is a field of this same struct and these slices are
    // never read after `self` is dropped (there is no `Drop` impl that
    // dereferences them), this is sound: bumpalo's `Bump` never moves or
    // frees an already-handed-out allocation while it is alive, and moving
    // the `AtomTable` itself only moves the `Bump` header (which internally
    // holds heap pointers to its chunks), not the chunks themselves.
    names: FxHashMap<&'static [u8], Atom>,
    strings: Vec<&'static [u8]>,
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomTable {
    pub fn new() -> Self {
        let arena = Bump::new();
        let mut names = FxHashMap::default();
        let mut strings = Vec::with_capacity(SHORT_COUNT);

        // index 0: nil atom.
        let empty: &'static [u8] = &[];
        strings.push(empty);
        names.insert(empty, Atom::NIL);

        // indices 1..=256: every single byte value, `$` lands wherever its
        // byte value puts it (so `Atom::DOLLAR` below must match).
        for b in 0u16..=255 {
            let byte = b as u8;
            // SAFETY: allocating a 1-byte slice in `arena`, extending its
            // lifetime per the struct-level safety comment.
            let slice = arena.alloc_slice_copy(&[byte]);
            let slice: &'static [u8] = unsafe { &*(slice as *const [u8]) };
            let atom = Atom(strings.len() as u32);
            strings.push(slice);
            names.insert(slice, atom);
        }

        let table = AtomTable {
            arena,
            names,
            strings,
        };
        debug_assert_eq!(table.strings[Atom::DOLLAR.0 as usize], b"$");
        table
    }

    /// Intern raw bytes, inserting only if not already present.
    pub fn intern(&mut self, bytes: &[u8]) -> Atom {
        if let Some(&atom) = self.names.get(bytes) {
            return atom;
        }
        // SAFETY: see struct-level comment.
        let slice = self.arena.alloc_slice_copy(bytes);
        let slice: &'static [u8] = unsafe { &*(slice as *const [u8]) };
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(slice);
        self.names.insert(slice, atom);
        atom
    }

    pub fn intern_str(&mut self, s: &str) -> Atom {
        self.intern(s.as_bytes())
    }

    /// Lowercase `bytes` into a scratch buffer and intern the result, so
    /// that case-insensitive identifiers (sheet/column/function names)
    /// compare equal by atom identity.
    pub fn intern_lower(&mut self, bytes: &[u8]) -> Atom {
        let mut scratch: Vec<u8> = Vec::with_capacity(bytes.len());
        scratch.extend(bytes.iter().map(|b| b.to_ascii_lowercase()));
        self.intern(&scratch)
    }

    pub fn get(&self, atom: Atom) -> &[u8] {
        self.strings[atom.0 as usize]
    }

    pub fn get_str(&self, atom: Atom) -> &str {
        // Every atom was interned from either `&str` or formula-source
        // bytes, which this crate only ever feeds from valid UTF-8.
        std::str::from_utf8(self.get(atom)).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_and_dollar_are_preallocated() {
        let table = AtomTable::new();
        assert_eq!(table.get(Atom::NIL), b"");
        assert_eq!(table.get(Atom::DOLLAR), b"$");
    }

    #[test]
    fn identical_bytes_intern_to_the_same_atom() {
        let mut table = AtomTable::new();
        let a = table.intern(b"hello");
        let b = table.intern(b"hello");
        assert_eq!(a, b);
        let c = table.intern(b"world");
        assert_ne!(a, c);
    }

    #[test]
    fn single_ascii_bytes_are_preallocated() {
        let mut table = AtomTable::new();
        let before = table.strings.len();
        let a = table.intern(b"q");
        assert_eq!(table.strings.len(), before, "no new allocation");
        assert_eq!(table.get(a), b"q");
    }

    #[test]
    fn intern_lower_is_case_insensitive() {
        let mut table = AtomTable::new();
        let a = table.intern_lower(b"Sheet1");
        let b = table.intern_lower(b"sheet1");
        let c = table.intern_lower(b"SHEET1");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(table.get(a), b"sheet1");
    }
}
