//! Column-name resolution and the `$` row substitution rule, grounded on
//! `formualizer-eval::reference`'s resolution helpers (adapted from
//! packed-bit cell references to this spec's plain signed `RowCol`).

use crate::sheet::Sheet;
use sheetcalc_common::{sentinel, Atom, AtomTable};

/// Resolve a column name against a sheet's column-name cache, falling back
/// to the base-26 letter scheme for length-1/2 all-ASCII-letter names
/// (§4.3: `a`=0, `z`=25, `aa`=26).
pub fn resolve_col_name(sheet: &Sheet, atoms: &AtomTable, name: Atom) -> Option<i32> {
    if let Some(&(_, idx)) = sheet.col_names.iter().find(|&&(n, _)| n == name) {
        return Some(idx);
    }
    let bytes = atoms.get(name);
    if !bytes.is_empty() && bytes.len() <= 2 && bytes.iter().all(u8::is_ascii_alphabetic) {
        let mut value: i32 = 0;
        for &b in bytes {
            let letter = (b.to_ascii_lowercase() - b'a') as i32;
            value = value * 26 + letter + 1;
        }
        return Some(value - 1);
    }
    None
}

/// `$` substitution: a `row`/`col` field equal to the `DOLLAR` sentinel
/// means "the caller's position".
pub fn resolve_row(raw: i32, caller_row: i32) -> i32 {
    if raw == sentinel::DOLLAR {
        caller_row
    } else {
        raw
    }
}

/// Resolve a `Range1DColumn`/`Range1DRow`-style inclusive span against the
/// sheet's actual extent: `-1` means "to end" (the sheet's current
/// height/width), a start of `0` is already the beginning.
pub fn resolve_span(start: i32, end: i32, extent: i32) -> (i32, i32) {
    let end = if end < 0 { extent.saturating_sub(1) } else { end };
    (start.max(0), end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    #[test]
    fn single_letter_columns_decode_base26() {
        let mut atoms = AtomTable::new();
        let sheet = Sheet::new(Atom::NIL);
        let a = atoms.intern_lower(b"a");
        let z = atoms.intern_lower(b"z");
        let aa = atoms.intern_lower(b"aa");
        assert_eq!(resolve_col_name(&sheet, &atoms, a), Some(0));
        assert_eq!(resolve_col_name(&sheet, &atoms, z), Some(25));
        assert_eq!(resolve_col_name(&sheet, &atoms, aa), Some(26));
    }

    #[test]
    fn explicit_column_name_overrides_the_letter_fallback() {
        let mut atoms = AtomTable::new();
        let mut sheet = Sheet::new(Atom::NIL);
        let cost = atoms.intern_lower(b"cost");
        sheet.set_col_name(9, cost);
        assert_eq!(resolve_col_name(&sheet, &atoms, cost), Some(9));
    }

    #[test]
    fn dollar_substitutes_the_caller_row() {
        assert_eq!(resolve_row(sentinel::DOLLAR, 7), 7);
        assert_eq!(resolve_row(3, 7), 3);
    }

    #[test]
    fn negative_one_end_means_to_the_sheet_extent() {
        assert_eq!(resolve_span(0, -1, 5), (0, 4));
        assert_eq!(resolve_span(2, 4, 5), (2, 4));
    }
}
