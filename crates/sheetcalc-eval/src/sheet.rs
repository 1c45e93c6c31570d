//! Per-sheet storage: cells, caches, and the bookkeeping a sheet needs to
//! act as a user-defined function. Grounded on the teacher's per-entity
//! vertex storage shape (`formualizer-eval::engine`) and its `FnCaps`
//! bitflags pattern, adapted to this spec's single `IS_FUNCTION` flag.

use rustc_hash::FxHashMap;
use sheetcalc_common::{Atom, CachedResult};
use smallvec::SmallVec;

use crate::interpreter::CellValue;

bitflags::bitflags! {
    /// Sheet-level flags. Only one bit is defined today; this is a real
    /// bitfield (not a bare `bool`) because the host interface exposes it
    /// as one (`set_sheet_flags`/`set_sheet_flag`), matching §6.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct SheetFlags: u32 {
        const IS_FUNCTION = 1 << 0;
    }
}

/// An opaque handle the host assigns to a sheet. Never constructed by this
/// crate; the host decides the numbering.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SheetHandle(pub u32);

const MAX_PARAMS: usize = 4;

/// One sheet's full state. `(row, col)` keys are already 0-based.
pub struct Sheet {
    pub name: Atom,
    pub alias: Option<Atom>,
    pub width: i32,
    pub height: i32,

    /// Cell contents, keyed by `(row, col)`. Off-grid ("extra-dimensional")
    /// cells share this map under the key
    /// `(sheetcalc_common::sentinel::EXTRA_DIMENSIONAL, id)`.
    pub cells: FxHashMap<(i32, i32), Atom>,

    /// `(name, col_index)` pairs, linear-scanned (spec.md §4.3: small N).
    pub col_names: Vec<(Atom, i32)>,
    /// `(name, row, col)` triples, linear-scanned.
    pub named_cells: Vec<(Atom, i32, i32)>,

    pub results: FxHashMap<(i32, i32), CachedResult>,
    /// The driver's own record of what was last shown to the host, keyed
    /// separately from `results` because `results` only ever holds
    /// non-error entries (§7) while change detection must also recognize
    /// "still the same error as last pass" to avoid re-emitting a callback.
    pub last_display: FxHashMap<(i32, i32), CachedResult>,
    pub dependants: Vec<SheetHandle>,

    pub flags: SheetFlags,

    pub function_params: SmallVec<[(i32, i32); MAX_PARAMS]>,
    pub function_output: Option<(i32, i32)>,

    /// The call frame: up to four `((row, col), value)` bindings active
    /// while this sheet is executing as a user-defined function. A
    /// populated slot is also how `evaluate` detects recursive re-entry.
    /// Owned, not arena-indexed, because a binding must outlive the
    /// scratch tree of whichever caller evaluated it.
    pub arg_slots: [Option<((i32, i32), CellValue)>; MAX_PARAMS],

    pub dirty: bool,
}

impl Sheet {
    pub fn new(name: Atom) -> Self {
        Sheet {
            name,
            alias: None,
            width: 0,
            height: 0,
            cells: FxHashMap::default(),
            col_names: Vec::new(),
            named_cells: Vec::new(),
            results: FxHashMap::default(),
            last_display: FxHashMap::default(),
            dependants: Vec::new(),
            flags: SheetFlags::empty(),
            function_params: SmallVec::new(),
            function_output: None,
            arg_slots: Default::default(),
            dirty: true,
        }
    }

    pub fn is_function(&self) -> bool {
        self.flags.contains(SheetFlags::IS_FUNCTION)
    }

    pub fn is_calling(&self) -> bool {
        self.arg_slots.iter().any(Option::is_some)
    }

    /// `set_cell(row, col, atom)`: grows the bounding box, writes the
    /// entry. Does not invalidate the result cache — the driver performs
    /// change detection (§4.3).
    pub fn set_cell(&mut self, row: i32, col: i32, atom: Atom) {
        if row >= 0 && col >= 0 {
            self.width = self.width.max(col + 1);
            self.height = self.height.max(row + 1);
        }
        self.cells.insert((row, col), atom);
        self.dirty = true;
    }

    pub fn get_cell(&self, row: i32, col: i32) -> Atom {
        self.cells.get(&(row, col)).copied().unwrap_or(Atom::NIL)
    }

    /// `set_col_name`: if `name` already names another column, that column
    /// loses the name (§4.3). An empty name atom removes `col`'s mapping.
    pub fn set_col_name(&mut self, col: i32, name: Atom) {
        if name.is_nil() {
            self.col_names.retain(|&(_, c)| c != col);
            return;
        }
        if let Some(existing) = self.col_names.iter().position(|&(n, _)| n == name) {
            self.col_names.remove(existing);
        }
        if let Some(slot) = self.col_names.iter_mut().find(|(_, c)| *c == col) {
            slot.0 = name;
        } else {
            self.col_names.push((name, col));
        }
    }

    pub fn set_named_cell(&mut self, name: Atom, row: i32, col: i32) {
        if let Some(slot) = self.named_cells.iter_mut().find(|(n, _, _)| *n == name) {
            slot.1 = row;
            slot.2 = col;
        } else {
            self.named_cells.push((name, row, col));
        }
    }

    pub fn clear_named_cell(&mut self, name: Atom) {
        self.named_cells.retain(|(n, _, _)| *n != name);
    }

    pub fn lookup_named_cell(&self, name: Atom) -> Option<(i32, i32)> {
        self.named_cells
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, r, c)| (*r, *c))
    }
}
