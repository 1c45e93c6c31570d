//! The top-level context: owns the atom table, every sheet, the parse
//! cache, and the scratch arena, mirroring `formualizer-eval::engine::mod`'s
//! `Engine` struct owning its caches — but single-threaded (`Context` is
//! deliberately `!Send + !Sync`, §5).

use std::cell::Cell;

use rustc_hash::FxHashMap;
use sheetcalc_common::{Atom, AtomTable};
use sheetcalc_parse::ParsedFormula;

use crate::sheet::{Sheet, SheetFlags, SheetHandle};

/// The host-callback trait standing in for spec.md §6's `ops` function
/// pointer table. Every method is a notification, not a query: spec.md
/// notes a callback's return code is only ever propagated, never acted
/// upon inside the core, so there is nothing for these methods to return
/// (see DESIGN.md's Open Question ledger).
pub trait DisplaySink {
    fn set_display_number(&mut self, sheet: SheetHandle, row: i32, col: i32, value: f64);
    fn set_display_string(&mut self, sheet: SheetHandle, row: i32, col: i32, text: &[u8]);
    fn set_display_error(&mut self, sheet: SheetHandle, row: i32, col: i32, text: &[u8]);
}

/// A `DisplaySink` that does nothing — useful for tests and for ad-hoc
/// evaluation (`evaluate_string`/`evaluate_function`) that never touches
/// the display path.
pub struct NullSink;

impl DisplaySink for NullSink {
    fn set_display_number(&mut self, _sheet: SheetHandle, _row: i32, _col: i32, _value: f64) {}
    fn set_display_string(&mut self, _sheet: SheetHandle, _row: i32, _col: i32, _text: &[u8]) {}
    fn set_display_error(&mut self, _sheet: SheetHandle, _row: i32, _col: i32, _text: &[u8]) {}
}

/// The recursion ceiling substituting spec.md §9's frame-address
/// arithmetic.
pub const DEPTH_LIMIT: u32 = 300;

pub struct Context {
    pub(crate) atoms: AtomTable,
    pub(crate) sheets: FxHashMap<SheetHandle, Sheet>,
    /// Keyed on formula-atom identity, not on sheet — the parse tree is
    /// sheet-independent (spec.md §9's third open question).
    pub(crate) parse_cache: FxHashMap<Atom, ParsedFormula>,
    pub(crate) depth: Cell<u32>,
    pub(crate) ops: Box<dyn DisplaySink>,
}

impl Context {
    pub fn new(ops: Box<dyn DisplaySink>) -> Self {
        Context {
            atoms: AtomTable::new(),
            sheets: FxHashMap::default(),
            parse_cache: FxHashMap::default(),
            depth: Cell::new(0),
            ops,
        }
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut AtomTable {
        &mut self.atoms
    }

    pub fn sheet(&self, handle: SheetHandle) -> Option<&Sheet> {
        self.sheets.get(&handle)
    }

    pub fn sheet_mut(&mut self, handle: SheetHandle) -> Option<&mut Sheet> {
        self.sheets.get_mut(&handle)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&SheetHandle, &Sheet)> {
        self.sheets.iter()
    }

    /// Look up a sheet by name or alias atom (both already lowercased by
    /// the caller).
    pub fn find_sheet(&self, name: Atom) -> Option<SheetHandle> {
        self.sheets
            .iter()
            .find(|(_, s)| s.name == name || s.alias == Some(name))
            .map(|(h, _)| *h)
    }

    /// Look up a sheet flagged `IS_FUNCTION` by name or alias.
    pub fn find_function_sheet(&self, name: Atom) -> Option<SheetHandle> {
        self.find_sheet(name)
            .filter(|h| self.sheets[h].flags.contains(SheetFlags::IS_FUNCTION))
    }

    /// Record that `caller` referenced a cell on `target` during
    /// evaluation (§9 "Foreign dependants").
    pub fn add_dependant(&mut self, target: SheetHandle, caller: SheetHandle) {
        if let Some(sheet) = self.sheets.get_mut(&target) {
            if !sheet.dependants.contains(&caller) {
                sheet.dependants.push(caller);
            }
        }
    }

    pub fn ensure_sheet(&mut self, handle: SheetHandle, name: Atom) -> &mut Sheet {
        self.sheets.entry(handle).or_insert_with(|| Sheet::new(name))
    }
}
