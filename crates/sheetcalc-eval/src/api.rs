//! Host-facing surface (spec.md §6): sheet lifecycle, cell I/O,
//! function-sheet configuration, the atom interface, and the driver/ad-hoc
//! evaluation entry points, all as inherent methods on `Context`.

use sheetcalc_common::{sentinel, Atom, CalcError, ErrorKind};

use crate::context::Context;
use crate::interpreter::CellValue;
use crate::sheet::{SheetFlags, SheetHandle};

const MAX_PARAMS: usize = 4;

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

impl Context {
    // -- Sheet lifecycle -----------------------------------------------

    /// Creates the sheet on first use, exactly as spec.md requires ("must
    /// be called before any other sheet operation").
    pub fn set_sheet_name(&mut self, handle: SheetHandle, name: &[u8]) {
        let atom = self.atoms_mut().intern_lower(name);
        let sheet = self.ensure_sheet(handle, atom);
        sheet.name = atom;
    }

    pub fn set_sheet_alias(&mut self, handle: SheetHandle, name: &[u8]) {
        let atom = self.atoms_mut().intern_lower(name);
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.alias = Some(atom);
        }
    }

    pub fn del_sheet(&mut self, handle: SheetHandle) {
        self.sheets.remove(&handle);
    }

    pub fn set_sheet_flags(&mut self, handle: SheetHandle, flags: SheetFlags) {
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.flags = flags;
        }
    }

    pub fn set_sheet_flag(&mut self, handle: SheetHandle, flag: SheetFlags, on: bool) {
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.flags.set(flag, on);
        }
    }

    // -- Cell I/O --------------------------------------------------------

    pub fn set_cell_str(&mut self, handle: SheetHandle, row: i32, col: i32, bytes: &[u8]) {
        let atom = self.atoms_mut().intern(trim_ascii(bytes));
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.set_cell(row, col, atom);
        }
    }

    pub fn set_cell_atom(&mut self, handle: SheetHandle, row: i32, col: i32, atom: Atom) {
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.set_cell(row, col, atom);
        }
    }

    /// Off-grid cells live in the sentinel `EXTRA_DIMENSIONAL` row, keyed
    /// by the host's opaque `id` in the column slot.
    pub fn set_extra_dimensional_str(&mut self, handle: SheetHandle, id: i32, bytes: &[u8]) {
        let atom = self.atoms_mut().intern(trim_ascii(bytes));
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.set_cell(sentinel::EXTRA_DIMENSIONAL, id, atom);
        }
    }

    pub fn set_col_name(&mut self, handle: SheetHandle, col: i32, bytes: &[u8]) {
        let atom = if bytes.is_empty() {
            Atom::NIL
        } else {
            self.atoms_mut().intern_lower(bytes)
        };
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.set_col_name(col, atom);
        }
    }

    /// Names shorter than 2 bytes collide with the implicit column letters
    /// and are rejected.
    pub fn set_named_cell(
        &mut self,
        handle: SheetHandle,
        name: &[u8],
        row: i32,
        col: i32,
    ) -> Result<(), CalcError> {
        if name.len() < 2 {
            return Err(CalcError::new(ErrorKind::Domain));
        }
        let atom = self.atoms_mut().intern_lower(name);
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.set_named_cell(atom, row, col);
        }
        Ok(())
    }

    pub fn clear_named_cell(&mut self, handle: SheetHandle, name: &[u8]) {
        let atom = self.atoms_mut().intern_lower(name);
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.clear_named_cell(atom);
        }
    }

    // -- Function sheets ---------------------------------------------------

    pub fn set_function_params(
        &mut self,
        handle: SheetHandle,
        params: &[(i32, i32)],
    ) -> Result<(), CalcError> {
        if params.len() > MAX_PARAMS {
            return Err(CalcError::new(ErrorKind::Arity));
        }
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.function_params = params.iter().copied().collect();
        }
        Ok(())
    }

    pub fn clear_function_params(&mut self, handle: SheetHandle) {
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.function_params.clear();
        }
    }

    pub fn set_function_output(&mut self, handle: SheetHandle, row: i32, col: i32) {
        if let Some(sheet) = self.sheet_mut(handle) {
            sheet.function_output = Some((row, col));
        }
    }

    // -- Atom interface ----------------------------------------------------

    pub fn atomize(&mut self, bytes: &[u8]) -> Atom {
        self.atoms_mut().intern(trim_ascii(bytes))
    }

    pub fn atom_get_str(&self, atom: Atom) -> &str {
        self.atoms().get_str(atom)
    }

    // -- Driver and ad-hoc evaluation --------------------------------------

    pub fn evaluate_formulas(&mut self) -> i32 {
        crate::driver::evaluate_formulas(self)
    }

    pub fn evaluate_string(
        &mut self,
        sheet: SheetHandle,
        bytes: &[u8],
        row: i32,
        col: i32,
    ) -> CellValue {
        crate::driver::evaluate_string(self, sheet, bytes, row, col)
    }

    pub fn evaluate_function(&mut self, function_sheet: SheetHandle, args: &[&[u8]]) -> CellValue {
        crate::driver::evaluate_function(self, function_sheet, args)
    }
}
