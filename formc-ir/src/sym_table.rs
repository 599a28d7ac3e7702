use crate::value_numbering::Symbol;
use formc_expr::Expr;

/// A table mapping each symbol to the scalar expression that computes it.
///
/// The table is sized once, to the number of symbols created by value numbering. Every slot can be
/// written once; [`SymbolTable::fill`] reports whether the write happened instead of overwriting.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    slots: Vec<Option<Expr>>,
}

impl SymbolTable {
    /// Creates a table with `len` empty slots.
    pub fn with_len(len: usize) -> Self {
        Self { slots: vec![None; len] }
    }

    /// Returns the number of slots in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the expression stored for the given symbol, if its slot is filled.
    pub fn get(&self, symbol: Symbol) -> Option<&Expr> {
        self.slots.get(symbol.index())?.as_ref()
    }

    /// Returns true if the slot of the given symbol is filled.
    pub fn is_filled(&self, symbol: Symbol) -> bool {
        self.get(symbol).is_some()
    }

    /// Stores `expr` in the slot of `symbol` if the slot is empty.
    ///
    /// Returns true if the expression was stored, and false if the slot was already filled (or the
    /// symbol is out of range), in which case the table is unchanged.
    pub fn fill(&mut self, symbol: Symbol, expr: Expr) -> bool {
        match self.slots.get_mut(symbol.index()) {
            Some(slot) if slot.is_none() => {
                *slot = Some(expr);
                true
            },
            _ => false,
        }
    }

    /// Returns the number of filled slots.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
