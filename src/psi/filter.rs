//! PID-indexed table_id filters, grounded on `table.c`'s `filter_alloc`/
//! `filter_set`/`filter_lookup`/`filter_free` and its `init_table_ops` wiring.
//!
//! The original keeps a filter per (PID, table_id, mask) triple and a bare
//! function pointer as the callback; here the callback is replaced by a
//! [`TableKind`] tag that [`crate::psi::store::PsiStore::dispatch`] matches
//! on; and then again for registering a PMT filter while that PMT's own
//! section is still being dispatched, `add`/`remove` calls made during
//! dispatch are queued and applied once the dispatch loop returns instead of
//! mutating `by_pid` out from under the iterator.

use std::collections::HashMap;

/// Which per-table parser a matched filter routes its section to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Pat,
    Cat,
    Pmt,
    NitActual,
    NitOther,
    Bat,
    SdtActual,
    SdtOther,
    Eit,
    Tdt,
    Tot,
}

#[derive(Debug, Clone, Copy)]
struct Filter {
    table_id: u8,
    mask: u8,
    kind: TableKind,
}

impl Filter {
    fn matches(&self, table_id: u8) -> bool {
        table_id & self.mask == self.table_id & self.mask
    }
}

enum PendingOp {
    Add(u16, Filter),
    Remove(u16, u8, u8),
}

/// Registry of active filters, keyed by PID.
#[derive(Default)]
pub struct FilterTable {
    by_pid: HashMap<u16, Vec<Filter>>,
    pending: Vec<PendingOp>,
    dispatching: bool,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter for `pid` matching `table_id & mask == table_id & mask`.
    pub fn add(&mut self, pid: u16, table_id: u8, mask: u8, kind: TableKind) {
        let f = Filter { table_id, mask, kind };
        if self.dispatching {
            self.pending.push(PendingOp::Add(pid, f));
        } else {
            self.by_pid.entry(pid).or_default().push(f);
        }
    }

    /// Drop the filter previously registered with this exact `(table_id, mask)`.
    pub fn remove(&mut self, pid: u16, table_id: u8, mask: u8) {
        if self.dispatching {
            self.pending.push(PendingOp::Remove(pid, table_id, mask));
            return;
        }
        if let Some(filters) = self.by_pid.get_mut(&pid) {
            filters.retain(|f| !(f.table_id == table_id && f.mask == mask));
        }
    }

    /// Whether any filter at all is registered for `pid`.
    pub fn has_pid(&self, pid: u16) -> bool {
        self.by_pid.get(&pid).is_some_and(|v| !v.is_empty())
    }

    /// Every registered kind whose predicate matches `table_id` on this PID.
    pub fn lookup(&self, pid: u16, table_id: u8) -> Vec<TableKind> {
        self.by_pid
            .get(&pid)
            .map(|filters| {
                filters
                    .iter()
                    .filter(|f| f.matches(table_id))
                    .map(|f| f.kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Enter a dispatch pass: subsequent `add`/`remove` calls queue instead of
    /// mutating `by_pid` directly, so a callback invoked mid-pass can safely
    /// register or drop filters without invalidating the caller's match list.
    pub fn begin_dispatch(&mut self) {
        self.dispatching = true;
    }

    /// Leave a dispatch pass and apply every queued `add`/`remove` in order.
    pub fn end_dispatch(&mut self) {
        self.dispatching = false;
        for op in self.pending.drain(..) {
            match op {
                PendingOp::Add(pid, f) => self.by_pid.entry(pid).or_default().push(f),
                PendingOp::Remove(pid, table_id, mask) => {
                    if let Some(filters) = self.by_pid.get_mut(&pid) {
                        filters.retain(|f| !(f.table_id == table_id && f.mask == mask));
                    }
                }
            }
        }
    }
}
