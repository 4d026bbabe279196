//! The meta-match predicate, ported directly from `ft_flow_meta_match` in
//! `ft.c`.

use crate::effects::PortNo;
use crate::entry::{FlowEntry, FlowState};
use crate::match_header::FlowMatch;

/// Dispatch mode for a meta-match query. The source's "unknown mode" branch
/// has no counterpart here: `MatchMode` is a closed enum, so every query
/// names one of these four modes at compile time and there is nothing left
/// to reject at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Strict,
    NonStrict,
    CookieOnly,
    Overlap,
}

/// Table id wildcard for a query, matching the `ANY` sentinel `ft_flow_meta_match`
/// checks `query->table_id` against.
pub const QUERY_TABLE_ID_ANY: u8 = u8::MAX;

/// A composite lookup spec: match, cookie+mask, table id, priority, mode,
/// out-port, and the priority-check flag — the fields `ft_flow_meta_match`
/// gates on, gathered into one query object.
#[derive(Debug, Clone)]
pub struct MetaMatch {
    pub flow_match: FlowMatch,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub table_id: u8,
    pub priority: u16,
    pub check_priority: bool,
    pub mode: MatchMode,
    pub out_port: PortNo,
}

impl MetaMatch {
    /// A query that matches everything under `mode`, useful for full scans
    /// (`query`/`first_match` with no effective filter, and an iterator
    /// task with no filter).
    pub fn any(mode: MatchMode) -> Self {
        Self {
            flow_match: FlowMatch::any(),
            cookie: 0,
            cookie_mask: 0,
            table_id: QUERY_TABLE_ID_ANY,
            priority: 0,
            check_priority: false,
            mode,
            out_port: crate::effects::PORT_WILDCARD,
        }
    }
}

/// Evaluate the meta-match predicate against `entry`, mirroring
/// `ft_flow_meta_match`'s gate order: state, cookie+mask, table id,
/// priority check, then the mode-specific match clause.
pub fn meta_match(query: &MetaMatch, entry: &FlowEntry) -> bool {
    if entry.state == FlowState::DeleteMarked {
        return false;
    }

    if query.cookie_mask != 0 && (query.cookie & query.cookie_mask) != (entry.cookie & query.cookie_mask) {
        return false;
    }

    if query.table_id != QUERY_TABLE_ID_ANY && query.table_id != entry.table_id {
        return false;
    }

    if query.check_priority && query.priority != entry.priority {
        return false;
    }

    match query.mode {
        MatchMode::Strict => {
            entry.flow_match == query.flow_match && out_port_ok(query, entry)
        }
        MatchMode::NonStrict => {
            entry.flow_match.more_specific_than(&query.flow_match) && out_port_ok(query, entry)
        }
        MatchMode::CookieOnly => true,
        MatchMode::Overlap => entry.flow_match.overlaps(&query.flow_match),
    }
}

fn out_port_ok(query: &MetaMatch, entry: &FlowEntry) -> bool {
    if query.out_port == crate::effects::PORT_WILDCARD {
        return true;
    }
    entry.output_ports.contains(&query.out_port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Action, Effects};
    use crate::entry::FlowEntry;
    use crate::match_header::MATCH_LEN;

    fn sample_entry(flow_match: FlowMatch) -> FlowEntry {
        let mut e = FlowEntry::free();
        e.state = FlowState::New;
        e.flow_match = flow_match;
        e.table_id = 0;
        e.priority = 10;
        e.cookie = 0xabcd;
        e.effects = Effects::Actions(vec![Action::Output(3)]);
        e.output_ports = vec![3];
        e
    }

    #[test]
    fn delete_marked_never_matches() {
        let fm = FlowMatch::exact([1u8; MATCH_LEN]);
        let mut e = sample_entry(fm);
        e.state = FlowState::DeleteMarked;
        let q = MetaMatch {
            flow_match: fm,
            ..MetaMatch::any(MatchMode::Strict)
        };
        assert!(!meta_match(&q, &e));
    }

    #[test]
    fn strict_requires_byte_equal_match() {
        let fm = FlowMatch::exact([1u8; MATCH_LEN]);
        let other = FlowMatch::exact([2u8; MATCH_LEN]);
        let e = sample_entry(fm);
        let q_match = MetaMatch {
            flow_match: fm,
            ..MetaMatch::any(MatchMode::Strict)
        };
        let q_nomatch = MetaMatch {
            flow_match: other,
            ..MetaMatch::any(MatchMode::Strict)
        };
        assert!(meta_match(&q_match, &e));
        assert!(!meta_match(&q_nomatch, &e));
    }

    #[test]
    fn cookie_only_ignores_match() {
        let fm = FlowMatch::exact([1u8; MATCH_LEN]);
        let e = sample_entry(fm);
        let q = MetaMatch {
            flow_match: FlowMatch::exact([9u8; MATCH_LEN]),
            cookie: 0xabcd,
            cookie_mask: u64::MAX,
            ..MetaMatch::any(MatchMode::CookieOnly)
        };
        assert!(meta_match(&q, &e));
    }

    #[test]
    fn out_port_filter_excludes_nonmatching_port() {
        let fm = FlowMatch::exact([1u8; MATCH_LEN]);
        let e = sample_entry(fm);
        let q = MetaMatch {
            flow_match: fm,
            out_port: 99,
            ..MetaMatch::any(MatchMode::Strict)
        };
        assert!(!meta_match(&q, &e));
    }

    #[test]
    fn overlap_is_symmetric() {
        let mut a = FlowMatch::any();
        a.wildcard_mask[0] = 0;
        a.value[0] = 5;
        let mut b = FlowMatch::any();
        b.wildcard_mask[1] = 0;
        b.value[1] = 6;
        let e = sample_entry(a);
        let q = MetaMatch {
            flow_match: b,
            ..MetaMatch::any(MatchMode::Overlap)
        };
        assert!(meta_match(&q, &e));
    }
}
