//! Rust rendering of the compressed scanner tables.
//!
//! Produces a `TokenStream` of `static` tables plus the small lookup
//! functions a table-driven scanner needs. Large arrays are built from
//! `proc_macro2::Literal` tokens directly rather than one `quote!` per entry.
//!
//! The transition table shape follows the encoding chosen at compression
//! time: a flat `TRANSITIONS` array (dense), a `PACKED_TRANSITIONS` run list
//! with an `unpack_transitions` function (packed), or a `next_row` function
//! of nested `match` arms (inline branches).

use proc_macro2::{Literal, TokenStream, TokenTree};
use quote::quote;

use super::charset::Interval;
use super::compress::{BranchRow, CompressedTables, EncodedTable};
use super::{ClassId, NO_TARGET};

fn u32_lit(v: u32) -> TokenTree {
    TokenTree::Literal(Literal::u32_suffixed(v))
}

fn u32_array(values: impl IntoIterator<Item = u32>) -> (TokenStream, usize) {
    let entries: Vec<TokenTree> = values.into_iter().map(u32_lit).collect();
    let len = entries.len();
    (quote! { [#(#entries),*] }, len)
}

/// Render every table of `tables`.
///
/// `char_map` is the sorted `(interval, class)` list of the character-class
/// partition, as returned by `CharClasses::class_intervals`.
pub fn generate_tables(tables: &CompressedTables, char_map: &[(Interval, ClassId)]) -> TokenStream {
    let num_states = tables.num_states;
    let num_classes = tables.num_classes;
    let num_cols = tables.num_cols;

    let char_class = generate_char_class_table(char_map);
    let (row_map, row_len) = u32_array(tables.row_map.iter().copied());
    let (col_map, col_len) = u32_array(tables.col_map.iter().copied());
    let (lex_state, lex_len) = u32_array(tables.lex_state.iter().copied());
    let (action_map, action_len) = u32_array(tables.action_map.iter().copied());
    let (eof_map, eof_len) = u32_array(tables.eof_action_map.iter().copied());

    let attr_entries: Vec<TokenTree> = tables
        .attributes
        .iter()
        .map(|&a| TokenTree::Literal(Literal::u8_suffixed(a)))
        .collect();
    let attr_len = attr_entries.len();

    let action_code: Vec<Literal> =
        tables.actions.iter().map(|a| Literal::string(a.content.trim())).collect();
    let action_code_len = action_code.len();

    let transitions = generate_transitions(&tables.table, num_cols);

    quote! {
        pub const NUM_STATES: usize = #num_states;
        pub const NUM_CLASSES: usize = #num_classes;
        pub const NO_TARGET: u32 = u32::MAX;

        #char_class

        pub static ROW_MAP: [u32; #row_len] = #row_map;
        pub static COL_MAP: [u32; #col_len] = #col_map;
        pub static LEX_STATE: [u32; #lex_len] = #lex_state;
        pub static ATTRIBUTES: [u8; #attr_len] = [#(#attr_entries),*];
        pub static ACTION: [u32; #action_len] = #action_map;
        pub static EOF_ACTION: [u32; #eof_len] = #eof_map;
        pub static ACTION_CODE: [&str; #action_code_len] = [#(#action_code),*];

        #transitions
    }
}

/// Sorted `(start, end, class)` triples and a binary-search `class_of`.
pub fn generate_char_class_table(char_map: &[(Interval, ClassId)]) -> TokenStream {
    let triples: Vec<TokenStream> = char_map
        .iter()
        .map(|(iv, class)| {
            let (s, e, c) = (u32_lit(iv.start), u32_lit(iv.end), u32_lit(*class));
            quote! { (#s, #e, #c) }
        })
        .collect();
    let len = triples.len();

    quote! {
        pub static CHAR_CLASS: [(u32, u32, u32); #len] = [#(#triples),*];

        pub fn class_of(c: u32) -> Option<u32> {
            CHAR_CLASS
                .binary_search_by(|&(start, end, _)| {
                    if end < c {
                        ::core::cmp::Ordering::Less
                    } else if start > c {
                        ::core::cmp::Ordering::Greater
                    } else {
                        ::core::cmp::Ordering::Equal
                    }
                })
                .ok()
                .map(|i| CHAR_CLASS[i].2)
        }
    }
}

/// Transition table items for the chosen encoding.
pub fn generate_transitions(table: &EncodedTable, num_cols: usize) -> TokenStream {
    match table {
        EncodedTable::Dense(cells) => {
            let (array, len) = u32_array(cells.iter().copied());
            quote! {
                pub static TRANSITIONS: [u32; #len] = #array;

                pub fn next_state(state: u32, class: u32) -> u32 {
                    let row = ROW_MAP[state as usize] as usize;
                    let col = COL_MAP[class as usize] as usize;
                    TRANSITIONS[row * #num_cols + col]
                }
            }
        }
        EncodedTable::Packed(runs) => {
            let pairs: Vec<TokenStream> = runs
                .iter()
                .map(|&(count, value)| {
                    let (c, v) = (u32_lit(count), u32_lit(value));
                    quote! { (#c, #v) }
                })
                .collect();
            let len = pairs.len();
            quote! {
                pub static PACKED_TRANSITIONS: [(u32, u32); #len] = [#(#pairs),*];

                pub fn unpack_transitions() -> Vec<u32> {
                    let mut cells = Vec::new();
                    for &(count, value) in PACKED_TRANSITIONS.iter() {
                        cells.extend(::core::iter::repeat(value).take(count as usize));
                    }
                    cells
                }

                pub fn next_state(cells: &[u32], state: u32, class: u32) -> u32 {
                    let row = ROW_MAP[state as usize] as usize;
                    let col = COL_MAP[class as usize] as usize;
                    cells[row * #num_cols + col]
                }
            }
        }
        EncodedTable::InlineBranches(rows) => {
            let row_arms: Vec<TokenStream> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let row_lit = u32_lit(i as u32);
                    let body = generate_branch_row(row);
                    quote! { #row_lit => #body }
                })
                .collect();
            quote! {
                pub fn next_row(row: u32, col: u32) -> u32 {
                    match row {
                        #(#row_arms,)*
                        _ => NO_TARGET,
                    }
                }

                pub fn next_state(state: u32, class: u32) -> u32 {
                    next_row(ROW_MAP[state as usize], COL_MAP[class as usize])
                }
            }
        }
    }
}

fn target_expr(target: u32) -> TokenStream {
    if target == NO_TARGET {
        quote! { NO_TARGET }
    } else {
        let lit = u32_lit(target);
        quote! { #lit }
    }
}

fn generate_branch_row(row: &BranchRow) -> TokenStream {
    let default = target_expr(row.default);
    if row.cases.is_empty() {
        return default;
    }
    let arms: Vec<TokenStream> = row
        .cases
        .iter()
        .map(|(target, cols)| {
            let patterns: Vec<TokenTree> = cols.iter().map(u32_lit).collect();
            let target = target_expr(*target);
            quote! { #(#patterns)|* => #target }
        })
        .collect();
    quote! {
        match col {
            #(#arms,)*
            _ => #default,
        }
    }
}
