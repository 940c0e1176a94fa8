//! Macro table: named regular expressions referenced as `{NAME}`.
//!
//! Macros are expanded once, after parsing and before any automaton is
//! built. Expansion rewrites each used definition so that it no longer
//! contains [`RegExp::MacroUse`] nodes, substituting deep copies of the
//! referenced definitions. Rules keep their macro uses; the NFA builder
//! resolves them against the expanded table.

use std::collections::BTreeMap;

use log::debug;

use crate::automata::regex::RegExp;
use crate::error::{GenerateError, Result};

#[derive(Debug, Clone)]
struct MacroEntry {
    definition: RegExp,
    used: bool,
    expanded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: BTreeMap<String, MacroEntry>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable { entries: BTreeMap::new() }
    }

    /// Define `name`. Returns `true` if the name was not defined before; a
    /// redefinition replaces the old definition and clears its used flag.
    pub fn insert(&mut self, name: impl Into<String>, definition: RegExp) -> bool {
        self.entries
            .insert(name.into(), MacroEntry { definition, used: false, expanded: false })
            .is_none()
    }

    /// Mark `name` as used. Returns `false` if it is not defined.
    pub fn mark_used(&mut self, name: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.used = true;
                true
            }
            None => false,
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.used)
    }

    /// Names of macros that are defined but never used, in name order.
    pub fn unused(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.used)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn definition(&self, name: &str) -> Option<&RegExp> {
        self.entries.get(name).map(|e| &e.definition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark every macro used directly in `re`, reporting undefined ones as
    /// used by `referrer`.
    pub fn mark_uses_in(&mut self, re: &RegExp, referrer: &str) -> Result<()> {
        let mut names = Vec::new();
        re.for_each_macro_use(&mut |name| names.push(name.to_string()));
        for name in names {
            if !self.mark_used(&name) {
                return Err(GenerateError::MacroDefMissing { name, referrer: referrer.to_string() });
            }
        }
        Ok(())
    }

    /// Expand every used macro in place.
    ///
    /// Macros reached only through other macros become used as well, so the
    /// loop runs until no used macro is left unexpanded.
    pub fn expand(&mut self) -> Result<()> {
        loop {
            let pending: Vec<String> = self
                .entries
                .iter()
                .filter(|(_, e)| e.used && !e.expanded)
                .map(|(name, _)| name.clone())
                .collect();
            if pending.is_empty() {
                return Ok(());
            }

            for name in pending {
                let mut stack = vec![name.clone()];
                let mut reached = Vec::new();
                let expanded = match self.entries.get(&name) {
                    Some(entry) => self.expand_regexp(&entry.definition, &mut stack, &mut reached)?,
                    None => continue,
                };
                debug!("expanded macro `{name}`");
                if let Some(entry) = self.entries.get_mut(&name) {
                    entry.definition = expanded;
                    entry.expanded = true;
                }
                for used in reached {
                    self.mark_used(&used);
                }
            }
        }
    }

    /// Deep copy of `re` with every macro use replaced by its expansion.
    /// `stack` holds the macros currently being expanded, innermost last.
    fn expand_regexp(
        &self,
        re: &RegExp,
        stack: &mut Vec<String>,
        reached: &mut Vec<String>,
    ) -> Result<RegExp> {
        Ok(match re {
            RegExp::Alternation(r1, r2) => RegExp::alt(
                self.expand_regexp(r1, stack, reached)?,
                self.expand_regexp(r2, stack, reached)?,
            ),
            RegExp::Concatenation(r1, r2) => RegExp::concat(
                self.expand_regexp(r1, stack, reached)?,
                self.expand_regexp(r2, stack, reached)?,
            ),
            RegExp::Star(r) => RegExp::star(self.expand_regexp(r, stack, reached)?),
            RegExp::Plus(r) => RegExp::plus(self.expand_regexp(r, stack, reached)?),
            RegExp::Question(r) => RegExp::question(self.expand_regexp(r, stack, reached)?),
            RegExp::Negation(r) => RegExp::negation(self.expand_regexp(r, stack, reached)?),
            RegExp::UpTo(r) => RegExp::up_to(self.expand_regexp(r, stack, reached)?),
            RegExp::MacroUse(used) => {
                if stack.iter().any(|n| n == used) {
                    return Err(GenerateError::MacroCycle { name: used.clone() });
                }
                let Some(definition) = self.definition(used) else {
                    let referrer = stack.last().cloned().unwrap_or_default();
                    return Err(GenerateError::MacroDefMissing { name: used.clone(), referrer });
                };
                reached.push(used.clone());
                stack.push(used.clone());
                let expanded = self.expand_regexp(definition, stack, reached)?;
                stack.pop();
                expanded
            }
            leaf => leaf.clone(),
        })
    }
}
