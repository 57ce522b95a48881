//! Generic grammar.
//!
//! Plain SQL with double-quoted identifiers and no engine extensions. JSON,
//! full-text, upsert and insert-or-ignore compilation are rejected.

use super::{Grammar, GrammarConfig};

/// Engine-neutral grammar.
#[derive(Debug, Clone, Default)]
pub struct GenericGrammar {
    config: GrammarConfig,
}

impl GenericGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }
}

impl Grammar for GenericGrammar {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn config(&self) -> &GrammarConfig {
        &self.config
    }
}
