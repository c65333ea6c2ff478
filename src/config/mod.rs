//! Engine configuration.
//!
//! Built-in defaults cover every setting; a TOML file can override them:
//!
//! ```toml
//! [chain]
//! boolean = 2      # bound for operators returning booleans
//! value = 3        # bound for value-returning operators
//!
//! [chain.overrides]
//! add = 4
//!
//! [trace]
//! enabled = true
//! ```


use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::diagnostic::Diagnostic;
use crate::ops::{Operator, Returns};
use crate::span::Span;

/// Chain-depth bounds.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Bound for operators whose result is a boolean.
    pub boolean: usize,
    /// Bound for value-returning operators.
    pub value: usize,
    /// Per-operator bounds, keyed by operator name.
    pub overrides: BTreeMap<String, usize>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            boolean: 2,
            value: 3,
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Deliver rewrite records to registered trace sinks.
    pub enabled: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub chain: ChainConfig,
    pub trace: TraceConfig,
}

impl EngineConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read engine config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse(&content)
    }

    /// Parse and validate TOML text. Syntax errors carry the byte span
    /// of the offending text.
    pub fn parse(content: &str) -> Result<Self, Diagnostic> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| {
            let span = e
                .span()
                .map_or_else(Span::dummy, |r| Span::new(0, r.start as u32, r.end as u32));
            Diagnostic::error(format!("invalid engine config: {}", e.message()), span)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Diagnostic> {
        if self.chain.boolean == 0 || self.chain.value == 0 {
            return Err(Diagnostic::error(
                "chain bounds must be at least 1".to_string(),
                Span::dummy(),
            )
            .with_help("a bound of 1 sends every second type combination to generic".to_string()));
        }
        for (name, bound) in &self.chain.overrides {
            if Operator::from_name(name).is_none() {
                let known: Vec<&str> = Operator::ALL.iter().map(|op| op.name()).collect();
                return Err(Diagnostic::error(
                    format!("unknown operator '{}' in chain overrides", name),
                    Span::dummy(),
                )
                .with_note(format!("known operators: {}", known.join(", "))));
            }
            if *bound == 0 {
                return Err(Diagnostic::error(
                    format!("chain bound for '{}' must be at least 1", name),
                    Span::dummy(),
                ));
            }
        }
        Ok(())
    }

    /// Legal settings worth pointing out: a bound of 1 turns off
    /// polymorphic caching for the operators it covers.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        let mut warnings = Vec::new();
        let defaults = [("boolean", self.chain.boolean), ("value", self.chain.value)];
        let overrides = self.chain.overrides.iter().map(|(name, bound)| (name.as_str(), *bound));
        for (name, bound) in defaults.into_iter().chain(overrides) {
            if bound == 1 {
                warnings.push(
                    Diagnostic::warning(
                        format!("chain bound for '{}' is 1", name),
                        Span::dummy(),
                    )
                    .with_note(
                        "the second type combination a node sees sends it to generic".to_string(),
                    ),
                );
            }
        }
        warnings
    }

    /// Effective chain bound for `op`.
    pub fn chain_bound(&self, op: Operator) -> usize {
        if let Some(bound) = self.chain.overrides.get(op.name()) {
            return *bound;
        }
        match op.table().returns {
            Returns::Boolean => self.chain.boolean,
            Returns::Value => self.chain.value,
        }
    }

    /// Builder-style override, mostly for tests and the CLI.
    pub fn with_bound(mut self, op: Operator, bound: usize) -> Self {
        self.chain.overrides.insert(op.name().to_string(), bound);
        self
    }
}
