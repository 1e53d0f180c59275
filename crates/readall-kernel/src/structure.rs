//! Per-tap structural validation.

use std::sync::Arc;

use crate::alias::AliasResolver;
use crate::outcome::{Diagnostic, ValidationOutcome};
use crate::syntax::SyntaxValidator;
use crate::tap::{Tap, TapRef};
use crate::vfs::Filesystem;

/// Progress through one tap's checks.
///
/// Only ever moves forward. `Done` is reached whatever the individual checks
/// find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TapCheckState {
    NotStarted,
    DefinitionsChecked,
    AliasesChecked,
    Done,
}

/// Runs the checks for one tap and folds them into a single outcome.
#[derive(Clone)]
pub struct TapStructureValidator {
    fs: Arc<dyn Filesystem>,
    syntax: SyntaxValidator,
    aliases: AliasResolver,
    check_aliases: bool,
    empty_is_failure: bool,
}

impl TapStructureValidator {
    pub fn new(fs: Arc<dyn Filesystem>, syntax: SyntaxValidator, check_aliases: bool) -> Self {
        Self {
            aliases: AliasResolver::new(fs.clone()),
            fs,
            syntax,
            check_aliases,
            empty_is_failure: false,
        }
    }

    /// Fail taps without definitions. Off by default: command-only taps
    /// legitimately have none, but a tap asked for by name must.
    pub fn empty_is_failure(mut self, fail: bool) -> Self {
        self.empty_is_failure = fail;
        self
    }

    /// Load a tap from disk and validate it.
    pub async fn validate_ref(&self, tap: &TapRef) -> ValidationOutcome {
        let loaded = Tap::load(self.fs.as_ref(), tap).await;
        self.validate(&loaded).await
    }

    pub async fn validate(&self, tap: &Tap) -> ValidationOutcome {
        let mut run = TapCheck::new(tap);
        while run.state != TapCheckState::Done {
            self.step(&mut run).await;
        }
        tracing::debug!(tap = %tap.id, diagnostics = run.diagnostics.len(), "tap checked");
        ValidationOutcome::tap(&tap.id, run.diagnostics)
    }

    async fn step(&self, run: &mut TapCheck<'_>) {
        run.state = match run.state {
            TapCheckState::NotStarted => {
                self.check_definitions(run).await;
                TapCheckState::DefinitionsChecked
            }
            TapCheckState::DefinitionsChecked if self.check_aliases => {
                let broken = self.aliases.resolve(run.tap).await;
                run.diagnostics.extend(broken);
                TapCheckState::AliasesChecked
            }
            TapCheckState::DefinitionsChecked | TapCheckState::AliasesChecked => {
                TapCheckState::Done
            }
            TapCheckState::Done => TapCheckState::Done,
        };
    }

    /// Every definition parses, and there is at least one if required.
    async fn check_definitions(&self, run: &mut TapCheck<'_>) {
        let tap = run.tap;
        run.diagnostics.extend(tap.load_problems.iter().cloned());

        if tap.definitions.is_empty() && self.empty_is_failure {
            run.diagnostics.push(Diagnostic::EmptyTap { tap: tap.id.clone() });
        }
        for definition in &tap.definitions {
            if let Some(d) = self.syntax.diagnose(&definition.path).await {
                run.diagnostics.push(d);
            }
        }
    }
}

struct TapCheck<'a> {
    tap: &'a Tap,
    state: TapCheckState,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TapCheck<'a> {
    fn new(tap: &'a Tap) -> Self {
        Self {
            tap,
            state: TapCheckState::NotStarted,
            diagnostics: Vec::new(),
        }
    }
}
