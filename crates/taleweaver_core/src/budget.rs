//! Token budget tracking for streamed generation.
//!
//! The tracker never sees the model's tokenizer. It estimates units from the
//! text it is shown, so the limit is an approximation of model tokens:
//!
//! - [`UnitEstimator::Words`] counts maximal runs of non-whitespace across the
//!   whole output, so a word split over two fragments counts once. The
//!   budget halts once the last allowed word has ended, so a word that
//!   arrives in pieces is never cut short.
//! - [`UnitEstimator::Fragments`] counts one unit per non-empty fragment,
//!   which tracks Ollama's one-token-per-chunk streaming closely.

use serde::{Deserialize, Serialize};
use taleweaver_error::{RequestError, RequestErrorKind};

/// How generated text is converted into countable units.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnitEstimator {
    /// Whitespace-delimited words
    #[default]
    #[display("words")]
    Words,
    /// One unit per streamed fragment
    #[display("fragments")]
    Fragments,
}

impl UnitEstimator {
    /// Token allowance to request from the inference service for a unit limit.
    ///
    /// Words usually take more than one model token, so the upstream allowance
    /// is doubled to keep the local tracker as the binding constraint.
    pub fn upstream_allowance(&self, limit: u32) -> u32 {
        match self {
            UnitEstimator::Words => limit.saturating_mul(2),
            UnitEstimator::Fragments => limit,
        }
    }
}

/// Whether generation may continue after a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetVerdict {
    /// Budget remains
    Continue,
    /// Budget exhausted; stop generating
    Halt,
}

/// Result of observing one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<'a> {
    /// The part of the fragment that fits in the budget
    pub forwarded: &'a str,
    /// Whether generation may continue
    pub verdict: BudgetVerdict,
}

/// Running unit counter for one generation request.
///
/// Once the ceiling is spent the tracker halts and every later observation
/// also halts without forwarding anything. With [`UnitEstimator::Words`] the
/// halt comes at the whitespace or fragment boundary after the last word.
///
/// # Examples
///
/// ```
/// use taleweaver_core::{BudgetVerdict, TokenBudget, UnitEstimator};
///
/// let mut budget = TokenBudget::new(3, UnitEstimator::Words).unwrap();
/// let first = budget.observe("Once upon");
/// assert_eq!(first.verdict, BudgetVerdict::Continue);
///
/// let second = budget.observe(" a time there was");
/// assert_eq!(second.forwarded, " a");
/// assert_eq!(second.verdict, BudgetVerdict::Halt);
/// assert_eq!(budget.used(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBudget {
    ceiling: u32,
    used: u32,
    estimator: UnitEstimator,
    mid_word: bool,
    halted: bool,
}

impl TokenBudget {
    /// Create a tracker with the given ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error if `ceiling` is zero.
    #[track_caller]
    pub fn new(ceiling: u32, estimator: UnitEstimator) -> Result<Self, RequestError> {
        if ceiling == 0 {
            return Err(RequestError::new(RequestErrorKind::ZeroTokenLimit));
        }
        Ok(Self {
            ceiling,
            used: 0,
            estimator,
            mid_word: false,
            halted: false,
        })
    }

    /// Count one fragment against the budget.
    pub fn observe<'a>(&mut self, fragment: &'a str) -> Observation<'a> {
        if self.halted {
            return Observation {
                forwarded: "",
                verdict: BudgetVerdict::Halt,
            };
        }

        match self.estimator {
            UnitEstimator::Words => self.observe_words(fragment),
            UnitEstimator::Fragments => self.observe_fragment(fragment),
        }
    }

    fn observe_words<'a>(&mut self, fragment: &'a str) -> Observation<'a> {
        let mut in_word = self.mid_word;

        for (idx, ch) in fragment.char_indices() {
            if ch.is_whitespace() {
                if self.used == self.ceiling {
                    // The last allowed word just ended.
                    return self.halt(&fragment[..idx]);
                }
                in_word = false;
            } else if !in_word {
                if self.used == self.ceiling {
                    return self.halt(&fragment[..idx]);
                }
                self.used += 1;
                in_word = true;
            }
        }

        // The last allowed word may still be arriving, so keep it open.
        self.mid_word = in_word;
        Observation {
            forwarded: fragment,
            verdict: BudgetVerdict::Continue,
        }
    }

    fn observe_fragment<'a>(&mut self, fragment: &'a str) -> Observation<'a> {
        if fragment.is_empty() {
            return Observation {
                forwarded: fragment,
                verdict: BudgetVerdict::Continue,
            };
        }

        self.used += 1;
        if self.used >= self.ceiling {
            self.halt(fragment)
        } else {
            Observation {
                forwarded: fragment,
                verdict: BudgetVerdict::Continue,
            }
        }
    }

    fn halt<'a>(&mut self, forwarded: &'a str) -> Observation<'a> {
        self.halted = true;
        self.mid_word = false;
        Observation {
            forwarded: forwarded.trim_end(),
            verdict: BudgetVerdict::Halt,
        }
    }

    /// The configured ceiling.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Units counted so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Units still available.
    pub fn remaining(&self) -> u32 {
        self.ceiling - self.used
    }

    /// The estimator in use.
    pub fn estimator(&self) -> UnitEstimator {
        self.estimator
    }

    /// Whether the budget has been exhausted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Count whitespace-delimited words in a complete text.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
