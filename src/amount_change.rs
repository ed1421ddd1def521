//! Bidirectional amount-field linking.
//!
//! Typing into either field echoes the value immediately, then fills in the
//! other field: identity on the SY and YT tabs, a debounced Calculation Cache
//! quote on the PT tab. A new edit cancels any computation still pending.
//!
//! Only the PT path waits out the 200 ms debounce. The SY and YT identity
//! conversion needs no remote call, so it is written in the same update as the
//! echo and the counterpart field never lags the edited one on those tabs.

use crate::debounce::Debouncer;
use crate::ledger::QuoteKind;
use crate::quotes::QuoteCache;
use crate::swap_state::{SwapState, SwapStateHandle, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which of the two linked fields was edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSide {
    /// Amount in (`input`)
    A,
    /// Converted amount (`output`)
    B,
}

impl InputSide {
    fn quote_kind(self) -> QuoteKind {
        match self {
            InputSide::A => QuoteKind::PtOut,
            InputSide::B => QuoteKind::SyIn,
        }
    }

    fn edited(self, state: &SwapState) -> Option<f64> {
        let pair = state.current();
        match self {
            InputSide::A => pair.input,
            InputSide::B => pair.output,
        }
    }

    fn set_edited(self, state: &mut SwapState, value: Option<f64>) {
        match self {
            InputSide::A => state.set_input(value),
            InputSide::B => state.set_output(value),
        }
    }

    fn set_counterpart(self, state: &mut SwapState, value: Option<f64>) {
        match self {
            InputSide::A => state.set_output(value),
            InputSide::B => state.set_input(value),
        }
    }
}

pub struct AmountChangeHandler {
    quotes: Arc<QuoteCache>,
    swap: SwapStateHandle,
    delay: Duration,
    debouncer: Debouncer,
}

impl AmountChangeHandler {
    pub fn new(quotes: Arc<QuoteCache>, swap: SwapStateHandle, delay: Duration) -> Self {
        Self {
            quotes,
            swap,
            delay,
            debouncer: Debouncer::new(),
        }
    }

    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    pub fn on_amount_change(
        &self,
        side: InputSide,
        value: Option<f64>,
        pool_stats_id: &str,
        pool_id: &str,
    ) {
        self.debouncer.cancel();
        let tab = self.swap.snapshot().selected_tab();
        self.swap.update(|state| side.set_edited(state, value));

        let Some(amount) = value.filter(|v| v.is_finite() && *v > 0.0) else {
            self.swap.update(|state| side.set_counterpart(state, None));
            return;
        };

        match tab {
            Tab::Sy | Tab::Yt => {
                // 1:1 conversion, no remote call
                self.swap
                    .update(|state| side.set_counterpart(state, Some(amount)));
            }
            Tab::Pt => {
                let quotes = self.quotes.clone();
                let swap = self.swap.clone();
                let pool_stats_id = pool_stats_id.to_string();
                let pool_id = pool_id.to_string();
                self.debouncer.schedule(self.delay, async move {
                    let result = quotes
                        .compute(side.quote_kind(), amount, &pool_stats_id, &pool_id)
                        .await;
                    let applied = swap.update_if_selected(tab, |state| {
                        if side.edited(state) == Some(amount) {
                            side.set_counterpart(state, result);
                        }
                    });
                    if !applied {
                        debug!("Tab changed before {} quote arrived, dropping", tab);
                    }
                });
            }
        }
    }
}
