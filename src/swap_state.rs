use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Instrument tab of the market page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Sy,
    Pt,
    Yt,
}

impl Tab {
    fn index(self) -> usize {
        match self {
            Tab::Sy => 0,
            Tab::Pt => 1,
            Tab::Yt => 2,
        }
    }

    pub fn input_label(self, token_name: &str) -> String {
        match self {
            Tab::Sy => token_name.to_string(),
            Tab::Pt | Tab::Yt => format!("SY-{}", token_name),
        }
    }

    pub fn output_label(self, token_name: &str) -> String {
        match self {
            Tab::Sy => format!("SY-{}", token_name),
            Tab::Pt => format!("PT-{}", token_name),
            Tab::Yt => format!("YT-{}", token_name),
        }
    }

    pub fn exchange_rate_hint(self, token_name: &str) -> String {
        format!(
            "1 {} = 1 {}",
            self.input_label(token_name),
            self.output_label(token_name)
        )
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Sy => f.write_str("SY"),
            Tab::Pt => f.write_str("PT"),
            Tab::Yt => f.write_str("YT"),
        }
    }
}

/// The two linked amount fields of one tab.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwapPair {
    pub input: Option<f64>,
    pub output: Option<f64>,
}

/// Market-page swap form state.
///
/// Each tab keeps its own pair so switching tabs never clobbers another tab's
/// amounts. Field mutators only ever touch the selected tab.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapState {
    pairs: [SwapPair; 3],
    selected_tab: Tab,
    pub selected_position: Option<String>,
    pub slippage: f64,
    pub is_swap_loading: bool,
    pub status: String,
}

impl SwapState {
    pub fn new(slippage: f64) -> Self {
        Self {
            pairs: [SwapPair::default(); 3],
            selected_tab: Tab::default(),
            selected_position: None,
            slippage,
            is_swap_loading: false,
            status: String::new(),
        }
    }

    pub fn selected_tab(&self) -> Tab {
        self.selected_tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.selected_tab = tab;
    }

    pub fn current(&self) -> SwapPair {
        self.pairs[self.selected_tab.index()]
    }

    /// Read-only view of any tab.
    pub fn pair(&self, tab: Tab) -> SwapPair {
        self.pairs[tab.index()]
    }

    pub fn set_input(&mut self, value: Option<f64>) {
        self.pairs[self.selected_tab.index()].input = value;
    }

    pub fn set_output(&mut self, value: Option<f64>) {
        self.pairs[self.selected_tab.index()].output = value;
    }

    /// Clear one tab's pair, whichever tab is selected now.
    pub fn reset(&mut self, tab: Tab) {
        self.pairs[tab.index()] = SwapPair::default();
    }
}

impl Default for SwapState {
    fn default() -> Self {
        Self::new(crate::settings::ValueSettings::default().default_slippage)
    }
}

/// Shared, observable handle to a [`SwapState`].
#[derive(Debug, Clone)]
pub struct SwapStateHandle {
    tx: Arc<watch::Sender<SwapState>>,
}

impl SwapStateHandle {
    pub fn new(state: SwapState) -> Self {
        let (tx, _) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> SwapState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SwapState> {
        self.tx.subscribe()
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SwapState),
    {
        self.tx.send_modify(f);
    }

    /// Apply `f` only if `tab` is still selected. Returns whether it was applied.
    pub fn update_if_selected<F>(&self, tab: Tab, f: F) -> bool
    where
        F: FnOnce(&mut SwapState),
    {
        self.tx.send_if_modified(|state| {
            if state.selected_tab() != tab {
                return false;
            }
            f(state);
            true
        })
    }
}

impl Default for SwapStateHandle {
    fn default() -> Self {
        Self::new(SwapState::default())
    }
}
