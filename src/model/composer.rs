/// One optional provider extra and its checked state.
#[derive(Debug, Clone)]
pub struct ProviderToggle {
    /// Extra name, interpolated verbatim into the command.
    pub value: String,
    /// Display text for the picker list.
    pub label: String,
    pub checked: bool,
}

impl ProviderToggle {
    pub fn new(value: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            checked,
        }
    }
}

/// Derives the install command from an ordered set of provider toggles.
///
/// The toggle list is injected at construction and never discovered from the
/// environment, so any host (the TUI, a test) can drive it: flip a toggle,
/// read `command()`. The command is a pure function of the toggle states.
pub struct CommandComposer {
    base: String,
    toggles: Vec<ProviderToggle>,
}

impl CommandComposer {
    /// Build a composer for `base` (e.g. `pip install ecologits`) over the
    /// given toggles, kept in the order handed in.
    pub fn new(base: impl Into<String>, toggles: Vec<ProviderToggle>) -> Self {
        Self {
            base: base.into(),
            toggles,
        }
    }

    pub fn toggles(&self) -> &[ProviderToggle] {
        &self.toggles
    }

    /// Swap the base command, e.g. after a config reload.
    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }

    /// Number of currently checked toggles.
    pub fn checked_count(&self) -> usize {
        self.toggles.iter().filter(|t| t.checked).count()
    }

    /// Values of the checked toggles, in list (not click) order.
    pub fn selected_providers(&self) -> Vec<&str> {
        self.toggles
            .iter()
            .filter(|t| t.checked)
            .map(|t| t.value.as_str())
            .collect()
    }

    /// The derived command string: the base command alone when nothing is
    /// selected, otherwise with a bracketed comma-joined extras suffix.
    pub fn command(&self) -> String {
        let selected = self.selected_providers();
        if selected.is_empty() {
            self.base.clone()
        } else {
            format!("{}[{}]", self.base, selected.join(","))
        }
    }

    /// Flip one toggle by list index. Out-of-range indices are ignored.
    pub fn toggle(&mut self, index: usize) {
        if let Some(t) = self.toggles.get_mut(index) {
            t.checked = !t.checked;
        }
    }

    /// Set one toggle by value. Unknown values are ignored.
    pub fn set_checked(&mut self, value: &str, checked: bool) {
        if let Some(t) = self.toggles.iter_mut().find(|t| t.value == value) {
            t.checked = checked;
        }
    }

    pub fn set_all(&mut self, checked: bool) {
        for t in &mut self.toggles {
            t.checked = checked;
        }
    }

    /// Replace the toggle list, carrying checked state over by value.
    /// Values absent from the new list drop their state.
    pub fn replace_toggles(&mut self, mut toggles: Vec<ProviderToggle>) {
        for t in &mut toggles {
            if let Some(old) = self.toggles.iter().find(|o| o.value == t.value) {
                t.checked = old.checked;
            }
        }
        self.toggles = toggles;
    }
}
