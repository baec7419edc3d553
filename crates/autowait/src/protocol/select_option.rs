// Ways to pick an option in a <select>

/// One option to select, by value, visible label or position.
///
/// Plain strings convert to [`SelectOption::Value`].
///
/// # Example
///
/// ```ignore
/// use autowait::SelectOption;
///
/// let by_value: SelectOption = "lohi".into();
/// let by_label = SelectOption::Label("Price (low to high)".to_string());
/// let by_index = SelectOption::Index(2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOption {
    /// The option's `value` attribute
    Value(String),
    /// The option's text, compared trimmed
    Label(String),
    /// Zero-based position among the select's options
    Index(usize),
}

impl SelectOption {
    /// Whether the option at `index`, with this value and label, is the one
    /// asked for.
    pub fn matches(&self, index: usize, value: &str, label: &str) -> bool {
        match self {
            SelectOption::Value(v) => v == value,
            SelectOption::Label(l) => l.trim() == label.trim(),
            SelectOption::Index(i) => *i == index,
        }
    }

    /// Argument for the in-page select script: `{"value": ..}`,
    /// `{"label": ..}` or `{"index": ..}`.
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            SelectOption::Value(v) => serde_json::json!({ "value": v }),
            SelectOption::Label(l) => serde_json::json!({ "label": l }),
            SelectOption::Index(i) => serde_json::json!({ "index": i }),
        }
    }
}

impl From<&str> for SelectOption {
    fn from(value: &str) -> Self {
        SelectOption::Value(value.to_string())
    }
}

impl From<String> for SelectOption {
    fn from(value: String) -> Self {
        SelectOption::Value(value)
    }
}

impl From<usize> for SelectOption {
    fn from(index: usize) -> Self {
        SelectOption::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_option_json_shapes() {
        assert_eq!(SelectOption::Value("lohi".into()).to_json()["value"], "lohi");
        assert_eq!(
            SelectOption::Label("Name (A to Z)".into()).to_json()["label"],
            "Name (A to Z)"
        );
        let index = SelectOption::Index(2).to_json();
        assert_eq!(index["index"], 2);
        assert!(index["value"].is_null());
    }

    #[test]
    fn test_matches_by_variant() {
        assert!(SelectOption::Value("za".into()).matches(1, "za", "Name (Z to A)"));
        assert!(SelectOption::Label("Name (Z to A)".into()).matches(1, "za", " Name (Z to A) "));
        assert!(SelectOption::Index(1).matches(1, "za", "Name (Z to A)"));
        assert!(!SelectOption::Index(0).matches(1, "za", "Name (Z to A)"));
    }

    #[test]
    fn test_from_str() {
        let opt: SelectOption = "hilo".into();
        assert_eq!(opt, SelectOption::Value("hilo".to_string()));
        assert_eq!(SelectOption::from(3usize), SelectOption::Index(3));
    }
}
