//! What the front-end shows for one step: text plus the controls to attach.

use serde::Serialize;

use gobble::{render, Outcome, Selection, EXHAUSTED_TEXT};

/// An interactive control the front-end may attach to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub label: String,
    pub outcome: Outcome,
}

/// Controls for a presentation. Exhausted presentations get none.
pub fn controls_for(exhausted: bool) -> Vec<Control> {
    if exhausted {
        return Vec::new();
    }
    vec![
        Control {
            label: "Smash".to_string(),
            outcome: Outcome::Keep,
        },
        Control {
            label: "Pass".to_string(),
            outcome: Outcome::Discard,
        },
    ]
}

/// One rendered step for a user.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub text: String,
    /// Entry to pass back to `decide`. `None` when exhausted.
    pub entry_index: Option<usize>,
    pub controls: Vec<Control>,
    pub exhausted: bool,
}

impl Presentation {
    pub fn from_selection(selection: Selection<'_>) -> Self {
        match selection {
            Selection::Entry(entry) => Self {
                text: render(entry),
                entry_index: Some(entry.index),
                controls: controls_for(false),
                exhausted: false,
            },
            Selection::Exhausted => Self {
                text: EXHAUSTED_TEXT.to_string(),
                entry_index: None,
                controls: controls_for(true),
                exhausted: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gobble::Catalog;

    #[test]
    fn test_controls_depend_only_on_exhaustion() {
        let live = controls_for(false);
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].outcome, Outcome::Keep);
        assert_eq!(live[1].outcome, Outcome::Discard);
        assert!(controls_for(true).is_empty());
    }

    #[test]
    fn test_entry_presentation_carries_index() {
        let catalog = Catalog::from_rows(vec![("Co".into(), "Place".into(), "Addr".into())]);
        let p = Presentation::from_selection(Selection::Entry(catalog.get(0).unwrap()));
        assert_eq!(p.entry_index, Some(0));
        assert!(p.text.starts_with("0\n\n<b>Place</b>"));
        assert!(!p.exhausted);
    }

    #[test]
    fn test_exhausted_presentation_has_no_controls() {
        let p = Presentation::from_selection(Selection::Exhausted);
        assert_eq!(p.text, EXHAUSTED_TEXT);
        assert_eq!(p.entry_index, None);
        assert!(p.controls.is_empty());
        assert!(p.exhausted);
    }
}
