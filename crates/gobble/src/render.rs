//! HTML-flavoured text rendering for chat messages.

use crate::types::{Catalog, Entry, UserState};

/// Text shown once a user has decided every entry.
pub const EXHAUSTED_TEXT: &str = "Come back tomorrow for more!";

/// Card body for an entry: name, company and address.
pub fn render_card(entry: &Entry) -> String {
    format!(
        "\n\n<b>{}</b>\n<i>{}</i>\nAddress: {}\n",
        entry.name, entry.company, entry.address
    )
}

/// Full presentation text: the entry index on the first line, then the card.
pub fn render(entry: &Entry) -> String {
    format!("{}{}", entry.index, render_card(entry))
}

/// Cards for every saved entry, in the order they were saved.
///
/// Indices that are not in the catalog are skipped.
pub fn build_history(catalog: &Catalog, user: &UserState) -> String {
    user.decided
        .iter()
        .filter_map(|index| match catalog.get(index) {
            Some(entry) => Some(render_card(entry)),
            None => {
                tracing::warn!(
                    "User {} has saved index {index} outside the catalog",
                    user.user_id
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_rows(vec![
            ("Co A".into(), "Alpha".into(), "1 A ST, SINGAPORE 000001".into()),
            ("Co B".into(), "Beta".into(), "2 B ST, SINGAPORE 000002".into()),
            ("Co C".into(), "Gamma".into(), "3 C ST, SINGAPORE 000003".into()),
        ])
    }

    #[test]
    fn test_render_leads_with_index() {
        let cat = catalog();
        let text = render(cat.get(1).unwrap());
        assert_eq!(
            text,
            "1\n\n<b>Beta</b>\n<i>Co B</i>\nAddress: 2 B ST, SINGAPORE 000002\n"
        );
    }

    #[test]
    fn test_history_uses_saved_order_without_index_lines() {
        let cat = catalog();
        let mut user = UserState::new(5);
        user.decided.insert(2);
        user.decided.insert(0);

        let history = build_history(&cat, &user);
        assert_eq!(
            history,
            format!(
                "{}{}",
                render_card(cat.get(2).unwrap()),
                render_card(cat.get(0).unwrap())
            )
        );
        assert!(!history.starts_with('2'));
    }

    #[test]
    fn test_history_empty_for_new_user() {
        assert_eq!(build_history(&catalog(), &UserState::new(1)), "");
    }
}
