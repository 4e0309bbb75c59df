//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random requests that the board
//! accepts, plus a few it must reject.

use proptest::prelude::*;
use twosteps_server::StateUpdate;

/// Strategy for generating valid usernames (non-blank, no surrounding
/// whitespace).
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9_.-]{0,23}").expect("Invalid regex")
}

/// Strategy for generating blank usernames, which sign-in must reject.
pub fn blank_username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ \t\r\n]{0,8}").expect("Invalid regex")
}

/// Strategy for generating colors.
pub fn color_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("white".to_string()),
        Just("red".to_string()),
        Just("blue".to_string()),
        prop::string::string_regex("#[0-9a-f]{6}").expect("Invalid regex"),
    ]
}

/// Strategy for generating complete state updates.
pub fn state_update_strategy() -> impl Strategy<Value = StateUpdate> {
    (-10_000i64..10_000, -10_000i64..10_000, color_strategy())
        .prop_map(|(x, y, color)| StateUpdate::new(x, y, color))
}

/// Strategy for generating state updates with at least one field missing.
pub fn partial_update_strategy() -> impl Strategy<Value = StateUpdate> {
    (state_update_strategy(), 1u8..8).prop_map(|(mut update, mask)| {
        // Each bit of `mask` drops one field; mask is never zero
        if mask & 0b001 != 0 {
            update.x = None;
        }
        if mask & 0b010 != 0 {
            update.y = None;
        }
        if mask & 0b100 != 0 {
            update.color = None;
        }
        update
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestBoard;
    use twosteps_server::ServerError;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn username_is_signable(name in username_strategy()) {
            let board = TestBoard::memory();
            let user = board.sign_in_as(&name);
            prop_assert_eq!(user.username, name);
        }

        #[test]
        fn blank_username_rejected(name in blank_username_strategy()) {
            let board = TestBoard::memory();
            let result = board.sign_in(&name);
            prop_assert!(matches!(result, Err(ServerError::InvalidInput(_))));
        }

        #[test]
        fn partial_update_leaves_board_untouched(update in partial_update_strategy()) {
            let board = TestBoard::memory();
            let alice = board.sign_in_as("alice");
            let before = board.document();

            let result = board.update_state(alice.identity(), update);
            prop_assert!(matches!(result, Err(ServerError::InvalidInput(_))));
            prop_assert_eq!(board.document(), before);
        }

        #[test]
        fn last_history_entry_is_current_state(
            updates in prop::collection::vec(state_update_strategy(), 1..8)
        ) {
            let board = TestBoard::memory();
            let alice = board.sign_in_as("alice");

            for update in updates {
                board.update_state(alice.identity(), update).unwrap();
            }

            let state = board.get_state(alice.identity()).unwrap();
            let history = board.get_history(alice.identity()).unwrap();
            prop_assert_eq!(history.last(), Some(&state));
        }
    }
}
