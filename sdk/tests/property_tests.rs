use proptest::prelude::*;
use sdk::errors::{EngineError, RelayErrorExt};
use sdk::types::{ConversationTurn, Role};

// Hints are static and never echo the error payload, which may carry an
// upstream body or part of a credential.
proptest! {
    #[test]
    fn test_error_user_hint_never_echoes_payload(error_str in "[a-zA-Z0-9_\\-]{24,48}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Validation(error_str.clone()),
            EngineError::Network(error_str.clone()),
            EngineError::Serialization(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

proptest! {
    #[test]
    fn test_turn_preserves_content(content in "\\PC*", role_idx in 0..3usize) {
        let role = [Role::User, Role::Assistant, Role::System][role_idx];
        let turn = ConversationTurn::new(role, content.clone());

        prop_assert_eq!(turn.role(), role);
        prop_assert_eq!(turn.content(), content.as_str());
    }
}
