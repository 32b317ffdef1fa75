//! Target resolution.
//!
//! An explicit target wins. Otherwise the board alias (default
//! [`DEFAULT_BOARD`]) is looked up in the alias table; unknown aliases pass
//! through as literal targets. The result must be on the allow-list when
//! one is configured.

use crate::config::{GateConfig, DEFAULT_BOARD};
use crate::result::{RejectionReason, ResolvedTarget};

/// Resolve an explicit target or board alias to a canonical target.
pub fn resolve_target(
    fqbn: Option<&str>,
    board: Option<&str>,
    config: &GateConfig,
) -> Result<ResolvedTarget, RejectionReason> {
    let target = match fqbn {
        Some(explicit) => {
            let explicit = explicit.trim();
            if explicit.is_empty() {
                return Err(RejectionReason::EmptyTarget);
            }
            explicit.to_string()
        }
        None => {
            let alias = board
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .unwrap_or(DEFAULT_BOARD);
            config
                .board_aliases
                .get(alias)
                .cloned()
                .unwrap_or_else(|| alias.to_string())
        }
    };

    if !config.allowed_targets.is_empty() && !config.allowed_targets.contains(&target) {
        return Err(RejectionReason::TargetNotAllowed(target));
    }

    Ok(ResolvedTarget::new(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn restricted(allowed: &[&str]) -> GateConfig {
        GateConfig {
            allowed_targets: allowed.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[parameterized(
        default_board = { None, None, "arduino:avr:uno" },
        alias = { None, Some("mega"), "arduino:avr:mega" },
        megaavr_alias = { None, Some("uno-wifi-rev2"), "arduino:megaavr:uno2018" },
        passthrough = { None, Some("esp32:esp32:esp32"), "esp32:esp32:esp32" },
        explicit = { Some("arduino:avr:nano"), None, "arduino:avr:nano" },
        explicit_wins = { Some("arduino:avr:micro"), Some("mega"), "arduino:avr:micro" },
        explicit_trimmed = { Some("  arduino:avr:uno "), None, "arduino:avr:uno" },
        blank_board = { None, Some("  "), "arduino:avr:uno" },
    )]
    fn test_resolution(fqbn: Option<&str>, board: Option<&str>, expected: &str) {
        let target = resolve_target(fqbn, board, &GateConfig::default()).unwrap();
        assert_eq!(target.as_str(), expected);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let config = GateConfig::default();
        let first = resolve_target(None, Some("nano"), &config).unwrap();
        let second = resolve_target(None, Some("nano"), &config).unwrap();
        assert_eq!(first, second);

        // Feeding a resolved target back in as explicit target is a no-op.
        let again = resolve_target(Some(first.as_str()), None, &config).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_alias_outside_allow_list_rejected() {
        let mut config = restricted(&["a:b:c"]);
        config.board_aliases.insert("xy".to_string(), "x:y:z".to_string());

        let err = resolve_target(None, Some("xy"), &config).unwrap_err();
        assert_eq!(err, RejectionReason::TargetNotAllowed("x:y:z".to_string()));
        assert!(err.is_resolution());
    }

    #[test]
    fn test_allow_list_membership() {
        let config = restricted(&["arduino:avr:uno", "arduino:avr:nano"]);
        assert!(resolve_target(None, None, &config).is_ok());
        assert!(resolve_target(Some("arduino:avr:nano"), None, &config).is_ok());
        assert!(resolve_target(None, Some("mega"), &config).is_err());
    }

    #[test]
    fn test_empty_explicit_target_rejected() {
        let err = resolve_target(Some(" "), Some("uno"), &GateConfig::default()).unwrap_err();
        assert_eq!(err, RejectionReason::EmptyTarget);
    }
}
