//! Process exit codes. Scripts depend on these values.

use syntheverse_core::errors::{BridgeError, BridgeErrorKind};

pub const EXIT_SUCCESS: i32 = 0;
/// The command ran but found a problem (missing papers, failed pipeline step, lost state).
pub const EXIT_FAILURE: i32 = 1;
/// Bad or missing config, deployment file or key.
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Node, provider or network failure.
pub const EXIT_INFRA_ERROR: i32 = 3;

pub fn for_kind(kind: BridgeErrorKind) -> i32 {
    match kind {
        BridgeErrorKind::MissingConfig
        | BridgeErrorKind::ConfigParse
        | BridgeErrorKind::MissingKey
        | BridgeErrorKind::DeploymentNotFound => EXIT_CONFIG_ERROR,
        k if k.is_infra() => EXIT_INFRA_ERROR,
        _ => EXIT_FAILURE,
    }
}

pub fn for_error(err: &anyhow::Error) -> i32 {
    for_kind(BridgeError::from_anyhow(err).kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_codes() {
        assert_eq!(for_kind(BridgeErrorKind::MissingKey), EXIT_CONFIG_ERROR);
        assert_eq!(for_kind(BridgeErrorKind::Network), EXIT_INFRA_ERROR);
        assert_eq!(for_kind(BridgeErrorKind::Reverted), EXIT_INFRA_ERROR);
        assert_eq!(for_kind(BridgeErrorKind::Other), EXIT_FAILURE);
    }

    #[test]
    fn untyped_errors_are_classified_from_text() {
        let err = anyhow::anyhow!("config error: unknown field `foo`");
        assert_eq!(for_error(&err), EXIT_CONFIG_ERROR);
        let err: anyhow::Error = BridgeError::deployment_not_found("d.json").into();
        assert_eq!(for_error(&err), EXIT_CONFIG_ERROR);
    }
}
