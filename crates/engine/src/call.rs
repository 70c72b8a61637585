//! Provider call wrapper: timeout and failure classification.

use std::future::Future;
use std::time::Duration;

use cades_sign_core::{CadesError, ProviderFault, Result};

/// Await a provider call, bounded by `timeout` when set.
pub(crate) async fn call<T>(
    timeout: Option<Duration>,
    operation: &'static str,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T> {
    let outcome = match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| CadesError::Timeout { operation, after })?,
        None => fut.await,
    };
    outcome.map_err(|err| classify(operation, err))
}

/// Map a backend error onto the typed taxonomy.
pub(crate) fn classify(operation: &'static str, err: anyhow::Error) -> CadesError {
    match err.downcast_ref::<ProviderFault>() {
        Some(ProviderFault::Unavailable(reason)) => CadesError::ProviderUnavailable(reason.clone()),
        Some(ProviderFault::AccessDenied(reason)) => CadesError::StoreAccessDenied(reason.clone()),
        Some(ProviderFault::InvalidSignature(reason)) => {
            CadesError::InvalidSignature(reason.clone())
        }
        None => CadesError::provider(operation, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tagged_faults_are_classified() {
        let err = call(None, "open_store", async {
            Err::<(), anyhow::Error>(ProviderFault::AccessDenied("My".into()).into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CadesError::StoreAccessDenied(r) if r == "My"));

        let err = call(None, "version", async {
            Err::<(), anyhow::Error>(
                anyhow::Error::from(ProviderFault::Unavailable("gone".into())).context("probe"),
            )
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CadesError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn untagged_errors_keep_operation_name() {
        let err = call(None, "sign_hash", async { Err::<(), _>(anyhow::anyhow!("0x80090016")) })
            .await
            .unwrap_err();
        match err {
            CadesError::Provider { operation, source } => {
                assert_eq!(operation, "sign_hash");
                assert!(source.to_string().contains("0x80090016"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let after = Duration::from_millis(10);
        let err = call(Some(after), "hash_update", std::future::pending::<anyhow::Result<()>>())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CadesError::Timeout { operation: "hash_update", after: a } if a == after
        ));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let value = call(Some(Duration::from_secs(5)), "version", async { Ok(7u32) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
