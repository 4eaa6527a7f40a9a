// lib/src/audit.rs

use tracing::{error, info};

use models::medical::{AuditLog, NewAuditLog};

use crate::storage_engine::ClinicStorage;

/// Appends an audit entry. A storage failure is logged and swallowed so the
/// audited action itself is never rolled back by it.
pub async fn record_audit<S: ClinicStorage + ?Sized>(storage: &S, entry: NewAuditLog) -> Option<AuditLog> {
    let action = entry.action.clone();
    let user_id = entry.user_id;
    match storage.append_audit(entry).await {
        Ok(log) => {
            info!("Audit log created: {} by user {:?}", action, user_id);
            Some(log)
        }
        Err(e) => {
            error!("Failed to create audit log for {}: {}", action, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::SledClinicStorage;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn records_details_and_client() {
        let storage = SledClinicStorage::temporary().unwrap();
        let user = Uuid::new_v4();
        let entry = NewAuditLog::new(Some(user), "update_user")
            .with_details(json!({"is_active": false}))
            .with_client(Some("10.0.0.7".into()), None);
        let log = record_audit(&storage, entry).await.unwrap();
        assert_eq!(log.details_json(), Some(json!({"is_active": false})));

        let stored = storage.list_audit_logs().await.unwrap();
        assert_eq!(stored, vec![log]);
        assert_eq!(stored[0].ip_address.as_deref(), Some("10.0.0.7"));
    }
}
