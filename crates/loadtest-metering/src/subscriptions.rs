//! Working set of subscriptions the generator emits for.

use crate::error::{LoadgenError, Result};
use chrono::Utc;
use metering_types::{load_json, SubscriptionRef};
use std::path::Path;
use tracing::info;

/// Subscriptions provisioned in the demo environment.
const DEMO_SUBSCRIPTIONS: [(&str, &str); 2] = [
    ("fdc778a6-1281-40e4-cade-4a5fc11f5440", "2021-11-04T16:12:26"),
    ("8151a707-467c-4105-df0b-44c3fca5880d", "2021-12-14T18:20:00"),
];

pub fn demo_subscriptions() -> Result<Vec<SubscriptionRef>> {
    DEMO_SUBSCRIPTIONS
        .iter()
        .map(|(id, established)| {
            SubscriptionRef::parse(id, established).map_err(LoadgenError::from)
        })
        .collect()
}

/// Assemble the working set.
///
/// Entries from `file` come first, followed by one subscription per name
/// (id derived from the name, established now). With neither, the demo
/// subscriptions are used.
pub async fn resolve_working_set(
    file: Option<&Path>,
    names: &[String],
) -> Result<Vec<SubscriptionRef>> {
    let mut subscriptions: Vec<SubscriptionRef> = match file {
        Some(path) => load_json(path).await?,
        None => Vec::new(),
    };

    let now = Utc::now();
    subscriptions.extend(names.iter().map(|name| SubscriptionRef::from_name(name, now)));

    if file.is_none() && names.is_empty() {
        subscriptions = demo_subscriptions()?;
    }

    info!("Working set: {} subscriptions", subscriptions.len());
    for subscription in &subscriptions {
        info!(
            "  {} (established {})",
            subscription.id, subscription.established_at
        );
    }
    Ok(subscriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metering_types::derive_id;
    use std::fs;

    #[tokio::test]
    async fn test_defaults_to_demo_set() {
        let subs = resolve_working_set(None, &[]).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].id.as_str(), "fdc778a6-1281-40e4-cade-4a5fc11f5440");
    }

    #[tokio::test]
    async fn test_names_derive_ids() {
        let names = vec!["tenant-x".to_string()];
        let subs = resolve_working_set(None, &names).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, derive_id("tenant-x"));
    }

    #[tokio::test]
    async fn test_file_then_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subscriptions.json");
        fs::write(
            &path,
            r#"[{"id": "from-file", "established": "2022-01-01T00:00:00"}]"#,
        )
        .unwrap();

        let names = vec!["tenant-y".to_string()];
        let subs = resolve_working_set(Some(&path), &names).await.unwrap();

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].id.as_str(), "from-file");
        assert_eq!(subs[1].id, derive_id("tenant-y"));
    }
}
