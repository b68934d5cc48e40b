//! Meter batch construction.

use metering_types::{MeterBatch, MeterName, MeterValue, SubscriptionId};

/// Build one batch for `subscription_id` with a reading per catalog entry,
/// in catalog order. `value_fn` supplies each reading's quantity.
pub fn build_batch<F>(
    subscription_id: &SubscriptionId,
    catalog: &[MeterName],
    mut value_fn: F,
) -> MeterBatch
where
    F: FnMut(&MeterName) -> f64,
{
    let readings = catalog
        .iter()
        .map(|name| MeterValue::new(name.clone(), value_fn(name)))
        .collect();
    MeterBatch::new(subscription_id.clone(), readings)
}
