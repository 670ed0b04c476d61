//! Per-stop fan-out of trip-update and alert fragments.
//!
//! Vehicle positions are not distributed: they describe continuous movement
//! rather than a stop event, and many publishers omit their stop id.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{StopPrefix, StopReference};
use crate::model::{
    Alert, Cause, Effect, EntityPayload, EntitySelector, EnumValue, FeedHeader, FeedMessage,
    SeverityLevel, StopTimeUpdate, TimeRange, TranslatedString, TripDescriptor, TripUpdate,
    VehicleDescriptor,
};
use crate::serde_helpers::serialize_option_int_as_string;

/// One stop-time update together with the trip it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdateFragment {
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleDescriptor>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_int_as_string"
    )]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    pub stop_time_update: StopTimeUpdate,
}

/// The alert fields copied into every stop an alert informs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub active_period: Vec<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<EnumValue<Cause>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<EnumValue<Effect>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<EnumValue<SeverityLevel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<TranslatedString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_text: Option<TranslatedString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<TranslatedString>,
}

impl From<&Alert> for AlertSummary {
    fn from(alert: &Alert) -> Self {
        Self {
            active_period: alert.active_periods.clone(),
            cause: alert.cause,
            effect: alert.effect,
            severity_level: alert.severity_level,
            header_text: alert.header_text.clone(),
            description_text: alert.description_text.clone(),
            url: alert.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFragment {
    pub entity_id: String,
    pub informed_entity: EntitySelector,
    pub alert: AlertSummary,
}

/// Everything one run found for a single stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopBundle {
    pub stop_id: String,
    pub header: FeedHeader,
    pub trip_updates: Vec<TripUpdateFragment>,
    pub alerts: Vec<AlertFragment>,
    pub generated_at: DateTime<Utc>,
    pub source: String,
}

/// Run-wide values stamped onto every bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleStamp {
    pub generated_at: DateTime<Utc>,
    /// Source URL with credentials redacted.
    pub source: String,
}

impl BundleStamp {
    pub fn new(generated_at: DateTime<Utc>, source: &str) -> Self {
        Self {
            generated_at,
            source: crate::redact::redact_url(source),
        }
    }
}

/// Stop bundles keyed by stop id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopBundles {
    bundles: BTreeMap<String, StopBundle>,
}

impl StopBundles {
    /// Fans the trip updates and alerts of `feed` out into per-stop bundles.
    ///
    /// A bundle is created the first time its stop is referenced and carries
    /// `feed`'s header. Every payload of an entity is visited, so one entity
    /// may contribute trip-update and alert fragments to several bundles.
    pub fn collect(feed: &FeedMessage, prefix: &StopPrefix, stamp: &BundleStamp) -> Self {
        let mut out = StopBundles::default();

        for entity in &feed.entities {
            for payload in entity.payloads() {
                match payload {
                    EntityPayload::TripUpdate(trip_update) => {
                        for stu in &trip_update.stop_time_updates {
                            let Some(stop_id) = matching_stop(stu, prefix) else {
                                continue;
                            };
                            out.bundle_mut(stop_id, &feed.header, stamp)
                                .trip_updates
                                .push(trip_fragment(&entity.id, trip_update, stu));
                        }
                    }
                    EntityPayload::Alert(alert) => {
                        for informed in &alert.informed_entities {
                            let Some(stop_id) = matching_stop(informed, prefix) else {
                                continue;
                            };
                            out.bundle_mut(stop_id, &feed.header, stamp)
                                .alerts
                                .push(AlertFragment {
                                    entity_id: entity.id.clone(),
                                    informed_entity: informed.clone(),
                                    alert: AlertSummary::from(alert),
                                });
                        }
                    }
                    EntityPayload::Vehicle(_) => {}
                }
            }
        }

        out
    }

    /// Appends `other`'s fragments to the bundles already present.
    ///
    /// Bundles keep the header and stamp they were created with; nothing is
    /// deduplicated.
    pub fn merge(&mut self, other: StopBundles) {
        for (stop_id, bundle) in other.bundles {
            match self.bundles.entry(stop_id) {
                Entry::Vacant(slot) => {
                    slot.insert(bundle);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    existing.trip_updates.extend(bundle.trip_updates);
                    existing.alerts.extend(bundle.alerts);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn get(&self, stop_id: &str) -> Option<&StopBundle> {
        self.bundles.get(stop_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StopBundle> {
        self.bundles.values()
    }

    pub fn fragment_count(&self) -> usize {
        self.iter()
            .map(|b| b.trip_updates.len() + b.alerts.len())
            .sum()
    }

    fn bundle_mut(&mut self, stop_id: &str, header: &FeedHeader, stamp: &BundleStamp) -> &mut StopBundle {
        self.bundles
            .entry(stop_id.to_string())
            .or_insert_with(|| StopBundle {
                stop_id: stop_id.to_string(),
                header: header.clone(),
                trip_updates: Vec::new(),
                alerts: Vec::new(),
                generated_at: stamp.generated_at,
                source: stamp.source.clone(),
            })
    }
}

fn matching_stop<'a, T: StopReference>(item: &'a T, prefix: &StopPrefix) -> Option<&'a str> {
    item.stop_id().filter(|id| prefix.matches(Some(*id)))
}

fn trip_fragment(entity_id: &str, trip_update: &TripUpdate, stu: &StopTimeUpdate) -> TripUpdateFragment {
    TripUpdateFragment {
        entity_id: entity_id.to_string(),
        trip: trip_update.trip.clone(),
        vehicle: trip_update.vehicle.clone(),
        timestamp: trip_update.timestamp,
        delay: trip_update.delay,
        stop_time_update: stu.clone(),
    }
}
