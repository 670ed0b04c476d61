//! Single-feed pruning.

use serde::Serialize;

use super::{StopPrefix, StopReference};
use crate::model::{FeedEntity, FeedHeader, FeedMessage};
use crate::stats::FilterSummary;

/// A feed narrowed to the entities relevant to a stop prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredFeed {
    pub header: FeedHeader,
    pub entities: Vec<FeedEntity>,
    #[serde(skip)]
    pub summary: FilterSummary,
}

impl FilteredFeed {
    /// The pruned feed as a message that can be re-encoded.
    pub fn to_message(&self) -> FeedMessage {
        FeedMessage {
            header: self.header.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// Keeps the entities of `feed` that reference a matching stop.
///
/// Each entity is tried in three steps, stopping at the first that keeps it:
///
/// 1. its trip update, through the stop-time updates;
/// 2. its alert, through the informed entities;
/// 3. its vehicle position, which keeps the entity unconditionally.
///
/// Only the collection of the step that kept the entity is narrowed to the
/// matching elements. Every other field and payload is left as it was, and
/// stop references are only counted for the steps that ran.
pub fn prune_feed(feed: FeedMessage, prefix: &StopPrefix) -> FilteredFeed {
    let mut summary = FilterSummary {
        total_entities: feed.entities.len(),
        ..Default::default()
    };

    let entities: Vec<FeedEntity> = feed
        .entities
        .into_iter()
        .filter_map(|mut entity| retain_entity(&mut entity, prefix, &mut summary).then_some(entity))
        .collect();

    summary.kept_entities = entities.len();

    FilteredFeed {
        header: feed.header,
        entities,
        summary,
    }
}

fn retain_entity(entity: &mut FeedEntity, prefix: &StopPrefix, summary: &mut FilterSummary) -> bool {
    if let Some(trip_update) = &mut entity.trip_update {
        if narrow_to_matches(&mut trip_update.stop_time_updates, prefix, summary) {
            return true;
        }
    }
    if let Some(alert) = &mut entity.alert {
        if narrow_to_matches(&mut alert.informed_entities, prefix, summary) {
            return true;
        }
    }
    // vehicle positions carry no reliable stop reference
    entity.vehicle.is_some()
}

/// Counts the stop references in `items` and, if any matched, drops every
/// element that did not. Leaves `items` alone when nothing matched.
fn narrow_to_matches<T: StopReference>(
    items: &mut Vec<T>,
    prefix: &StopPrefix,
    summary: &mut FilterSummary,
) -> bool {
    let hits: Vec<bool> = items
        .iter()
        .map(|item| {
            let Some(stop_id) = item.stop_id() else {
                return false;
            };
            summary.total_stop_refs_checked += 1;
            let hit = prefix.matches(Some(stop_id));
            if hit {
                summary.kept_stop_refs += 1;
            }
            hit
        })
        .collect();

    if !hits.contains(&true) {
        return false;
    }
    let mut hits = hits.into_iter();
    items.retain(|_| hits.next().unwrap_or(false));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fixtures::{alert_entity, header, sample_feed, trip_entity, vehicle_entity};
    use crate::model::FeedEntity;

    fn trip_stop_ids(entity: &FeedEntity) -> Vec<String> {
        entity
            .trip_update
            .iter()
            .flat_map(|tu| &tu.stop_time_updates)
            .filter_map(|s| s.stop_id.clone())
            .collect()
    }

    fn alert_stop_ids(entity: &FeedEntity) -> Vec<String> {
        entity
            .alert
            .iter()
            .flat_map(|alert| &alert.informed_entities)
            .filter_map(|s| s.stop_id.clone())
            .collect()
    }

    fn stop_ids(entity: &FeedEntity) -> Vec<String> {
        let mut ids = trip_stop_ids(entity);
        ids.extend(alert_stop_ids(entity));
        ids
    }

    /// One entity carrying the trip update of `trip` and the alert of `alert`.
    fn combined(id: &str, trip: &[&str], alert: &[&str]) -> FeedEntity {
        FeedEntity {
            id: id.into(),
            alert: alert_entity(id, alert).alert,
            ..trip_entity(id, trip)
        }
    }

    #[test]
    fn test_sample_feed_scenario() {
        let filtered = prune_feed(sample_feed(), &StopPrefix::new("370"));

        assert_eq!(filtered.entities.len(), 2);
        assert_eq!(stop_ids(&filtered.entities[0]), vec!["3701"]);
        assert_eq!(stop_ids(&filtered.entities[1]), vec!["3705"]);
        assert_eq!(
            filtered.summary,
            FilterSummary {
                total_entities: 2,
                kept_entities: 2,
                total_stop_refs_checked: 3,
                kept_stop_refs: 2,
            }
        );
        assert_eq!(filtered.header.version, "2.0");
    }

    #[test]
    fn test_pruning_leaves_other_fields_untouched() {
        let feed = sample_feed();
        let original = feed.entities[0].clone();
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        let (Some(before), Some(after)) = (&original.trip_update, &filtered.entities[0].trip_update)
        else {
            panic!("expected trip updates");
        };
        assert_eq!(before.trip, after.trip);
        assert_eq!(before.timestamp, after.timestamp);
        assert_eq!(before.stop_time_updates[0], after.stop_time_updates[0]);
    }

    #[test]
    fn test_vehicle_positions_always_kept() {
        let feed = FeedMessage {
            header: header(),
            entities: vec![vehicle_entity("V1"), trip_entity("T1", &["1234"])],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        assert_eq!(filtered.entities.len(), 1);
        assert_eq!(filtered.entities[0].id, "V1");
        // vehicle pass-through does not count as a stop check
        assert_eq!(filtered.summary.total_stop_refs_checked, 1);
        assert_eq!(filtered.summary.kept_stop_refs, 0);
    }

    #[test]
    fn test_entities_without_payload_are_dropped() {
        let feed = FeedMessage {
            header: header(),
            entities: vec![FeedEntity {
                id: "empty".into(),
                is_deleted: Some(true),
                trip_update: None,
                vehicle: None,
                alert: None,
            }],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));
        assert!(filtered.entities.is_empty());
        assert_eq!(filtered.summary.total_entities, 1);
    }

    #[test]
    fn test_stop_time_updates_without_stop_id_are_not_counted() {
        let mut entity = trip_entity("T1", &["3701"]);
        if let Some(tu) = &mut entity.trip_update {
            tu.stop_time_updates.push(Default::default());
        }
        let feed = FeedMessage {
            header: header(),
            entities: vec![entity],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        assert_eq!(filtered.summary.total_stop_refs_checked, 1);
        assert_eq!(stop_ids(&filtered.entities[0]), vec!["3701"]);
    }

    #[test]
    fn test_unmatched_trip_update_with_vehicle_is_kept_whole() {
        let entity = FeedEntity {
            vehicle: vehicle_entity("TV").vehicle,
            ..trip_entity("TV", &["9999", "4000"])
        };
        let feed = FeedMessage {
            header: header(),
            entities: vec![entity.clone()],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        assert_eq!(filtered.entities, vec![entity]);
        assert_eq!(trip_stop_ids(&filtered.entities[0]), vec!["9999", "4000"]);
        assert_eq!(filtered.summary.total_stop_refs_checked, 2);
        assert_eq!(filtered.summary.kept_stop_refs, 0);
    }

    #[test]
    fn test_trip_update_match_skips_alert_step() {
        let feed = FeedMessage {
            header: header(),
            entities: vec![combined("TA", &["3701", "9999"], &["3705", "4000"])],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        let kept = &filtered.entities[0];
        assert_eq!(trip_stop_ids(kept), vec!["3701"]);
        // the alert rides along unchanged and unchecked
        assert_eq!(alert_stop_ids(kept), vec!["3705", "4000"]);
        assert_eq!(filtered.summary.total_stop_refs_checked, 2);
        assert_eq!(filtered.summary.kept_stop_refs, 1);
    }

    #[test]
    fn test_alert_step_runs_when_trip_update_misses() {
        let feed = FeedMessage {
            header: header(),
            entities: vec![combined("TA", &["9999"], &["3705", "4000"])],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        let kept = &filtered.entities[0];
        assert_eq!(trip_stop_ids(kept), vec!["9999"]);
        assert_eq!(alert_stop_ids(kept), vec!["3705"]);
        assert_eq!(
            filtered.summary,
            FilterSummary {
                total_entities: 1,
                kept_entities: 1,
                total_stop_refs_checked: 3,
                kept_stop_refs: 1,
            }
        );
    }

    #[test]
    fn test_zero_matches_keeps_header() {
        let feed = FeedMessage {
            header: header(),
            entities: vec![trip_entity("T1", &["1111"]), alert_entity("A1", &["2222"])],
        };
        let filtered = prune_feed(feed, &StopPrefix::new("370"));

        assert!(filtered.entities.is_empty());
        assert_eq!(filtered.summary.kept_entities, 0);
        assert_eq!(filtered.summary.total_stop_refs_checked, 2);
        assert_eq!(filtered.header, header());
    }

    #[test]
    fn test_counters_never_exceed_totals() {
        let feeds = vec![
            sample_feed(),
            FeedMessage {
                header: header(),
                entities: vec![
                    trip_entity("T1", &["3700", "3709", "4000"]),
                    alert_entity("A1", &["9999", "370X"]),
                    vehicle_entity("V1"),
                    trip_entity("T2", &[]),
                ],
            },
        ];

        let mut total = FilterSummary::default();
        for feed in feeds {
            let filtered = prune_feed(feed, &StopPrefix::new("370"));
            assert!(filtered.summary.kept_entities <= filtered.summary.total_entities);
            assert!(filtered.summary.kept_stop_refs <= filtered.summary.total_stop_refs_checked);
            for entity in &filtered.entities {
                assert!(stop_ids(entity).iter().all(|id| id.starts_with("370")));
            }
            total += filtered.summary;
        }

        assert_eq!(
            total,
            FilterSummary {
                total_entities: 6,
                kept_entities: 5,
                total_stop_refs_checked: 8,
                kept_stop_refs: 5,
            }
        );
    }
}
