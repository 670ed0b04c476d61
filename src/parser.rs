//! Protobuf decoding and encoding for GTFS Realtime feeds.

use prost::Message;
use tracing::debug;

use crate::archive::NamedBuffer;
use crate::error::{PipelineError, Result};
use crate::gtfs_rt;
use crate::model::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`gtfs_rt::FeedMessage`] from raw bytes.
pub fn parse_feed(bytes: &[u8]) -> std::result::Result<gtfs_rt::FeedMessage, prost::DecodeError> {
    gtfs_rt::FeedMessage::decode(bytes)
}

/// Decodes one named buffer into the feed model.
///
/// # Errors
///
/// Returns [`PipelineError::Decode`] tagged with the buffer's name if the
/// bytes are not valid protobuf for a `FeedMessage`.
pub fn decode_buffer(buffer: &NamedBuffer) -> Result<FeedMessage> {
    let wire = parse_feed(&buffer.bytes).map_err(|source| PipelineError::Decode {
        name: buffer.name.clone(),
        source,
    })?;
    debug!(
        buffer = %buffer.name,
        entity_count = wire.entity.len(),
        "Feed decoded"
    );
    Ok(wire.into())
}

/// Encodes a feed with the GTFS-Realtime wire schema.
pub fn encode_feed(feed: &FeedMessage) -> Vec<u8> {
    gtfs_rt::FeedMessage::from(feed.clone()).encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_decode_empty_buffer_yields_empty_feed() {
        let feed = decode_buffer(&NamedBuffer {
            name: "empty.pb".into(),
            bytes: Bytes::new(),
        })
        .unwrap();
        assert!(feed.header.version.is_empty());
        assert!(feed.entities.is_empty());
    }

    #[test]
    fn test_decode_buffer_error_is_tagged_with_name() {
        let buffer = NamedBuffer {
            name: "alerts.pb".into(),
            bytes: Bytes::from_static(&[0xFF, 0xFE, 0x00, 0x01]),
        };
        match decode_buffer(&buffer) {
            Err(PipelineError::Decode { name, .. }) => assert_eq!(name, "alerts.pb"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_valid_minimal_feed() {
        use crate::gtfs_rt::{FeedHeader, FeedMessage};

        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                timestamp: Some(1234567890),
                incrementality: None,
                feed_version: None,
            },
            entity: vec![],
        };
        let buffer = NamedBuffer {
            name: "feed.pb".into(),
            bytes: Bytes::from(feed.encode_to_vec()),
        };

        let parsed = decode_buffer(&buffer).unwrap();
        assert_eq!(parsed.header.version, "2.0");
        assert_eq!(parsed.header.timestamp, Some(1234567890));
        assert!(parsed.header.incrementality.is_none());
    }

    #[test]
    fn test_encode_then_decode_keeps_entities() {
        use crate::model::{FeedEntity, FeedHeader, StopTimeUpdate, TripUpdate};

        let feed = crate::model::FeedMessage {
            header: FeedHeader {
                version: "2.0".into(),
                ..Default::default()
            },
            entities: vec![FeedEntity {
                id: "t1".into(),
                is_deleted: None,
                trip_update: Some(TripUpdate {
                    stop_time_updates: vec![StopTimeUpdate {
                        stop_id: Some("3701".into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                vehicle: None,
                alert: None,
            }],
        };

        let bytes = encode_feed(&feed);
        let decoded = decode_buffer(&NamedBuffer {
            name: "feed.pb".into(),
            bytes: Bytes::from(bytes),
        })
        .unwrap();
        assert_eq!(decoded, feed);
    }
}
