use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::tracker::{
    channel_from_track_name, parse_timestamp, GeoPoint, InboundEvent, PositionSample,
    SegmentBatch, TrackMetadata, TrackerError,
};

/// Body of a `position` event.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PositionEvent {
    pub lon: f64,
    pub lat: f64,
    pub timestamp: String,
    #[serde(default, deserialize_with = "heading_field")]
    pub heading: Option<f64>,
    #[serde(default, deserialize_with = "id_field")]
    pub track_pk: Option<String>,
    #[serde(default)]
    pub track_hexcolor: Option<String>,
}

impl PositionEvent {
    pub fn into_sample(self, channel: &str) -> Result<PositionSample, TrackerError> {
        Ok(PositionSample {
            channel: channel.to_string(),
            longitude: self.lon,
            latitude: self.lat,
            timestamp: parse_timestamp(&self.timestamp)?,
            heading: self.heading,
            track_pk: self.track_pk,
            track_hexcolor: self.track_hexcolor.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// One track from the map server: coordinate blocks with parallel time blocks.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackRecord {
    pub coords: Vec<Vec<Vec<f64>>>,
    pub times: Vec<Vec<String>>,
    #[serde(default)]
    pub color: Option<String>,
}

impl TrackRecord {
    pub fn into_batch(self) -> Result<SegmentBatch, TrackerError> {
        let coords = self
            .coords
            .into_iter()
            .enumerate()
            .map(|(index, block)| block_points(index, block))
            .collect();
        let times = self
            .times
            .iter()
            .map(|block| {
                block
                    .iter()
                    .map(|value| parse_timestamp(value))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SegmentBatch { coords, times })
    }

    pub fn into_metadata(self, track_pk: &str) -> Result<TrackMetadata, TrackerError> {
        let color = self.color.clone().filter(|c| !c.trim().is_empty());
        Ok(TrackMetadata {
            track_pk: track_pk.to_string(),
            color,
            segments: self.into_batch()?,
        })
    }
}

/// Stream payloads are either a single position or a block of segments.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WirePayload {
    Segment(TrackRecord),
    Point(PositionEvent),
}

impl WirePayload {
    pub fn into_event(self, channel: &str) -> Result<InboundEvent, TrackerError> {
        match self {
            WirePayload::Segment(record) => Ok(InboundEvent::Segment(record.into_batch()?)),
            WirePayload::Point(event) => Ok(InboundEvent::Point(event.into_sample(channel)?)),
        }
    }
}

/// The map server answers with an array; anything but exactly one track is no data.
pub fn decode_track(
    track_pk: &str,
    records: Option<Vec<TrackRecord>>,
) -> Result<Option<TrackMetadata>, TrackerError> {
    match records {
        Some(mut records) if records.len() == 1 => {
            let record = records.remove(0);
            record.into_metadata(track_pk).map(Some)
        }
        _ => Ok(None),
    }
}

/// Resolves the active-position snapshot to samples, skipping bad records.
pub fn decode_active_positions(
    snapshot: Option<BTreeMap<String, serde_json::Value>>,
) -> Vec<PositionSample> {
    snapshot
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(track_name, record)| {
            let channel = channel_from_track_name(&track_name);
            let sample = serde_json::from_value::<PositionEvent>(record)
                .map_err(|e| e.to_string())
                .and_then(|event| event.into_sample(channel).map_err(|e| e.to_string()));
            match sample {
                Ok(sample) => Some(sample),
                Err(e) => {
                    log::warn!("Skipping active position for {}: {}", track_name, e);
                    None
                }
            }
        })
        .collect()
}

// A block ends at its first malformed coordinate so the rest stays aligned
// with its timestamps.
fn block_points(index: usize, block: Vec<Vec<f64>>) -> Vec<GeoPoint> {
    let total = block.len();
    let points: Vec<GeoPoint> = block
        .into_iter()
        .map_while(|coord| match coord.as_slice() {
            [lon, lat, ..] => Some(GeoPoint::new(*lon, *lat)),
            _ => None,
        })
        .collect();
    if points.len() != total {
        log::warn!(
            "Track block {} has a malformed coordinate at {}, keeping {} of {}",
            index,
            points.len(),
            points.len(),
            total
        );
    }
    points
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Headings arrive as numbers, numeric strings, or "" for none.
fn heading_field<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(v)) if v.is_finite() => Some(v),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn id_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(v)) if v.fract() == 0.0 => Some(format!("{}", v as i64)),
        Some(NumberOrText::Number(v)) => Some(v.to_string()),
        Some(NumberOrText::Text(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(json: &str) -> PositionEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn heading_accepts_number_string_and_empty() {
        let base = r#""lon": 10, "lat": 20, "timestamp": "2017-06-01T12:00:00Z""#;
        assert_eq!(
            point(&format!("{{{}, \"heading\": 1.5}}", base)).heading,
            Some(1.5)
        );
        assert_eq!(
            point(&format!("{{{}, \"heading\": \"0.25\"}}", base)).heading,
            Some(0.25)
        );
        assert_eq!(point(&format!("{{{}, \"heading\": \"\"}}", base)).heading, None);
        assert_eq!(point(&format!("{{{}, \"heading\": null}}", base)).heading, None);
        assert_eq!(point(&format!("{{{}}}", base)).heading, None);
    }

    #[test]
    fn track_pk_may_be_numeric() {
        let event = point(
            r#"{"lon": 1, "lat": 2, "timestamp": "2017-06-01T12:00:00Z", "track_pk": 42, "track_hexcolor": "ff0000"}"#,
        );
        assert_eq!(event.track_pk.as_deref(), Some("42"));
        let sample = event.into_sample("rover1").unwrap();
        assert_eq!(sample.channel, "rover1");
        assert_eq!(sample.track_hexcolor.as_deref(), Some("ff0000"));
    }

    #[test]
    fn payload_shape_selects_variant() {
        let point: WirePayload =
            serde_json::from_str(r#"{"lon": 1, "lat": 2, "timestamp": "2017-06-01T12:00:00Z"}"#)
                .unwrap();
        assert!(matches!(
            point.into_event("rover1").unwrap(),
            InboundEvent::Point(_)
        ));

        let segment: WirePayload = serde_json::from_str(
            r#"{"coords": [[[1, 2], [3, 4]]], "times": [["2017-06-01T12:00:00Z", "2017-06-01T12:00:01Z"]]}"#,
        )
        .unwrap();
        match segment.into_event("rover1").unwrap() {
            InboundEvent::Segment(batch) => {
                assert_eq!(batch.coords[0].len(), 2);
                assert_eq!(batch.times[0].len(), 2);
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn track_response_needs_exactly_one_record() {
        let record = TrackRecord {
            coords: vec![vec![vec![1.0, 2.0]]],
            times: vec![vec!["2017-06-01T12:00:00Z".into()]],
            color: Some("00ff00".into()),
        };
        assert!(decode_track("7", None).unwrap().is_none());
        assert!(decode_track("7", Some(vec![])).unwrap().is_none());
        assert!(decode_track("7", Some(vec![record.clone(), record.clone()]))
            .unwrap()
            .is_none());

        let metadata = decode_track("7", Some(vec![record])).unwrap().unwrap();
        assert_eq!(metadata.track_pk, "7");
        assert_eq!(metadata.color.as_deref(), Some("00ff00"));
        assert_eq!(metadata.segments.coords.len(), 1);
    }

    #[test]
    fn malformed_coordinate_ends_block() {
        let record = TrackRecord {
            coords: vec![vec![vec![1.0, 2.0], vec![3.0], vec![5.0, 6.0]]],
            times: vec![vec![]],
            color: None,
        };
        let batch = record.into_batch().unwrap();
        assert_eq!(batch.coords[0], vec![GeoPoint::new(1.0, 2.0)]);
    }

    #[test]
    fn active_positions_resolve_channel_from_track_name() {
        let snapshot: BTreeMap<String, serde_json::Value> = serde_json::from_str(
            r#"{
                "20170601A_EV1": {"lon": 1, "lat": 2, "timestamp": "2017-06-01T12:00:00Z"},
                "rover2": {"lon": 3, "lat": 4, "timestamp": "2017-06-01T12:00:00Z"},
                "bad_EV2": {"lon": 3, "lat": 4, "timestamp": "never"}
            }"#,
        )
        .unwrap();

        let samples = decode_active_positions(Some(snapshot));
        let channels: Vec<_> = samples.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(channels, vec!["EV1", "rover2"]);
        assert!(decode_active_positions(None).is_empty());
    }

    #[test]
    fn malformed_active_record_does_not_drop_the_others() {
        let snapshot: Option<BTreeMap<String, serde_json::Value>> = serde_json::from_str(
            r#"{
                "A_EV1": {"lon": 1, "lat": 2, "timestamp": "2017-06-01T12:00:00Z"},
                "A_EV2": {"lon": null, "lat": 2, "timestamp": "2017-06-01T12:00:00Z"},
                "A_EV3": "not a record"
            }"#,
        )
        .unwrap();

        let samples = decode_active_positions(snapshot);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].channel, "EV1");
        assert_eq!(samples[0].longitude, 1.0);
    }
}
