//! Snapshot → EXIF field conversion.

use chrono::Timelike;
use exif::{Context, Field, In, Rational, Tag, Value};
use std::io::Cursor;

use super::app_block::AppBlock;
use crate::types::{LocationFix, MetadataSnapshot};

/// Seconds are stored with 1/10000 arc-second resolution.
const SECONDS_DENOM: u32 = 10_000;

/// Altitude, speed and direction are stored with centi-unit resolution.
const CENTI: u32 = 100;

// Exif 2.31 timezone tags, addressed by number.
const OFFSET_TIME: Tag = Tag(Context::Exif, 0x9010);
const OFFSET_TIME_ORIGINAL: Tag = Tag(Context::Exif, 0x9011);
const GPS_H_POSITIONING_ERROR: Tag = Tag(Context::Gps, 0x001F);

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Tags the encoder regenerates from the layout. Never copied from an existing directory.
const STRUCTURAL_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Convert decimal degrees to unsigned degrees/minutes/seconds rationals.
///
/// The sign is dropped; it is carried by the hemisphere reference tag.
pub fn decimal_to_dms(value: f64) -> [Rational; 3] {
    let abs = value.abs();
    let mut degrees = abs.trunc() as u32;
    let minutes_full = (abs - abs.trunc()) * 60.0;
    let mut minutes = minutes_full.trunc() as u32;
    let mut seconds =
        ((minutes_full - minutes_full.trunc()) * 60.0 * SECONDS_DENOM as f64).round() as u32;

    // Rounding can carry a full minute (or degree) upward.
    if seconds >= 60 * SECONDS_DENOM {
        seconds -= 60 * SECONDS_DENOM;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    [
        Rational {
            num: degrees,
            denom: 1,
        },
        Rational {
            num: minutes,
            denom: 1,
        },
        Rational {
            num: seconds,
            denom: SECONDS_DENOM,
        },
    ]
}

/// Convert DMS rationals plus a hemisphere reference back to signed decimal degrees.
pub fn dms_to_decimal(dms: &[Rational], reference: &str) -> Option<f64> {
    if dms.len() < 3 || dms.iter().any(|r| r.denom == 0) {
        return None;
    }
    let magnitude = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;
    let sign = if reference.contains('S') || reference.contains('W') {
        -1.0
    } else {
        1.0
    };
    Some(sign * magnitude)
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rationals(tag: Tag, values: Vec<Rational>) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(values),
    }
}

fn centi(value: f64) -> Rational {
    Rational {
        num: (value.abs() * CENTI as f64).round() as u32,
        denom: CENTI,
    }
}

/// EXIF orientation code for a clockwise rotation, if it is a right angle.
pub fn orientation_for_rotation(degrees: u16) -> Option<u16> {
    match degrees % 360 {
        0 => Some(1),
        90 => Some(6),
        180 => Some(3),
        270 => Some(8),
        _ => None,
    }
}

/// Build every field the snapshot contributes to the container.
pub fn snapshot_fields(snapshot: &MetadataSnapshot) -> Result<Vec<Field>, serde_json::Error> {
    let captured = snapshot.captured_at;
    let datetime = captured.format(EXIF_DATETIME_FORMAT).to_string();

    let mut fields = vec![
        ascii(Tag::Make, &snapshot.device.manufacturer),
        ascii(Tag::Model, &snapshot.device.model),
        ascii(Tag::Software, &snapshot.device.os_version),
        ascii(Tag::DateTime, &datetime),
        ascii(Tag::DateTimeOriginal, &datetime),
        ascii(Tag::DateTimeDigitized, &datetime),
        ascii(
            Tag::SubSecTimeOriginal,
            &format!("{:03}", captured.timestamp_subsec_millis()),
        ),
        ascii(OFFSET_TIME, "+00:00"),
        ascii(OFFSET_TIME_ORIGINAL, "+00:00"),
        Field {
            tag: Tag::UserComment,
            ifd_num: In::PRIMARY,
            value: Value::Undefined(AppBlock::from_snapshot(snapshot).to_user_comment()?, 0),
        },
    ];

    if let Some(orientation) = snapshot
        .camera
        .rotation_degrees
        .and_then(orientation_for_rotation)
    {
        fields.push(Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![orientation]),
        });
    }

    if let Some(location) = &snapshot.location {
        fields.extend(gps_fields(location, snapshot));
    }

    Ok(fields)
}

fn gps_fields(location: &LocationFix, snapshot: &MetadataSnapshot) -> Vec<Field> {
    let captured = snapshot.captured_at;
    let mut fields = vec![
        Field {
            tag: Tag::GPSVersionID,
            ifd_num: In::PRIMARY,
            value: Value::Byte(vec![2, 3, 0, 0]),
        },
        ascii(
            Tag::GPSLatitudeRef,
            if location.latitude >= 0.0 { "N" } else { "S" },
        ),
        rationals(Tag::GPSLatitude, decimal_to_dms(location.latitude).to_vec()),
        ascii(
            Tag::GPSLongitudeRef,
            if location.longitude >= 0.0 { "E" } else { "W" },
        ),
        rationals(Tag::GPSLongitude, decimal_to_dms(location.longitude).to_vec()),
        ascii(Tag::GPSDateStamp, &captured.format("%Y:%m:%d").to_string()),
        rationals(
            Tag::GPSTimeStamp,
            [captured.hour(), captured.minute(), captured.second()]
                .into_iter()
                .map(|num| Rational { num, denom: 1 })
                .collect(),
        ),
    ];

    if let Some(altitude) = location.altitude.filter(|a| a.is_finite()) {
        fields.push(Field {
            tag: Tag::GPSAltitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Byte(vec![if altitude < 0.0 { 1 } else { 0 }]),
        });
        fields.push(rationals(Tag::GPSAltitude, vec![centi(altitude)]));
    }

    if let Some(speed) = location.speed.filter(|s| s.is_finite() && *s >= 0.0) {
        fields.push(ascii(Tag::GPSSpeedRef, "K"));
        fields.push(rationals(Tag::GPSSpeed, vec![centi(speed * 3.6)]));
    }

    if let Some(heading) = location.heading.filter(|h| h.is_finite()) {
        fields.push(ascii(Tag::GPSImgDirectionRef, "T"));
        fields.push(rationals(
            Tag::GPSImgDirection,
            vec![centi(heading.rem_euclid(360.0))],
        ));
    }

    if let Some(accuracy) = location
        .horizontal_accuracy
        .filter(|a| a.is_finite() && *a >= 0.0)
    {
        fields.push(rationals(GPS_H_POSITIONING_ERROR, vec![centi(accuracy)]));
    }

    fields
}

/// Combine an existing primary directory with freshly built fields.
///
/// Existing fields survive unless the fresh set replaces their tag, they are
/// structural, they live outside the primary image, or they carry a value type
/// the encoder cannot write. When `strip_gps` is set every existing GPS field
/// is dropped, so a snapshot without location never inherits a stale fix.
pub fn merge_fields(existing: Vec<Field>, fresh: Vec<Field>, strip_gps: bool) -> Vec<Field> {
    let mut merged: Vec<Field> = existing
        .into_iter()
        .filter(|field| field.ifd_num == In::PRIMARY)
        .filter(|field| !STRUCTURAL_TAGS.contains(&field.tag))
        .filter(|field| !matches!(field.value, Value::Unknown(..)))
        .filter(|field| !(strip_gps && matches!(field.tag.context(), Context::Gps)))
        .filter(|field| !fresh.iter().any(|f| f.tag == field.tag))
        .collect();
    merged.extend(fresh);
    merged
}

/// Serialize fields into a big-endian TIFF structure.
pub fn encode_tiff(fields: &[Field]) -> Result<Vec<u8>, exif::Error> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buffer = Cursor::new(Vec::new());
    writer.write(&mut buffer, false)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CameraContext, DeviceIdentity};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn snapshot(location: Option<LocationFix>) -> MetadataSnapshot {
        MetadataSnapshot {
            location,
            device: DeviceIdentity {
                manufacturer: "Google".into(),
                model: "Pixel 8".into(),
                os_version: "Android 15".into(),
            },
            camera: CameraContext {
                rotation_degrees: Some(90),
                ..CameraContext::default()
            },
            tilt: None,
            captured_at: Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 5).unwrap(),
            capture_latency_ms: 12,
            tags: BTreeMap::new(),
        }
    }

    fn find<'a>(fields: &'a [Field], tag: Tag) -> Option<&'a Field> {
        fields.iter().find(|f| f.tag == tag)
    }

    fn ascii_of(field: &Field) -> &[u8] {
        match &field.value {
            Value::Ascii(v) => v.first().map(Vec::as_slice).unwrap_or_default(),
            other => panic!("expected ASCII, got {other:?}"),
        }
    }

    #[test]
    fn test_dms_conversion_precision() {
        for value in [37.7749, -122.4194, 0.0, 89.99999, -0.000_01, 179.5] {
            let dms = decimal_to_dms(value);
            let reference = if value < 0.0 { "S" } else { "N" };
            let back = dms_to_decimal(&dms, reference).unwrap();
            assert!((back - value).abs() < 1e-6, "{value} -> {back}");
        }
    }

    #[test]
    fn test_dms_carries_rounded_seconds() {
        // 59.99999999 arc-seconds rounds up to a whole minute
        let value = 10.0 + 59.0 / 60.0 + 59.999_999_99 / 3600.0;
        let dms = decimal_to_dms(value);
        assert_eq!(dms[0].num, 11);
        assert_eq!(dms[1].num, 0);
        assert_eq!(dms[2].num, 0);
    }

    #[test]
    fn test_dms_rejects_short_or_zero_denominator() {
        assert!(dms_to_decimal(&[Rational { num: 1, denom: 1 }], "N").is_none());
        let bad = [
            Rational { num: 1, denom: 1 },
            Rational { num: 1, denom: 0 },
            Rational { num: 1, denom: 1 },
        ];
        assert!(dms_to_decimal(&bad, "N").is_none());
    }

    #[test]
    fn test_hemisphere_references() {
        let fields = snapshot_fields(&snapshot(Some(LocationFix::new(-33.8688, 151.2093)))).unwrap();
        let lat_ref = find(&fields, Tag::GPSLatitudeRef).unwrap();
        let lon_ref = find(&fields, Tag::GPSLongitudeRef).unwrap();
        assert_eq!(ascii_of(lat_ref), b"S");
        assert_eq!(ascii_of(lon_ref), b"E");
    }

    #[test]
    fn test_no_gps_without_location() {
        let fields = snapshot_fields(&snapshot(None)).unwrap();
        assert!(fields
            .iter()
            .all(|f| !matches!(f.tag.context(), Context::Gps)));
        assert!(find(&fields, Tag::Make).is_some());
        assert!(find(&fields, Tag::UserComment).is_some());
    }

    #[test]
    fn test_optional_gps_fields() {
        let fix = LocationFix {
            altitude: Some(-12.5),
            speed: Some(10.0),
            heading: Some(-90.0),
            ..LocationFix::new(1.0, 2.0)
        };
        let fields = snapshot_fields(&snapshot(Some(fix))).unwrap();

        assert!(matches!(
            &find(&fields, Tag::GPSAltitudeRef).unwrap().value,
            Value::Byte(v) if v == &[1]
        ));
        match &find(&fields, Tag::GPSSpeed).unwrap().value {
            Value::Rational(v) => assert!((v[0].to_f64() - 36.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        match &find(&fields, Tag::GPSImgDirection).unwrap().value {
            Value::Rational(v) => assert!((v[0].to_f64() - 270.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_timestamps_and_orientation() {
        let fields = snapshot_fields(&snapshot(None)).unwrap();
        assert_eq!(
            ascii_of(find(&fields, Tag::DateTimeOriginal).unwrap()),
            b"2024:03:15 14:30:05"
        );
        assert!(matches!(
            &find(&fields, Tag::Orientation).unwrap().value,
            Value::Short(v) if v == &[6]
        ));
        assert_eq!(orientation_for_rotation(45), None);
        assert_eq!(orientation_for_rotation(450), Some(6));
    }

    #[test]
    fn test_merge_replaces_and_preserves() {
        let existing = vec![
            ascii(Tag::Make, "OldMake"),
            ascii(Tag::Artist, "Jane"),
            ascii(Tag::GPSLatitudeRef, "N"),
            Field {
                tag: Tag::ExifIFDPointer,
                ifd_num: In::PRIMARY,
                value: Value::Long(vec![100]),
            },
            Field {
                tag: Tag::Compression,
                ifd_num: In::THUMBNAIL,
                value: Value::Short(vec![6]),
            },
        ];
        let fresh = vec![ascii(Tag::Make, "Google")];

        let merged = merge_fields(existing, fresh, true);
        let tags: Vec<Tag> = merged.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![Tag::Artist, Tag::Make]);
        assert_eq!(ascii_of(&merged[1]), b"Google");
    }

    #[test]
    fn test_encode_tiff_header() {
        let fields = snapshot_fields(&snapshot(Some(LocationFix::new(37.7749, -122.4194)))).unwrap();
        let tiff = encode_tiff(&fields).unwrap();
        assert_eq!(&tiff[..4], b"MM\0\x2a");
    }
}
