//! Reading embedded capture metadata back out of an image file.

use exif::{In, Reader, Tag, Value};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::app_block::AppBlock;
use super::encode::dms_to_decimal;

/// The capture metadata found in a file's container.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WrittenMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,

    /// Raw EXIF timestamp ("YYYY:MM:DD HH:MM:SS")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time_original: Option<String>,

    /// Decimal degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Decimal degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Meters, negative below sea level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// EXIF orientation code (1-8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,

    /// Custom application block, when present and understood
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_block: Option<AppBlock>,
}

/// Read capture metadata from an image file.
///
/// Returns `None` if the file has no readable container. This is lenient:
/// individual tags that are missing or malformed are simply left empty.
pub fn read_metadata(path: &Path) -> Option<WrittenMetadata> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    Some(WrittenMetadata {
        make: get_ascii(&exif, Tag::Make),
        model: get_ascii(&exif, Tag::Model),
        software: get_ascii(&exif, Tag::Software),
        date_time_original: get_ascii(&exif, Tag::DateTimeOriginal)
            .or_else(|| get_ascii(&exif, Tag::DateTime)),
        latitude: get_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        longitude: get_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        altitude: get_altitude(&exif),
        orientation: get_u32(&exif, Tag::Orientation),
        app_block: get_app_block(&exif),
    })
}

/// First ASCII component of a field, without trailing NULs.
fn get_ascii(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()),
        _ => None,
    }
}

fn get_u32(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Short(v) => v.first().map(|&x| x as u32),
            Value::Long(v) => v.first().copied(),
            _ => None,
        })
}

fn get_gps_coord(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let coord = exif.get_field(coord_tag, In::PRIMARY)?;
    let reference = get_ascii(exif, ref_tag)?;
    match &coord.value {
        Value::Rational(rationals) => dms_to_decimal(rationals, &reference),
        _ => None,
    }
}

fn get_altitude(exif: &exif::Exif) -> Option<f64> {
    let altitude = match &exif.get_field(Tag::GPSAltitude, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0)?.to_f64(),
        _ => return None,
    };
    let below_sea_level = matches!(
        exif.get_field(Tag::GPSAltitudeRef, In::PRIMARY).map(|f| &f.value),
        Some(Value::Byte(v)) if v.first() == Some(&1)
    );
    Some(if below_sea_level { -altitude } else { altitude })
}

fn get_app_block(exif: &exif::Exif) -> Option<AppBlock> {
    match &exif.get_field(Tag::UserComment, In::PRIMARY)?.value {
        Value::Undefined(bytes, _) => match AppBlock::from_user_comment(bytes) {
            Ok(block) => block,
            Err(e) => {
                tracing::debug!("Ignoring application block: {e}");
                None
            }
        },
        _ => None,
    }
}
