//! Tolerant lookups into decoded notification payloads.
//!
//! Payloads are arbitrary [`serde_json::Value`] trees whose shape depends on the event family.
//! Everything here treats a missing key, a container of the wrong kind, or `null` as *absent*
//! rather than as an error. Only the helpers used by rules to assert a specific shape
//! ([`reference`] and [`items`]) report [`ExtractError`]s, and only for values that are present.

use std::{borrow::Cow, fmt, str::FromStr};

use derive_more::Display;
use serde_json::Value;

use crate::{Error, ExtractError, Result, LOG_TARGET};

/// Path segment that decodes the current string value as an embedded JSON document.
pub const EMBEDDED_SEGMENT: &str = "$json";

/// Field of an SNS notification envelope that carries the actual document as a string.
const SNS_MESSAGE_FIELD: &str = "Message";

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Segment {
    /// Object key.
    #[display(fmt = "{}", _0)]
    Key(String),
    /// Array index. Applied to an object, it is looked up as a key instead.
    #[display(fmt = "{}", _0)]
    Index(usize),
    /// Decode the current string value as JSON and continue inside it.
    #[display(fmt = "{}", EMBEDDED_SEGMENT)]
    Embedded,
}

/// A parsed sequence of [`Segment`]s, written as dotted text.
///
/// ```
/// # use aws_event_targets::navigator::Path;
/// let path = Path::parse("detail.requestParameters.instancesSet.items").unwrap();
/// assert_eq!(path.segments().len(), 4);
///
/// // Numeric segments index arrays, `$json` descends into a double-encoded document.
/// let path = Path::parse("Message.$json.Trigger.Dimensions.0").unwrap();
/// assert_eq!(path.to_string(), "Message.$json.Trigger.Dimensions.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse dotted path text.
    ///
    /// Returns [`Error::InvalidPath`] if the text is empty or has an empty segment.
    pub fn parse(text: &str) -> Result<Path> {
        let segments = text
            .split('.')
            .map(|segment| match segment {
                "" => Err(Error::InvalidPath {
                    path: text.to_owned(),
                }),
                EMBEDDED_SEGMENT => Ok(Segment::Embedded),
                _ if segment.bytes().all(|b| b.is_ascii_digit()) => Ok(segment
                    .parse()
                    .map(Segment::Index)
                    .unwrap_or_else(|_| Segment::Key(segment.to_owned()))),
                _ => Ok(Segment::Key(segment.to_owned())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Path { segments })
    }

    /// Segments in lookup order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns a new path with `other` appended to `self`.
    pub fn join(&self, other: &Path) -> Path {
        Path {
            segments: self
                .segments
                .iter()
                .chain(other.segments.iter())
                .cloned()
                .collect(),
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Look up the value at `path`.
///
/// Returns `None` if any segment is missing, a container has the wrong shape, an embedded
/// document cannot be decoded, or the final value is `null`. The result borrows from `payload`
/// unless the path passes through an embedded document.
pub fn get<'a>(payload: &'a Value, path: &Path) -> Option<Cow<'a, Value>> {
    let mut current = Cow::Borrowed(payload);
    for segment in path.segments() {
        current = match current {
            Cow::Borrowed(value) => match segment {
                Segment::Embedded => Cow::Owned(decode_embedded(value)?),
                _ => Cow::Borrowed(child(value, segment)?),
            },
            Cow::Owned(value) => match segment {
                Segment::Embedded => Cow::Owned(decode_embedded(&value)?),
                _ => Cow::Owned(take_child(value, segment)?),
            },
        };
    }

    (!current.is_null()).then_some(current)
}

fn child<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn take_child(value: Value, segment: &Segment) -> Option<Value> {
    match (value, segment) {
        (Value::Object(mut map), Segment::Key(key)) => map.remove(key),
        (Value::Object(mut map), Segment::Index(index)) => map.remove(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.into_iter().nth(*index),
        _ => None,
    }
}

/// Decode a string value holding a second, embedded JSON document.
///
/// Returns `None` if `value` is not a string, is not valid JSON, or decodes to `null`.
pub fn decode_embedded(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    match serde_json::from_str(text) {
        Ok(Value::Null) => None,
        Ok(decoded) => Some(decoded),
        Err(err) => {
            log::trace!(target: LOG_TARGET, error:display = err; "embedded document is not valid JSON");
            None
        }
    }
}

/// The document a notification is about.
///
/// SNS delivers the actual document double-encoded in the `Message` field of its envelope. If
/// that field decodes to an object, the decoded object is returned. Otherwise the payload is
/// assumed to already be the document.
pub fn notification_body(payload: &Value) -> Cow<'_, Value> {
    match payload.get(SNS_MESSAGE_FIELD).and_then(decode_embedded) {
        Some(body @ Value::Object(_)) => Cow::Owned(body),
        _ => Cow::Borrowed(payload),
    }
}

/// Coerce a scalar into a provider identifier.
///
/// Strings are trimmed and numbers are rendered in their JSON form. Blank strings and
/// non-scalars yield `None`.
pub fn reference_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read an identifier at `path`.
///
/// Absent and blank values are `Ok(None)`. A value that is present but is neither a string nor a
/// number is an [`ExtractError::UnexpectedShape`].
pub fn reference(payload: &Value, path: &Path) -> std::result::Result<Option<String>, ExtractError> {
    let Some(value) = get(payload, path) else {
        return Ok(None);
    };

    match value.as_ref() {
        Value::String(_) | Value::Number(_) => Ok(reference_value(&value)),
        _ => Err(ExtractError::UnexpectedShape {
            path: path.to_string(),
            expected: "string or number",
        }),
    }
}

/// Read the list at `path`.
///
/// An absent list is empty. A value that is present but is not a list is an
/// [`ExtractError::UnexpectedShape`]. Elements are returned as-is and may be of mixed types.
pub fn items<'a>(
    payload: &'a Value,
    path: &Path,
) -> std::result::Result<Cow<'a, [Value]>, ExtractError> {
    match get(payload, path) {
        None => Ok(Cow::Borrowed(&[])),
        Some(Cow::Borrowed(Value::Array(items))) => Ok(Cow::Borrowed(items.as_slice())),
        Some(Cow::Owned(Value::Array(items))) => Ok(Cow::Owned(items)),
        Some(_) => Err(ExtractError::UnexpectedShape {
            path: path.to_string(),
            expected: "list",
        }),
    }
}
