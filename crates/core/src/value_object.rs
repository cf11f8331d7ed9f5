//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. A
/// commission tier or a date window is a value object: two tiers with the same
/// number, target and rate are interchangeable. A sales goal, by contrast, is
/// an aggregate with an identity that survives edits.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct DateWindow { start: DateTime<Utc>, end: DateTime<Utc> }
///
/// impl ValueObject for DateWindow {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
