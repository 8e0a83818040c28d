//! Model⇄Entity conversion
//!
//! Persisted models and domain entities are usually the same record in two
//! shapes: a model stores a [`RecordId`] and `DateTime` timestamps, while the
//! entity exposes the id as a string and timestamps as epoch milliseconds.
//!
//! Types taking part in conversion implement [`Record`], which lists every
//! field with its [`FieldKind`]. The [`record!`](crate::record) macro derives
//! that list from the struct definition:
//!
//! ```rust
//! use acton_docstore::convert::{copy, FieldKind, Record};
//! use acton_docstore::ids::RecordId;
//! use acton_docstore::time::UnixTime;
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! acton_docstore::record! {
//!     #[derive(Debug, Default, Serialize, Deserialize)]
//!     pub struct UserModel {
//!         pub id: RecordId,
//!         pub name: String,
//!         pub created_at: DateTime<Utc>,
//!     }
//! }
//!
//! acton_docstore::record! {
//!     #[derive(Debug, Default, Serialize, Deserialize)]
//!     pub struct User {
//!         pub id: String,
//!         pub name: String,
//!         pub created_at: UnixTime,
//!     }
//! }
//!
//! assert_eq!(UserModel::fields()[2].kind, FieldKind::Timestamp);
//!
//! let model = UserModel { id: RecordId::new(), name: "ada".into(), created_at: Utc::now() };
//! let user: User = copy(&model).unwrap();
//! assert_eq!(user.id, model.id.to_string());
//! assert_eq!(user.created_at.millis(), model.created_at.timestamp_millis());
//! ```
//!
//! Field names must match the serialized keys; `#[serde(rename)]` on a
//! field breaks the correspondence.

mod copier;
mod registry;

pub use copier::{copy, Copier};
pub use registry::{Coercion, CoercionRegistry};

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConversionError;
use crate::ids::RecordId;
use crate::time::UnixTime;

/// Semantic kind of a serialized field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// [`RecordId`], serialized as its canonical string
    Id,
    /// Free text
    Text,
    /// `DateTime<Utc>`, serialized as RFC 3339
    Timestamp,
    /// [`UnixTime`], serialized as epoch milliseconds
    Millis,
    /// Any integer
    Integer,
    /// Any float
    Float,
    /// Boolean
    Bool,
    /// Sequence
    List,
    /// Map or nested document
    Object,
    /// Caller-defined kind
    Custom(&'static str),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Millis => write!(f, "millis"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::List => write!(f, "list"),
            Self::Object => write!(f, "object"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Maps a Rust type to its [`FieldKind`].
///
/// Implement for your own field types, typically with
/// [`FieldKind::Custom`], and register coercions for them.
pub trait FieldType {
    /// Kind of the serialized value
    const KIND: FieldKind;
    /// Whether the value may serialize as `null`
    const NULLABLE: bool = false;
}

macro_rules! field_type {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::$kind;
        })+
    };
}

field_type!(Id => RecordId);
field_type!(Text => String, char);
field_type!(Timestamp => DateTime<Utc>);
field_type!(Millis => UnixTime);
field_type!(Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
field_type!(Float => f32, f64);
field_type!(Bool => bool);
field_type!(Object => Value, Map<String, Value>);

impl<T> FieldType for Vec<T> {
    const KIND: FieldKind = FieldKind::List;
}

impl<V> FieldType for HashMap<String, V> {
    const KIND: FieldKind = FieldKind::Object;
}

impl<V> FieldType for BTreeMap<String, V> {
    const KIND: FieldKind = FieldKind::Object;
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;
}

/// A field name with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Serialized field name
    pub name: &'static str,
    /// Field kind
    pub kind: FieldKind,
    /// Whether `null` is a valid value
    pub nullable: bool,
}

impl FieldSpec {
    /// Describe a field of type `T`.
    #[must_use]
    pub const fn of<T: FieldType>(name: &'static str) -> Self {
        Self {
            name,
            kind: T::KIND,
            nullable: T::NULLABLE,
        }
    }
}

/// A serializable struct with a field descriptor.
///
/// Usually declared with [`record!`](crate::record).
pub trait Record: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Every serialized field, in declaration order
    fn fields() -> &'static [FieldSpec];
}

/// Declares a struct and implements [`Record`] for it.
///
/// Attributes (including derives) pass through unchanged; the struct must
/// derive or implement `Serialize`, `Deserialize` and `Default`. Every field
/// type must implement [`FieldType`].
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::convert::Record for $name {
            fn fields() -> &'static [$crate::convert::FieldSpec] {
                const FIELDS: &[$crate::convert::FieldSpec] = &[
                    $($crate::convert::FieldSpec::of::<$ty>(::std::stringify!($field))),*
                ];
                FIELDS
            }
        }
    };
}

/// How conversion failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPolicy {
    /// Log the failure and keep the destination field's current value
    #[default]
    BestEffort,
    /// Return the failure as an error
    Strict,
}

/// Converts between a persisted model `M` and a domain entity `E`.
///
/// Implement this when the field-by-field [`Copier`] is not enough. An
/// injected converter takes precedence over the copier.
pub trait ModelConverter<M, E>: Send + Sync {
    /// Entity to model
    fn to_model(&self, entity: E) -> Result<M, ConversionError>;

    /// Model to entity
    fn to_entity(&self, model: M) -> Result<E, ConversionError>;

    /// Models to entities
    fn to_entities(&self, models: Vec<M>) -> Result<Vec<E>, ConversionError> {
        models.into_iter().map(|m| self.to_entity(m)).collect()
    }

    /// Entities to models
    fn to_models(&self, entities: Vec<E>) -> Result<Vec<M>, ConversionError> {
        entities.into_iter().map(|e| self.to_model(e)).collect()
    }
}

impl<M: Record, E: Record> ModelConverter<M, E> for Copier {
    fn to_model(&self, entity: E) -> Result<M, ConversionError> {
        self.copy(&entity)
    }

    fn to_entity(&self, model: M) -> Result<E, ConversionError> {
        self.copy(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    crate::record! {
        #[derive(Debug, Default, Serialize, Deserialize)]
        pub struct Sample {
            pub id: RecordId,
            #[serde(default)]
            pub label: Option<String>,
            pub at: DateTime<Utc>,
            pub seen: UnixTime,
            pub hits: u32,
            pub ratio: f64,
            pub flags: Vec<bool>,
            pub meta: Value,
        }
    }

    #[test]
    fn test_record_fields() {
        let fields = Sample::fields();
        let kinds: Vec<_> = fields.iter().map(|f| (f.name, f.kind, f.nullable)).collect();
        assert_eq!(
            kinds,
            vec![
                ("id", FieldKind::Id, false),
                ("label", FieldKind::Text, true),
                ("at", FieldKind::Timestamp, false),
                ("seen", FieldKind::Millis, false),
                ("hits", FieldKind::Integer, false),
                ("ratio", FieldKind::Float, false),
                ("flags", FieldKind::List, false),
                ("meta", FieldKind::Object, false),
            ]
        );
    }

    #[test]
    fn test_field_kind_display() {
        assert_eq!(FieldKind::Timestamp.to_string(), "timestamp");
        assert_eq!(FieldKind::Custom("money").to_string(), "money");
    }

    struct Upper;

    impl ModelConverter<Sample, Sample> for Upper {
        fn to_model(&self, mut entity: Sample) -> Result<Sample, ConversionError> {
            entity.label = entity.label.map(|l| l.to_uppercase());
            Ok(entity)
        }

        fn to_entity(&self, model: Sample) -> Result<Sample, ConversionError> {
            Ok(model)
        }
    }

    #[test]
    fn test_model_converter_batch_defaults() {
        let samples = vec![
            Sample {
                label: Some("a".into()),
                ..Default::default()
            },
            Sample::default(),
        ];
        let models = Upper.to_models(samples).unwrap();
        assert_eq!(models[0].label.as_deref(), Some("A"));
        assert_eq!(models[1].label, None);
    }

    #[test]
    fn test_copier_as_converter() {
        let converter: &dyn ModelConverter<Sample, Sample> = &Copier::default();
        let s = Sample {
            hits: 3,
            ..Default::default()
        };
        let m = converter.to_model(s).unwrap();
        assert_eq!(m.hits, 3);
    }
}
