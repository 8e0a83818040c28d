//! Field-by-field copying between records

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{ConversionPolicy, CoercionRegistry, FieldSpec, Record};
use crate::document::{is_zero, Document};
use crate::error::ConversionError;

/// Copies same-named fields from one [`Record`] into another.
///
/// For each destination field with a same-named source field:
///
/// - equal kinds are copied verbatim;
/// - a registered kind pair is coerced through the [`CoercionRegistry`];
/// - any other pair is skipped and the destination keeps its value.
///
/// A `null` source value is copied only into nullable destinations.
/// Coercion failures, and copied values that do not deserialize into the
/// destination field's type, follow the [`ConversionPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Copier {
    registry: CoercionRegistry,
    policy: ConversionPolicy,
    ignore_empty: bool,
    skip: HashSet<String>,
}

impl Copier {
    /// A copier with the default coercions and best-effort policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the coercion registry.
    #[must_use]
    pub fn with_registry(mut self, registry: CoercionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the conversion policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Leave destination fields untouched when the source value is zero.
    #[must_use]
    pub fn ignore_empty(mut self, ignore: bool) -> Self {
        self.ignore_empty = ignore;
        self
    }

    /// Never copy the named fields.
    #[must_use]
    pub fn skip_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(fields.into_iter().map(Into::into));
        self
    }

    /// The coercion registry in use.
    #[must_use]
    pub fn registry(&self) -> &CoercionRegistry {
        &self.registry
    }

    /// The conversion policy in use.
    #[must_use]
    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    /// Build a new `D` from `src`, starting from `D::default()`.
    ///
    /// # Errors
    ///
    /// Fails on (de)serialization errors, or on a coercion failure under
    /// [`ConversionPolicy::Strict`].
    pub fn copy<S: Record, D: Record>(&self, src: &S) -> Result<D, ConversionError> {
        let mut dst = D::default();
        self.copy_into(src, &mut dst)?;
        Ok(dst)
    }

    /// Copy fields of `src` over an existing `dst`.
    ///
    /// # Errors
    ///
    /// Same as [`copy`](Self::copy). `dst` is unchanged on error.
    pub fn copy_into<S: Record, D: Record>(&self, src: &S, dst: &mut D) -> Result<(), ConversionError> {
        let src_map = to_map(src)?;
        let base = to_map(&*dst)?;
        let mut out = base.clone();
        let mut written: Vec<(&'static FieldSpec, &'static FieldSpec)> = Vec::new();

        for target in D::fields() {
            if self.skip.contains(target.name) {
                continue;
            }
            let Some(source) = S::fields().iter().find(|f| f.name == target.name) else {
                continue;
            };
            let Some(value) = src_map.get(target.name) else {
                continue;
            };
            if self.ignore_empty && is_zero(value) {
                continue;
            }

            if let Some(converted) = self.convert_field(source, target, value)? {
                out.insert(target.name.to_string(), converted);
                written.push((source, target));
            }
        }

        *dst = match serde_json::from_value(Value::Object(out.clone())) {
            Ok(value) => value,
            Err(_) => self.settle(base, &out, &written)?,
        };
        Ok(())
    }

    // Re-applies written fields one at a time over `base`, which is known to
    // deserialize, to find the ones that do not fit the destination type.
    fn settle<D: Record>(
        &self,
        mut accepted: Document,
        out: &Document,
        written: &[(&'static FieldSpec, &'static FieldSpec)],
    ) -> Result<D, ConversionError> {
        for (source, target) in written {
            let Some(value) = out.get(target.name) else {
                continue;
            };
            let previous = accepted.insert(target.name.to_string(), value.clone());

            let Err(e) = serde_json::from_value::<D>(Value::Object(accepted.clone())) else {
                continue;
            };
            let err = ConversionError::Field {
                field: target.name.to_string(),
                from: source.kind.to_string(),
                to: target.kind.to_string(),
                message: e.to_string(),
            };
            match self.policy {
                ConversionPolicy::Strict => return Err(err),
                ConversionPolicy::BestEffort => {
                    tracing::warn!(error = %err, "Copied value does not fit destination, keeping destination value");
                    match previous {
                        Some(v) => accepted.insert(target.name.to_string(), v),
                        None => accepted.remove(target.name),
                    };
                }
            }
        }

        from_map(accepted)
    }

    fn convert_field(
        &self,
        source: &FieldSpec,
        target: &FieldSpec,
        value: &Value,
    ) -> Result<Option<Value>, ConversionError> {
        if value.is_null() {
            return Ok(target.nullable.then_some(Value::Null));
        }
        if source.kind == target.kind {
            return Ok(Some(value.clone()));
        }

        match self.registry.coerce(source.kind, target.kind, value) {
            None => {
                tracing::debug!(
                    field = target.name,
                    from = %source.kind,
                    to = %target.kind,
                    "No coercion registered, field skipped"
                );
                Ok(None)
            }
            Some(Ok(converted)) => Ok(Some(converted)),
            Some(Err(message)) => {
                let err = ConversionError::Field {
                    field: target.name.to_string(),
                    from: source.kind.to_string(),
                    to: target.kind.to_string(),
                    message,
                };
                match self.policy {
                    ConversionPolicy::Strict => Err(err),
                    ConversionPolicy::BestEffort => {
                        tracing::warn!(error = %err, "Field conversion failed, keeping destination value");
                        Ok(None)
                    }
                }
            }
        }
    }
}

/// Copy `src` into a new `D` with the default coercions and best-effort
/// policy.
///
/// # Errors
///
/// Fails only on (de)serialization errors.
pub fn copy<S: Record, D: Record>(src: &S) -> Result<D, ConversionError> {
    Copier::default().copy(src)
}

fn to_map<T: Serialize>(value: &T) -> Result<Document, ConversionError> {
    let type_name = std::any::type_name::<T>();
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConversionError::Serialize {
            type_name,
            message: "not a struct".to_string(),
        }),
        Err(e) => Err(ConversionError::Serialize {
            type_name,
            message: e.to_string(),
        }),
    }
}

fn from_map<T: DeserializeOwned>(map: Document) -> Result<T, ConversionError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| ConversionError::Deserialize {
        type_name: std::any::type_name::<T>(),
        message: e.to_string(),
    })
}
