//! Ordered parameter collections.
//!
//! [`FitParameters`] is the ordered, name-unique set of [`FitParameter`]s a fit
//! runs over. [`ParameterMap`] is the plain name → value view handed to the
//! model evaluator and returned in results; it keeps insertion order.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parameters::parameter::{FitParameter, ParameterError};

/// Insertion-ordered mapping from parameter name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: Vec<(String, f64)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace a value. Replacing keeps the original position.
    pub fn insert(&mut self, name: &str, value: f64) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    /// Look up a value, failing with [`ParameterError::ParameterNotFound`].
    pub fn require(&self, name: &str) -> Result<f64, ParameterError> {
        self.get(name).ok_or_else(|| ParameterError::ParameterNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl Serialize for ParameterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ParameterMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of parameter names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = ParameterMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, f64>()? {
                    map.insert(&name, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Ordered set of fit parameters with unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitParameters {
    params: Vec<FitParameter>,
}

impl FitParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, rejecting duplicate names.
    pub fn from_vec(params: Vec<FitParameter>) -> Result<Self, ParameterError> {
        let mut set = Self::new();
        for param in params {
            set.add(param)?;
        }
        Ok(set)
    }

    /// Append a parameter. Names must be unique.
    pub fn add(&mut self, param: FitParameter) -> Result<(), ParameterError> {
        if self.contains(param.name()) {
            return Err(ParameterError::DuplicateName {
                name: param.name().to_string(),
            });
        }
        self.params.push(param);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FitParameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FitParameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FitParameter> {
        self.params.iter()
    }

    /// Positions of the free (non-fixed) parameters, in order.
    pub fn free_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_fixed())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.params.iter().filter(|p| !p.is_fixed()).count()
    }

    /// Current values of all parameters, in order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Name → value view of the current values.
    pub fn to_map(&self) -> ParameterMap {
        self.params.iter().map(|p| (p.name(), p.value())).collect()
    }

    /// Copy with the given values applied to every parameter.
    ///
    /// Values are clamped into each parameter's bounds; fixed parameters keep
    /// their current value whatever is passed for them.
    pub fn with_values(&self, values: &[f64]) -> Result<Self, ParameterError> {
        if values.len() != self.params.len() {
            return Err(ParameterError::CountMismatch {
                expected: self.params.len(),
                found: values.len(),
            });
        }
        let mut updated = self.clone();
        for (param, &value) in updated.params.iter_mut().zip(values) {
            if !param.is_fixed() {
                param.set_value_clamped(value);
            }
        }
        Ok(updated)
    }

    /// Overwrite values from a map, e.g. when restoring a saved fit.
    ///
    /// Names missing from `values` are left alone; values are clamped and
    /// fixed parameters are updated too, since this is a user edit, not a fit step.
    pub fn reset_to(&mut self, values: &ParameterMap) {
        for param in &mut self.params {
            if let Some(value) = values.get(param.name()) {
                param.set_value_clamped(value);
            }
        }
    }

    /// Check names are non-empty and unique and every value is inside its bounds.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (i, param) in self.params.iter().enumerate() {
            param.validate()?;
            if self.params[..i].iter().any(|p| p.name() == param.name()) {
                return Err(ParameterError::DuplicateName {
                    name: param.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FitParameters {
    type Item = &'a FitParameter;
    type IntoIter = std::slice::Iter<'a, FitParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
