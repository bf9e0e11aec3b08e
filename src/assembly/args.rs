//! Construction arguments shared by or specific to the elements of an
//! assembly.
//!
//! Arguments are either [`PerElement::Shared`] by all elements or given
//! [`PerElement::PerElement`] as a list with one entry per element. The tag is
//! explicit, so a list-valued argument that all elements share can never be
//! mistaken for per-element values.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assembly::parallel::AssemblyError;
use crate::geometry::affine::PoseSpec;

/// A value used by all elements or one value per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerElement<T> {
    /// The same value for every element.
    Shared(T),
    /// One value per element, in element order.
    PerElement(Vec<T>),
}

impl<T> PerElement<T> {
    /// Value for element `index` of `count`.
    ///
    /// Returns `None` if a per-element list does not have exactly `count`
    /// entries.
    #[must_use]
    pub fn resolve(&self, index: usize, count: usize) -> Option<&T> {
        match self {
            Self::Shared(value) => Some(value),
            Self::PerElement(values) if values.len() == count => values.get(index),
            Self::PerElement(_) => None,
        }
    }

    /// Number of per-element entries, `None` for a shared value.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Shared(_) => None,
            Self::PerElement(values) => Some(values.len()),
        }
    }

    /// `true` for a per-element list without entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl<T: Default> Default for PerElement<T> {
    fn default() -> Self {
        Self::Shared(T::default())
    }
}

impl<T> From<T> for PerElement<T> {
    fn from(value: T) -> Self {
        Self::Shared(value)
    }
}

/// Scalar or vector value of a construction parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// A flag.
    Bool(bool),
    /// An integer, e.g. a diffraction order.
    Int(i64),
    /// A real number, e.g. a grating period.
    Float(f64),
    /// Free text.
    Text(String),
    /// A 3-vector, e.g. a direction.
    Vector([f64; 3]),
}

impl ArgValue {
    /// Name of the variant, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<[f64; 3]> for ArgValue {
    fn from(value: [f64; 3]) -> Self {
        Self::Vector(value)
    }
}

/// Arguments for constructing the elements of an assembly.
///
/// # Examples
///
/// ```rust
/// use rowland::assembly::args::{ArgValue, ElementArgs};
///
/// let args = ElementArgs::new()
///     .with_param("d", 2e-4)
///     .with_param_per_element("order", vec![ArgValue::Int(-1), ArgValue::Int(1)]);
/// let second = args.resolve(1, 2).unwrap();
/// assert_eq!(second.params["d"], ArgValue::Float(2e-4));
/// assert_eq!(second.params["order"], ArgValue::Int(1));
///
/// // Three elements cannot use a two-entry list.
/// assert!(args.resolve(0, 3).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementArgs {
    /// Pose of each element in its own frame, applied before its nominal
    /// position. Usually only a zoom that sets the element size.
    #[serde(default)]
    pub pose: PerElement<PoseSpec>,
    /// Element names; defaults to `"Elem {i} in {assembly}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PerElement<String>>,
    /// Name of the column that records which element was hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_col: Option<String>,
    /// Element-specific construction parameters.
    #[serde(default)]
    pub params: BTreeMap<String, PerElement<ArgValue>>,
}

/// Arguments of a single element after [`ElementArgs::resolve`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedArgs {
    /// Construction pose.
    pub pose: PoseSpec,
    /// Explicit name, if any.
    pub name: Option<String>,
    /// Explicit id column, if any.
    pub id_col: Option<String>,
    /// Parameters of this element.
    pub params: BTreeMap<String, ArgValue>,
}

impl ElementArgs {
    /// Arguments with an identity construction pose and no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the construction pose shared by all elements.
    #[must_use]
    pub fn with_pose(mut self, pose: PoseSpec) -> Self {
        self.pose = PerElement::Shared(pose);
        self
    }

    /// Sets one construction pose per element.
    #[must_use]
    pub fn with_poses(mut self, poses: Vec<PoseSpec>) -> Self {
        self.pose = PerElement::PerElement(poses);
        self
    }

    /// Sets one name per element.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.name = Some(PerElement::PerElement(names));
        self
    }

    /// Sets the id column passed to every element.
    #[must_use]
    pub fn with_id_col(mut self, id_col: impl Into<String>) -> Self {
        self.id_col = Some(id_col.into());
        self
    }

    /// Sets a parameter shared by all elements.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.params.insert(name.into(), PerElement::Shared(value.into()));
        self
    }

    /// Sets a parameter with one value per element.
    #[must_use]
    pub fn with_param_per_element(mut self, name: impl Into<String>, values: Vec<ArgValue>) -> Self {
        self.params.insert(name.into(), PerElement::PerElement(values));
        self
    }

    /// Picks the values for element `index` out of `count`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::AmbiguousParameter`] naming the first argument
    /// whose per-element list does not have `count` entries.
    pub fn resolve(&self, index: usize, count: usize) -> Result<ResolvedArgs, AssemblyError> {
        fn pick<'a, T>(
            name: &str,
            value: &'a PerElement<T>,
            index: usize,
            count: usize,
        ) -> Result<&'a T, AssemblyError> {
            value.resolve(index, count).ok_or_else(|| AssemblyError::AmbiguousParameter {
                name: name.to_owned(),
                expected: count,
                found: value.len().unwrap_or_default(),
            })
        }

        let pose = pick("pose", &self.pose, index, count)?.clone();
        let name = self
            .name
            .as_ref()
            .map(|names| pick("name", names, index, count).cloned())
            .transpose()?;
        let params = self
            .params
            .iter()
            .map(|(key, value)| Ok((key.clone(), pick(key, value, index, count)?.clone())))
            .collect::<Result<BTreeMap<_, _>, AssemblyError>>()?;
        Ok(ResolvedArgs {
            pose,
            name,
            id_col: self.id_col.clone(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::affine::Zoom;

    #[test]
    fn test_shared_value_for_every_index() {
        let value = PerElement::Shared(3.0);
        assert_eq!(value.resolve(0, 5), Some(&3.0));
        assert_eq!(value.resolve(4, 5), Some(&3.0));
        assert_eq!(value.len(), None);
    }

    #[test]
    fn test_per_element_length_must_match() {
        let value = PerElement::PerElement(vec![1, 2, 3]);
        assert_eq!(value.resolve(2, 3), Some(&3));
        assert_eq!(value.resolve(0, 4), None);
        assert!(!value.is_empty());
    }

    #[test]
    fn test_shared_list_stays_shared() {
        // A shared vector-valued parameter is not split across elements even
        // when the element count matches its length.
        let args = ElementArgs::new().with_param("direction", [0.0, 1.0, 0.0]);
        for i in 0..3 {
            let resolved = args.resolve(i, 3).unwrap();
            assert_eq!(resolved.params["direction"], ArgValue::Vector([0.0, 1.0, 0.0]));
        }
    }

    #[test]
    fn test_resolve_reports_offending_parameter() {
        let args = ElementArgs::new()
            .with_poses(vec![PoseSpec::new(), PoseSpec::new()])
            .with_param_per_element("d", vec![ArgValue::Float(1.0)]);
        assert_eq!(
            args.resolve(0, 2),
            Err(AssemblyError::AmbiguousParameter {
                name: "d".to_owned(),
                expected: 2,
                found: 1,
            })
        );
        assert!(matches!(
            args.resolve(0, 3),
            Err(AssemblyError::AmbiguousParameter { name, .. }) if name == "pose"
        ));
    }

    #[test]
    fn test_names_and_id_col() {
        let args = ElementArgs::new()
            .with_names(vec!["left".to_owned(), "right".to_owned()])
            .with_id_col("CCD_ID");
        let resolved = args.resolve(1, 2).unwrap();
        assert_eq!(resolved.name.as_deref(), Some("right"));
        assert_eq!(resolved.id_col.as_deref(), Some("CCD_ID"));
    }

    #[test]
    fn test_json_form() {
        let json = r#"{
            "pose": {"shared": {"zoom": [1.0, 0.5, 0.5]}},
            "params": {
                "d": {"shared": 0.0002},
                "order": {"per_element": [-1, 0, 1]},
                "label": {"shared": "CAT"}
            }
        }"#;
        let args: ElementArgs = serde_json::from_str(json).unwrap();
        let resolved = args.resolve(2, 3).unwrap();
        assert_eq!(resolved.pose.zoom, Some(Zoom::PerAxis([1.0, 0.5, 0.5])));
        assert_eq!(resolved.params["d"], ArgValue::Float(2e-4));
        assert_eq!(resolved.params["order"], ArgValue::Int(1));
        assert_eq!(resolved.params["label"], ArgValue::Text("CAT".to_owned()));
    }
}
