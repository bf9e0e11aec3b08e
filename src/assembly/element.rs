//! The interface between an assembly and the elements it places.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use thiserror::Error;

use crate::assembly::args::ArgValue;
use crate::geometry::affine::AffineTransform;

/// Errors raised by element constructors.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ElementError {
    /// A required parameter was not given.
    #[error("Missing required parameter `{name}`")]
    MissingParameter {
        /// Parameter name.
        name: String,
    },
    /// A parameter has the wrong type.
    #[error("Parameter `{name}` must be {expected}, got {found}")]
    WrongType {
        /// Parameter name.
        name: String,
        /// Expected kind.
        expected: &'static str,
        /// Kind that was given.
        found: &'static str,
    },
    /// A parameter has the right type but an unusable value.
    #[error("Invalid value for parameter `{name}`: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Description of the problem.
        message: String,
    },
}

/// Everything an element needs to construct itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSpec {
    /// Final pose of the element in the global frame.
    pub pose: AffineTransform,
    /// Index of the element in its assembly.
    pub id: usize,
    /// Human readable name.
    pub name: String,
    /// Name of the column that records the element id.
    pub id_col: String,
    /// Element-specific parameters.
    pub params: BTreeMap<String, ArgValue>,
}

impl ElementSpec {
    /// Raw parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ArgValue> {
        self.params.get(name)
    }

    fn required(&self, name: &str) -> Result<&ArgValue, ElementError> {
        self.param(name).ok_or_else(|| ElementError::MissingParameter {
            name: name.to_owned(),
        })
    }

    /// Real-valued parameter; integers are converted.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::MissingParameter`] or [`ElementError::WrongType`].
    pub fn f64_param(&self, name: &str) -> Result<f64, ElementError> {
        match self.required(name)? {
            ArgValue::Float(value) => Ok(*value),
            #[expect(clippy::cast_precision_loss, reason = "parameter integers are small")]
            ArgValue::Int(value) => Ok(*value as f64),
            other => Err(ElementError::WrongType {
                name: name.to_owned(),
                expected: "a number",
                found: other.kind(),
            }),
        }
    }

    /// Non-negative integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::MissingParameter`], [`ElementError::WrongType`]
    /// or [`ElementError::InvalidParameter`] for negative values.
    pub fn usize_param(&self, name: &str) -> Result<usize, ElementError> {
        match self.required(name)? {
            ArgValue::Int(value) => usize::try_from(*value).map_err(|_| ElementError::InvalidParameter {
                name: name.to_owned(),
                message: format!("expected a non-negative integer, got {value}"),
            }),
            other => Err(ElementError::WrongType {
                name: name.to_owned(),
                expected: "an integer",
                found: other.kind(),
            }),
        }
    }

    /// Text parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::MissingParameter`] or [`ElementError::WrongType`].
    pub fn text_param(&self, name: &str) -> Result<&str, ElementError> {
        match self.required(name)? {
            ArgValue::Text(value) => Ok(value.as_str()),
            other => Err(ElementError::WrongType {
                name: name.to_owned(),
                expected: "text",
                found: other.kind(),
            }),
        }
    }
}

/// An element that can be placed by an assembly.
pub trait Element: Sized {
    /// Id column used when neither the assembly nor its tiling names one.
    const ID_COL: &'static str = "element";

    /// Builds the element at `spec.pose`.
    ///
    /// # Errors
    ///
    /// Returns an [`ElementError`] if the parameters are missing or invalid.
    fn from_spec(spec: ElementSpec) -> Result<Self, ElementError>;

    /// Final pose of the element.
    fn pose(&self) -> &AffineTransform;

    /// Index of the element in its assembly.
    fn id(&self) -> usize;
}

/// A flat grating facet.
///
/// Parameters: `d` (grating period, required, positive) and `order`
/// (diffraction order, optional integer).
#[derive(Clone, Debug, PartialEq)]
pub struct Facet {
    pose: AffineTransform,
    id: usize,
    name: String,
    id_col: String,
    period: f64,
    order: Option<i64>,
}

impl Facet {
    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column that records the facet index.
    #[must_use]
    pub fn id_col(&self) -> &str {
        &self.id_col
    }

    /// Grating period.
    #[must_use]
    pub const fn period(&self) -> f64 {
        self.period
    }

    /// Diffraction order, if fixed.
    #[must_use]
    pub const fn order(&self) -> Option<i64> {
        self.order
    }
}

impl Element for Facet {
    const ID_COL: &'static str = "facet";

    fn from_spec(spec: ElementSpec) -> Result<Self, ElementError> {
        let period = spec.f64_param("d")?;
        if !(period.is_finite() && period > 0.0) {
            return Err(ElementError::InvalidParameter {
                name: "d".to_owned(),
                message: format!("grating period must be positive, got {period}"),
            });
        }
        let order = match spec.param("order") {
            None => None,
            Some(ArgValue::Int(order)) => Some(*order),
            Some(other) => {
                return Err(ElementError::WrongType {
                    name: "order".to_owned(),
                    expected: "an integer",
                    found: other.kind(),
                });
            }
        };
        Ok(Self {
            pose: spec.pose,
            id: spec.id,
            name: spec.name,
            id_col: spec.id_col,
            period,
            order,
        })
    }

    fn pose(&self) -> &AffineTransform {
        &self.pose
    }

    fn id(&self) -> usize {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(params: &[(&str, ArgValue)]) -> ElementSpec {
        ElementSpec {
            pose: AffineTransform::identity(),
            id: 3,
            name: "Elem 3 in test".to_owned(),
            id_col: "facet".to_owned(),
            params: params.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect(),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let s = spec(&[
            ("d", ArgValue::Int(2)),
            ("n", ArgValue::Int(-1)),
            ("label", ArgValue::Text("CAT".to_owned())),
        ]);
        assert_eq!(s.f64_param("d"), Ok(2.0));
        assert_eq!(s.usize_param("d"), Ok(2));
        assert!(matches!(s.usize_param("n"), Err(ElementError::InvalidParameter { .. })));
        assert_eq!(s.text_param("label"), Ok("CAT"));
        assert_eq!(
            s.text_param("d"),
            Err(ElementError::WrongType {
                name: "d".to_owned(),
                expected: "text",
                found: "int",
            })
        );
        assert_eq!(
            s.f64_param("missing"),
            Err(ElementError::MissingParameter {
                name: "missing".to_owned()
            })
        );
    }

    #[test]
    fn test_facet_from_spec() {
        let facet = Facet::from_spec(spec(&[("d", ArgValue::Float(2e-4)), ("order", ArgValue::Int(-2))])).unwrap();
        assert_eq!(facet.id(), 3);
        assert_eq!(facet.period(), 2e-4);
        assert_eq!(facet.order(), Some(-2));
        assert_eq!(facet.name(), "Elem 3 in test");
        assert_eq!(*facet.pose(), AffineTransform::identity());
    }

    #[test]
    fn test_facet_rejects_bad_period() {
        assert!(matches!(
            Facet::from_spec(spec(&[("d", ArgValue::Float(-1.0))])),
            Err(ElementError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Facet::from_spec(spec(&[])),
            Err(ElementError::MissingParameter { .. })
        ));
        assert!(matches!(
            Facet::from_spec(spec(&[("d", ArgValue::Float(1.0)), ("order", ArgValue::Float(1.0))])),
            Err(ElementError::WrongType { .. })
        ));
    }
}
