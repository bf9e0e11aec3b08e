//! Pose composition for elements of an assembly.
//!
//! The final pose of an element is an ordered product of named factors. The
//! order guarantees that all rotations act about the element center, and that
//! uncertainty rotations act after the nominal and construction rotations:
//!
//! ```text
//! GlobalPlacement · GlobalUncertainty
//!   · UncertaintyTranslation · NominalTranslation · ConstructionTranslation
//!   · UncertaintyRotation · NominalRotation · ConstructionRotation
//!   · UncertaintyZoom · NominalZoom · ConstructionZoom
//! ```
//!
//! "Nominal" is the element position relative to the assembly, "uncertainty"
//! the per-element misalignment and "construction" the pose from the element
//! arguments (usually only a zoom that sets the element size).

#![forbid(unsafe_code)]

use crate::geometry::affine::{AffineError, AffineTransform};

/// Named factor of an element pose, in multiplication order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositionFactor {
    /// Pose of the whole assembly.
    GlobalPlacement,
    /// Misalignment of the whole assembly.
    GlobalUncertainty,
    /// Translation part of the element misalignment.
    UncertaintyTranslation,
    /// Element position relative to the assembly.
    NominalTranslation,
    /// Translation part of the construction pose.
    ConstructionTranslation,
    /// Rotation part of the element misalignment.
    UncertaintyRotation,
    /// Element orientation relative to the assembly.
    NominalRotation,
    /// Rotation part of the construction pose.
    ConstructionRotation,
    /// Zoom part of the element misalignment.
    UncertaintyZoom,
    /// Zoom part of the nominal element pose.
    NominalZoom,
    /// Zoom part of the construction pose.
    ConstructionZoom,
}

impl CompositionFactor {
    /// All factors, leftmost first.
    pub const ORDER: [Self; 11] = [
        Self::GlobalPlacement,
        Self::GlobalUncertainty,
        Self::UncertaintyTranslation,
        Self::NominalTranslation,
        Self::ConstructionTranslation,
        Self::UncertaintyRotation,
        Self::NominalRotation,
        Self::ConstructionRotation,
        Self::UncertaintyZoom,
        Self::NominalZoom,
        Self::ConstructionZoom,
    ];
}

/// The factors of one element pose.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionFactors {
    factors: [AffineTransform; 11],
}

impl CompositionFactors {
    /// Decomposes the element-level poses and arranges all factors.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::ShearNotSupported`] or [`AffineError::Singular`]
    /// if `nominal`, `uncertainty` or `construction` cannot be decomposed
    /// without shear.
    pub fn new(
        global_placement: &AffineTransform,
        global_uncertainty: &AffineTransform,
        nominal: &AffineTransform,
        uncertainty: &AffineTransform,
        construction: &AffineTransform,
    ) -> Result<Self, AffineError> {
        let construction = construction.decompose_without_shear()?;
        let nominal = nominal.decompose_without_shear()?;
        let uncertainty = uncertainty.decompose_without_shear()?;
        Ok(Self {
            factors: [
                *global_placement,
                *global_uncertainty,
                uncertainty.translation_transform(),
                nominal.translation_transform(),
                construction.translation_transform(),
                uncertainty.rotation_transform(),
                nominal.rotation_transform(),
                construction.rotation_transform(),
                uncertainty.zoom_transform(),
                nominal.zoom_transform(),
                construction.zoom_transform(),
            ],
        })
    }

    /// A single factor.
    #[must_use]
    pub fn get(&self, factor: CompositionFactor) -> &AffineTransform {
        &self.factors[factor as usize]
    }

    /// Factors with their names, leftmost first.
    pub fn iter(&self) -> impl Iterator<Item = (CompositionFactor, &AffineTransform)> {
        CompositionFactor::ORDER.into_iter().zip(self.factors.iter())
    }

    /// Product of all factors.
    #[must_use]
    pub fn compose(&self) -> AffineTransform {
        self.factors
            .iter()
            .fold(AffineTransform::identity(), |acc, factor| acc * *factor)
    }
}
