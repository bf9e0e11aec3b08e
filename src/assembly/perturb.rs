//! Misalignment of assemblies for tolerance studies.
//!
//! The movers overwrite the global or per-element uncertainty of a
//! [`ParallelAssembly`] and regenerate its elements. Compare a perturbed
//! assembly with the nominal one to estimate the effect of manufacturing and
//! alignment errors.

#![forbid(unsafe_code)]

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::element::Element;
use crate::assembly::parallel::{AssemblyError, ParallelAssembly};
use crate::geometry::affine::AffineTransform;
use crate::geometry::rotation::rotation_from_xyz;

/// Errors of the movers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PerturbError {
    /// A standard deviation is negative or not finite.
    #[error("Standard deviation for `{component}` must be finite and non-negative, got {value}")]
    InvalidSigma {
        /// Name of the displacement component.
        component: &'static str,
        /// The offending value.
        value: f64,
    },
    /// Regenerating the assembly failed.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Rigid displacement: a translation plus rotations about the x, y and z
/// axes (radians).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Translation along x.
    #[serde(default)]
    pub dx: f64,
    /// Translation along y.
    #[serde(default)]
    pub dy: f64,
    /// Translation along z.
    #[serde(default)]
    pub dz: f64,
    /// Rotation about x.
    #[serde(default)]
    pub rx: f64,
    /// Rotation about y.
    #[serde(default)]
    pub ry: f64,
    /// Rotation about z.
    #[serde(default)]
    pub rz: f64,
}

const COMPONENTS: [&str; 6] = ["dx", "dy", "dz", "rx", "ry", "rz"];

impl Displacement {
    /// A pure translation.
    #[must_use]
    pub const fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            dx,
            dy,
            dz,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
        }
    }

    /// A pure rotation.
    #[must_use]
    pub const fn rotation(rx: f64, ry: f64, rz: f64) -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            dz: 0.0,
            rx,
            ry,
            rz,
        }
    }

    const fn components(&self) -> [f64; 6] {
        [self.dx, self.dy, self.dz, self.rx, self.ry, self.rz]
    }

    const fn from_components(c: [f64; 6]) -> Self {
        Self {
            dx: c[0],
            dy: c[1],
            dz: c[2],
            rx: c[3],
            ry: c[4],
            rz: c[5],
        }
    }

    /// Transform that rotates by `Rz · Ry · Rx` and then translates.
    #[must_use]
    pub fn to_transform(&self) -> AffineTransform {
        AffineTransform::compose(
            &Vector3::new(self.dx, self.dy, self.dz),
            &rotation_from_xyz(self.rx, self.ry, self.rz),
            &Vector3::repeat(1.0),
        )
    }
}

impl From<Displacement> for AffineTransform {
    fn from(displacement: Displacement) -> Self {
        displacement.to_transform()
    }
}

/// Moves the whole assembly by `displacement` about its own center.
///
/// # Errors
///
/// Returns [`PerturbError::Assembly`] if regeneration fails.
pub fn move_global<E: Element>(
    assembly: &mut ParallelAssembly<E>,
    displacement: &Displacement,
) -> Result<(), PerturbError> {
    assembly.set_uncertainty(displacement.to_transform());
    assembly.generate()?;
    Ok(())
}

/// Moves every element by the same `displacement` about its own center.
///
/// # Errors
///
/// Returns [`PerturbError::Assembly`] if regeneration fails.
pub fn move_individual<E: Element>(
    assembly: &mut ParallelAssembly<E>,
    displacement: &Displacement,
) -> Result<(), PerturbError> {
    let transform = displacement.to_transform();
    let count = assembly.element_count();
    *assembly.elem_uncertainty_mut() = vec![transform; count];
    assembly.generate()?;
    Ok(())
}

/// Draws an independent random displacement for every element.
///
/// Each component is normal distributed with zero mean and the standard
/// deviation given by the matching component of `sigma`; a zero sigma keeps
/// that component at exactly zero. Components are drawn element by element in
/// the order `dx, dy, dz, rx, ry, rz`, so a seeded `rng` reproduces the same
/// misalignment.
///
/// # Errors
///
/// Returns [`PerturbError::InvalidSigma`] before touching the assembly if a
/// sigma is negative or not finite, and [`PerturbError::Assembly`] if
/// regeneration fails.
///
/// # Examples
///
/// ```rust
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use rowland::assembly::args::ElementArgs;
/// use rowland::assembly::element::Facet;
/// use rowland::assembly::parallel::ParallelAssembly;
/// use rowland::assembly::perturb::{Displacement, wiggle};
/// use rowland::geometry::affine::AffineTransform;
///
/// let mut assembly = ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
///     .positions(vec![AffineTransform::identity(); 4])
///     .build()
///     .unwrap();
/// let mut rng = StdRng::seed_from_u64(42);
/// wiggle(&mut assembly, &Displacement::translation(0.0, 0.0, 1e-3), &mut rng).unwrap();
/// for u in assembly.elem_uncertainty() {
///     assert_eq!(u.translation().x, 0.0);
/// }
/// ```
pub fn wiggle<E: Element, R: Rng + ?Sized>(
    assembly: &mut ParallelAssembly<E>,
    sigma: &Displacement,
    rng: &mut R,
) -> Result<(), PerturbError> {
    let distributions = sigma
        .components()
        .into_iter()
        .zip(COMPONENTS)
        .map(|(value, component)| {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PerturbError::InvalidSigma { component, value });
            }
            if value == 0.0 {
                return Ok(None);
            }
            Normal::new(0.0, value)
                .map(Some)
                .map_err(|_| PerturbError::InvalidSigma { component, value })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = assembly.element_count();
    let uncertainties = (0..count)
        .map(|_| {
            let mut drawn = [0.0; 6];
            for (slot, distribution) in drawn.iter_mut().zip(&distributions) {
                if let Some(normal) = distribution {
                    *slot = normal.sample(rng);
                }
            }
            Displacement::from_components(drawn).to_transform()
        })
        .collect();
    *assembly.elem_uncertainty_mut() = uncertainties;
    assembly.generate()?;
    Ok(())
}
