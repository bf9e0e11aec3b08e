//! # rowland
//!
//! Geometry for X-ray grating spectrometers built around a Rowland torus.
//!
//! A spectrometer with a tilted Rowland torus focuses both the zeroth and the
//! dispersed orders of many small flat gratings ("facets"). This crate
//! computes where those facets go and how misalignments propagate:
//!
//! - [`geometry::torus::ImplicitTorus`]: the torus as the zero set of a
//!   quartic, with line intersections and surface normals
//! - [`design::rowland::design_tilted_torus`]: torus radii and placement from
//!   the focal distance and two design angles
//! - [`design::facet_array::FacetArray`]: tiling of an annulus segment with
//!   facets whose centers lie on the torus
//! - [`assembly::parallel::ParallelAssembly`]: owns nominal positions and
//!   uncertainties of a set of elements and composes their final poses
//! - [`assembly::perturb`]: global, per-element and random misalignments for
//!   tolerance studies
//!
//! All poses are 4×4 homogeneous [`nalgebra`] matrices wrapped in
//! [`geometry::affine::AffineTransform`]. Lengths are in arbitrary but
//! consistent units, angles in radians.
//!
//! # Basic Usage
//!
//! ```rust
//! use rowland::prelude::*;
//!
//! // Torus for a focal distance of 10 with tilt angles of 0.06 and 0.12 rad.
//! let torus = design_tilted_torus(10.0, 0.06, 0.12)
//!     .unwrap()
//!     .to_torus()
//!     .unwrap();
//!
//! // Facets of size 0.25 covering radii 0.5 to 1.0 around the optical axis.
//! let config = FacetArrayConfigBuilder::default()
//!     .radius((0.5, 1.0))
//!     .d_facet(0.25)
//!     .x_range((8.0, 11.0))
//!     .build()
//!     .unwrap();
//! let tiling = FacetArray::new(torus, config).unwrap();
//!
//! let mut gratings = ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
//!     .name("CAT gratings")
//!     .tiled_by(&tiling)
//!     .build()
//!     .unwrap();
//! assert_eq!(gratings.elements().len(), 30);
//! assert_eq!(gratings.id_col(), "facet");
//!
//! // Shift the whole grating array by 1 along the optical axis.
//! move_global(&mut gratings, &Displacement::translation(1.0, 0.0, 0.0)).unwrap();
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events but installs no subscriber. Set
//! `ROWLAND_DEBUG_SOLVER` to trace every root finder iteration at debug level.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Affine transforms, rotations, root finding and the implicit torus.
pub mod geometry {
    /// Homogeneous 4×4 transforms and pose keywords
    pub mod affine;
    /// Bracketed scalar root finding
    pub mod root_finding;
    pub mod rotation;
    pub mod torus;
    pub use affine::*;
    pub use rotation::*;
    pub use torus::*;
}

/// Design of the Rowland torus and the facet layout on it.
pub mod design {
    pub mod facet_array;
    pub mod rowland;
    pub use facet_array::*;
    pub use rowland::*;
}

/// Assemblies of parallel elements and their misalignment.
///
/// Positions of the elements are kept separately from the elements
/// themselves, so the assembly can be regenerated after any change.
pub mod assembly {
    pub mod args;
    /// Ordered named factors of an element pose
    pub mod composition;
    pub mod element;
    pub mod parallel;
    /// Global, individual and random element movers
    pub mod perturb;
    pub use args::*;
    pub use element::*;
    pub use parallel::*;
}

/// A prelude module that re-exports commonly used types.
pub mod prelude {
    pub use crate::assembly::{
        args::*,
        composition::*,
        element::*,
        parallel::*,
        perturb::{Displacement, PerturbError, move_global, move_individual, wiggle},
    };
    pub use crate::design::{facet_array::*, rowland::*};
    pub use crate::geometry::{
        affine::*,
        root_finding::{RootFindingConfig, RootFindingError, brent, config_presets, scan_sign_changes},
        rotation::*,
        torus::*,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
