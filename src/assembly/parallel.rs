//! Assemblies of identical elements operating in parallel.
//!
//! A [`ParallelAssembly`] owns the nominal positions of its elements relative
//! to the assembly, per-element and global uncertainties, and the construction
//! arguments. [`ParallelAssembly::generate`] combines them into the final
//! element poses (see [`crate::assembly::composition`]) and constructs the
//! elements. After any input changes, `generate` has to run again; the element
//! list is only replaced when a regeneration succeeds completely.
//!
//! Positions are either given explicitly or computed by a [`TilingStrategy`]
//! such as [`FacetArray`](crate::design::facet_array::FacetArray).

#![forbid(unsafe_code)]

use std::marker::PhantomData;

use thiserror::Error;

use crate::assembly::args::ElementArgs;
use crate::assembly::composition::CompositionFactors;
use crate::assembly::element::{Element, ElementError, ElementSpec};
use crate::design::facet_array::FacetPlacementError;
use crate::geometry::affine::{AffineError, AffineTransform, PoseList, PoseSpec};

/// Name of an assembly that was not given one.
pub const DEFAULT_ASSEMBLY_NAME: &str = "ParallelAssembly";

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors of a [`TilingStrategy`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TilingError {
    /// The strategy cannot compute positions.
    #[error("Tiling strategy does not compute element positions")]
    NotImplemented,
    /// Facet placement failed.
    #[error(transparent)]
    Placement(#[from] FacetPlacementError),
}

/// Errors that can occur while building or regenerating an assembly.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AssemblyError {
    /// A pose could not be resolved or decomposed.
    #[error("Invalid element pose: {0}")]
    Transform(#[from] AffineError),
    /// A per-element argument has the wrong number of entries.
    #[error("Argument `{name}` has {found} per-element values, but the assembly has {expected} elements")]
    AmbiguousParameter {
        /// Argument name.
        name: String,
        /// Number of elements.
        expected: usize,
        /// Number of given values.
        found: usize,
    },
    /// Neither positions nor a tiling strategy that computes them was given.
    #[error("Element positions must be specified, or computed by a tiling strategy")]
    PositionsRequired,
    /// The tiling strategy failed.
    #[error("Computing element positions failed: {0}")]
    Tiling(#[source] TilingError),
    /// Positions and uncertainties are out of sync.
    #[error("{positions} element positions but {uncertainties} element uncertainties")]
    LengthMismatch {
        /// Number of element positions.
        positions: usize,
        /// Number of element uncertainties.
        uncertainties: usize,
    },
    /// An element index is out of range.
    #[error("Element {index} does not exist in an assembly of {count} elements")]
    UnknownElement {
        /// Requested index.
        index: usize,
        /// Number of elements.
        count: usize,
    },
    /// An element constructor failed.
    #[error("Constructing element {index} failed: {source}")]
    ConstructionFailure {
        /// Index of the element.
        index: usize,
        /// The constructor error.
        #[source]
        source: ElementError,
    },
}

impl From<TilingError> for AssemblyError {
    fn from(err: TilingError) -> Self {
        match err {
            TilingError::NotImplemented => Self::PositionsRequired,
            other @ TilingError::Placement(_) => Self::Tiling(other),
        }
    }
}

// =============================================================================
// TILING STRATEGY
// =============================================================================

/// Computes nominal element positions for an assembly.
pub trait TilingStrategy {
    /// Poses of the elements relative to the assembly.
    ///
    /// # Errors
    ///
    /// The default returns [`TilingError::NotImplemented`].
    fn nominal_poses(&self) -> Result<Vec<AffineTransform>, TilingError> {
        Err(TilingError::NotImplemented)
    }

    /// Id column suggested for the placed elements.
    fn id_col(&self) -> Option<&str> {
        None
    }
}

// =============================================================================
// BUILDER
// =============================================================================

enum Positions {
    Poses(Vec<AffineTransform>),
    List(PoseList),
}

/// Builder for [`ParallelAssembly`].
pub struct ParallelAssemblyBuilder<'s, E> {
    elem_args: ElementArgs,
    name: Option<String>,
    placement: PoseSpec,
    positions: Option<Positions>,
    strategy: Option<&'s dyn TilingStrategy>,
    id_col: Option<String>,
    _element: PhantomData<fn() -> E>,
}

impl<'s, E: Element> ParallelAssemblyBuilder<'s, E> {
    /// Name of the assembly, used in default element names.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pose of the assembly in the global frame.
    #[must_use]
    pub fn placement(mut self, placement: AffineTransform) -> Self {
        self.placement = PoseSpec::from_pose(placement);
        self
    }

    /// Pose of the assembly given as keywords.
    #[must_use]
    pub fn placement_spec(mut self, placement: PoseSpec) -> Self {
        self.placement = placement;
        self
    }

    /// Element positions relative to the assembly.
    #[must_use]
    pub fn positions(mut self, positions: Vec<AffineTransform>) -> Self {
        self.positions = Some(Positions::Poses(positions));
        self
    }

    /// Element positions given column-wise as keywords.
    #[must_use]
    pub fn pose_list(mut self, positions: PoseList) -> Self {
        self.positions = Some(Positions::List(positions));
        self
    }

    /// Computes the positions with `strategy` unless positions are given
    /// explicitly.
    #[must_use]
    pub fn tiled_by(mut self, strategy: &'s dyn TilingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Id column of the elements.
    #[must_use]
    pub fn id_col(mut self, id_col: impl Into<String>) -> Self {
        self.id_col = Some(id_col.into());
        self
    }

    /// Resolves the positions and generates the elements.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::PositionsRequired`] if no positions are given
    /// and there is no strategy that computes them,
    /// [`AssemblyError::Tiling`] if the strategy fails,
    /// [`AssemblyError::Transform`] for invalid poses and the errors of
    /// [`ParallelAssembly::generate`].
    pub fn build(self) -> Result<ParallelAssembly<E>, AssemblyError> {
        let placement = self.placement.resolve()?;
        let elem_pos = match (self.positions, self.strategy) {
            (Some(Positions::Poses(poses)), _) => poses,
            (Some(Positions::List(list)), _) => list.resolve()?,
            (None, Some(strategy)) => strategy.nominal_poses()?,
            (None, None) => return Err(AssemblyError::PositionsRequired),
        };
        let id_col = self
            .id_col
            .or_else(|| self.strategy.and_then(|s| s.id_col().map(str::to_owned)))
            .unwrap_or_else(|| E::ID_COL.to_owned());

        let mut assembly = ParallelAssembly {
            name: self.name.unwrap_or_else(|| DEFAULT_ASSEMBLY_NAME.to_owned()),
            placement,
            uncertainty: AffineTransform::identity(),
            elem_args: self.elem_args,
            elem_uncertainty: vec![AffineTransform::identity(); elem_pos.len()],
            elem_pos,
            id_col,
            elements: Vec::new(),
        };
        assembly.generate()?;
        Ok(assembly)
    }
}

// =============================================================================
// PARALLEL ASSEMBLY
// =============================================================================

/// A set of elements of type `E` placed relative to a common frame.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Vector3;
/// use rowland::assembly::args::ElementArgs;
/// use rowland::assembly::element::{Element, Facet};
/// use rowland::assembly::parallel::ParallelAssembly;
/// use rowland::geometry::affine::{AffineTransform, PoseList};
///
/// let positions = PoseList {
///     position: Some(vec![Vector3::new(0.0, -1.0, 0.0), Vector3::new(0.0, 1.0, 0.0)]),
///     ..PoseList::default()
/// };
/// let assembly = ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
///     .name("gratings")
///     .placement(AffineTransform::from_translation(&Vector3::new(10.0, 0.0, 0.0)))
///     .pose_list(positions)
///     .build()
///     .unwrap();
///
/// assert_eq!(assembly.elements().len(), 2);
/// assert_eq!(assembly.elements()[1].pose().translation(), Vector3::new(10.0, 1.0, 0.0));
/// assert_eq!(assembly.elements()[1].name(), "Elem 1 in gratings");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelAssembly<E> {
    name: String,
    placement: AffineTransform,
    uncertainty: AffineTransform,
    elem_args: ElementArgs,
    elem_pos: Vec<AffineTransform>,
    elem_uncertainty: Vec<AffineTransform>,
    id_col: String,
    elements: Vec<E>,
}

impl<E: Element> ParallelAssembly<E> {
    /// Starts building an assembly whose elements are constructed from
    /// `elem_args`.
    #[must_use]
    pub fn builder<'s>(elem_args: ElementArgs) -> ParallelAssemblyBuilder<'s, E> {
        ParallelAssemblyBuilder {
            elem_args,
            name: None,
            placement: PoseSpec::new(),
            positions: None,
            strategy: None,
            id_col: None,
            _element: PhantomData,
        }
    }

    /// Name of the assembly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id column passed to elements without an explicit one.
    #[must_use]
    pub fn id_col(&self) -> &str {
        &self.id_col
    }

    /// Number of element positions.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elem_pos.len()
    }

    /// Elements from the last successful [`ParallelAssembly::generate`].
    #[must_use]
    pub fn elements(&self) -> &[E] {
        &self.elements
    }

    /// Pose of the assembly.
    #[must_use]
    pub const fn placement(&self) -> &AffineTransform {
        &self.placement
    }

    /// Replaces the pose of the assembly.
    pub const fn set_placement(&mut self, placement: AffineTransform) {
        self.placement = placement;
    }

    /// Misalignment of the whole assembly.
    #[must_use]
    pub const fn uncertainty(&self) -> &AffineTransform {
        &self.uncertainty
    }

    /// Replaces the misalignment of the whole assembly.
    pub const fn set_uncertainty(&mut self, uncertainty: AffineTransform) {
        self.uncertainty = uncertainty;
    }

    /// Nominal element positions relative to the assembly.
    #[must_use]
    pub fn elem_pos(&self) -> &[AffineTransform] {
        &self.elem_pos
    }

    /// Mutable nominal positions. Adding or removing entries requires a
    /// matching change of [`ParallelAssembly::elem_uncertainty_mut`].
    pub const fn elem_pos_mut(&mut self) -> &mut Vec<AffineTransform> {
        &mut self.elem_pos
    }

    /// Replaces the nominal positions and resets all element uncertainties.
    pub fn set_elem_pos(&mut self, elem_pos: Vec<AffineTransform>) {
        self.elem_uncertainty = vec![AffineTransform::identity(); elem_pos.len()];
        self.elem_pos = elem_pos;
    }

    /// Per-element misalignments.
    #[must_use]
    pub fn elem_uncertainty(&self) -> &[AffineTransform] {
        &self.elem_uncertainty
    }

    /// Mutable per-element misalignments.
    pub const fn elem_uncertainty_mut(&mut self) -> &mut Vec<AffineTransform> {
        &mut self.elem_uncertainty
    }

    /// Construction arguments.
    #[must_use]
    pub const fn elem_args(&self) -> &ElementArgs {
        &self.elem_args
    }

    /// Mutable construction arguments.
    pub const fn elem_args_mut(&mut self) -> &mut ElementArgs {
        &mut self.elem_args
    }

    fn check_lengths(&self) -> Result<usize, AssemblyError> {
        let positions = self.elem_pos.len();
        let uncertainties = self.elem_uncertainty.len();
        if positions == uncertainties {
            Ok(positions)
        } else {
            Err(AssemblyError::LengthMismatch {
                positions,
                uncertainties,
            })
        }
    }

    fn factors(&self, index: usize, construction: &PoseSpec) -> Result<CompositionFactors, AssemblyError> {
        let construction = construction.resolve()?;
        Ok(CompositionFactors::new(
            &self.placement,
            &self.uncertainty,
            &self.elem_pos[index],
            &self.elem_uncertainty[index],
            &construction,
        )?)
    }

    /// Named pose factors of element `index`, leftmost first.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::UnknownElement`] for an index out of range and
    /// the resolution and decomposition errors of
    /// [`ParallelAssembly::generate`].
    pub fn composition_factors(&self, index: usize) -> Result<CompositionFactors, AssemblyError> {
        let count = self.check_lengths()?;
        if index >= count {
            return Err(AssemblyError::UnknownElement { index, count });
        }
        let args = self.elem_args.resolve(index, count)?;
        self.factors(index, &args.pose)
    }

    /// Recomputes all element poses and reconstructs the elements.
    ///
    /// All poses are resolved before the first element is constructed. On
    /// error the previous elements are kept unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::LengthMismatch`] if positions and
    /// uncertainties differ in number, [`AssemblyError::AmbiguousParameter`]
    /// for per-element arguments of the wrong length,
    /// [`AssemblyError::Transform`] for ambiguous or sheared poses, and
    /// [`AssemblyError::ConstructionFailure`] for the first element that
    /// cannot be constructed.
    pub fn generate(&mut self) -> Result<(), AssemblyError> {
        let count = self.check_lengths()?;
        let mut specs = Vec::with_capacity(count);
        for index in 0..count {
            let args = self.elem_args.resolve(index, count)?;
            let pose = self.factors(index, &args.pose)?.compose();
            specs.push(ElementSpec {
                pose,
                id: index,
                name: args
                    .name
                    .unwrap_or_else(|| format!("Elem {index} in {}", self.name)),
                id_col: args.id_col.unwrap_or_else(|| self.id_col.clone()),
                params: args.params,
            });
        }

        let elements = specs
            .into_iter()
            .map(|spec| {
                let index = spec.id;
                E::from_spec(spec).map_err(|source| AssemblyError::ConstructionFailure { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.elements = elements;
        tracing::debug!(assembly = %self.name, elements = count, "generated assembly elements");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
