/// Hotspot analysis for the event snapshot.
///
/// Submodules:
/// - `grid`    — bins scored features into lon/lat cells and ranks them.
/// - `trend`   — week-over-week classification of cells and totals.
/// - `summary` — the weekly digest built from the raw snapshot.

pub mod grid;
pub mod summary;
pub mod trend;
