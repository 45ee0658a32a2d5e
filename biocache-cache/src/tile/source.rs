//! Producer of tile content.

use super::entry::TileData;
use super::resolution::Resolution;

/// Computes tiles on a cache miss.
///
/// Used by [`TileCache::get_or_compute`](super::TileCache::get_or_compute),
/// which guarantees at most one `compute` per placeholder at a time.
pub trait TileSource {
    /// Error returned when a tile cannot be computed.
    type Error;

    /// Cheap estimate of the number of points `compute` would return.
    ///
    /// Returning `Some` lets the cache skip sharing a result that could
    /// never be admitted. The default makes no estimate.
    fn estimate_points(&self, _query: &str, _resolution: Resolution) -> Option<usize> {
        None
    }

    /// Compute the tile content.
    fn compute(
        &self,
        query: &str,
        colour_mode: &str,
        resolution: Resolution,
    ) -> Result<TileData, Self::Error>;
}
