//! Extraction Pipeline feature
//!
//! Depth-first construction of the raw model graph, threading cancellation,
//! the index, and pointer-following through every recursive step.

mod context;
mod extract;
mod map;
mod scalar;

pub use context::BuildContext;
pub use extract::{extract_array, extract_object, extract_raw, RawField};
pub use map::{
    extract_extensions, extract_map, extract_map_concurrent, ExtractedMap,
};
pub use scalar::{extract_bool, extract_f64, extract_i64, extract_string};

use crate::errors::Result;
use crate::features::indexing::SpecIndex;
use crate::shared::models::NodeId;

/// The Build contract, implemented by every modeled type
///
/// `build` populates the object from its resolved node; it is safe to invoke
/// exactly once per instance. The extraction entry points allocate the
/// instance, resolve pointers, call `build`, and wrap the result in a
/// `ValueRef`.
pub trait Buildable: Default + Send {
    fn build(
        &mut self,
        ctx: &BuildContext,
        key: Option<NodeId>,
        node: NodeId,
        index: &SpecIndex,
    ) -> Result<()>;
}
