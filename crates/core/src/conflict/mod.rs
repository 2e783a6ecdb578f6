//! Merge-base resolution, three-way content assembly, and resolution
//! bookkeeping for conflicted files.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parentage** -- finding the one or two parents of a file's state.
//! 2. **Ancestry** -- locating the common ancestor of two divergent sides.
//! 3. **Assembly** -- producing base, local, and incoming content for a merge.
//! 4. **Recording** -- marking a file resolved once the caller is done.

pub mod ancestor;
pub mod assembler;
pub mod merger;
pub mod parents;
pub mod recorder;
pub mod session;

pub use ancestor::{AncestorFinder, AncestorLookup};
pub use assembler::MergeDataAssembler;
pub use merger::{is_binary, MergePreview};
pub use parents::ParentResolver;
pub use recorder::ConflictResolutionRecorder;
pub use session::{ConflictSession, ConflictState};
