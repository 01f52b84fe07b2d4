use ucfb_chunk::ChunkReader;
use ucfb_dispatch::{DispatchEnv, Result};

use crate::collaborators::HandlerContext;

/// Handles a nested `ucfb` chunk exactly like the top-level file: descend
/// into its children with the same dispatcher and environment. Top-level
/// files are also driven through this dispatch path by `unmunge-cli`, so a
/// `ucfb` chunk nested inside another container (a level embedding a
/// sub-level) is handled identically to the outermost one.
pub fn handle_ucfb(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let failures = env
        .dispatcher
        .dispatch_children(chunk, env.platform, env.version, env.ctx);
    for failure in &failures {
        tracing::warn!(tag = %failure.tag, size = failure.size, message = %failure.message, "chunk failed inside ucfb container");
    }
    Ok(())
}

/// Handles an `lvl_` chunk: an 8-byte name field followed by a nested tree
/// of children, same shape as a `ucfb` container (spec.md §10).
pub fn handle_lvl_child(
    mut chunk: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
) -> Result<()> {
    let _name: u64 = chunk.read_trivial(true)?;
    let failures = env
        .dispatcher
        .dispatch_children(chunk, env.platform, env.version, env.ctx);
    for failure in &failures {
        tracing::warn!(tag = %failure.tag, size = failure.size, message = %failure.message, "chunk failed inside lvl_ container");
    }
    Ok(())
}
