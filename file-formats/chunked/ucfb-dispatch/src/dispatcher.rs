use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use ucfb_chunk::{ChunkReader, Tag};

use crate::error::{DispatchFailure, HandlerError, Result};
use crate::version::{GameVersion, Platform};

/// A chunk handler: decodes one chunk's payload, optionally recursing into
/// the dispatcher for its own children.
pub type HandlerFn<C> = fn(ChunkReader<'_>, DispatchEnv<'_, C>) -> Result<()>;

/// Shared, read-only environment threaded through every handler call.
/// `dispatcher` lets a container handler (e.g. the `lvl_` wrapper) recurse
/// into its own children using the same registry.
pub struct DispatchEnv<'d, C> {
    pub platform: Platform,
    pub version: GameVersion,
    pub ctx: &'d C,
    pub dispatcher: &'d Dispatcher<C>,
}

impl<C> Clone for DispatchEnv<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<C> Copy for DispatchEnv<'_, C> {}

struct Registration<C> {
    platform: Platform,
    version: GameVersion,
    handler: HandlerFn<C>,
}

/// `(tag, platform, version) -> handler` registry with parallel fan-out
/// over a container's children (spec.md §4.C).
pub struct Dispatcher<C> {
    handlers: HashMap<Tag, Vec<Registration<C>>>,
    unknown: HandlerFn<C>,
}

impl<C: Sync> Dispatcher<C> {
    pub fn builder(unknown: HandlerFn<C>) -> DispatcherBuilder<C> {
        DispatcherBuilder {
            handlers: HashMap::new(),
            unknown,
        }
    }

    /// Lookup precedence (spec.md §4.C):
    /// 1. exact `(platform, version)` match
    /// 2. same platform, any version
    /// 3. any platform, same version
    /// 4. first entry registered for `tag`
    /// 5. the unknown fallback, if no entry exists for `tag` at all
    pub fn lookup(&self, tag: Tag, platform: Platform, version: GameVersion) -> HandlerFn<C> {
        let Some(candidates) = self.handlers.get(&tag) else {
            return self.unknown;
        };

        if let Some(reg) = candidates
            .iter()
            .find(|r| r.platform == platform && r.version == version)
        {
            return reg.handler;
        }
        if let Some(reg) = candidates.iter().find(|r| r.platform == platform) {
            return reg.handler;
        }
        if let Some(reg) = candidates.iter().find(|r| r.version == version) {
            return reg.handler;
        }

        candidates[0].handler
    }

    /// Reads every child of `parent`, dispatches each to its handler in
    /// parallel, and returns the failures of whichever children didn't
    /// succeed. Siblings are dispatched with no ordering guarantee (spec.md
    /// §5); a failing child never stops the others.
    pub fn dispatch_children(
        &self,
        mut parent: ChunkReader<'_>,
        platform: Platform,
        version: GameVersion,
        ctx: &C,
    ) -> Vec<DispatchFailure>
    where
        C: Sync,
    {
        let mut children = Vec::new();
        while parent.has_more() {
            match parent.read_child(false) {
                Ok(child) => children.push(child),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read child chunk header, stopping descent into this container");
                    break;
                }
            }
        }

        children
            .into_par_iter()
            .filter_map(|child| {
                let tag = child.tag();
                let size = child.size();
                let handler = self.lookup(tag, platform, version);
                let env = DispatchEnv {
                    platform,
                    version,
                    ctx,
                    dispatcher: self,
                };

                let outcome = catch_unwind(AssertUnwindSafe(|| handler(child, env)));

                match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => {
                        tracing::warn!(%tag, size, error = %err, "chunk handler failed");
                        Some(DispatchFailure {
                            tag,
                            size,
                            message: err.to_string(),
                        })
                    }
                    Err(panic) => {
                        let message = panic_message(&panic);
                        tracing::warn!(%tag, size, %message, "chunk handler panicked");
                        Some(DispatchFailure { tag, size, message })
                    }
                }
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

pub struct DispatcherBuilder<C> {
    handlers: HashMap<Tag, Vec<Registration<C>>>,
    unknown: HandlerFn<C>,
}

impl<C> DispatcherBuilder<C> {
    pub fn register(
        mut self,
        tag: Tag,
        platform: Platform,
        version: GameVersion,
        handler: HandlerFn<C>,
    ) -> Self {
        self.handlers.entry(tag).or_default().push(Registration {
            platform,
            version,
            handler,
        });
        self
    }

    pub fn build(self) -> Dispatcher<C> {
        Dispatcher {
            handlers: self.handlers,
            unknown: self.unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucfb_chunk::{tag, ChunkWriter};

    struct Ctx {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    fn handler_pc(_chunk: ChunkReader<'_>, env: DispatchEnv<'_, Ctx>) -> Result<()> {
        env.ctx.calls.lock().unwrap().push("pc");
        Ok(())
    }

    fn handler_ps2(_chunk: ChunkReader<'_>, env: DispatchEnv<'_, Ctx>) -> Result<()> {
        env.ctx.calls.lock().unwrap().push("ps2");
        Ok(())
    }

    fn unknown(_chunk: ChunkReader<'_>, env: DispatchEnv<'_, Ctx>) -> Result<()> {
        env.ctx.calls.lock().unwrap().push("unknown");
        Ok(())
    }

    fn failing(_chunk: ChunkReader<'_>, _env: DispatchEnv<'_, Ctx>) -> Result<()> {
        Err(HandlerError::Domain("boom".into()))
    }

    fn build_container(tags: &[&str]) -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut root = writer.open_child(tag!("ucfb"), false).unwrap();
            for t in tags {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(t.as_bytes());
                root.open_child(ucfb_chunk::Tag(bytes), false).unwrap();
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn precedence_exact_beats_platform_only_beats_version_only_beats_first() {
        let dispatcher = Dispatcher::builder(unknown)
            .register(tag!("TAG1"), Platform::Pc, GameVersion::SwbfIi, handler_pc)
            .register(tag!("TAG1"), Platform::Ps2, GameVersion::SwbfIi, handler_ps2)
            .build();

        // exact match for (xbox, swbf_ii) doesn't exist: first registration wins
        assert_eq!(
            dispatcher.lookup(tag!("TAG1"), Platform::Xbox, GameVersion::SwbfIi) as usize,
            handler_pc as usize
        );

        // (ps2, swbf_ii) has an exact registration
        assert_eq!(
            dispatcher.lookup(tag!("TAG1"), Platform::Ps2, GameVersion::SwbfIi) as usize,
            handler_ps2 as usize
        );
    }

    #[test]
    fn unknown_tag_falls_back_to_unknown_handler() {
        let dispatcher: Dispatcher<Ctx> = Dispatcher::builder(unknown).build();
        assert_eq!(
            dispatcher.lookup(tag!("xxx1"), Platform::Pc, GameVersion::SwbfIi) as usize,
            unknown as usize
        );
    }

    #[test]
    fn dispatch_children_isolates_failures_per_child() {
        let dispatcher = Dispatcher::builder(unknown)
            .register(tag!("OKOK"), Platform::Pc, GameVersion::SwbfIi, handler_pc)
            .register(tag!("BAD_"), Platform::Pc, GameVersion::SwbfIi, failing)
            .build();

        let bytes = build_container(&["OKOK", "BAD_", "OKOK"]);
        let root = ChunkReader::open(&bytes).unwrap();

        let ctx = Ctx {
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let failures =
            dispatcher.dispatch_children(root, Platform::Pc, GameVersion::SwbfIi, &ctx);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].tag, tag!("BAD_"));
        assert_eq!(ctx.calls.lock().unwrap().len(), 2);
    }
}
