//! Cached, invalidation-tracked drawing layers.
//!
//! Layers live in a [`LayerTree`] arena and are addressed by generational
//! [`LayerHandle`]s. A layer's parent link is a plain handle: it is used only
//! to forward invalidation upward and never keeps the parent alive. A handle
//! whose layer was removed is stale and every operation on it is a no-op.
//!
//! ## Caching
//!
//! `draw_layer` reuses the layer's last command snapshot while both its
//! version and the caller's transform are exactly what they were when the
//! snapshot was taken. Otherwise the draw callback runs again into a scratch
//! context. Either way the commands are emitted wrapped in `BeginLayer` /
//! `EndLayer` markers.
//!
//! A snapshot that contains nested `BeginLayer` markers is never stored:
//! the nested layers cache themselves.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::RenderError;
use crate::geometry::Rect;
use crate::transform::Transform;

use super::commands::DrawCommand;
use super::context::GraphicsContext;

/// Process-unique layer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Hands out increasing [`LayerId`]s.
///
/// Clones share one counter, so a render-graph context can own the allocator
/// and give copies to every tree it creates. This is the only piece of layer
/// state that may be touched from more than one thread.
#[derive(Debug, Clone, Default)]
pub struct LayerIdAllocator {
    next: Arc<AtomicU64>,
}

impl LayerIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> LayerId {
        LayerId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerFlags: u8 {
        /// Keep the recorded commands between frames.
        const ALLOWS_CACHING = 1 << 0;
        /// Invalidate the parent whenever this layer is invalidated.
        const PROPAGATES_INVALIDATION = 1 << 1;
    }
}

impl Default for LayerFlags {
    fn default() -> Self {
        LayerFlags::ALLOWS_CACHING | LayerFlags::PROPAGATES_INVALIDATION
    }
}

/// Generational reference to a layer in a [`LayerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle {
    index: u32,
    generation: u32,
}

/// Draw callback of a layer.
///
/// Receives the tree (so it can draw child layers), a scratch context seeded
/// with the caller's transform and environment, and the layer's frame.
pub type DrawCallback = Box<dyn FnMut(&mut LayerTree, &mut GraphicsContext, Rect)>;

struct LayerCache {
    commands: Rc<[DrawCommand]>,
    version: u64,
    transform: Transform,
}

struct LayerNode {
    id: LayerId,
    frame: Rect,
    flags: LayerFlags,
    version: u64,
    parent: Option<LayerHandle>,
    /// `None` while the callback is running.
    draw: Option<DrawCallback>,
    cache: Option<LayerCache>,
}

struct Slot {
    generation: u32,
    node: Option<LayerNode>,
}

/// Arena owning every layer of one UI tree.
pub struct LayerTree {
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    ids: LayerIdAllocator,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    pub fn new() -> Self {
        Self::with_allocator(LayerIdAllocator::new())
    }

    pub fn with_allocator(ids: LayerIdAllocator) -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            ids,
        }
    }

    pub fn create_layer<F>(&mut self, frame: Rect, flags: LayerFlags, draw: F) -> LayerHandle
    where
        F: FnMut(&mut LayerTree, &mut GraphicsContext, Rect) + 'static,
    {
        let node = LayerNode {
            id: self.ids.allocate(),
            frame,
            flags,
            version: 0,
            parent: None,
            draw: Some(Box::new(draw)),
            cache: None,
        };

        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            LayerHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            LayerHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Destroy a layer. Children keep their (now stale) parent handle.
    pub fn remove_layer(&mut self, handle: LayerHandle) {
        if self.node(handle).is_none() {
            return;
        }
        self.slots[handle.index as usize].node = None;
        self.free_indices.push(handle.index);
    }

    pub fn contains(&self, handle: LayerHandle) -> bool {
        self.node(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the layer invalidation is forwarded to.
    ///
    /// Fails without changing anything if `child` is `parent` itself or one
    /// of its ancestors.
    pub fn set_parent(
        &mut self,
        child: LayerHandle,
        parent: Option<LayerHandle>,
    ) -> Result<(), RenderError> {
        if let Some(parent) = parent {
            let mut ancestor = Some(parent);
            while let Some(handle) = ancestor {
                if handle == child {
                    return Err(RenderError::LayerCycle {
                        child: child.index,
                        parent: parent.index,
                    });
                }
                ancestor = self.parent(handle);
            }
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = parent;
        }
        Ok(())
    }

    /// The parent, if it is still alive.
    pub fn parent(&self, handle: LayerHandle) -> Option<LayerHandle> {
        self.node(handle)
            .and_then(|node| node.parent)
            .filter(|parent| self.contains(*parent))
    }

    pub fn id(&self, handle: LayerHandle) -> Option<LayerId> {
        self.node(handle).map(|node| node.id)
    }

    pub fn version(&self, handle: LayerHandle) -> Option<u64> {
        self.node(handle).map(|node| node.version)
    }

    pub fn frame(&self, handle: LayerHandle) -> Option<Rect> {
        self.node(handle).map(|node| node.frame)
    }

    pub fn flags(&self, handle: LayerHandle) -> Option<LayerFlags> {
        self.node(handle).map(|node| node.flags)
    }

    pub fn set_flags(&mut self, handle: LayerHandle, flags: LayerFlags) {
        if let Some(node) = self.node_mut(handle) {
            node.flags = flags;
            if !flags.contains(LayerFlags::ALLOWS_CACHING) {
                node.cache = None;
            }
        }
    }

    pub fn is_cached(&self, handle: LayerHandle) -> bool {
        self.node(handle).is_some_and(|node| node.cache.is_some())
    }

    /// Replace the draw callback and invalidate.
    pub fn set_draw_callback<F>(&mut self, handle: LayerHandle, draw: F)
    where
        F: FnMut(&mut LayerTree, &mut GraphicsContext, Rect) + 'static,
    {
        if let Some(node) = self.node_mut(handle) {
            node.draw = Some(Box::new(draw));
        }
        self.invalidate(handle);
    }

    /// Bump the version and drop the snapshot, then walk up through every
    /// ancestor reached via layers that propagate invalidation.
    pub fn invalidate(&mut self, handle: LayerHandle) {
        let mut current = Some(handle);
        while let Some(handle) = current {
            let Some(node) = self.node_mut(handle) else {
                break;
            };
            node.version += 1;
            node.cache = None;
            log::trace!("Layer {:?} invalidated (version {})", node.id, node.version);

            current = if node.flags.contains(LayerFlags::PROPAGATES_INVALIDATION) {
                node.parent
            } else {
                None
            };
        }
    }

    /// Update the frame. Zero-area rects mean "not laid out yet" and are
    /// ignored.
    pub fn set_frame(&mut self, handle: LayerHandle, frame: Rect) {
        if frame.is_empty() {
            return;
        }
        match self.node_mut(handle) {
            Some(node) => node.frame = frame,
            None => return,
        }
        self.invalidate(handle);
    }

    /// Emit the layer's commands into `context`, reusing the snapshot when it
    /// is still valid.
    ///
    /// # Panics
    ///
    /// Panics if called for a layer whose draw callback is already running.
    pub fn draw_layer(&mut self, handle: LayerHandle, context: &mut GraphicsContext) {
        let transform = context.transform();
        let Some(node) = self.node_mut(handle) else {
            return;
        };
        let id = node.id;
        let version = node.version;

        if let Some(cache) = &node.cache {
            if cache.version == version && cache.transform == transform {
                log::trace!("Layer {:?} cache hit (version {})", id, version);
                crate::render_stats::record_layer_cache_hit();
                let commands = Rc::clone(&cache.commands);
                emit(context, id, version, true, &commands);
                return;
            }
        }

        let Some(mut draw) = node.draw.take() else {
            panic!("layer {:?} drawn re-entrantly from its own draw callback", id);
        };
        let frame = node.frame;
        let flags = node.flags;

        log::trace!("Layer {:?} cache miss (version {})", id, version);
        crate::render_stats::record_layer_cache_miss();

        let mut scratch = context.scratch();
        draw(self, &mut scratch, frame);
        let commands: Rc<[DrawCommand]> = scratch.take_commands().into();

        let has_nested_layers = commands
            .iter()
            .any(|c| matches!(c, DrawCommand::BeginLayer { .. }));
        let cacheable = flags.contains(LayerFlags::ALLOWS_CACHING) && !has_nested_layers;

        if let Some(node) = self.node_mut(handle) {
            node.draw = Some(draw);
            // Stored under the version the callback saw, so an invalidation
            // raised while drawing still forces a redraw next time.
            node.cache = cacheable.then(|| LayerCache {
                commands: Rc::clone(&commands),
                version,
                transform,
            });
        }

        emit(context, id, version, cacheable, &commands);
    }

    fn node(&self, handle: LayerHandle) -> Option<&LayerNode> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, handle: LayerHandle) -> Option<&mut LayerNode> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }
}

fn emit(
    context: &GraphicsContext,
    id: LayerId,
    version: u64,
    cacheable: bool,
    commands: &[DrawCommand],
) {
    let queue = context.queue();
    queue.push(DrawCommand::BeginLayer {
        id,
        version,
        cacheable,
    });
    queue.extend(commands.iter().cloned());
    queue.push(DrawCommand::EndLayer { id });
}
