//! An in-memory desktop host.
//!
//! Windows live in a stacking order (last is topmost). Every window owns a
//! root node covering its frame; further nodes are positioned relative to
//! the window origin, so they move with it. All mutations are recorded in
//! an event log that replay output and tests inspect.

use std::collections::BTreeMap;

use serde::Serialize;

use handwave_common::error::{HandwaveError, HandwaveResult};
use handwave_model::geometry::{Point2D, Rect, Size};
use handwave_model::mapping::actions;
use handwave_model::ui::{NodeId, WindowId};

use crate::host::DesktopHost;

/// A mutation applied to the virtual desktop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Focused {
        window: Option<WindowId>,
    },
    Moved {
        window: WindowId,
        position: Point2D,
    },
    Activated {
        node: NodeId,
    },
    Invoked {
        action: String,
        window: Option<WindowId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualWindow {
    pub id: WindowId,
    pub title: String,
    pub frame: Rect,
    pub minimized: bool,
    /// Frame to return to after a maximize.
    pub restore_frame: Option<Rect>,
    pub root: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualNode {
    pub id: NodeId,
    pub window: WindowId,
    pub parent: Option<NodeId>,
    /// Relative to the window origin.
    pub bounds: Rect,
    pub interactive: bool,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct VirtualDesktop {
    screen: Size,
    windows: BTreeMap<WindowId, VirtualWindow>,
    stacking: Vec<WindowId>,
    nodes: BTreeMap<NodeId, VirtualNode>,
    focused: Option<WindowId>,
    next_window: u64,
    next_node: u64,
    events: Vec<HostEvent>,
}

impl VirtualDesktop {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            windows: BTreeMap::new(),
            stacking: Vec::new(),
            nodes: BTreeMap::new(),
            focused: None,
            next_window: 1,
            next_node: 1,
            events: Vec::new(),
        }
    }

    /// Open a window on top of the stack and focus it.
    pub fn add_window(&mut self, title: impl Into<String>, frame: Rect) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;

        let root = self.alloc_node(VirtualNode {
            id: NodeId(0),
            window: id,
            parent: None,
            bounds: Rect::new(0.0, 0.0, frame.w, frame.h),
            interactive: false,
            label: "root".to_string(),
        });
        self.windows.insert(
            id,
            VirtualWindow {
                id,
                title: title.into(),
                frame,
                minimized: false,
                restore_frame: None,
                root,
            },
        );
        self.focus(Some(id));
        id
    }

    /// Add a widget. `parent` defaults to the window's root node.
    pub fn add_node(
        &mut self,
        window: WindowId,
        parent: Option<NodeId>,
        bounds: Rect,
        interactive: bool,
        label: impl Into<String>,
    ) -> HandwaveResult<NodeId> {
        let root = self
            .windows
            .get(&window)
            .map(|w| w.root)
            .ok_or_else(|| HandwaveError::host(format!("Unknown window {window}")))?;

        let parent = parent.unwrap_or(root);
        match self.nodes.get(&parent) {
            Some(node) if node.window == window => {}
            _ => {
                return Err(HandwaveError::host(format!(
                    "Node {parent} does not belong to {window}"
                )))
            }
        }

        Ok(self.alloc_node(VirtualNode {
            id: NodeId(0),
            window,
            parent: Some(parent),
            bounds,
            interactive,
            label: label.into(),
        }))
    }

    fn alloc_node(&mut self, mut node: VirtualNode) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        node.id = id;
        self.nodes.insert(id, node);
        id
    }

    /// Focus a window (raising it) or clear focus.
    pub fn focus(&mut self, window: Option<WindowId>) {
        let window = window.filter(|id| self.windows.contains_key(id));
        if let Some(id) = window {
            self.raise(id);
        }
        if self.focused != window {
            self.focused = window;
            self.events.push(HostEvent::Focused { window });
        }
    }

    fn raise(&mut self, window: WindowId) {
        self.stacking.retain(|id| *id != window);
        self.stacking.push(window);
    }

    /// Remove a window and its nodes. Focus moves to the next visible window.
    pub fn close_window(&mut self, window: WindowId) -> bool {
        if self.windows.remove(&window).is_none() {
            return false;
        }
        self.nodes.retain(|_, node| node.window != window);
        self.stacking.retain(|id| *id != window);
        if self.focused == Some(window) {
            let next = self.topmost_visible();
            self.focus(next);
        }
        true
    }

    pub fn window(&self, window: WindowId) -> Option<&VirtualWindow> {
        self.windows.get(&window)
    }

    pub fn windows(&self) -> impl Iterator<Item = &VirtualWindow> {
        self.windows.values()
    }

    pub fn node(&self, node: NodeId) -> Option<&VirtualNode> {
        self.nodes.get(&node)
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn activations(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Activated { node } => Some(*node),
                _ => None,
            })
            .collect()
    }

    pub fn invocations(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Invoked { action, .. } => Some(action.as_str()),
                _ => None,
            })
            .collect()
    }

    fn topmost_visible(&self) -> Option<WindowId> {
        self.stacking
            .iter()
            .rev()
            .copied()
            .find(|id| self.windows.get(id).is_some_and(|w| !w.minimized))
    }

    fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(&node).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        depth
    }

    fn absolute_bounds(&self, node: &VirtualNode) -> Option<Rect> {
        let origin = self.windows.get(&node.window)?.frame.origin();
        Some(node.bounds.moved_to(origin + node.bounds.origin()))
    }

    fn require_window(
        &mut self,
        window: Option<WindowId>,
        action: &str,
    ) -> HandwaveResult<&mut VirtualWindow> {
        let id = window.ok_or_else(|| {
            HandwaveError::host(format!("{action} requires a focused window"))
        })?;
        self.windows
            .get_mut(&id)
            .ok_or_else(|| HandwaveError::host(format!("Unknown window {id}")))
    }

    /// Cycle focus through visible windows in id order.
    fn cycle_focus(&mut self, forward: bool) {
        let visible: Vec<WindowId> = self
            .windows
            .values()
            .filter(|w| !w.minimized)
            .map(|w| w.id)
            .collect();
        if visible.is_empty() {
            return;
        }
        let current = self
            .focused
            .and_then(|id| visible.iter().position(|v| *v == id));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % visible.len(),
            (Some(i), false) => (i + visible.len() - 1) % visible.len(),
            (None, true) => 0,
            (None, false) => visible.len() - 1,
        };
        self.focus(Some(visible[next]));
    }
}

impl DesktopHost for VirtualDesktop {
    fn name(&self) -> &str {
        "virtual"
    }

    fn screen_size(&self) -> Size {
        self.screen
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    fn window_frame(&self, window: WindowId) -> Option<Rect> {
        self.windows.get(&window).map(|w| w.frame)
    }

    fn set_window_position(&mut self, window: WindowId, position: Point2D) -> HandwaveResult<()> {
        let entry = self
            .windows
            .get_mut(&window)
            .ok_or_else(|| HandwaveError::host(format!("Unknown window {window}")))?;
        entry.frame = entry.frame.moved_to(position);
        self.events.push(HostEvent::Moved { window, position });
        Ok(())
    }

    fn hit_test(&self, point: Point2D) -> Option<NodeId> {
        let window = self.stacking.iter().rev().find_map(|id| {
            self.windows
                .get(id)
                .filter(|w| !w.minimized && w.frame.contains(&point))
        })?;

        self.nodes
            .values()
            .filter(|node| node.window == window.id)
            .filter(|node| {
                self.absolute_bounds(node)
                    .is_some_and(|bounds| bounds.contains(&point))
            })
            .max_by_key(|node| (self.depth(node.id), node.id))
            .map(|node| node.id)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn is_interactive(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.interactive)
    }

    fn activate(&mut self, node: NodeId) -> HandwaveResult<()> {
        if !self.nodes.contains_key(&node) {
            return Err(HandwaveError::host(format!("Unknown node {node}")));
        }
        self.events.push(HostEvent::Activated { node });
        Ok(())
    }

    fn invoke(&mut self, action: &str, focused: Option<WindowId>) -> HandwaveResult<()> {
        let screen = self.screen;
        match action {
            actions::MINIMIZE_WINDOW => {
                let window = self.require_window(focused, action)?;
                window.minimized = true;
                let id = window.id;
                if self.focused == Some(id) {
                    let next = self.topmost_visible();
                    self.focus(next);
                }
            }
            actions::MAXIMIZE_WINDOW => {
                let window = self.require_window(focused, action)?;
                if window.restore_frame.is_none() {
                    window.restore_frame = Some(window.frame);
                }
                window.frame = Rect::new(0.0, 0.0, screen.width, screen.height);
            }
            actions::RESTORE_WINDOW => {
                let window = self.require_window(focused, action)?;
                if window.minimized {
                    window.minimized = false;
                } else if let Some(frame) = window.restore_frame.take() {
                    window.frame = frame;
                }
            }
            actions::NEXT_WINDOW => self.cycle_focus(true),
            actions::PREVIOUS_WINDOW => self.cycle_focus(false),
            _ => {}
        }
        self.events.push(HostEvent::Invoked {
            action: action.to_string(),
            window: focused,
        });
        Ok(())
    }
}
