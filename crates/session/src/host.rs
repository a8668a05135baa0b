//! The desktop shell as seen from the gesture pipeline.

use handwave_common::error::HandwaveResult;
use handwave_model::geometry::{Point2D, Rect, Size};
use handwave_model::ui::{NodeId, WindowId};

/// Trait for desktop shells driven by gestures.
///
/// Queries are infallible and answer `None` for unknown ids. Mutations
/// return an error when the host cannot apply them; callers log and carry
/// on.
pub trait DesktopHost: Send {
    /// Host name for logging.
    fn name(&self) -> &str;

    /// Screen size in pixels.
    fn screen_size(&self) -> Size;

    fn focused_window(&self) -> Option<WindowId>;

    /// Current frame of a window in screen pixels.
    fn window_frame(&self, window: WindowId) -> Option<Rect>;

    /// Move a window so its top-left corner is at `position`.
    fn set_window_position(&mut self, window: WindowId, position: Point2D) -> HandwaveResult<()>;

    /// Deepest UI node under a screen point.
    fn hit_test(&self, point: Point2D) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Whether a primary activation on this node does something.
    fn is_interactive(&self, node: NodeId) -> bool;

    /// Synthesize a primary activation (a click) on a node.
    fn activate(&mut self, node: NodeId) -> HandwaveResult<()>;

    /// Run a stateless named action such as `minimize-window`.
    fn invoke(&mut self, action: &str, focused: Option<WindowId>) -> HandwaveResult<()>;
}
