//! Stateless click: hit-test, climb to an interactive node, activate.

use tracing::{debug, warn};

use handwave_model::geometry::Point2D;
use handwave_model::ui::NodeId;

use crate::host::DesktopHost;

/// Ancestor walk limit, guarding against cyclic host trees.
const MAX_ANCESTOR_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHandler;

impl ClickHandler {
    pub fn new() -> Self {
        Self
    }

    /// Nearest interactive node at or above the one under `point`.
    pub fn resolve<H: DesktopHost + ?Sized>(&self, host: &H, point: Point2D) -> Option<NodeId> {
        let mut node = host.hit_test(point)?;
        for _ in 0..MAX_ANCESTOR_DEPTH {
            if host.is_interactive(node) {
                return Some(node);
            }
            node = host.parent(node)?;
        }
        None
    }

    /// Activate the resolved node. Returns it if the host accepted.
    pub fn click<H: DesktopHost + ?Sized>(&self, host: &mut H, point: Point2D) -> Option<NodeId> {
        let Some(node) = self.resolve(host, point) else {
            debug!(x = point.x, y = point.y, "Nothing clickable under cursor");
            return None;
        };
        match host.activate(node) {
            Ok(()) => {
                debug!(node = %node, "Activated");
                Some(node)
            }
            Err(e) => {
                warn!(node = %node, error = %e, "Activation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_desktop::{HostEvent, VirtualDesktop};
    use handwave_model::geometry::{Rect, Size};

    #[test]
    fn test_click_resolves_interactive_ancestor() {
        let mut desktop = VirtualDesktop::new(Size::new(1000.0, 800.0));
        let window = desktop.add_window("dialog", Rect::new(100.0, 100.0, 400.0, 300.0));
        let button = desktop
            .add_node(window, None, Rect::new(20.0, 20.0, 120.0, 40.0), true, "ok")
            .unwrap();
        let label = desktop
            .add_node(window, Some(button), Rect::new(30.0, 25.0, 60.0, 20.0), false, "ok-label")
            .unwrap();

        let handler = ClickHandler::new();
        assert_eq!(desktop.hit_test(Point2D::new(140.0, 130.0)), Some(label));
        assert_eq!(handler.click(&mut desktop, Point2D::new(140.0, 130.0)), Some(button));
        assert_eq!(desktop.events().last(), Some(&HostEvent::Activated { node: button }));
    }

    #[test]
    fn test_click_on_inert_area_does_nothing() {
        let mut desktop = VirtualDesktop::new(Size::new(1000.0, 800.0));
        let window = desktop.add_window("dialog", Rect::new(100.0, 100.0, 400.0, 300.0));
        desktop
            .add_node(window, None, Rect::new(0.0, 0.0, 400.0, 32.0), false, "title")
            .unwrap();

        let handler = ClickHandler::new();
        assert_eq!(handler.click(&mut desktop, Point2D::new(150.0, 110.0)), None);
        assert_eq!(handler.click(&mut desktop, Point2D::new(900.0, 700.0)), None);
        assert!(desktop.activations().is_empty());
    }
}
