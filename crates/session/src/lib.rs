//! Handwave Session
//!
//! Everything downstream of the action mapper:
//! - **Host:** the [`DesktopHost`] trait the shell implements
//! - **Drag sessions:** continuous manipulation rebuilt from repeated
//!   `drag` events, ended by release, focus loss, or inactivity
//! - **Click:** stateless hit-test and activation
//! - **Router:** sends each dispatched action to the right handler
//! - **Virtual desktop:** an in-memory host for replay and tests

pub mod click;
pub mod controller;
pub mod host;
pub mod router;
pub mod screen;
pub mod virtual_desktop;

pub use click::ClickHandler;
pub use controller::{DragOutcome, DragSession, EndedSession, SessionController, SessionEnd};
pub use host::DesktopHost;
pub use router::{ActionRouter, Routed};
pub use screen::ScreenMapper;
pub use virtual_desktop::{HostEvent, VirtualDesktop, VirtualNode, VirtualWindow};
