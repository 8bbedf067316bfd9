//! Handling of `xdg_shell` surfaces on top of an X11 display.
//!
//! The heart of this module is the popup machinery: the state machine behind
//! `xdg_popup` objects, their configure/ack round-trips, and the grab stack
//! that menus and nested submenus rely on. Toplevels need almost nothing from
//! the bridge beyond plain window management and are handled by the embedding
//! compositor directly.
//!
//! ## How to use it
//!
//! The module does not dispatch wire messages itself. The embedding
//! compositor implements the collaborator traits over its own objects and
//! forwards protocol traffic:
//!
//! - [`XdgRole`] over its `xdg_surface` role data, for both the popup's own
//!   surface and the parent surface,
//! - [`Seat`] over its input seats,
//! - [`Positioner`] over the accumulated `xdg_positioner` state,
//! - [`PopupResource`] is already implemented for the wire `xdg_popup`
//!   resource from `wayland-server`.
//!
//! On `xdg_surface.get_popup`, call [`XdgPopup::create`] and keep one clone of
//! the returned handle in the role data and one in the resource user data.
//! Forward `ack_configure`, surface commits, and role teardown to
//! [`XdgPopup::ack_configure`], [`XdgPopup::commit`] and [`XdgPopup::detach`],
//! and the `grab`/`reposition`/`destroy` requests to their namesakes. The
//! machinery drives the backing [`HostWindow`] (mapping, stacking, movement)
//! in response.

use std::rc::Rc;

use crate::utils::{ListenerKey, Point, Rectangle, Serial};

mod grab;
mod handlers;
mod popup;

pub use popup::{WeakXdgPopup, XdgPopup};

/// Protocol errors this module can raise on a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum XdgShellError {
    /// The client tried to grab a popup after it was mapped.
    #[error("tried to grab a popup after it has been mapped")]
    InvalidGrab,
    /// The client tried to destroy a grab-holding popup below the topmost one.
    #[error("the popup to destroy is not the topmost popup")]
    NotTheTopmostPopup,
    /// The positioner misses required fields.
    #[error("the xdg_positioner is incomplete")]
    InvalidPositioner,
}

/// The role an `xdg_surface` currently carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// The surface is an `xdg_toplevel`.
    Toplevel,
    /// The surface is an `xdg_popup`.
    Popup,
}

/// A parent-side change a popup may want to reconstrain against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentUpdate {
    /// The parent went through a configure cycle.
    Configure,
    /// The parent window was resized on the host display.
    Resize,
}

/// Placement rules for a popup, supplied by the protocol layer.
///
/// The geometry computation itself is policy owned by the embedder; the popup
/// machinery only asks for the resulting rectangle and must observe no side
/// effects from asking.
pub trait Positioner {
    /// The rectangle the popup should occupy, relative to the parent's window
    /// geometry.
    fn geometry(&self, parent: Rectangle) -> Rectangle;

    /// Whether the popup wants to be repositioned when the parent changes.
    fn reactive(&self) -> bool;

    /// Check that every field required by the protocol was set.
    fn ensure_complete(&self) -> Result<(), XdgShellError>;
}

/// The slice of an input seat the popup machinery interacts with.
pub trait Seat {
    /// Ask the seat to route its input to the popup. `false` means the seat
    /// declined, for example because the serial is stale.
    fn try_explicit_grab(&self, popup: &XdgPopup, serial: Serial) -> bool;

    /// Run `listener` when the seat goes away.
    fn add_destroy_listener(&self, listener: Rc<dyn Fn()>) -> ListenerKey;

    /// Cancel a destroy listener.
    fn remove_destroy_listener(&self, key: ListenerKey);
}

/// Operations on the window backing a surface on the host display server.
///
/// Implementations are expected to be cheap handles; failures are theirs to
/// report. See [`crate::x11::X11Window`] for the X11 implementation.
pub trait HostWindow {
    /// Toggle the override-redirect flag.
    fn set_override_redirect(&self, enabled: bool);

    /// Toggle decoration hints.
    fn set_decorated(&self, decorated: bool);

    /// Toggle participation in the synchronous configure protocol.
    fn set_sync_configure(&self, enabled: bool);

    /// Move the window.
    fn move_to(&self, position: Point);

    /// Map the window on top of its siblings.
    fn map_raised(&self);

    /// Unmap the window.
    fn unmap(&self);
}

/// The `xdg_surface` role seam.
///
/// The popup machinery sees both its own role object and the parent role
/// through this trait. A role may temporarily lack a backing window while its
/// surface has no content; window operations are skipped in that case.
pub trait XdgRole {
    /// Which role the surface carries.
    fn kind(&self) -> RoleKind;

    /// The popup backing, when this role is an `xdg_popup`.
    fn popup(&self) -> Option<XdgPopup> {
        None
    }

    /// Current window geometry in surface coordinates.
    fn window_geometry(&self) -> Rectangle;

    /// Absolute position of the role's window on the host display.
    fn root_position(&self) -> Point;

    /// The window backing this role, if the surface currently has one.
    fn window(&self) -> Option<Rc<dyn HostWindow>>;

    /// Translate a surface-space point into window space, truncating to the
    /// window's coordinate grid.
    fn surface_to_window(&self, point: Point) -> Point;

    /// Send `xdg_surface.configure` with `serial`.
    fn send_configure(&self, serial: Serial);

    /// Stop producing frame callbacks until the outstanding configure has
    /// been acknowledged.
    fn freeze_frames(&self);

    /// Drop cached surface contents; they are not preserved across an unmap.
    fn invalidate_contents(&self);

    /// Subscribe to configure/resize updates of this role.
    fn add_update_listener(&self, listener: Rc<dyn Fn(&ParentUpdate)>) -> ListenerKey;

    /// Cancel an update subscription.
    fn remove_update_listener(&self, key: ListenerKey);
}

/// The client-facing `xdg_popup` object.
///
/// Implemented for the real wire resource in this crate; tests substitute a
/// recording fake.
pub trait PopupResource {
    /// Send `xdg_popup.configure`.
    fn send_configure(&self, geometry: Rectangle);

    /// Send `xdg_popup.popup_done`.
    fn send_popup_done(&self);

    /// Send `xdg_popup.repositioned`.
    fn send_repositioned(&self, token: u32);

    /// Post a protocol error on the client connection.
    fn post_error(&self, error: XdgShellError);
}
