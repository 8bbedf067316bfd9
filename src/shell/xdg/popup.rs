//! The popup backing object.
//!
//! An [`XdgPopup`] is a cheap handle onto the shared backing state. During
//! normal operation exactly two strong handles exist: one stored with the
//! wire resource and one stored with the `xdg_surface` role. The backing is
//! released once both sides have let go, at which point every outstanding
//! subscription on seats and the parent has been withdrawn.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use tracing::trace;

use crate::utils::{ListenerKey, Point, Serial, Size, SERIAL_COUNTER};

use super::{ParentUpdate, Positioner, PopupResource, XdgRole, XdgShellError};

bitflags! {
    /// State bits of a popup.
    ///
    /// The bits are orthogonal; a mapped popup is typically also grabbed and
    /// topmost while a menu chain is open.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(super) struct PopupFlags: u8 {
        /// The window is mapped on the host display.
        const MAPPED = 1 << 0;
        /// A seat routes its input to this popup.
        const GRABBED = 1 << 1;
        /// A grab was requested before the first map and waits for it.
        const PENDING_GRAB = 1 << 2;
        /// An acknowledged position has not been applied to the window yet.
        const PENDING_POSITION = 1 << 3;
        /// This popup is the top of its chain and may be destroyed.
        const TOPMOST = 1 << 4;
    }
}

pub(super) struct PopupInner {
    pub(super) flags: PopupFlags,
    pub(super) role: Option<Rc<dyn XdgRole>>,
    pub(super) parent: Option<Rc<dyn XdgRole>>,
    pub(super) positioner: Rc<dyn Positioner>,
    pub(super) resource: Option<Rc<dyn PopupResource>>,
    /// Location sent in the most recent configure, not acknowledged yet.
    pub(super) pending_loc: Point,
    /// Acknowledged location, applied to the window on the next commit.
    pub(super) loc: Point,
    /// Window size as last observed on the host display.
    pub(super) size: Size,
    pub(super) conf_serial: Option<Serial>,
    pub(super) position_serial: Option<Serial>,
    pub(super) grab_seat: Option<Rc<dyn super::Seat>>,
    pub(super) grab_serial: Option<Serial>,
    pub(super) pending_grab_seat: Option<Rc<dyn super::Seat>>,
    pub(super) pending_grab_serial: Option<Serial>,
    pub(super) seat_listener: Option<ListenerKey>,
    pub(super) pending_seat_listener: Option<ListenerKey>,
    pub(super) reconstrain_listener: Option<ListenerKey>,
}

impl Drop for PopupInner {
    fn drop(&mut self) {
        // Subscriptions are withdrawn when the second referrer lets go; a
        // key surviving until here means an unbalanced release path.
        debug_assert!(self.reconstrain_listener.is_none());
        debug_assert!(self.seat_listener.is_none());
        debug_assert!(self.pending_seat_listener.is_none());
    }
}

/// Handle to a popup backing.
#[derive(Clone)]
pub struct XdgPopup {
    pub(super) inner: Rc<RefCell<PopupInner>>,
}

/// Weak counterpart of [`XdgPopup`], for callbacks that must not keep the
/// backing alive.
#[derive(Debug, Clone)]
pub struct WeakXdgPopup {
    inner: Weak<RefCell<PopupInner>>,
}

impl WeakXdgPopup {
    /// Attempt to upgrade back into a strong handle.
    pub fn upgrade(&self) -> Option<XdgPopup> {
        self.inner.upgrade().map(|inner| XdgPopup { inner })
    }
}

impl fmt::Debug for XdgPopup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("XdgPopup")
                .field("flags", &inner.flags)
                .field("loc", &inner.loc)
                .finish_non_exhaustive(),
            Err(_) => f.debug_struct("XdgPopup").finish_non_exhaustive(),
        }
    }
}

impl XdgPopup {
    /// Create a popup for `xdg_surface.get_popup`.
    ///
    /// This binds the popup to its role, marks the backing window for popup
    /// treatment on the host display, subscribes to the parent for
    /// reconstraints and sends the initial configure. The returned handle
    /// should be cloned into the role data and the resource user data; the
    /// backing lives until both have released it again.
    pub fn create(
        role: Rc<dyn XdgRole>,
        parent: Rc<dyn XdgRole>,
        positioner: Rc<dyn Positioner>,
        resource: Rc<dyn PopupResource>,
    ) -> Result<XdgPopup, XdgShellError> {
        if let Err(err) = positioner.ensure_complete() {
            resource.post_error(err);
            return Err(err);
        }

        let popup = XdgPopup {
            inner: Rc::new(RefCell::new(PopupInner {
                flags: PopupFlags::empty(),
                role: Some(role.clone()),
                parent: Some(parent.clone()),
                positioner,
                resource: Some(resource),
                pending_loc: Point::default(),
                loc: Point::default(),
                size: Size::default(),
                conf_serial: None,
                position_serial: None,
                grab_seat: None,
                grab_serial: None,
                pending_grab_seat: None,
                pending_grab_serial: None,
                seat_listener: None,
                pending_seat_listener: None,
                reconstrain_listener: None,
            })),
        };

        // The window is owned from now on, but stays unmapped until the
        // configure round-trip finishes.
        if let Some(window) = role.window() {
            window.set_override_redirect(true);
            window.set_decorated(false);
            window.set_sync_configure(true);
        }

        let weak = popup.downgrade();
        let key = parent.add_update_listener(Rc::new(move |_update: &ParentUpdate| {
            let Some(popup) = weak.upgrade() else { return };
            if popup.positioner().reactive() {
                popup.send_configure();
            }
        }));
        popup.inner.borrow_mut().reconstrain_listener = Some(key);

        trace!("new xdg_popup");
        popup.send_configure();

        Ok(popup)
    }

    /// Obtain a weak handle onto the backing.
    pub fn downgrade(&self) -> WeakXdgPopup {
        WeakXdgPopup {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether the popup window is currently mapped.
    pub fn is_mapped(&self) -> bool {
        self.inner.borrow().flags.contains(PopupFlags::MAPPED)
    }

    /// The window size last recorded through [`note_size`](Self::note_size).
    pub fn window_size(&self) -> Size {
        self.inner.borrow().size
    }

    /// Record the window size observed on the host display.
    pub fn note_size(&self, size: Size) {
        self.inner.borrow_mut().size = size;
    }

    /// Unbind the popup from its role.
    ///
    /// Called when the role is torn down. An active or pending grab moves
    /// back to the parent, the window is unmapped and loses its popup
    /// treatment.
    pub fn detach(&self) {
        if self.inner.borrow().role.is_none() {
            return;
        }
        self.revert_grab_to_parent();
        self.unmap();
        let role = self.inner.borrow_mut().role.take();
        if let Some(role) = role {
            if let Some(window) = role.window() {
                window.set_override_redirect(false);
                window.set_decorated(true);
                window.set_sync_configure(false);
            }
        }
        self.maybe_release();
    }

    /// Apply a surface commit.
    ///
    /// `has_buffer` states whether the committed surface state carries a
    /// buffer. A buffer-less commit unmaps the window while keeping the popup
    /// object usable; a buffer-carrying commit maps it once no configure is
    /// outstanding.
    pub fn commit(&self, has_buffer: bool) {
        let pending_position = {
            let mut inner = self.inner.borrow_mut();
            if inner.role.is_none() {
                return;
            }
            let pending = inner.flags.contains(PopupFlags::PENDING_POSITION);
            inner.flags.remove(PopupFlags::PENDING_POSITION);
            pending
        };
        if pending_position {
            self.update_window_position();
        }

        if !has_buffer {
            self.unmap();
            return;
        }

        let can_map = {
            let inner = self.inner.borrow();
            inner.conf_serial.is_none() && !inner.flags.contains(PopupFlags::MAPPED)
        };
        if can_map {
            self.map();
        }
    }

    /// Process `xdg_surface.ack_configure`.
    ///
    /// Serials that match nothing outstanding are ignored.
    pub fn ack_configure(&self, serial: Serial) {
        let mut inner = self.inner.borrow_mut();
        if inner.role.is_none() {
            return;
        }
        if inner.conf_serial == Some(serial) {
            inner.conf_serial = None;
        }
        if inner.position_serial == Some(serial) {
            inner.position_serial = None;
            inner.loc = inner.pending_loc;
            inner.flags.insert(PopupFlags::PENDING_POSITION);
        }
    }

    /// The role's window geometry changed on the host display; recompute the
    /// window position.
    pub fn handle_geometry_change(&self) {
        self.update_window_position();
    }

    /// Process `xdg_popup.reposition`.
    ///
    /// Swaps in the new positioner, confirms with `repositioned(token)` and
    /// starts a new configure round-trip.
    pub fn reposition(
        &self,
        positioner: Rc<dyn Positioner>,
        token: u32,
    ) -> Result<(), XdgShellError> {
        if self.inner.borrow().role.is_none() {
            return Ok(());
        }
        let resource = {
            let mut inner = self.inner.borrow_mut();
            inner.positioner = positioner;
            inner.resource.clone()
        };
        if let Err(err) = self.positioner().ensure_complete() {
            if let Some(resource) = resource {
                resource.post_error(err);
            }
            return Err(err);
        }
        if let Some(resource) = resource {
            resource.send_repositioned(token);
        }
        self.send_configure();
        Ok(())
    }

    /// Destroy the popup on behalf of the client.
    ///
    /// A popup that takes part in a grab chain may only be destroyed from the
    /// top; everything else is a [`XdgShellError::NotTheTopmostPopup`]
    /// protocol error.
    pub fn destroy(&self) -> Result<(), XdgShellError> {
        {
            let inner = self.inner.borrow();
            if inner
                .flags
                .intersects(PopupFlags::GRABBED | PopupFlags::PENDING_GRAB)
                && !inner.flags.contains(PopupFlags::TOPMOST)
            {
                let resource = inner.resource.clone();
                drop(inner);
                if let Some(resource) = resource {
                    resource.post_error(XdgShellError::NotTheTopmostPopup);
                }
                return Err(XdgShellError::NotTheTopmostPopup);
            }
        }
        self.detach();
        self.inner.borrow_mut().resource = None;
        self.maybe_release();
        Ok(())
    }

    /// Notify the backing that the wire resource went away without a
    /// `destroy` request, e.g. on client disconnect.
    pub fn resource_destroyed(&self) {
        self.inner.borrow_mut().resource = None;
        self.maybe_release();
    }

    /// Start a configure round-trip from the current positioner state.
    pub(super) fn send_configure(&self) {
        let state = {
            let inner = self.inner.borrow();
            match (&inner.role, &inner.parent) {
                (Some(role), Some(parent)) => Some((
                    role.clone(),
                    parent.clone(),
                    inner.positioner.clone(),
                    inner.resource.clone(),
                )),
                _ => None,
            }
        };
        let Some((role, parent, positioner, resource)) = state else {
            return;
        };

        let geometry = positioner.geometry(parent.window_geometry());
        let carries_geometry = geometry.size.w >= 0 && geometry.size.h >= 0;
        let serial = SERIAL_COUNTER.next_serial();
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending_loc = geometry.loc;
            inner.conf_serial = Some(serial);
            if carries_geometry {
                inner.position_serial = Some(serial);
            }
        }

        // No frames between this configure and its ack.
        role.freeze_frames();
        if carries_geometry {
            if let Some(resource) = resource {
                resource.send_configure(geometry);
            }
        }
        role.send_configure(serial);
    }

    fn map(&self) {
        let Some(role) = self.inner.borrow().role.clone() else {
            return;
        };
        // Contents from before an unmap are not preserved.
        role.invalidate_contents();
        self.inner.borrow_mut().flags.insert(PopupFlags::MAPPED);
        self.update_window_position();
        if let Some(window) = role.window() {
            window.map_raised();
        }
        trace!("xdg_popup mapped");
        self.finish_pending_grab();
    }

    pub(super) fn unmap(&self) {
        let window = {
            let mut inner = self.inner.borrow_mut();
            if !inner.flags.contains(PopupFlags::MAPPED) {
                return;
            }
            inner.flags.remove(PopupFlags::MAPPED);
            inner.role.as_ref().and_then(|role| role.window())
        };
        if let Some(window) = window {
            window.unmap();
        }
    }

    /// Move the backing window to the spot derived from the acknowledged
    /// location and the parent's placement on the host display.
    fn update_window_position(&self) {
        let (role, parent, loc) = {
            let inner = self.inner.borrow();
            match (&inner.role, &inner.parent) {
                (Some(role), Some(parent)) => (role.clone(), parent.clone(), inner.loc),
                _ => return,
            }
        };
        // Nothing to position against without backing windows on both ends.
        let Some(window) = role.window() else {
            return;
        };
        if parent.window().is_none() {
            return;
        }
        let parent_geometry = parent.window_geometry();
        let position = parent.root_position()
            + parent.surface_to_window(parent_geometry.loc + loc)
            - role.surface_to_window(role.window_geometry().loc);
        window.move_to(position);
    }

    fn positioner(&self) -> Rc<dyn Positioner> {
        self.inner.borrow().positioner.clone()
    }

    /// Tear down the backing once neither the role nor the resource hold on
    /// to it anymore. Idempotent, and safe to call from either release path.
    pub(super) fn maybe_release(&self) {
        let (parent, reconstrain_key, grab_seat, seat_key, pending_seat, pending_key) = {
            let mut inner = self.inner.borrow_mut();
            if inner.role.is_some() || inner.resource.is_some() {
                return;
            }
            (
                inner.parent.take(),
                inner.reconstrain_listener.take(),
                inner.grab_seat.take(),
                inner.seat_listener.take(),
                inner.pending_grab_seat.take(),
                inner.pending_seat_listener.take(),
            )
        };
        if let (Some(parent), Some(key)) = (parent.as_ref(), reconstrain_key) {
            parent.remove_update_listener(key);
        }
        if let (Some(seat), Some(key)) = (grab_seat, seat_key) {
            seat.remove_destroy_listener(key);
        }
        if let (Some(seat), Some(key)) = (pending_seat, pending_key) {
            seat.remove_destroy_listener(key);
        }
        trace!("xdg_popup backing released");
    }
}
