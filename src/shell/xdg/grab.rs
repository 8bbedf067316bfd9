//! The popup grab stack.
//!
//! Grabs form a stack along the parent chain: a submenu grabs on top of its
//! parent menu, and dismissing or destroying a popup hands the grab back to
//! the parent. Grab requests arrive before the popup is mapped, so they are
//! buffered and only resolved against the seat during the map.

use std::rc::Rc;

use tracing::trace;

use crate::utils::Serial;

use super::popup::{PopupFlags, XdgPopup};
use super::{RoleKind, Seat, XdgShellError};

fn same_seat(a: &Rc<dyn Seat>, b: &Rc<dyn Seat>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl XdgPopup {
    /// Process `xdg_popup.grab`.
    ///
    /// On an unmapped popup this records the request and resolves it during
    /// the map. Grabbing a mapped popup is a protocol error; a repeated grab
    /// on an already grabbed or grab-committed popup is ignored.
    pub fn grab(&self, seat: Rc<dyn Seat>, serial: Serial) -> Result<(), XdgShellError> {
        {
            let inner = self.inner.borrow();
            if inner.role.is_none() {
                return Ok(());
            }
            if inner.flags.contains(PopupFlags::GRABBED) {
                return Ok(());
            }
            if inner.flags.contains(PopupFlags::MAPPED) {
                let resource = inner.resource.clone();
                drop(inner);
                if let Some(resource) = resource {
                    resource.post_error(XdgShellError::InvalidGrab);
                }
                return Err(XdgShellError::InvalidGrab);
            }
            // Already committed to a grab path.
            if inner.seat_listener.is_some() || inner.pending_seat_listener.is_some() {
                return Ok(());
            }
        }

        let weak = self.downgrade();
        let key = seat.add_destroy_listener(Rc::new(move || {
            if let Some(popup) = weak.upgrade() {
                popup.pending_seat_destroyed();
            }
        }));

        let parent_popup = {
            let mut inner = self.inner.borrow_mut();
            inner.pending_grab_seat = Some(seat);
            inner.pending_grab_serial = Some(serial);
            inner.pending_seat_listener = Some(key);
            inner
                .flags
                .insert(PopupFlags::PENDING_GRAB | PopupFlags::TOPMOST);
            inner.parent.as_ref().and_then(|parent| parent.popup())
        };
        // The chain has a new top.
        if let Some(parent) = parent_popup {
            parent.inner.borrow_mut().flags.remove(PopupFlags::TOPMOST);
        }
        Ok(())
    }

    /// Dismiss this popup and every popup parent above it in the chain.
    ///
    /// This is the entry point for seat implementations when input leaves
    /// the grab, e.g. on a click outside of the menus.
    pub fn dismiss(&self) {
        self.send_dismiss(true);
    }

    pub(super) fn send_dismiss(&self, dismiss_parents: bool) {
        trace!("dismissing xdg_popup");
        let resource = self.inner.borrow().resource.clone();
        if let Some(resource) = resource {
            resource.send_popup_done();
        }
        self.unmap();
        let parent_popup = {
            let mut inner = self.inner.borrow_mut();
            inner.flags.remove(PopupFlags::GRABBED);
            if dismiss_parents {
                inner.parent.as_ref().and_then(|parent| parent.popup())
            } else {
                None
            }
        };
        if let Some(parent) = parent_popup {
            parent.send_dismiss(true);
        }
    }

    /// Resolve a buffered grab request during the map.
    pub(super) fn finish_pending_grab(&self) {
        let (seat, serial, key) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.flags.contains(PopupFlags::PENDING_GRAB) {
                return;
            }
            inner.flags.remove(PopupFlags::PENDING_GRAB);
            (
                inner.pending_grab_seat.take(),
                inner.pending_grab_serial.take(),
                inner.pending_seat_listener.take(),
            )
        };
        match (seat, serial) {
            (Some(seat), Some(serial)) => {
                if let Some(key) = key {
                    seat.remove_destroy_listener(key);
                }
                if !self.establish_grab(&seat, serial) {
                    self.send_dismiss(false);
                }
            }
            // The seat went away while the grab was pending.
            _ => self.send_dismiss(false),
        }
    }

    /// Try to make `seat` route its input to this popup.
    pub(super) fn establish_grab(&self, seat: &Rc<dyn Seat>, serial: Serial) -> bool {
        let parent = self.inner.borrow().parent.clone();
        let grabbable = match parent.as_ref().map(|parent| parent.kind()) {
            Some(RoleKind::Toplevel) => true,
            Some(RoleKind::Popup) => parent
                .and_then(|parent| parent.popup())
                .is_some_and(|parent| parent.grabbed_by(seat)),
            None => false,
        };
        if !grabbable || !seat.try_explicit_grab(self, serial) {
            return false;
        }

        let previous = {
            let inner = self.inner.borrow();
            inner.grab_seat.clone().zip(inner.seat_listener)
        };
        if let Some((old_seat, old_key)) = previous {
            old_seat.remove_destroy_listener(old_key);
        }
        let weak = self.downgrade();
        let key = seat.add_destroy_listener(Rc::new(move || {
            if let Some(popup) = weak.upgrade() {
                popup.holder_destroyed();
            }
        }));

        let mut inner = self.inner.borrow_mut();
        inner.grab_seat = Some(seat.clone());
        inner.grab_serial = Some(serial);
        inner.seat_listener = Some(key);
        inner.flags.insert(PopupFlags::GRABBED);
        true
    }

    fn grabbed_by(&self, seat: &Rc<dyn Seat>) -> bool {
        let inner = self.inner.borrow();
        inner.flags.contains(PopupFlags::GRABBED)
            && inner
                .grab_seat
                .as_ref()
                .is_some_and(|holder| same_seat(holder, seat))
    }

    fn pending_seat_destroyed(&self) {
        // PENDING_GRAB stays set; the map will notice the missing seat and
        // dismiss.
        let mut inner = self.inner.borrow_mut();
        inner.pending_grab_seat = None;
        inner.pending_seat_listener = None;
    }

    fn holder_destroyed(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.grab_seat = None;
            inner.seat_listener = None;
        }
        self.send_dismiss(false);
    }

    /// Hand an active or pending grab back to the parent when this popup
    /// leaves the chain.
    pub(super) fn revert_grab_to_parent(&self) {
        let (grab, pending, parent) = {
            let mut inner = self.inner.borrow_mut();
            if !inner
                .flags
                .intersects(PopupFlags::GRABBED | PopupFlags::PENDING_GRAB)
            {
                return;
            }
            inner.flags.remove(
                PopupFlags::GRABBED | PopupFlags::PENDING_GRAB | PopupFlags::TOPMOST,
            );
            (
                (
                    inner.grab_seat.take(),
                    inner.grab_serial.take(),
                    inner.seat_listener.take(),
                ),
                (
                    inner.pending_grab_seat.take(),
                    inner.pending_grab_serial.take(),
                    inner.pending_seat_listener.take(),
                ),
                inner.parent.clone(),
            )
        };
        if let (Some(seat), Some(key)) = (grab.0.as_ref(), grab.2) {
            seat.remove_destroy_listener(key);
        }
        if let (Some(seat), Some(key)) = (pending.0.as_ref(), pending.2) {
            seat.remove_destroy_listener(key);
        }
        let (seat, serial) = if grab.0.is_some() {
            (grab.0, grab.1)
        } else {
            (pending.0, pending.1)
        };

        let Some(parent) = parent.and_then(|parent| parent.popup()) else {
            return;
        };
        // The parent stays topmost even if the grab cannot move back, so the
        // client can still legally destroy it.
        parent.inner.borrow_mut().flags.insert(PopupFlags::TOPMOST);
        if let (Some(seat), Some(serial)) = (seat, serial) {
            if !parent.establish_grab(&seat, serial) {
                parent.send_dismiss(true);
            }
        }
    }
}
