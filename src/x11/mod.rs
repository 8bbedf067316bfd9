//! The X11 side of the bridge.
//!
//! Every shell surface is backed by a real window on the host X server. This
//! module implements the window operations the shell machinery needs on top
//! of an [`x11rb`] connection. Failures on the connection are logged and
//! otherwise swallowed; a vanished window is handled through the normal
//! surface teardown, not through these calls.

use std::rc::Rc;

use tracing::warn;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt as _, PropMode,
    StackMode, Window,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shell::xdg::HostWindow;
use crate::utils::Point;

x11rb::atom_manager! {
    /// Atoms the bridge needs for window management.
    pub Atoms:
    AtomsCookie {
        WM_PROTOCOLS,
        _MOTIF_WM_HINTS,
        _NET_WM_SYNC_REQUEST,
    }
}

/// Errors raised while connecting the bridge to the X server.
#[derive(Debug, thiserror::Error)]
pub enum X11BackendError {
    /// The connection failed while interning atoms.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The X server rejected an atom request.
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

/// Shared handle to the host X server.
#[derive(Debug)]
pub struct X11Backend {
    conn: Rc<RustConnection>,
    atoms: Atoms,
}

impl X11Backend {
    /// Intern the atoms the bridge relies on and wrap the connection.
    pub fn new(conn: Rc<RustConnection>) -> Result<Self, X11BackendError> {
        let atoms = Atoms::new(conn.as_ref())?.reply()?;
        Ok(Self { conn, atoms })
    }

    /// A [`HostWindow`] handle driving the given X11 window.
    pub fn window(&self, window: Window) -> X11Window {
        X11Window {
            conn: self.conn.clone(),
            atoms: self.atoms,
            window,
        }
    }
}

const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

/// One X11 window under bridge control.
#[derive(Debug, Clone)]
pub struct X11Window {
    conn: Rc<RustConnection>,
    atoms: Atoms,
    window: Window,
}

impl X11Window {
    /// The raw window id.
    pub fn window(&self) -> Window {
        self.window
    }
}

impl HostWindow for X11Window {
    fn set_override_redirect(&self, enabled: bool) {
        let aux = ChangeWindowAttributesAux::new().override_redirect(enabled as u32);
        if let Err(err) = self.conn.change_window_attributes(self.window, &aux) {
            warn!(window = self.window, "failed to change override-redirect: {}", err);
        }
    }

    fn set_decorated(&self, decorated: bool) {
        // [flags, functions, decorations, input mode, status]
        let hints = [MWM_HINTS_DECORATIONS, 0, decorated as u32, 0, 0];
        if let Err(err) = self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms._MOTIF_WM_HINTS,
            self.atoms._MOTIF_WM_HINTS,
            &hints,
        ) {
            warn!(window = self.window, "failed to update motif hints: {}", err);
        }
    }

    fn set_sync_configure(&self, enabled: bool) {
        let result = if enabled {
            self.conn
                .change_property32(
                    PropMode::REPLACE,
                    self.window,
                    self.atoms.WM_PROTOCOLS,
                    AtomEnum::ATOM,
                    &[self.atoms._NET_WM_SYNC_REQUEST],
                )
                .map(|_| ())
        } else {
            self.conn
                .delete_property(self.window, self.atoms.WM_PROTOCOLS)
                .map(|_| ())
        };
        if let Err(err) = result {
            warn!(window = self.window, "failed to update WM_PROTOCOLS: {}", err);
        }
    }

    fn move_to(&self, position: Point) {
        let aux = ConfigureWindowAux::new().x(position.x).y(position.y);
        if let Err(err) = self.conn.configure_window(self.window, &aux) {
            warn!(window = self.window, "failed to move window: {}", err);
        }
    }

    fn map_raised(&self) {
        let aux = ConfigureWindowAux::new().stack_mode(StackMode::ABOVE);
        let result = self
            .conn
            .configure_window(self.window, &aux)
            .and_then(|_| self.conn.map_window(self.window));
        if let Err(err) = result {
            warn!(window = self.window, "failed to raise and map window: {}", err);
        }
    }

    fn unmap(&self) {
        if let Err(err) = self.conn.unmap_window(self.window) {
            warn!(window = self.window, "failed to unmap window: {}", err);
        }
    }
}
