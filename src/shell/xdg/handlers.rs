//! Wiring between the popup machinery and the client-facing wire objects.

use wayland_protocols::xdg::shell::server::{xdg_popup, xdg_wm_base};
use wayland_server::Resource;

use crate::utils::Rectangle;

use super::{PopupResource, XdgShellError};

impl PopupResource for xdg_popup::XdgPopup {
    fn send_configure(&self, geometry: Rectangle) {
        self.configure(
            geometry.loc.x,
            geometry.loc.y,
            geometry.size.w,
            geometry.size.h,
        );
    }

    fn send_popup_done(&self) {
        self.popup_done();
    }

    fn send_repositioned(&self, token: u32) {
        if self.version() >= xdg_popup::EVT_REPOSITIONED_SINCE {
            self.repositioned(token);
        }
    }

    fn post_error(&self, error: XdgShellError) {
        match error {
            XdgShellError::InvalidGrab => Resource::post_error(
                self,
                xdg_popup::Error::InvalidGrab,
                "xdg_popup already is mapped",
            ),
            XdgShellError::NotTheTopmostPopup => Resource::post_error(
                self,
                xdg_wm_base::Error::NotTheTopmostPopup,
                "xdg_popup was not created on the topmost popup",
            ),
            XdgShellError::InvalidPositioner => Resource::post_error(
                self,
                xdg_wm_base::Error::InvalidPositioner,
                "xdg_positioner is incomplete",
            ),
        }
    }
}
