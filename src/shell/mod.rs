//! Shell protocol handling.
//!
//! One submodule per shell protocol the bridge speaks towards its clients.
//! Only `xdg_shell` is implemented at the moment.

pub mod xdg;
