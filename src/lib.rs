#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # Waybridge: Wayland clients on an X11 display
//!
//! This crate contains the protocol core of a compositor that talks
//! `wayland` to its clients while every surface is realized as a window on a
//! host X11 server. The embedding compositor owns the event loop, the wire
//! dispatch and input handling; this crate owns the part that does not map
//! onto plain X11 window management: the `xdg_shell` popup machinery with its
//! configure/ack round-trips, grab stack and reconstraint handling.
//!
//! ## Structure of the crate
//!
//! [`shell`] holds the protocol machinery and the traits through which it
//! talks to the rest of the compositor. [`x11`] implements the window
//! operations on the host server via [`x11rb`]. [`utils`] carries the small
//! shared vocabulary: geometry, protocol serials and keyed listener
//! registries.
//!
//! ## Threading
//!
//! Everything here is loop-local. The compositor model is a single thread
//! servicing both the Wayland clients and the X server; handles are `Rc`
//! based and must stay on the dispatching thread. Callbacks registered on
//! collaborator objects run inline during dispatch.

pub mod shell;
pub mod utils;
pub mod x11;
