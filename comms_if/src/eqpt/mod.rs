//! # Equipment Interface
//!
//! This module defines the interface structures which are sent to and received from the
//! actuation interface.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
