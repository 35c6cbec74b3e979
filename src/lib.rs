#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

mod error;

pub mod config;
pub mod device;
pub mod interface;
pub mod params;
pub mod registers;
pub mod sensor;

pub use crate::device::Bmm050;
pub use crate::error::{status_code, BusError, Error, Result, BMM050_ERROR, BMM050_SUCCESS};
