#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod logging;
pub mod middleware;

pub use crate::error::{
    BoxedError, ClientErrors, ErrorClass, error_chain, is_any, render_error_chain,
};
