//! procguide: guided questionnaires for government procedures.
//!
//! A query is classified, searched and turned into a decision tree by an
//! external text generator. Generated trees are extracted from free text,
//! repaired into a navigable shape and walked one answer at a time.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
