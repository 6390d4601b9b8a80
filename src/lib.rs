#![forbid(unsafe_code)]
//! lsgrid: a directory lister with composable sort orders and width-fitted column layouts.

pub mod cli;
pub mod collate;
pub mod color;
pub mod columns;
pub mod compare;
pub mod config;
pub mod diag;
pub mod entry;
pub mod layout;
pub mod listing;
pub mod long;
pub mod quote;
pub mod signals;
pub mod sort;
pub mod source;
pub mod table;
pub mod version;
