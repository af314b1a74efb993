pub mod accumulator;
pub mod app;
pub mod assembler;
pub mod closure;
pub mod config;
pub mod domain;
pub mod ensembl;
pub mod error;
pub mod http;
pub mod mapper;
pub mod ols;
pub mod output;
pub mod reconcile;
pub mod source;
