//! Clock-jitter symbol extraction and chi-square uniformity validation.
//!
//! [`entropy::jitter::JitterExtractor`] turns the delta between two adjacent
//! clock reads into a fixed-width [`entropy::jitter::Symbol`].
//! [`validator::Validator`] tabulates `n` such symbols and scores them against
//! a uniform distribution over the observed alphabet; [`significance`] judges
//! the score separately.

pub mod cli;
pub mod config;
pub mod entropy;
pub mod error;
pub mod logging;
pub mod output;
pub mod shutdown;
pub mod significance;
pub mod stream;
pub mod validate;
pub mod validator;
