mod fragment;
mod hash_algo;
mod host;
mod limits;
mod module;
mod receipt;
mod stage;

#[rustfmt::skip]
pub use {
    fragment::*,
    hash_algo::*,
    host::*,
    limits::*,
    module::*,
    receipt::*,
    stage::*,
};
