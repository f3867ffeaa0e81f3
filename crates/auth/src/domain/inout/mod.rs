pub mod authn;
pub mod profile;

pub mod prelude {
    pub use super::authn::*;
    pub use super::profile::*;
}
