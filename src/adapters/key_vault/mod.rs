mod env;

pub use env::{EnvKeyVault, DEFAULT_ENV_PREFIX};
