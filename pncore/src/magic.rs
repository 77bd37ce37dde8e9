/// Name of the environment variable containing the path to the engine configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/propnet/engine.toml` or `$HOME/.config/propnet/engine.toml`
///  (2) on Windows: `%APPDATA%\propnet\engine.toml`
pub const ENV_CONFIG_PATH: &str = "PN_CONFIG_PATH";

/// Directory and file name used for the default configuration path.
pub const CONFIG_DIR_NAME: &str = "propnet";
pub const CONFIG_FILE_NAME: &str = "engine.toml";

/// Sub-directories of a descriptor directory.
pub const SYMBOLS_DIR: &str = "symbols";
pub const MODELS_DIR: &str = "models";

/// Extension of descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "toml";

/// Number of hex characters of the SHA-256 digest of a model name used as its short id.
pub const MODEL_ID_LEN: usize = 4;

/// Relative tolerance used when replaying model test data.
pub const SELF_TEST_TOLERANCE: f64 = 1e-6;
