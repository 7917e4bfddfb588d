use crate::TrellisError;

/// The environment variable the debug flag is read from.
pub const DEBUG_MODE: &str = "DEBUG_MODE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// The application configuration.
///
/// There is only one setting: whether the application runs in debug mode.
/// In debug mode, errors that are not HTTP errors are handed back to the
/// host unchanged; otherwise they are logged and masked as a generic
/// `500 Internal Server Error`.
///
/// The default configuration is the production one.
pub struct Config {
    /// Whether the application runs in debug mode.
    pub debug: bool,
}

#[derive(serde::Deserialize)]
struct Vars {
    debug_mode: Option<String>,
}

impl Config {
    /// Creates a configuration with the given debug flag.
    pub fn debug(debug: bool) -> Self {
        Config { debug }
    }

    /// Loads a `.env` file from the current directory (or any of its
    /// parents), if there is one, and then reads the configuration from the
    /// environment.  Variables already set in the environment take
    /// precedence over the ones in the file.
    ///
    /// # Errors
    /// This fails if the `.env` file exists but cannot be read, or for the
    /// same reasons as [`Self::from_env`].
    pub fn load() -> Result<Self, TrellisError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(TrellisError::Environment(e.to_string())),
        }

        Config::from_env()
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// This fails with [`TrellisError::Environment`] if `DEBUG_MODE` is not
    /// set, or is set to anything other than `true` or `false` (in any
    /// case).
    pub fn from_env() -> Result<Self, TrellisError> {
        let vars = envy::from_env::<Vars>().map_err(|e| TrellisError::Environment(e.to_string()))?;
        Config::from_vars(vars)
    }

    /// Reads the configuration from the given variables, instead of the
    /// process environment.
    ///
    /// # Errors
    /// See [`Self::from_env`].
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// let vars = vec![("DEBUG_MODE".to_owned(), "TRUE".to_owned())];
    /// assert_eq!(Config::from_iter(vars).unwrap(), Config::debug(true));
    ///
    /// let vars = vec![("DEBUG_MODE".to_owned(), "yes".to_owned())];
    /// assert!(Config::from_iter(vars).is_err());
    /// ```
    pub fn from_iter<I>(vars: I) -> Result<Self, TrellisError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars = envy::from_iter::<_, Vars>(vars).map_err(|e| TrellisError::Environment(e.to_string()))?;
        Config::from_vars(vars)
    }

    fn from_vars(vars: Vars) -> Result<Self, TrellisError> {
        let value = vars
            .debug_mode
            .ok_or_else(|| TrellisError::Environment(format!("{} is not set", DEBUG_MODE)))?;

        match value.to_ascii_lowercase().as_str() {
            "true" => Ok(Config::debug(true)),
            "false" => Ok(Config::debug(false)),
            _ => Err(TrellisError::Environment(format!(
                "{} must be \"true\" or \"false\", got {:?}",
                DEBUG_MODE, value
            ))),
        }
    }
}
