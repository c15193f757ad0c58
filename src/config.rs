use std::sync::OnceLock;
use serde::{Serialize, Deserialize};
use crate::error::Error;




/**
 * Rule for combining the fine face values that map onto a coarse face when
 * coarsening face-centered coefficients. Harmonic averaging preserves flux
 * continuity across strongly discontinuous coefficients; arithmetic
 * averaging is adequate for smooth ones.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Averaging {
    Arithmetic,
    Harmonic,
}




/**
 * Operator configuration: the boundary interpolant order, the coefficient
 * averaging rule, and a verbosity level. A process-wide default may be
 * installed once at startup; operators constructed afterwards start from it.
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Config {
    pub max_order: usize,
    pub averaging: Averaging,
    pub verbose: usize,
}




static DEFAULT: OnceLock<Config> = OnceLock::new();




// ============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            max_order: 2,
            averaging: Averaging::Arithmetic,
            verbose: 0,
        }
    }
}




// ============================================================================
impl Config {


    /**
     * Install the process-wide default configuration. Returns false if a
     * default was already installed, in which case the earlier one stands.
     */
    pub fn install_default(config: Config) -> bool {
        DEFAULT.set(config).is_ok()
    }


    /**
     * Return the process-wide default configuration, or the built-in one if
     * none was installed.
     */
    pub fn global() -> Config {
        DEFAULT.get().copied().unwrap_or_default()
    }


    pub fn validate(&self) -> Result<(), Error> {
        if self.max_order < 1 {
            Err(Error::InvalidOrder(self.max_order))
        } else {
            Ok(())
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{Averaging, Config};

    #[test]
    fn built_in_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.max_order, 2);
        assert_eq!(config.averaging, Averaging::Arithmetic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_order_is_rejected() {
        let config = Config { max_order: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }
}
