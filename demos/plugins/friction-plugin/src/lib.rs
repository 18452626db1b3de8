//! Friction Plugin - a sample native plugin for the demo hook spec in
//! `demos/hooks.toml`
//!
//! Implements only the `friction` hook; `env_temperature` stays unbound.
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Packaging and installing
//!
//! ```bash
//! mkdir -p pkg
//! cp plugin.toml target/release/libacme_friction.so pkg/
//! (cd pkg && zip ../friction-linux64.hmplugin *)
//! hookman --spec ../../hooks.toml install friction-linux64.hmplugin
//! hookman --spec ../../hooks.toml check
//! ```

/// Laminar flow ends around this Reynolds number
const LAMINAR_LIMIT: f64 = 2300.0;

/// Darcy friction factor: `64/Re` for laminar flow, Swamee-Jain otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn acme_v1_friction(reynolds: f64, roughness: f64) -> f64 {
    if reynolds <= 0.0 {
        return f64::NAN;
    }
    if reynolds < LAMINAR_LIMIT {
        return 64.0 / reynolds;
    }

    let term = roughness / 3.7 + 5.74 / reynolds.powf(0.9);
    0.25 / term.log10().powi(2)
}
