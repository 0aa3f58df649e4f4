//! # Orbital element representations
//!
//! Two canonical element sets and the conversions between them and Cartesian
//! states:
//!
//! - [`keplerian_element`](crate::orbit_type::keplerian_element) – Classical elements `(a, e, i, Ω, ω, ν)`,
//!   elliptic orbits only.
//! - [`equinoctial_element`](crate::orbit_type::equinoctial_element) – Equinoctial elements `(a, h, k, p, q, L)`,
//!   the non-singular form used to seed a TLE fit from an osculating state.
//!
//! ```text
//!   Cartesian ──from_cartesian──▶ Keplerian ──From──▶ Equinoctial
//!       ▲                             │  ◀──to_keplerian──┘
//!       └────────to_cartesian─────────┘
//! ```
//!
//! No perturbations are modeled here: these are osculating two-body
//! conversions, in whatever inertial frame the input state is expressed.

/// Equinoctial orbital elements and related conversions.
pub mod equinoctial_element;

/// Classical Keplerian elements structure and utilities.
pub mod keplerian_element;
