//! Levenberg–Marquardt damping factor.

/// Damping factor λ with its floor (the configured initial value).
///
/// * a rejected step multiplies λ by 10,
/// * an accepted step divides it by 10, never going below the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Damping {
    lambda: f64,
    floor: f64,
}

impl Damping {
    pub fn new(initial: f64) -> Self {
        Self {
            lambda: initial,
            floor: initial,
        }
    }

    pub fn value(&self) -> f64 {
        self.lambda
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    #[must_use]
    pub fn reject(self) -> Self {
        Self {
            lambda: self.lambda * 10.0,
            ..self
        }
    }

    #[must_use]
    pub fn accept(self) -> Self {
        Self {
            lambda: (self.lambda / 10.0).max(self.floor),
            ..self
        }
    }
}
