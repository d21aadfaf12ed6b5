//! Complex numbers for imaginary literals and the `cmath` module.

use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const I: Complex = Complex { re: 0.0, im: 1.0 };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn from_real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    /// Returns `None` on division by zero.
    pub fn div(self, other: Self) -> Option<Self> {
        let denom = other.re * other.re + other.im * other.im;
        if denom == 0.0 {
            return None;
        }
        Some(Self::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        ))
    }

    pub fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }

    pub fn exp(self) -> Self {
        let scale = self.re.exp();
        Self::new(scale * self.im.cos(), scale * self.im.sin())
    }

    pub fn ln(self) -> Self {
        Self::new(self.abs().ln(), self.arg())
    }

    pub fn sqrt(self) -> Self {
        if self.re == 0.0 && self.im == 0.0 {
            return Self::new(0.0, self.im);
        }
        let r = self.abs();
        let re = ((r + self.re) / 2.0).sqrt();
        let im = ((r - self.re) / 2.0).sqrt().copysign(self.im);
        Self::new(re, im)
    }

    /// Returns `None` for `0 ** z` with a non-positive real part.
    pub fn powc(self, exponent: Self) -> Option<Self> {
        if self.re == 0.0 && self.im == 0.0 {
            if exponent.re == 0.0 && exponent.im == 0.0 {
                return Some(Self::from_real(1.0));
            }
            if exponent.im != 0.0 || exponent.re < 0.0 {
                return None;
            }
            return Some(Self::from_real(0.0));
        }
        Some(self.ln().mul(exponent).exp())
    }

    pub fn sin(self) -> Self {
        Self::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    pub fn cos(self) -> Self {
        Self::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    pub fn tan(self) -> Option<Self> {
        self.sin().div(self.cos())
    }

    pub fn asin(self) -> Self {
        // -i * ln(iz + sqrt(1 - z^2))
        let one = Self::from_real(1.0);
        let root = one.sub(self.mul(self)).sqrt();
        let inner = Self::I.mul(self).add(root);
        Self::new(0.0, -1.0).mul(inner.ln())
    }

    pub fn acos(self) -> Self {
        Self::from_real(FRAC_PI_2).sub(self.asin())
    }

    pub fn atan(self) -> Option<Self> {
        // i/2 * (ln(1 - iz) - ln(1 + iz))
        let one = Self::from_real(1.0);
        let iz = Self::I.mul(self);
        let a = one.sub(iz);
        let b = one.add(iz);
        if (a.re == 0.0 && a.im == 0.0) || (b.re == 0.0 && b.im == 0.0) {
            return None;
        }
        Some(Self::new(0.0, 0.5).mul(a.ln().sub(b.ln())))
    }

    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    pub fn is_nan(self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex, b: Complex) -> bool {
        (a.re - b.re).abs() < 1e-12 && (a.im - b.im).abs() < 1e-12
    }

    #[test]
    fn test_sqrt_of_negative_real() {
        assert!(close(Complex::from_real(-4.0).sqrt(), Complex::new(0.0, 2.0)));
    }

    #[test]
    fn test_exp_ln_inverse() {
        let z = Complex::new(0.3, -1.2);
        assert!(close(z.ln().exp(), z));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(Complex::new(1.0, 1.0).div(Complex::from_real(0.0)).is_none());
    }

    #[test]
    fn test_asin_of_real_matches_real_asin() {
        let z = Complex::from_real(0.5).asin();
        assert!((z.re - 0.5f64.asin()).abs() < 1e-12);
        assert!(z.im.abs() < 1e-12);
    }
}
