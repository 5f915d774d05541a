// fp-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, Angle as UomAngle, AngularVelocity as UomAngularVelocity,
    Length as UomLength, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Angle = UomAngle;
pub type AngularRate = UomAngularVelocity;
pub type Length = UomLength;
pub type Time = UomTime;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn mps2(v: f64) -> Accel {
    use uom::si::acceleration::meter_per_second_squared;
    Accel::new::<meter_per_second_squared>(v)
}

#[inline]
pub fn rad(v: f64) -> Angle {
    use uom::si::angle::radian;
    Angle::new::<radian>(v)
}

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn radps(v: f64) -> AngularRate {
    use uom::si::angular_velocity::radian_per_second;
    AngularRate::new::<radian_per_second>(v)
}

/// Raw SI value accessors, used at the boundary into the integrator.
pub mod si {
    use super::*;

    #[inline]
    pub fn meters(l: Length) -> f64 {
        l.get::<uom::si::length::meter>()
    }

    #[inline]
    pub fn seconds(t: Time) -> f64 {
        t.get::<uom::si::time::second>()
    }

    #[inline]
    pub fn mps2(a: Accel) -> f64 {
        a.get::<uom::si::acceleration::meter_per_second_squared>()
    }

    #[inline]
    pub fn radians(a: Angle) -> f64 {
        a.get::<uom::si::angle::radian>()
    }

    #[inline]
    pub fn degrees(a: Angle) -> f64 {
        a.get::<uom::si::angle::degree>()
    }

    #[inline]
    pub fn radps(w: AngularRate) -> f64 {
        w.get::<uom::si::angular_velocity::radian_per_second>()
    }
}

pub mod constants {
    /// Gravitational acceleration used by the reference scene.
    pub const GRAVITY_MPS2: f64 = 9.81;
    /// Sidereal rotation rate of the Earth, rounded.
    pub const EARTH_RATE_RADPS: f64 = 7.27e-5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _l = m(30.0);
        let _dt = s(0.01);
        let _g = mps2(constants::GRAVITY_MPS2);
        let _w = radps(constants::EARTH_RATE_RADPS);
    }

    #[test]
    fn degrees_convert_to_radians() {
        let a = deg(180.0);
        assert!((si::radians(a) - std::f64::consts::PI).abs() < 1e-12);
        assert!((si::degrees(rad(std::f64::consts::FRAC_PI_2)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn raw_accessors_round_trip() {
        assert_eq!(si::meters(m(24.0)), 24.0);
        assert_eq!(si::seconds(s(0.5)), 0.5);
        assert_eq!(si::mps2(mps2(9.81)), 9.81);
        assert_eq!(si::radps(radps(7.27e-5)), 7.27e-5);
    }
}
