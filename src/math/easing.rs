/// Exact at both ends: `lerp(a, b, 0) == a` and `lerp(a, b, 1) == b`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Hermite S-curve on `[0, 1]`, clamped outside.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Frame-rate independent exponential approach of `current` towards `target`.
/// Same as `current += (target - current) * (1 - exp(-rate * dt))`, but never
/// steps past `target`.
pub fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    target + (current - target) * (-rate * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothstep_is_clamped_and_symmetric() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert!((smoothstep(0.25) + smoothstep(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn damp_never_overshoots() {
        let mut value = 0.0;
        for _ in 0..1000 {
            value = damp(value, 10.0, 4.0, 0.5);
            assert!(value <= 10.0);
        }
    }

    #[test]
    fn damp_with_zero_dt_is_identity() {
        assert_eq!(damp(3.0, 10.0, 4.0, 0.0), 3.0);
    }
}
