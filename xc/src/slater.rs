const T13: f64 = 1.0 / 3.0;

/// (vx, ex)
pub fn slater_unpolarized(rho: f64) -> (f64, f64) {
    let cx: f64 = -(3.0 / std::f64::consts::PI).powf(T13);

    let vx = cx * rho.powf(T13);

    (vx, 0.75 * vx)
}

/// (vx_up, vx_dn, ex)
pub fn slater_polarized(rho: f64, zeta: f64) -> (f64, f64, f64) {
    let cx: f64 = -(3.0 / std::f64::consts::PI).powf(T13);

    let vx_up = cx * ((1.0 + zeta) * rho).powf(T13);
    let vx_dn = cx * ((1.0 - zeta) * rho).powf(T13);

    let ex = 0.5 * ((1.0 + zeta) * 0.75 * vx_up + (1.0 - zeta) * 0.75 * vx_dn);

    (vx_up, vx_dn, ex)
}
